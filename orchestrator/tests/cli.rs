//! CLI tests: spawn the orchestrator binary and check output and exit codes.

use std::path::Path;
use std::process::{Command, Output};

use orchestrator::exit_codes;
use orchestrator::io::config::{AgentConfig, BackendConfig, load_config, write_config};

fn orchestrator(dir: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_orchestrator"))
        .current_dir(dir)
        .args(args)
        .output()
        .expect("run orchestrator")
}

fn config_with_backend(dir: &Path, script: &str) {
    let config = AgentConfig {
        backend: BackendConfig {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            ..BackendConfig::default()
        },
        ..AgentConfig::default()
    };
    write_config(&dir.join("orchestrator.toml"), &config).expect("write config");
}

#[test]
fn init_writes_config_and_refuses_to_overwrite() {
    let temp = tempfile::tempdir().expect("tempdir");

    let first = orchestrator(temp.path(), &["init"]);
    assert_eq!(first.status.code(), Some(exit_codes::OK));
    let config = load_config(&temp.path().join("orchestrator.toml")).expect("load");
    assert!(config.tools.contains(&"terminal.run_command".to_string()));

    let second = orchestrator(temp.path(), &["init"]);
    assert_eq!(second.status.code(), Some(exit_codes::ERROR));
    assert!(String::from_utf8_lossy(&second.stderr).contains("--force"));

    let forced = orchestrator(temp.path(), &["init", "--force"]);
    assert_eq!(forced.status.code(), Some(exit_codes::OK));
}

#[test]
fn tools_lists_granted_tools() {
    let temp = tempfile::tempdir().expect("tempdir");
    orchestrator(temp.path(), &["init"]);

    let plain = orchestrator(temp.path(), &["tools"]);
    let stdout = String::from_utf8_lossy(&plain.stdout);
    assert!(stdout.lines().any(|line| line.starts_with("filesys.read_file: ")));

    let openai = orchestrator(temp.path(), &["tools", "--format", "openai"]);
    let definitions: serde_json::Value =
        serde_json::from_slice(&openai.stdout).expect("json definitions");
    assert_eq!(definitions[0]["type"], "function");
}

#[cfg(unix)]
#[test]
fn exec_runs_steps_through_the_backend_command() {
    let temp = tempfile::tempdir().expect("tempdir");
    config_with_backend(temp.path(), "cat > /dev/null; echo ok");

    let output = orchestrator(
        temp.path(),
        &["exec", "Build X", "--step", "design", "--step", "implement"],
    );
    assert_eq!(output.status.code(), Some(exit_codes::OK));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json result");
    assert_eq!(result["kind"], "output");
    assert_eq!(result["value"], serde_json::json!(["ok", "ok"]));
}

#[cfg(unix)]
#[test]
fn exec_reports_a_failed_tree() {
    let temp = tempfile::tempdir().expect("tempdir");
    config_with_backend(temp.path(), "cat > /dev/null; echo broken >&2; exit 3");

    let output = orchestrator(temp.path(), &["exec", "Build X", "--step", "design"]);
    assert_eq!(output.status.code(), Some(exit_codes::TASK_FAILED));
    let result: serde_json::Value = serde_json::from_slice(&output.stdout).expect("json result");
    assert_eq!(result["kind"], "failure");
    assert_eq!(result["value"]["description"], "design");
}
