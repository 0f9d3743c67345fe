//! Task orchestration CLI.
//!
//! Reads an agent config (`orchestrator.toml` by default), builds the tool
//! registry and a chat agent on top of the configured backend command, then
//! plans or runs task trees.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use uuid::Uuid;

use orchestrator::agents::Agent;
use orchestrator::agents::backend::CommandBackend;
use orchestrator::agents::chat::ChatAgent;
use orchestrator::core::types::{TaskResult, TaskStatus};
use orchestrator::exit_codes;
use orchestrator::io::config::{AgentConfig, load_config, write_config};
use orchestrator::logging;
use orchestrator::manager::TaskManager;
use orchestrator::tools::context::{MAX_OPERATIONS, WORKINGDIR};
use orchestrator::tools::{Provider, ToolRegistry, builtin_registry};

const DEFAULT_CONFIG: &str = "orchestrator.toml";
const DEFAULT_MAX_OPERATIONS: &str = "50";

#[derive(Parser)]
#[command(
    name = "orchestrator",
    version,
    about = "Hierarchical task orchestration with scoped tool execution"
)]
struct Cli {
    /// Agent config file.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write a default config granting every built-in tool.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// List the tools granted by the config.
    Tools {
        #[arg(long, value_enum, default_value_t = ToolFormat::Plain)]
        format: ToolFormat,
    },
    /// Ask the agent for a plan and print it without executing it.
    Decompose { description: String },
    /// Answer a query, running it as a task tree when it needs several steps.
    Run { query: String },
    /// Execute a task built from explicit steps.
    Exec {
        description: String,
        /// Subtask description, in execution order. Repeatable.
        #[arg(long = "step")]
        steps: Vec<String>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum ToolFormat {
    Plain,
    Openai,
    Anthropic,
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::ERROR);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Tools { format } => cmd_tools(&cli.config, format),
        Command::Decompose { description } => cmd_decompose(&cli.config, &description),
        Command::Run { query } => cmd_run(&cli.config, &query),
        Command::Exec { description, steps } => cmd_exec(&cli.config, &description, &steps),
    }
}

fn cmd_init(config_path: &Path, force: bool) -> Result<i32> {
    if !force && config_path.exists() {
        bail!(
            "{} already exists (use --force to overwrite)",
            config_path.display()
        );
    }
    let registry = builtin_registry()?;
    let config = default_config(&registry);
    write_config(config_path, &config)?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_tools(config_path: &Path, format: ToolFormat) -> Result<i32> {
    let config = load_config(config_path)?;
    let granted = builtin_registry()?.subset(&config.tools);
    match format {
        ToolFormat::Plain => {
            for tool in granted.tools() {
                println!("{}: {}", tool.name(), tool.description());
            }
        }
        ToolFormat::Openai | ToolFormat::Anthropic => {
            let provider = if format == ToolFormat::Openai {
                Provider::OpenAi
            } else {
                Provider::Anthropic
            };
            let definitions = granted.definitions_for(provider);
            let rendered =
                serde_json::to_string_pretty(&definitions).context("serialize tool definitions")?;
            println!("{rendered}");
        }
    }
    Ok(exit_codes::OK)
}

fn cmd_decompose(config_path: &Path, description: &str) -> Result<i32> {
    let mut agent = build_agent(config_path)?;
    let subtasks = agent.decompose(description)?;
    if subtasks.is_empty() {
        println!("(single step)");
    }
    for (index, subtask) in subtasks.iter().enumerate() {
        println!("{}. {}", index + 1, subtask);
    }
    Ok(exit_codes::OK)
}

fn cmd_run(config_path: &Path, query: &str) -> Result<i32> {
    let mut agent = build_agent(config_path)?;
    let mut manager = TaskManager::new();
    let reply = agent.handle_complex_query(&mut manager, query)?;
    println!("{reply}");

    let failed = manager
        .get_tasks()
        .iter()
        .any(|task| task.status() == TaskStatus::Failed);
    Ok(if failed {
        exit_codes::TASK_FAILED
    } else {
        exit_codes::OK
    })
}

fn cmd_exec(config_path: &Path, description: &str, steps: &[String]) -> Result<i32> {
    let mut agent = build_agent(config_path)?;
    let mut manager = TaskManager::new();
    let task_id = manager
        .add_complex_task(description, steps.iter().cloned())
        .id()
        .to_string();

    let result = manager.execute_task_sequentially(&task_id, &mut agent)?;
    let summary = manager.status_summary();
    info!(
        completed = summary.completed.len(),
        failed = summary.failed.len(),
        pending = summary.pending.len(),
        "exec finished"
    );
    let rendered = serde_json::to_string_pretty(&result).context("serialize task result")?;
    println!("{rendered}");
    Ok(match result {
        TaskResult::Output(_) => exit_codes::OK,
        TaskResult::Failure(_) => exit_codes::TASK_FAILED,
    })
}

fn build_agent(config_path: &Path) -> Result<ChatAgent> {
    let config = load_config(config_path)?;
    let registry = builtin_registry()?;
    let backend = CommandBackend::new(config.backend.clone())?;
    let agent = ChatAgent::from_config(&config, &registry, Box::new(backend))?
        .with_session_id(Uuid::new_v4().to_string());
    info!(agent = %agent.name(), tools = agent.tools().len(), "agent ready");
    Ok(agent)
}

fn default_config(registry: &ToolRegistry) -> AgentConfig {
    let mut config = AgentConfig {
        tools: registry.names().into_iter().map(str::to_string).collect(),
        ..AgentConfig::default()
    };
    config
        .context
        .insert(WORKINGDIR.to_string(), ".".to_string());
    config
        .context
        .insert(MAX_OPERATIONS.to_string(), DEFAULT_MAX_OPERATIONS.to_string());
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_init_force() {
        let cli = Cli::parse_from(["orchestrator", "init", "--force"]);
        assert!(matches!(cli.command, Command::Init { force: true }));
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG));
    }

    #[test]
    fn parse_exec_steps_in_order() {
        let cli = Cli::parse_from([
            "orchestrator",
            "exec",
            "Build X",
            "--step",
            "design",
            "--step",
            "implement",
            "--config",
            "custom.toml",
        ]);
        match cli.command {
            Command::Exec { description, steps } => {
                assert_eq!(description, "Build X");
                assert_eq!(steps, vec!["design", "implement"]);
            }
            _ => panic!("expected exec"),
        }
        assert_eq!(cli.config, PathBuf::from("custom.toml"));
    }

    #[test]
    fn parse_tools_format() {
        let cli = Cli::parse_from(["orchestrator", "tools", "--format", "anthropic"]);
        assert!(matches!(
            cli.command,
            Command::Tools {
                format: ToolFormat::Anthropic
            }
        ));
    }

    #[test]
    fn default_config_grants_every_builtin_tool() {
        let registry = builtin_registry().expect("registry");
        let config = default_config(&registry);
        assert_eq!(config.tools.len(), registry.len());
        config.validate().expect("valid");
    }
}
