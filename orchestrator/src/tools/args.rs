//! Typed access to JSON tool arguments.

use anyhow::{Result, anyhow, bail};
use serde_json::Value;

pub fn required_str<'a>(args: &'a Value, name: &str) -> Result<&'a str> {
    match args.get(name) {
        Some(Value::String(s)) => Ok(s),
        Some(other) => bail!("argument '{name}' must be a string, got {other}"),
        None => Err(anyhow!("missing required argument '{name}'")),
    }
}

pub fn optional_str<'a>(args: &'a Value, name: &str) -> Result<Option<&'a str>> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => bail!("argument '{name}' must be a string, got {other}"),
    }
}

pub fn optional_bool(args: &Value, name: &str, default: bool) -> Result<bool> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(other) => bail!("argument '{name}' must be a boolean, got {other}"),
    }
}

pub fn optional_i64(args: &Value, name: &str, default: i64) -> Result<i64> {
    match args.get(name) {
        None | Some(Value::Null) => Ok(default),
        Some(value) => value
            .as_i64()
            .ok_or_else(|| anyhow!("argument '{name}' must be an integer, got {value}")),
    }
}

/// A positive count, e.g. a result limit.
pub fn optional_limit(args: &Value, name: &str, default: usize) -> Result<usize> {
    let raw = optional_i64(args, name, default as i64)?;
    if raw <= 0 {
        bail!("argument '{name}' must be positive, got {raw}");
    }
    Ok(raw as usize)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn required_string_reports_missing_and_mistyped() {
        let args = json!({"path": "a.txt", "count": 2});
        assert_eq!(required_str(&args, "path").expect("path"), "a.txt");
        let missing = required_str(&args, "query").expect_err("missing");
        assert_eq!(missing.to_string(), "missing required argument 'query'");
        assert!(required_str(&args, "count").is_err());
    }

    #[test]
    fn optional_values_fall_back_to_defaults() {
        let args = json!({"flag": null, "n": -1});
        assert!(optional_bool(&args, "flag", true).expect("flag"));
        assert_eq!(optional_i64(&args, "n", 5).expect("n"), -1);
        assert_eq!(optional_i64(&args, "m", 5).expect("m"), 5);
        assert_eq!(optional_str(&args, "s").expect("s"), None);
    }

    #[test]
    fn limits_must_be_positive() {
        assert_eq!(optional_limit(&json!({}), "max_results", 20).expect("default"), 20);
        assert!(optional_limit(&json!({"max_results": 0}), "max_results", 20).is_err());
    }
}
