//! Per-scope security settings and operation budget for tool calls.
//!
//! A context is created fresh for each agent-invocation scope and dropped when
//! the scope ends. Tools read its settings; only the registry bumps the
//! operation counter.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ToolError;

pub const ALLOWED_BASE_PATH: &str = "allowed_base_path";
pub const WORKINGDIR: &str = "workingdir";
pub const MAX_OPERATIONS: &str = "max_operations";
pub const SECURITY_LEVEL: &str = "security_level";

/// How strictly path-scoped tools treat a missing allowed root.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SecurityLevel {
    Permissive,
    #[default]
    Standard,
    /// Path-scoped tools refuse to run unless an allowed root is configured.
    Strict,
}

impl SecurityLevel {
    pub fn as_str(self) -> &'static str {
        match self {
            SecurityLevel::Permissive => "permissive",
            SecurityLevel::Standard => "standard",
            SecurityLevel::Strict => "strict",
        }
    }
}

impl fmt::Display for SecurityLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SecurityLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "permissive" => Ok(SecurityLevel::Permissive),
            "standard" => Ok(SecurityLevel::Standard),
            "strict" => Ok(SecurityLevel::Strict),
            other => Err(format!(
                "unknown security level '{other}' (expected permissive, standard or strict)"
            )),
        }
    }
}

/// Settings and usage counter for one agent-invocation scope.
#[derive(Debug, Default)]
pub struct ToolExecutionContext {
    settings: BTreeMap<String, String>,
    agent_id: String,
    session_id: String,
    operation_count: u64,
}

impl ToolExecutionContext {
    pub fn new(
        settings: BTreeMap<String, String>,
        agent_id: impl Into<String>,
        session_id: impl Into<String>,
    ) -> Self {
        Self {
            settings,
            agent_id: agent_id.into(),
            session_id: session_id.into(),
            operation_count: 0,
        }
    }

    /// Context with settings only, for callers outside an agent scope.
    pub fn with_settings<I, K, V>(settings: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let settings = settings
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(settings, "", "")
    }

    pub fn settings(&self) -> &BTreeMap<String, String> {
        &self.settings
    }

    pub fn agent_id(&self) -> &str {
        &self.agent_id
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    /// Tool calls that reached a tool function in this scope.
    pub fn operation_count(&self) -> u64 {
        self.operation_count
    }

    pub fn get_setting(&self, name: &str) -> Option<&str> {
        self.settings.get(name).map(String::as_str)
    }

    pub fn get_setting_or<'a>(&'a self, name: &str, default: &'a str) -> &'a str {
        self.get_setting(name).unwrap_or(default)
    }

    pub fn has_setting(&self, name: &str) -> bool {
        self.settings.contains_key(name)
    }

    /// Operation budget of this scope, if one is configured.
    pub fn max_operations(&self) -> Result<Option<u64>, ToolError> {
        match self.non_empty(MAX_OPERATIONS) {
            None => Ok(None),
            Some(raw) => raw.parse().map(Some).map_err(|_| ToolError::InvalidSetting {
                name: MAX_OPERATIONS.to_string(),
                message: format!("expected a non-negative integer, got '{raw}'"),
            }),
        }
    }

    pub fn security_level(&self) -> Result<SecurityLevel, ToolError> {
        match self.non_empty(SECURITY_LEVEL) {
            None => Ok(SecurityLevel::default()),
            Some(raw) => raw.parse().map_err(|message| ToolError::InvalidSetting {
                name: SECURITY_LEVEL.to_string(),
                message,
            }),
        }
    }

    /// Directory that path-scoped tools must stay under: `allowed_base_path`,
    /// falling back to `workingdir`.
    pub fn allowed_root(&self) -> Option<PathBuf> {
        self.non_empty(ALLOWED_BASE_PATH)
            .or_else(|| self.non_empty(WORKINGDIR))
            .map(PathBuf::from)
    }

    pub fn working_dir(&self) -> Option<PathBuf> {
        self.non_empty(WORKINGDIR).map(PathBuf::from)
    }

    /// True once the configured budget is spent.
    pub(crate) fn budget_exhausted(&self) -> Result<Option<u64>, ToolError> {
        Ok(self
            .max_operations()?
            .filter(|limit| self.operation_count >= *limit))
    }

    pub(crate) fn record_operation(&mut self) {
        self.operation_count += 1;
    }

    fn non_empty(&self, name: &str) -> Option<&str> {
        self.get_setting(name)
            .map(str::trim)
            .filter(|value| !value.is_empty())
    }
}
