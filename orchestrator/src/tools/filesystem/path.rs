//! Path scoping for filesystem tools.
//!
//! Every path goes through [`resolve_scoped_path`] before any filesystem
//! effect. Resolution is lexical first (`.` and `..` removed), then the longest
//! existing ancestor is canonicalized so symlinks cannot leave the allowed
//! root. The result must sit under the canonical allowed root, compared
//! component-wise.

use std::env;
use std::ffi::OsString;
use std::path::{Component, Path, PathBuf};

use anyhow::{Context, Result, bail};

use crate::error::ToolError;
use crate::tools::context::{SecurityLevel, ToolExecutionContext};

/// Canonical allowed root of `context`, if one is configured.
///
/// Under `security_level = strict` a missing root is an error.
pub fn scope_root(context: &ToolExecutionContext) -> Result<Option<PathBuf>> {
    let level = context.security_level()?;
    match context.allowed_root() {
        Some(root) => Ok(Some(canonicalize_existing_prefix(&absolutize(&root)?))),
        None if level == SecurityLevel::Strict => bail!(
            "security_level is strict but neither allowed_base_path nor workingdir is set"
        ),
        None => Ok(None),
    }
}

/// Directory relative paths are resolved against: `workingdir`, then the
/// allowed root, then the process working directory.
pub fn base_dir(context: &ToolExecutionContext) -> Result<PathBuf> {
    match context.working_dir().or_else(|| context.allowed_root()) {
        Some(dir) => Ok(canonicalize_existing_prefix(&absolutize(&dir)?)),
        None => env::current_dir().context("resolve current directory"),
    }
}

/// Resolve `raw` to a canonical absolute path inside the context's scope.
pub fn resolve_scoped_path(context: &ToolExecutionContext, raw: &str) -> Result<PathBuf> {
    if raw.trim().is_empty() {
        bail!("path must be non-empty");
    }
    let root = scope_root(context)?;
    let requested = Path::new(raw);
    let joined = if requested.is_absolute() {
        requested.to_path_buf()
    } else {
        base_dir(context)?.join(requested)
    };
    let resolved = canonicalize_existing_prefix(&normalize_lexically(&joined));

    if let Some(root) = root
        && !resolved.starts_with(&root)
    {
        return Err(ToolError::PathOutsideRoot {
            path: raw.to_string(),
            root: root.display().to_string(),
        }
        .into());
    }
    Ok(resolved)
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    let absolute = if path.is_absolute() {
        path.to_path_buf()
    } else {
        env::current_dir()
            .context("resolve current directory")?
            .join(path)
    };
    Ok(normalize_lexically(&absolute))
}

/// Drop `.` components and fold `..` into its parent without touching disk.
pub fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Canonicalize the longest existing ancestor of `path` and re-append the
/// missing tail.
fn canonicalize_existing_prefix(path: &Path) -> PathBuf {
    let mut existing = path.to_path_buf();
    let mut tail: Vec<OsString> = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            let mut out = canonical;
            out.extend(tail.iter().rev());
            return out;
        }
        match existing.file_name() {
            Some(name) => {
                tail.push(name.to_os_string());
                existing.pop();
            }
            None => return path.to_path_buf(),
        }
    }
}
