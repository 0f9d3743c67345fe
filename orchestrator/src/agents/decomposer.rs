//! Parsing of decomposition replies into subtask descriptions.

use std::sync::LazyLock;

use regex::Regex;

use crate::error::DecompositionError;

static LIST_ITEM_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(?:\d+[.)]|[-*])\s+(.*?)\s*$").expect("list item regex is valid")
});

/// Extract list items from a model reply, in order.
///
/// Numbered (`1.`, `2)`) and bulleted (`-`, `*`) lines count as items when
/// the marker is followed by whitespace; every other line is ignored. A blank
/// reply is an error; a reply without list lines yields no subtasks.
pub fn parse_subtask_list(reply: &str) -> Result<Vec<String>, DecompositionError> {
    if reply.trim().is_empty() {
        return Err(DecompositionError::EmptyResponse);
    }

    Ok(reply
        .lines()
        .filter_map(|line| LIST_ITEM_RE.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|item| item.as_str().to_string())
        .filter(|item| !item.is_empty())
        .collect())
}
