//! Command scripts: one JSON command per line.
//!
//! ```text
//! # USSR opens
//! {"command":"purchase","faction":"USSR","unit_type":"inf","count":2}
//! {"command":"end_phase"}
//! ```
//!
//! Blank lines and lines starting with `#` are skipped.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use warsim_core::Command;

/// A command and the 1-based line it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptLine {
    pub line: usize,
    pub command: Command,
}

pub fn parse_script(text: &str) -> Result<Vec<ScriptLine>> {
    let mut commands = Vec::new();
    for (index, raw) in text.lines().enumerate() {
        let trimmed = raw.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let command: Command = serde_json::from_str(trimmed)
            .with_context(|| format!("line {}: not a valid command: {}", index + 1, trimmed))?;
        commands.push(ScriptLine {
            line: index + 1,
            command,
        });
    }
    Ok(commands)
}

pub fn load_script(path: &Path) -> Result<Vec<ScriptLine>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("Failed to read command script {:?}", path))?;
    let commands = parse_script(&text).with_context(|| format!("In {:?}", path))?;
    log::info!("Loaded {} commands from {:?}", commands.len(), path);
    Ok(commands)
}
