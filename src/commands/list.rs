//! Implementation of the `latch list` command.
//!
//! The registry records which folders are supposed to be locked; whether they
//! are still there is checked here, per entry, at render time.

use super::Session;
use crate::error::Result;
use crate::registry::LockEntry;
use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

/// Whether a registered folder is still on disk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FolderState {
    Active,
    Missing,
}

impl FolderState {
    /// Only a definite "does not exist" counts as missing. A folder that
    /// cannot be inspected, e.g. inside another locked folder, is reported as
    /// active.
    pub fn probe(path: &Path) -> Self {
        match path.try_exists() {
            Ok(false) => FolderState::Missing,
            Ok(true) | Err(_) => FolderState::Active,
        }
    }
}

impl fmt::Display for FolderState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FolderState::Active => f.write_str("ACTIVE"),
            FolderState::Missing => f.write_str("MISSING"),
        }
    }
}

/// Execute the `latch list` command.
pub fn cmd_list(session: &Session) -> Result<()> {
    println!("{}", render_list(&session.engine.entries()));
    Ok(())
}

pub(super) fn locked_at_label(entry: &LockEntry) -> String {
    entry
        .locked_at
        .map(|ts| ts.format("%Y-%m-%d %H:%M UTC").to_string())
        .unwrap_or_else(|| "-".to_string())
}

pub(super) fn render_list(entries: &BTreeMap<String, LockEntry>) -> String {
    if entries.is_empty() {
        return "No folders are currently locked.".to_string();
    }

    let rows: Vec<[String; 5]> = entries
        .iter()
        .enumerate()
        .map(|(idx, (path, entry))| {
            [
                (idx + 1).to_string(),
                entry.display_name.clone(),
                path.clone(),
                FolderState::probe(Path::new(path)).to_string(),
                locked_at_label(entry),
            ]
        })
        .collect();

    let headers = ["#", "Name", "Path", "Status", "Locked at"];
    let mut widths = headers.map(str::len);
    for row in &rows {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }

    let format_row = |cells: [&str; 5]| {
        cells
            .iter()
            .zip(widths)
            .map(|(cell, width)| format!("{:<width$}", cell, width = width))
            .collect::<Vec<_>>()
            .join("  ")
            .trim_end()
            .to_string()
    };

    let mut lines = vec![format!("Locked folders ({}):", entries.len()), String::new()];
    lines.push(format_row(headers));
    for row in &rows {
        lines.push(format_row([&row[0], &row[1], &row[2], &row[3], &row[4]]));
    }
    lines.join("\n")
}
