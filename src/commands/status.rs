//! Implementation of the `latch status` command.

use super::Session;
use super::list::{FolderState, locked_at_label};
use crate::cli::StatusArgs;
use crate::error::Result;
use crate::registry::LockEntry;
use std::path::Path;

/// Execute the `latch status` command.
///
/// Reports whether the folder has a registry entry. Exits successfully either
/// way; this is a query.
pub fn cmd_status(session: &Session, args: &StatusArgs) -> Result<()> {
    let found = session.engine.find(&args.path);
    println!(
        "{}",
        render_status(&args.path, found.as_ref().map(|(p, _, e)| (p.as_path(), e)))
    );
    Ok(())
}

pub(super) fn render_status(requested: &Path, found: Option<(&Path, &LockEntry)>) -> String {
    match found {
        None => format!("Not locked: {}", requested.display()),
        Some((path, entry)) => format!(
            "Locked: {}\nPath: {}\nState: {}\nPlatform: {}\nLocked at: {}",
            entry.display_name,
            path.display(),
            FolderState::probe(path),
            entry.platform,
            locked_at_label(entry)
        ),
    }
}
