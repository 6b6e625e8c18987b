//! Implementation of the `latch unlock` command.

use super::Session;
use super::prompt::PasswordPrompt;
use crate::cli::UnlockArgs;
use crate::engine::UnlockOutcome;
use crate::error::Result;

/// Execute the `latch unlock` command.
pub fn cmd_unlock(
    session: &mut Session,
    args: &UnlockArgs,
    prompt: &mut dyn PasswordPrompt,
) -> Result<()> {
    let password = prompt.read_password("Enter password (or Master Key)")?;
    let outcome = session.engine.unlock_folder(&args.path, &password)?;
    println!("{}", render_unlock(&outcome));
    Ok(())
}

pub(super) fn render_unlock(outcome: &UnlockOutcome) -> String {
    let mut out = outcome.to_string();
    if outcome.via_master_key {
        out.push_str(" (master key)");
    }
    out.push_str(&format!("\nPath: {}", outcome.path.display()));
    for skipped in &outcome.permissions.skipped {
        out.push_str(&format!(
            "\n  not restored: {} ({})",
            skipped.path.display(),
            skipped.reason
        ));
    }
    out
}
