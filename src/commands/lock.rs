//! Implementation of the `latch lock` command.

use super::Session;
use super::prompt::{PasswordPrompt, read_new_password};
use crate::cli::LockArgs;
use crate::engine::LockOutcome;
use crate::error::{LatchError, Result};

/// Execute the `latch lock` command.
///
/// Checks the folder exists before asking for a password, so a typo doesn't
/// cost two password entries.
pub fn cmd_lock(session: &mut Session, args: &LockArgs, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    if !args.path.exists() {
        return Err(LatchError::NotFound(args.path.clone()));
    }

    let password = read_new_password(
        prompt,
        "password for this folder",
        session.config.min_password_length,
    )?;

    let outcome = session.engine.lock_folder(&args.path, &password)?;
    println!("{}", render_lock(&outcome));

    if !session.engine.has_master_key() {
        println!();
        println!("Note: no master key is set. Run `latch master-key set` so a forgotten");
        println!("folder password can still be recovered.");
    }

    Ok(())
}

pub(super) fn render_lock(outcome: &LockOutcome) -> String {
    let mut out = format!("{}\nPath: {}", outcome, outcome.path.display());
    for skipped in &outcome.permissions.skipped {
        out.push_str(&format!(
            "\n  not restricted: {} ({})",
            skipped.path.display(),
            skipped.reason
        ));
    }
    out
}
