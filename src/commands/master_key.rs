//! Implementation of the `latch master-key` commands.

use super::Session;
use super::prompt::{PasswordPrompt, read_new_password};
use crate::cli::MasterKeyAction;
use crate::error::{LatchError, Result};

/// Dispatch master-key subcommands.
pub fn cmd_master_key(
    session: &mut Session,
    action: &MasterKeyAction,
    prompt: &mut dyn PasswordPrompt,
) -> Result<()> {
    match action {
        MasterKeyAction::Set => cmd_set(session, prompt),
        MasterKeyAction::Verify => cmd_verify(session, prompt),
    }
}

/// Replace the master key. Anyone who can run latch as this user may do so;
/// the old key is not asked for.
fn cmd_set(session: &mut Session, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    let replacing = session.engine.has_master_key();
    let password = read_new_password(prompt, "master key", session.config.min_password_length)?;

    session.engine.set_master_key(&password)?;

    if replacing {
        println!("Master key replaced. The previous master key no longer unlocks anything.");
    } else {
        println!("Master key set successfully.");
    }
    Ok(())
}

fn cmd_verify(session: &mut Session, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    if !session.engine.has_master_key() {
        return Err(LatchError::UserError(
            "No master key is set. Run `latch master-key set` first.".to_string(),
        ));
    }

    let password = prompt.read_password("Enter master key")?;
    if session.engine.verify_master_key(&password) {
        println!("Master key is correct.");
        Ok(())
    } else {
        Err(LatchError::InvalidPassword)
    }
}
