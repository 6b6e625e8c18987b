//! Password prompts.
//!
//! Commands read passwords through [`PasswordPrompt`] so tests can script the
//! answers. Passwords are wiped from memory when dropped.

use crate::error::{LatchError, Result};
use zeroize::Zeroizing;

/// Source of passwords typed by the user.
pub trait PasswordPrompt {
    fn read_password(&mut self, prompt: &str) -> Result<Zeroizing<String>>;
}

/// Reads from the terminal without echo.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl PasswordPrompt for TerminalPrompt {
    fn read_password(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        rpassword::prompt_password(format!("{}: ", prompt))
            .map(Zeroizing::new)
            .map_err(|e| LatchError::UserError(format!("failed to read password: {}", e)))
    }
}

/// Ask for a new password twice and check it against the length policy.
pub fn read_new_password(
    prompt: &mut dyn PasswordPrompt,
    label: &str,
    min_length: usize,
) -> Result<Zeroizing<String>> {
    let password = prompt.read_password(&format!("Enter {}", label))?;
    let confirm = prompt.read_password(&format!("Confirm {}", label))?;

    if *password != *confirm {
        return Err(LatchError::UserError("Passwords do not match".to_string()));
    }

    if password.chars().count() < min_length {
        return Err(LatchError::UserError(format!(
            "Password must be at least {} characters",
            min_length
        )));
    }

    Ok(password)
}
