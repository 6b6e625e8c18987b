//! Command implementations for latch.
//!
//! This module provides the dispatcher that routes CLI commands to their
//! implementations. Commands share a [`Session`]: the loaded config and a
//! lock engine over the registry.

mod list;
mod lock;
mod master_key;
mod prompt;
mod status;
mod unlock;


pub use prompt::{PasswordPrompt, TerminalPrompt};

use crate::cli::{Cli, Command};
use crate::config::Config;
use crate::context::LatchContext;
use crate::engine::LockEngine;
use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// Everything a command needs to run.
pub struct Session {
    pub config: Config,
    pub engine: LockEngine,
}

impl Session {
    /// Resolve the state directory, load config, and open the registry.
    pub fn open(home: Option<&Path>) -> Result<Self> {
        let ctx = LatchContext::resolve(home)?;
        let config = Config::load_or_default(ctx.config_path())?;
        debug!(state_dir = %ctx.state_dir.display(), "session opened");
        let engine = LockEngine::open(&ctx, &config)?;
        Ok(Self { config, engine })
    }
}

/// Dispatch a command to its implementation.
///
/// This is the main entry point for command execution.
pub fn dispatch(cli: Cli) -> Result<()> {
    let mut session = Session::open(cli.home.as_deref())?;
    run(&mut session, &cli.command, &mut TerminalPrompt)
}

/// Run `command` against an open session.
pub fn run(session: &mut Session, command: &Command, prompt: &mut dyn PasswordPrompt) -> Result<()> {
    match command {
        Command::Lock(args) => lock::cmd_lock(session, args, prompt),
        Command::Unlock(args) => unlock::cmd_unlock(session, args, prompt),
        Command::List => list::cmd_list(session),
        Command::Status(args) => status::cmd_status(session, args),
        Command::MasterKey(cmd) => master_key::cmd_master_key(session, &cmd.action, prompt),
    }
}
