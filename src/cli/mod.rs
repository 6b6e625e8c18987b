//! CLI argument parsing for latch.
//!
//! Uses clap derive macros for declarative argument definitions.
//! This module defines the command structure; actual implementations
//! are in the `commands` module.

use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// Latch: password-gated folder locking on top of OS permissions.
///
/// Locking a folder removes all access to it (and everything inside) for your
/// account and records a password hash in a per-user registry. Unlocking with
/// that password, or with the master key, restores access.
///
/// This is protection against casual access on a shared machine. Contents are
/// not encrypted and an administrator can always read them.
#[derive(Parser, Debug)]
#[command(name = "latch")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the registry and config (default: ~/.folder_lock).
    #[arg(long, global = true, value_name = "DIR")]
    pub home: Option<PathBuf>,

    /// Increase log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

/// Available commands for latch.
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Lock a folder behind a password.
    ///
    /// Prompts for the password twice.
    Lock(LockArgs),

    /// Unlock a folder with its password or the master key.
    Unlock(UnlockArgs),

    /// List locked folders and whether they still exist.
    List,

    /// Show whether a folder is locked.
    Status(StatusArgs),

    /// Master key management.
    ///
    /// The master key unlocks every folder, whatever its own password.
    MasterKey(MasterKeyCommand),
}

/// Arguments for the `lock` command.
#[derive(Parser, Debug)]
pub struct LockArgs {
    /// Folder to lock.
    pub path: PathBuf,
}

/// Arguments for the `unlock` command.
#[derive(Parser, Debug)]
pub struct UnlockArgs {
    /// Folder to unlock.
    pub path: PathBuf,
}

/// Arguments for the `status` command.
#[derive(Parser, Debug)]
pub struct StatusArgs {
    /// Folder to inspect.
    pub path: PathBuf,
}

/// Master key subcommand.
#[derive(Parser, Debug)]
pub struct MasterKeyCommand {
    #[command(subcommand)]
    pub action: MasterKeyAction,
}

/// Available master key actions.
#[derive(Subcommand, Debug)]
pub enum MasterKeyAction {
    /// Set or replace the master key.
    Set,

    /// Check a candidate against the configured master key.
    Verify,
}
