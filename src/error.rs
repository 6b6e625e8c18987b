//! Error types for latch.
//!
//! Uses thiserror for derive macros. Every message is meant to be shown to the
//! user as-is, so variants carry the path they refer to.

use crate::exit_codes;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for latch operations.
#[derive(Error, Debug)]
pub enum LatchError {
    /// The folder to lock does not exist.
    #[error("Folder does not exist: {}", .0.display())]
    NotFound(PathBuf),

    /// The path exists but is not a directory.
    #[error("Path is not a folder: {}", .0.display())]
    NotADirectory(PathBuf),

    /// The folder already has a registry entry.
    #[error("Folder is already locked: {}", .0.display())]
    AlreadyLocked(PathBuf),

    /// No registry entry exists for the folder.
    #[error("Folder is not locked or not found in registry: {}", .0.display())]
    NotLocked(PathBuf),

    /// Neither the folder password nor the master key matched.
    #[error("Invalid password")]
    InvalidPassword,

    /// The platform permission change failed on the folder itself.
    #[error("Failed to change permissions on '{}': {message}", path.display())]
    PermissionError { path: PathBuf, message: String },

    /// The registry file could not be parsed. Only used internally: loading
    /// recovers from it by starting with an empty registry.
    #[error("Registry file is corrupt: {0}")]
    RegistryCorrupt(String),

    /// The registry could not be written.
    #[error("Registry update failed: {0}")]
    Registry(String),

    /// The configuration file is invalid.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// Password hashing failed.
    #[error("Password hashing failed: {0}")]
    Password(String),

    /// Bad input from the user (mismatched confirmation, short password, ...).
    #[error("{0}")]
    UserError(String),
}

impl LatchError {
    /// Build a permission error for `path`.
    pub fn permission(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        LatchError::PermissionError {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Returns the process exit code for this error.
    ///
    /// Every failure exits with the same code; callers only distinguish
    /// success from failure.
    pub fn exit_code(&self) -> i32 {
        exit_codes::FAILURE
    }
}

/// Result type alias for latch operations.
pub type Result<T> = std::result::Result<T, LatchError>;
