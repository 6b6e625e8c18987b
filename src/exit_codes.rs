//! Exit code constants for the latch CLI.
//!
//! - 0: Success
//! - 1: Any failure (bad input, wrong password, permission change failed, ...)

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// The command failed; the reason was printed to stderr.
pub const FAILURE: i32 = 1;
