//! Filesystem utilities for latch.
//!
//! The registry holds password hashes and is the only record of which folders
//! are supposed to be locked, so it is only ever replaced atomically.

pub mod atomic;

pub use atomic::atomic_write;
