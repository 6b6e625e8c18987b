//! Config struct definition and default implementation.

use serde::{Deserialize, Serialize};

/// Configuration for latch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Shortest password accepted when locking a folder or setting the master key.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// Argon2id cost parameters used for new password hashes.
    #[serde(default)]
    pub kdf: KdfConfig,
}

/// Argon2id cost parameters.
///
/// Only affects newly created hashes: every stored hash carries its own
/// parameters, so changing these never invalidates existing locks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct KdfConfig {
    /// Memory cost in KiB.
    pub memory_kib: u32,

    /// Number of passes over memory.
    pub iterations: u32,

    /// Degree of parallelism (lanes).
    pub parallelism: u32,
}

impl Default for KdfConfig {
    fn default() -> Self {
        Self {
            memory_kib: 64 * 1024,
            iterations: 3,
            parallelism: 4,
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
            kdf: KdfConfig::default(),
        }
    }
}

fn default_min_password_length() -> usize {
    4
}
