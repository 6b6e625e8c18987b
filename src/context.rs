//! Per-user path resolution for latch.
//!
//! All state lives in a single directory (default `~/.folder_lock/`, the
//! location older versions of the tool used, so existing registries keep
//! working):
//!
//! - `locks.json`: the registry
//! - `config.yaml`: optional settings
//!
//! The directory can be moved with `--home <DIR>` or the `LATCH_HOME`
//! environment variable; the flag wins.

use crate::error::{LatchError, Result};
use directories::BaseDirs;
use std::path::{Path, PathBuf};

/// Environment variable overriding the state directory.
pub const HOME_ENV: &str = "LATCH_HOME";

/// Default state directory name under the user's home directory.
pub const DEFAULT_STATE_DIR: &str = ".folder_lock";

/// Registry file name inside the state directory.
pub const REGISTRY_FILE: &str = "locks.json";

/// Config file name inside the state directory.
pub const CONFIG_FILE: &str = "config.yaml";

/// Resolved paths for one latch invocation. All paths are absolute.
#[derive(Debug, Clone)]
pub struct LatchContext {
    /// Directory holding the registry and config.
    pub state_dir: PathBuf,
}

impl LatchContext {
    /// Resolve the state directory: explicit override, then `LATCH_HOME`,
    /// then `~/.folder_lock`.
    pub fn resolve(home_override: Option<&Path>) -> Result<Self> {
        if let Some(dir) = home_override {
            return Self::from_dir(dir);
        }

        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Self::from_dir(Path::new(&dir));
        }

        let base = BaseDirs::new().ok_or_else(|| {
            LatchError::Config("cannot determine the home directory".to_string())
        })?;
        Self::from_dir(&base.home_dir().join(DEFAULT_STATE_DIR))
    }

    /// Use `dir` as the state directory.
    pub fn from_dir(dir: &Path) -> Result<Self> {
        let state_dir = std::path::absolute(dir).map_err(|e| {
            LatchError::Config(format!(
                "cannot resolve state directory '{}': {}",
                dir.display(),
                e
            ))
        })?;
        Ok(Self { state_dir })
    }

    pub fn registry_path(&self) -> PathBuf {
        self.state_dir.join(REGISTRY_FILE)
    }

    pub fn config_path(&self) -> PathBuf {
        self.state_dir.join(CONFIG_FILE)
    }
}
