//! Config loading and validation.

use super::model::Config;
use crate::error::{LatchError, Result};
use std::io::ErrorKind;
use std::path::Path;

impl Config {
    /// Load config from a YAML file, falling back to defaults when the file
    /// does not exist.
    ///
    /// Unlike the registry, an unreadable or invalid config is an error: it
    /// only ever contains what the user typed into it.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        match std::fs::read_to_string(path) {
            Ok(content) => Self::from_yaml(&content).map_err(|e| match e {
                LatchError::Config(msg) => {
                    LatchError::Config(format!("{}: {}", path.display(), msg))
                }
                other => other,
            }),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(LatchError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))),
        }
    }

    /// Parse config from a YAML string. An empty document yields defaults.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| LatchError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Validate config values.
    ///
    /// - `min_password_length` must be at least 1
    /// - `kdf` must be accepted by Argon2 (memory >= 8 KiB per lane, at least
    ///   one pass and one lane)
    pub fn validate(&self) -> Result<()> {
        if self.min_password_length == 0 {
            return Err(LatchError::Config(
                "min_password_length must be greater than 0".to_string(),
            ));
        }

        let kdf = &self.kdf;
        if kdf.iterations == 0 {
            return Err(LatchError::Config(
                "kdf.iterations must be greater than 0".to_string(),
            ));
        }
        if kdf.parallelism == 0 {
            return Err(LatchError::Config(
                "kdf.parallelism must be greater than 0".to_string(),
            ));
        }
        if kdf.memory_kib < 8 * kdf.parallelism {
            return Err(LatchError::Config(format!(
                "kdf.memory_kib must be at least {} for parallelism {}",
                8 * kdf.parallelism,
                kdf.parallelism
            )));
        }

        Ok(())
    }
}
