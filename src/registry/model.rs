//! Registry document model and legacy shape detection.

use crate::error::{LatchError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::Path;

/// JSON key of the master-key hash at the document root.
pub const MASTER_KEY_FIELD: &str = "master_key_hash";

/// JSON key of the lock mapping at the document root.
pub const LOCKS_FIELD: &str = "locks";

/// Platform a lock was created under.
///
/// Serialized as `"Windows"` or the Unix platform name (`"Linux"`,
/// `"Darwin"`, ...). Restoring access differs between the two families.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Platform {
    Windows,
    Unix(String),
}

impl Platform {
    /// Platform of the running process.
    pub fn current() -> Self {
        if cfg!(windows) {
            return Platform::Windows;
        }

        let name = match std::env::consts::OS {
            "linux" => "Linux".to_string(),
            "macos" => "Darwin".to_string(),
            "freebsd" => "FreeBSD".to_string(),
            "openbsd" => "OpenBSD".to_string(),
            "netbsd" => "NetBSD".to_string(),
            other => {
                let mut chars = other.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect(),
                    None => "Unix".to_string(),
                }
            }
        };
        Platform::Unix(name)
    }

    pub fn is_windows(&self) -> bool {
        matches!(self, Platform::Windows)
    }

    /// Name as written to the registry.
    pub fn name(&self) -> &str {
        match self {
            Platform::Windows => "Windows",
            Platform::Unix(name) => name,
        }
    }
}

impl From<String> for Platform {
    fn from(name: String) -> Self {
        if name == "Windows" {
            Platform::Windows
        } else {
            Platform::Unix(name)
        }
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        match platform {
            Platform::Windows => "Windows".to_string(),
            Platform::Unix(name) => name,
        }
    }
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Metadata recorded for one locked folder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LockEntry {
    /// Digest of the folder password.
    pub password_hash: String,

    /// Canonical absolute path at lock time.
    #[serde(default)]
    pub original_path: String,

    /// Platform the lock was created under.
    #[serde(rename = "system", default = "Platform::current")]
    pub platform: Platform,

    /// Cosmetic folder name, defaults to the final path component.
    #[serde(rename = "name", default)]
    pub display_name: String,

    /// When the folder was locked. Absent in files written by older versions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub locked_at: Option<DateTime<Utc>>,
}

/// The whole persisted registry.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    /// Digest of the master key, `None` until one is configured.
    #[serde(default)]
    pub master_key_hash: Option<String>,

    /// Locked folders keyed by absolute path.
    #[serde(default)]
    pub locks: BTreeMap<String, LockEntry>,
}

impl RegistryDocument {
    /// Fill in fields that older files may have left empty.
    fn normalize(mut self) -> Self {
        for (key, entry) in self.locks.iter_mut() {
            if entry.original_path.is_empty() {
                entry.original_path = key.clone();
            }
            if entry.display_name.is_empty() {
                entry.display_name = display_name_for(Path::new(key));
            }
        }
        self
    }
}

/// Shape of a registry file on disk, decided once when it is read.
#[derive(Debug, Clone, PartialEq)]
pub enum DocumentShape {
    /// `{ "master_key_hash": ..., "locks": { ... } }`
    Current(RegistryDocument),
    /// A bare `{ "<path>": <entry>, ... }` mapping with no master key.
    Legacy(BTreeMap<String, LockEntry>),
}

impl DocumentShape {
    /// Parse registry file content and classify its shape.
    ///
    /// A root object containing neither [`MASTER_KEY_FIELD`] nor
    /// [`LOCKS_FIELD`] is the legacy bare mapping.
    pub fn parse(content: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(content)
            .map_err(|e| LatchError::RegistryCorrupt(e.to_string()))?;

        let Value::Object(root) = value else {
            return Err(LatchError::RegistryCorrupt(
                "document root is not a JSON object".to_string(),
            ));
        };

        let is_current = root.contains_key(MASTER_KEY_FIELD) || root.contains_key(LOCKS_FIELD);
        let root = Value::Object(root);

        let shape = if is_current {
            serde_json::from_value(root).map(DocumentShape::Current)
        } else {
            serde_json::from_value(root).map(DocumentShape::Legacy)
        };

        shape.map_err(|e| LatchError::RegistryCorrupt(e.to_string()))
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, DocumentShape::Legacy(_))
    }

    /// Normalize into the canonical document.
    pub fn into_document(self) -> RegistryDocument {
        let document = match self {
            DocumentShape::Current(document) => document,
            DocumentShape::Legacy(locks) => RegistryDocument {
                master_key_hash: None,
                locks,
            },
        };
        document.normalize()
    }
}

/// Display name for a folder: its final path component, or the whole path
/// for roots such as `/` or `C:\`.
pub fn display_name_for(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
