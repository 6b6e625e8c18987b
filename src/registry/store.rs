//! Durable load/save of the registry document.

use super::model::{DocumentShape, LockEntry, RegistryDocument};
use crate::error::{LatchError, Result};
use crate::fs::atomic_write;
use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Owns the in-memory registry and the file it is persisted to.
///
/// Every mutating method writes the full document before returning. If the
/// write fails the in-memory document is rolled back, so memory and disk never
/// disagree about what was persisted.
#[derive(Debug)]
pub struct RegistryStore {
    path: PathBuf,
    document: RegistryDocument,
}

impl RegistryStore {
    /// Load the registry at `path`, starting empty if it is missing or corrupt.
    pub fn open<P: Into<PathBuf>>(path: P) -> Self {
        let path = path.into();
        let document = load(&path);
        Self { path, document }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn document(&self) -> &RegistryDocument {
        &self.document
    }

    pub fn master_key_hash(&self) -> Option<&str> {
        self.document.master_key_hash.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&LockEntry> {
        self.document.locks.get(key)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.document.locks.contains_key(key)
    }

    /// Read-only snapshot of every lock entry.
    pub fn entries(&self) -> BTreeMap<String, LockEntry> {
        self.document.locks.clone()
    }

    /// Overwrite the persisted file with the current document.
    pub fn save(&self) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.document)
            .map_err(|e| LatchError::Registry(format!("failed to serialize registry: {}", e)))?;
        atomic_write(&self.path, json.as_bytes())
    }

    /// Record a new lock and persist it.
    pub fn insert(&mut self, key: String, entry: LockEntry) -> Result<()> {
        if self.document.locks.contains_key(&key) {
            return Err(LatchError::AlreadyLocked(PathBuf::from(key)));
        }

        self.document.locks.insert(key.clone(), entry);
        if let Err(e) = self.save() {
            self.document.locks.remove(&key);
            return Err(e);
        }
        Ok(())
    }

    /// Drop a lock entry and persist the removal.
    pub fn remove(&mut self, key: &str) -> Result<LockEntry> {
        let entry = self
            .document
            .locks
            .remove(key)
            .ok_or_else(|| LatchError::NotLocked(PathBuf::from(key)))?;

        if let Err(e) = self.save() {
            self.document.locks.insert(key.to_string(), entry);
            return Err(e);
        }
        Ok(entry)
    }

    /// Replace the master-key hash and persist it.
    pub fn set_master_key_hash(&mut self, hash: String) -> Result<()> {
        let previous = self.document.master_key_hash.replace(hash);
        if let Err(e) = self.save() {
            self.document.master_key_hash = previous;
            return Err(e);
        }
        Ok(())
    }
}

/// Read the registry document at `path`.
///
/// Never fails: a missing, empty, or unparseable file yields an empty
/// document. An unparseable file is copied to `<name>.corrupt` first, since
/// the next save overwrites it.
pub fn load(path: &Path) -> RegistryDocument {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!(path = %path.display(), "no registry yet, starting empty");
            return RegistryDocument::default();
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "cannot read registry, starting empty");
            return RegistryDocument::default();
        }
    };

    if content.trim().is_empty() {
        return RegistryDocument::default();
    }

    match DocumentShape::parse(&content) {
        Ok(shape) => {
            if shape.is_legacy() {
                info!(path = %path.display(), "converting legacy registry layout");
            }
            shape.into_document()
        }
        Err(e) => {
            let backup = corrupt_backup_path(path);
            match fs::copy(path, &backup) {
                Ok(_) => warn!(
                    path = %path.display(),
                    backup = %backup.display(),
                    error = %e,
                    "registry unreadable, starting empty"
                ),
                Err(copy_err) => warn!(
                    path = %path.display(),
                    error = %e,
                    backup_error = %copy_err,
                    "registry unreadable and could not be backed up, starting empty"
                ),
            }
            RegistryDocument::default()
        }
    }
}

fn corrupt_backup_path(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "registry".into());
    name.push(".corrupt");
    path.with_file_name(name)
}
