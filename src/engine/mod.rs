//! Lock engine: the lock/unlock state machine and password logic.
//!
//! The engine owns the registry store, a permission adapter, and the password
//! KDF. Registry changes only ever follow a successful permission change:
//!
//! - lock: adapter `lock` → insert entry → save
//! - unlock: authenticate → adapter `unlock` → remove entry → save
//!
//! If saving fails after the permissions changed, the engine tries to undo the
//! permission change so the registry and the filesystem stay in agreement.

mod password;

#[cfg(test)]
mod tests;

pub use password::PasswordKdf;

use crate::config::Config;
use crate::context::LatchContext;
use crate::error::{LatchError, Result};
use crate::permissions::{PermissionAdapter, PermissionReport, platform_adapter};
use crate::registry::{LockEntry, Platform, RegistryStore, display_name_for};
use chrono::Utc;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::{info, warn};

/// Result of a successful [`LockEngine::lock_folder`].
#[derive(Debug, Clone)]
pub struct LockOutcome {
    pub path: PathBuf,
    pub entry: LockEntry,
    pub permissions: PermissionReport,
}

impl fmt::Display for LockOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.permissions.is_partial() {
            write!(
                f,
                "Folder locked, but {} item(s) inside could not be restricted",
                self.permissions.skipped.len()
            )
        } else {
            f.write_str("Folder locked successfully")
        }
    }
}

/// Result of a successful [`LockEngine::unlock_folder`].
#[derive(Debug, Clone)]
pub struct UnlockOutcome {
    pub path: PathBuf,
    /// The entry that was removed from the registry.
    pub entry: LockEntry,
    /// True when the master key, not the folder password, authenticated.
    pub via_master_key: bool,
    pub permissions: PermissionReport,
}

impl fmt::Display for UnlockOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.permissions.is_partial() {
            write!(
                f,
                "Folder unlocked, but {} item(s) inside could not be restored",
                self.permissions.skipped.len()
            )
        } else {
            f.write_str("Folder unlocked successfully")
        }
    }
}

/// Lock/unlock orchestration over a registry and a permission adapter.
pub struct LockEngine {
    store: RegistryStore,
    adapter: Box<dyn PermissionAdapter>,
    kdf: PasswordKdf,
    platform: Platform,
}

impl LockEngine {
    pub fn new(store: RegistryStore, adapter: Box<dyn PermissionAdapter>, kdf: PasswordKdf) -> Self {
        Self {
            store,
            adapter,
            kdf,
            platform: Platform::current(),
        }
    }

    /// Engine for the resolved per-user state directory, using the adapter
    /// for this platform.
    pub fn open(ctx: &LatchContext, config: &Config) -> Result<Self> {
        let store = RegistryStore::open(ctx.registry_path());
        let kdf = PasswordKdf::new(&config.kdf)?;
        Ok(Self::new(store, platform_adapter()?, kdf))
    }

    pub fn has_master_key(&self) -> bool {
        self.store.master_key_hash().is_some()
    }

    /// Replace the master key. No confirmation of the previous key is needed.
    pub fn set_master_key(&mut self, password: &str) -> Result<()> {
        let hash = self.kdf.hash(password)?;
        self.store.set_master_key_hash(hash)?;
        info!("master key updated");
        Ok(())
    }

    /// True when `password` matches the configured master key.
    pub fn verify_master_key(&self, password: &str) -> bool {
        match self.store.master_key_hash() {
            Some(hash) => self.kdf.verify(password, hash),
            None => false,
        }
    }

    /// Restrict access to the folder at `path` behind `password`.
    pub fn lock_folder(&mut self, path: &Path, password: &str) -> Result<LockOutcome> {
        let path = resolve_existing_dir(path)?;
        let key = registry_key(&path);

        if self.store.contains(&key) {
            return Err(LatchError::AlreadyLocked(path));
        }

        // Hash first: a KDF failure must not leave a restricted folder behind.
        let password_hash = self.kdf.hash(password)?;

        let permissions = self.adapter.lock(&path)?;

        let entry = LockEntry {
            password_hash,
            original_path: key.clone(),
            platform: self.platform.clone(),
            display_name: display_name_for(&path),
            locked_at: Some(Utc::now()),
        };

        if let Err(e) = self.store.insert(key, entry.clone()) {
            if let Err(revert) = self.adapter.unlock(&path) {
                warn!(
                    path = %path.display(),
                    error = %revert,
                    "registry not saved and folder could not be reopened"
                );
            }
            return Err(e);
        }

        info!(
            path = %path.display(),
            changed = permissions.changed,
            skipped = permissions.skipped.len(),
            "folder locked"
        );
        Ok(LockOutcome {
            path,
            entry,
            permissions,
        })
    }

    /// Restore access to the folder at `path` given its password or the
    /// master key.
    pub fn unlock_folder(&mut self, path: &Path, password: &str) -> Result<UnlockOutcome> {
        let lookup = resolve_lookup_path(path);
        let Some((path, key, entry)) = self.lookup(lookup.clone()) else {
            return Err(LatchError::NotLocked(lookup));
        };

        let via_password = self.kdf.verify(password, &entry.password_hash);
        let via_master_key = !via_password && self.verify_master_key(password);
        if !via_password && !via_master_key {
            info!(path = %path.display(), "unlock rejected: invalid password");
            return Err(LatchError::InvalidPassword);
        }

        if entry.platform.is_windows() != self.platform.is_windows() {
            warn!(
                path = %path.display(),
                locked_on = %entry.platform,
                running_on = %self.platform,
                "folder was locked on a different platform"
            );
        }

        let permissions = self.adapter.unlock(&path)?;

        let entry = match self.store.remove(&key) {
            Ok(entry) => entry,
            Err(e) => {
                if let Err(relock) = self.adapter.lock(&path) {
                    warn!(
                        path = %path.display(),
                        error = %relock,
                        "registry not saved and folder could not be locked again"
                    );
                }
                return Err(e);
            }
        };

        info!(
            path = %path.display(),
            via_master_key,
            changed = permissions.changed,
            skipped = permissions.skipped.len(),
            "folder unlocked"
        );
        Ok(UnlockOutcome {
            path,
            entry,
            via_master_key,
            permissions,
        })
    }

    /// Look up the registry entry for `path`, resolving it the same way
    /// unlocking does. Returns the resolved path, registry key, and entry.
    pub fn find(&self, path: &Path) -> Option<(PathBuf, String, LockEntry)> {
        self.lookup(resolve_lookup_path(path))
    }

    fn lookup(&self, path: PathBuf) -> Option<(PathBuf, String, LockEntry)> {
        let key = registry_key(&path);
        let entry = self.store.get(&key)?.clone();
        Some((path, key, entry))
    }

    /// Snapshot of every registered lock.
    pub fn entries(&self) -> BTreeMap<String, LockEntry> {
        self.store.entries()
    }
}

/// Canonicalize `path` and require an existing directory.
fn resolve_existing_dir(path: &Path) -> Result<PathBuf> {
    let canonical = fs::canonicalize(path).map_err(|e| match e.kind() {
        ErrorKind::NotFound => LatchError::NotFound(path.to_path_buf()),
        _ => LatchError::permission(path, e.to_string()),
    })?;
    let canonical = strip_verbatim_prefix(canonical);

    if !canonical.is_dir() {
        return Err(LatchError::NotADirectory(canonical));
    }
    Ok(canonical)
}

/// Resolve a path for registry lookup.
///
/// Canonicalizes when possible; a folder that no longer exists falls back to
/// its absolute form with `.` and `..` folded away, so its entry can still be
/// found.
fn resolve_lookup_path(path: &Path) -> PathBuf {
    match fs::canonicalize(path) {
        Ok(canonical) => strip_verbatim_prefix(canonical),
        Err(_) => {
            let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
            normalize_lexically(&absolute)
        }
    }
}

/// Fold `.` and `..` components without touching the filesystem. `..` at the
/// root stays at the root.
fn normalize_lexically(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if matches!(out.components().next_back(), Some(Component::Normal(_))) {
                    out.pop();
                }
            }
            other => out.push(other),
        }
    }
    out
}

fn registry_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

/// Windows canonical paths come back as `\\?\C:\...`; registry keys use the
/// plain form.
fn strip_verbatim_prefix(path: PathBuf) -> PathBuf {
    if cfg!(windows)
        && let Some(s) = path.to_str()
    {
        if let Some(rest) = s.strip_prefix(r"\\?\UNC\") {
            return PathBuf::from(format!(r"\\{}", rest));
        }
        if let Some(rest) = s.strip_prefix(r"\\?\") {
            return PathBuf::from(rest);
        }
    }
    path
}
