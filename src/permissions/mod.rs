//! Platform permission adapters.
//!
//! An adapter moves a directory tree between the "locked" state (no access
//! for the invoking user) and normal owner access. Only the root directory is
//! a hard gate: if it cannot be changed the operation fails. Descendants are
//! best-effort and every one that could not be changed is listed in the
//! returned [`PermissionReport`].

#[cfg(unix)]
mod unix;
mod windows;

#[cfg(unix)]
pub use unix::UnixAdapter;
pub use windows::{IcaclsAdapter, IcaclsStep};

use crate::error::Result;
use std::path::{Path, PathBuf};

/// Restricts or restores access to a directory tree.
pub trait PermissionAdapter {
    /// Remove all access to `path` and everything below it.
    fn lock(&self, path: &Path) -> Result<PermissionReport>;

    /// Restore owner access to `path` and everything below it.
    fn unlock(&self, path: &Path) -> Result<PermissionReport>;
}

/// A descendant whose permissions could not be changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedEntry {
    pub path: PathBuf,
    pub reason: String,
}

/// Outcome of a successful adapter call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PermissionReport {
    /// Number of entries changed, including the root.
    pub changed: usize,

    /// Descendants left untouched.
    pub skipped: Vec<SkippedEntry>,
}

impl PermissionReport {
    /// True when some descendants could not be changed.
    pub fn is_partial(&self) -> bool {
        !self.skipped.is_empty()
    }

    pub(crate) fn skip(&mut self, path: &Path, reason: impl std::fmt::Display) {
        tracing::warn!(path = %path.display(), reason = %reason, "skipping entry");
        self.skipped.push(SkippedEntry {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        });
    }
}

/// The adapter for the platform this binary was built for.
pub fn platform_adapter() -> Result<Box<dyn PermissionAdapter>> {
    #[cfg(unix)]
    {
        Ok(Box::new(UnixAdapter))
    }
    #[cfg(not(unix))]
    {
        Ok(Box::new(IcaclsAdapter::for_current_user()?))
    }
}
