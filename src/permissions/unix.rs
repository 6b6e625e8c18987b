//! Unix adapter: mode bits.
//!
//! Locking sets every entry to `000`. Children are changed before their
//! parent, since a directory can no longer be listed once its own mode is
//! `000`. Unlocking goes the other way: the directory is reopened first
//! (`0700`), then its children (`0700` for directories, `0600` for files).
//!
//! Symlinks are never followed; `chmod` would change their target instead.

use super::{PermissionAdapter, PermissionReport};
use crate::error::{LatchError, Result};
use std::fs::{self, Permissions};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Mode applied to every entry of a locked tree.
pub const LOCKED_MODE: u32 = 0o000;

/// Mode restored on directories.
pub const DIR_MODE: u32 = 0o700;

/// Mode restored on files.
pub const FILE_MODE: u32 = 0o600;

/// Permission adapter using Unix mode bits.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnixAdapter;

impl PermissionAdapter for UnixAdapter {
    fn lock(&self, path: &Path) -> Result<PermissionReport> {
        let original_mode = root_mode(path)?;

        // Rewriting the current mode fails exactly when the final chmod would
        // (not the owner, read-only filesystem), before any child is touched.
        set_mode(path, original_mode).map_err(|e| LatchError::permission(path, e.to_string()))?;

        let mut report = PermissionReport::default();
        let mut locked_children = Vec::new();

        let walker = WalkDir::new(path)
            .min_depth(1)
            .contents_first(true)
            .follow_links(false);

        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let failed = e.path().unwrap_or(path).to_path_buf();
                    report.skip(&failed, e);
                    continue;
                }
            };

            if entry.path_is_symlink() {
                continue;
            }

            let mode = match entry.metadata() {
                Ok(metadata) => metadata.permissions().mode() & 0o7777,
                Err(e) => {
                    report.skip(entry.path(), e);
                    continue;
                }
            };

            match set_mode(entry.path(), LOCKED_MODE) {
                Ok(()) => {
                    report.changed += 1;
                    locked_children.push((entry.into_path(), mode));
                }
                Err(e) => report.skip(entry.path(), e),
            }
        }

        if let Err(e) = set_mode(path, LOCKED_MODE) {
            restore_modes(&locked_children);
            return Err(LatchError::permission(path, e.to_string()));
        }
        report.changed += 1;

        debug!(path = %path.display(), changed = report.changed, "tree locked");
        Ok(report)
    }

    fn unlock(&self, path: &Path) -> Result<PermissionReport> {
        root_mode(path)?;
        set_mode(path, DIR_MODE).map_err(|e| LatchError::permission(path, e.to_string()))?;

        let mut report = PermissionReport {
            changed: 1,
            skipped: Vec::new(),
        };
        // walkdir opens a directory before yielding it, which fails while its
        // mode is still 000, so the restore walk is done by hand.
        restore_children(path, &mut report);

        debug!(path = %path.display(), changed = report.changed, "tree unlocked");
        Ok(report)
    }
}

fn root_mode(path: &Path) -> Result<u32> {
    let metadata =
        fs::symlink_metadata(path).map_err(|e| LatchError::permission(path, e.to_string()))?;
    Ok(metadata.permissions().mode() & 0o7777)
}

fn set_mode(path: &Path, mode: u32) -> std::io::Result<()> {
    fs::set_permissions(path, Permissions::from_mode(mode))
}

/// Put back the modes recorded while locking. Entries were recorded children
/// first, so parents are reopened before their children.
fn restore_modes(locked: &[(PathBuf, u32)]) {
    for (child, mode) in locked.iter().rev() {
        if let Err(e) = set_mode(child, *mode) {
            warn!(
                path = %child.display(),
                mode = %format!("{:o}", mode),
                error = %e,
                "could not restore original mode"
            );
        }
    }
}

fn restore_children(dir: &Path, report: &mut PermissionReport) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            report.skip(dir, e);
            return;
        }
    };

    for entry in entries {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                report.skip(dir, e);
                continue;
            }
        };
        let child = entry.path();

        let file_type = match entry.file_type() {
            Ok(file_type) => file_type,
            Err(e) => {
                report.skip(&child, e);
                continue;
            }
        };

        if file_type.is_symlink() {
            continue;
        }

        let mode = if file_type.is_dir() { DIR_MODE } else { FILE_MODE };
        match set_mode(&child, mode) {
            Ok(()) => {
                report.changed += 1;
                if file_type.is_dir() {
                    restore_children(&child, report);
                }
            }
            Err(e) => report.skip(&child, e),
        }
    }
}
