//! Windows adapter: ACL changes through `icacls`.
//!
//! Locking adds a recursive deny-full-control entry for the invoking user and
//! strips inherited entries. Unlocking removes that deny entry (deny entries
//! take precedence over grants, so a grant alone would not reopen the folder),
//! grants full control back, and re-enables inheritance.
//!
//! `icacls` is run directly, without a shell. Each step must exit with status
//! 0; the first failing step aborts the operation with its exit code and
//! stderr. `icacls /T` reports per-file failures in its output but still
//! exits non-zero, so there is no best-effort continuation on this platform.
//! A lock that fails partway is undone with the unlock steps, so a folder is
//! never left denied without a registry entry.

use super::{PermissionAdapter, PermissionReport};
use crate::error::{LatchError, Result};
use std::ffi::OsString;
use std::path::Path;
use std::process::{Command, Output};
use tracing::{debug, warn};

const ICACLS: &str = "icacls";

/// One `icacls` invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IcaclsStep {
    pub args: Vec<OsString>,
}

impl IcaclsStep {
    fn new(path: &Path, args: &[&str]) -> Self {
        let mut all = vec![path.as_os_str().to_os_string()];
        all.extend(args.iter().map(OsString::from));
        Self { args: all }
    }

    pub(crate) fn run(&self) -> Result<()> {
        let output = Command::new(ICACLS)
            .args(&self.args)
            .output()
            .map_err(|e| self.failure(format!("failed to execute {}: {}", ICACLS, e)))?;

        if output.status.success() {
            return Ok(());
        }

        let exit_code = output.status.code().unwrap_or(-1);
        Err(self.failure(format!(
            "{} {} failed (exit code {}): {}",
            ICACLS,
            self.args
                .get(1)
                .map(|a| a.to_string_lossy().into_owned())
                .unwrap_or_default(),
            exit_code,
            output_message(&output)
        )))
    }

    fn failure(&self, message: String) -> LatchError {
        let path = self.args.first().cloned().unwrap_or_default();
        LatchError::permission(path, message)
    }
}

fn output_message(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
    if stderr.is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr
    }
}

/// Executes [`IcaclsStep`]s.
pub trait StepRunner {
    fn run(&self, step: &IcaclsStep) -> Result<()>;
}

/// Runs steps with the real `icacls` binary.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemRunner;

impl StepRunner for SystemRunner {
    fn run(&self, step: &IcaclsStep) -> Result<()> {
        step.run()
    }
}

/// Permission adapter driving `icacls` for one user account.
#[derive(Debug, Clone)]
pub struct IcaclsAdapter<R = SystemRunner> {
    user: String,
    runner: R,
}

impl IcaclsAdapter {
    pub fn new(user: impl Into<String>) -> Self {
        Self::with_runner(user, SystemRunner)
    }

    /// Adapter for the account running this process (`DOMAIN\user` when the
    /// domain is known).
    pub fn for_current_user() -> Result<Self> {
        let user = std::env::var("USERNAME")
            .ok()
            .filter(|u| !u.is_empty())
            .ok_or_else(|| {
                LatchError::Config("USERNAME is not set; cannot determine the current user".into())
            })?;

        let qualified = match std::env::var("USERDOMAIN") {
            Ok(domain) if !domain.is_empty() => format!("{}\\{}", domain, user),
            _ => user,
        };
        Ok(Self::new(qualified))
    }
}

impl<R: StepRunner> IcaclsAdapter<R> {
    pub fn with_runner(user: impl Into<String>, runner: R) -> Self {
        Self {
            user: user.into(),
            runner,
        }
    }

    pub fn lock_steps(&self, path: &Path) -> Vec<IcaclsStep> {
        let deny = format!("{}:(OI)(CI)F", self.user);
        vec![
            IcaclsStep::new(path, &["/deny", &deny, "/T"]),
            IcaclsStep::new(path, &["/inheritance:r"]),
        ]
    }

    pub fn unlock_steps(&self, path: &Path) -> Vec<IcaclsStep> {
        let grant = format!("{}:(OI)(CI)F", self.user);
        vec![
            IcaclsStep::new(path, &["/remove:d", &self.user, "/T"]),
            IcaclsStep::new(path, &["/grant", &grant, "/T"]),
            IcaclsStep::new(path, &["/inheritance:e"]),
        ]
    }

    fn run_steps(&self, steps: &[IcaclsStep]) -> Result<PermissionReport> {
        for step in steps {
            debug!(args = ?step.args, "running icacls");
            self.runner.run(step)?;
        }

        Ok(PermissionReport {
            changed: 1,
            skipped: Vec::new(),
        })
    }

    /// Best-effort undo of a lock that failed partway.
    fn revert_lock(&self, path: &Path) {
        for step in self.unlock_steps(path) {
            if let Err(e) = self.runner.run(&step) {
                warn!(
                    path = %path.display(),
                    error = %e,
                    "lock failed and the folder could not be reopened"
                );
            }
        }
    }
}

impl<R: StepRunner> PermissionAdapter for IcaclsAdapter<R> {
    fn lock(&self, path: &Path) -> Result<PermissionReport> {
        require_existing(path)?;
        self.run_steps(&self.lock_steps(path))
            .inspect_err(|_| self.revert_lock(path))
    }

    fn unlock(&self, path: &Path) -> Result<PermissionReport> {
        require_existing(path)?;
        self.run_steps(&self.unlock_steps(path))
    }
}

fn require_existing(path: &Path) -> Result<()> {
    if path.exists() {
        Ok(())
    } else {
        Err(LatchError::permission(path, "folder no longer exists"))
    }
}
