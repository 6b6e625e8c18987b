use crate::commands::{PasswordPrompt, Session};
use crate::config::{Config, KdfConfig};
use crate::engine::{LockEngine, PasswordKdf};
use crate::error::{LatchError, Result};
use crate::permissions::{PermissionAdapter, PermissionReport, SkippedEntry};
use crate::registry::RegistryStore;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::{LazyLock, Mutex, MutexGuard};
use tempfile::TempDir;
use zeroize::Zeroizing;

static CWD_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));
static ENV_LOCK: LazyLock<Mutex<()>> = LazyLock::new(|| Mutex::new(()));

pub(crate) struct DirGuard {
    original: PathBuf,
    _lock: MutexGuard<'static, ()>,
}

impl DirGuard {
    pub(crate) fn new(new_dir: &Path) -> Self {
        // Changing the process current working directory is global and not thread-safe.
        // Lock it so tests don't race even if a #[serial] annotation is missed.
        let lock = CWD_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        let original = std::env::current_dir().unwrap();
        std::env::set_current_dir(new_dir).unwrap();
        Self {
            original,
            _lock: lock,
        }
    }
}

impl Drop for DirGuard {
    fn drop(&mut self) {
        let _ = std::env::set_current_dir(&self.original);
    }
}

/// Sets or clears an environment variable for the guard's lifetime.
pub(crate) struct EnvGuard {
    key: &'static str,
    original: Option<OsString>,
    _lock: MutexGuard<'static, ()>,
}

impl EnvGuard {
    pub(crate) fn set(key: &'static str, value: impl AsRef<std::ffi::OsStr>) -> Self {
        let guard = Self::capture(key);
        // SAFETY: serialized through ENV_LOCK and #[serial]; no other thread reads it.
        unsafe { std::env::set_var(key, value) };
        guard
    }

    pub(crate) fn unset(key: &'static str) -> Self {
        let guard = Self::capture(key);
        // SAFETY: see `set`.
        unsafe { std::env::remove_var(key) };
        guard
    }

    fn capture(key: &'static str) -> Self {
        let lock = ENV_LOCK.lock().unwrap_or_else(|poison| poison.into_inner());
        Self {
            key,
            original: std::env::var_os(key),
            _lock: lock,
        }
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        // SAFETY: see `EnvGuard::set`.
        unsafe {
            match &self.original {
                Some(value) => std::env::set_var(self.key, value),
                None => std::env::remove_var(self.key),
            }
        }
    }
}

/// Cheapest parameters Argon2 accepts, so tests don't spend seconds hashing.
pub(crate) fn fast_kdf_config() -> KdfConfig {
    KdfConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum AdapterCall {
    Lock,
    Unlock,
}

#[derive(Debug, Default)]
pub(crate) struct FakeAdapterState {
    pub calls: Vec<(AdapterCall, PathBuf)>,
    pub fail_lock: bool,
    pub fail_unlock: bool,
    pub skip_on_lock: Vec<PathBuf>,
}

/// Permission adapter that records calls instead of touching the filesystem.
#[derive(Clone, Default)]
pub(crate) struct FakeAdapter {
    pub state: Rc<RefCell<FakeAdapterState>>,
}

impl FakeAdapter {
    pub(crate) fn calls(&self) -> Vec<(AdapterCall, PathBuf)> {
        self.state.borrow().calls.clone()
    }

    pub(crate) fn fail_lock(&self, fail: bool) {
        self.state.borrow_mut().fail_lock = fail;
    }

    pub(crate) fn fail_unlock(&self, fail: bool) {
        self.state.borrow_mut().fail_unlock = fail;
    }

    pub(crate) fn skip_on_lock(&self, path: PathBuf) {
        self.state.borrow_mut().skip_on_lock.push(path);
    }
}

impl PermissionAdapter for FakeAdapter {
    fn lock(&self, path: &Path) -> Result<PermissionReport> {
        let mut state = self.state.borrow_mut();
        state.calls.push((AdapterCall::Lock, path.to_path_buf()));
        if state.fail_lock {
            return Err(LatchError::permission(path, "Operation not permitted"));
        }
        Ok(PermissionReport {
            changed: 1,
            skipped: state
                .skip_on_lock
                .iter()
                .map(|p| SkippedEntry {
                    path: p.clone(),
                    reason: "Permission denied".to_string(),
                })
                .collect(),
        })
    }

    fn unlock(&self, path: &Path) -> Result<PermissionReport> {
        let mut state = self.state.borrow_mut();
        state.calls.push((AdapterCall::Unlock, path.to_path_buf()));
        if state.fail_unlock {
            return Err(LatchError::permission(path, "Operation not permitted"));
        }
        Ok(PermissionReport {
            changed: 1,
            skipped: Vec::new(),
        })
    }
}

/// A scratch state directory plus an engine over it.
pub(crate) struct TestEngine {
    pub state_dir: TempDir,
    pub engine: LockEngine,
    pub adapter: FakeAdapter,
}

impl TestEngine {
    pub(crate) fn new() -> Self {
        let state_dir = TempDir::new().unwrap();
        let adapter = FakeAdapter::default();
        let engine = engine_with(state_dir.path(), Box::new(adapter.clone()));
        Self {
            state_dir,
            engine,
            adapter,
        }
    }

    pub(crate) fn registry_path(&self) -> PathBuf {
        self.state_dir.path().join("locks.json")
    }

    /// A fresh engine over the same registry file, as after a restart.
    pub(crate) fn reopen(&self) -> LockEngine {
        engine_with(self.state_dir.path(), Box::new(self.adapter.clone()))
    }
}

pub(crate) fn engine_with(state_dir: &Path, adapter: Box<dyn PermissionAdapter>) -> LockEngine {
    let store = RegistryStore::open(state_dir.join("locks.json"));
    let kdf = PasswordKdf::new(&fast_kdf_config()).unwrap();
    LockEngine::new(store, adapter, kdf)
}

/// A session over a scratch state directory and the fake adapter.
pub(crate) fn test_session(state_dir: &Path, adapter: FakeAdapter) -> Session {
    Session {
        config: Config {
            kdf: fast_kdf_config(),
            ..Config::default()
        },
        engine: engine_with(state_dir, Box::new(adapter)),
    }
}

/// Answers password prompts from a fixed script and records what was asked.
#[derive(Debug, Default)]
pub(crate) struct ScriptedPrompt {
    answers: VecDeque<String>,
    pub asked: Vec<String>,
}

impl ScriptedPrompt {
    pub(crate) fn new<I, S>(answers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            answers: answers.into_iter().map(Into::into).collect(),
            asked: Vec::new(),
        }
    }
}

impl PasswordPrompt for ScriptedPrompt {
    fn read_password(&mut self, prompt: &str) -> Result<Zeroizing<String>> {
        self.asked.push(prompt.to_string());
        self.answers
            .pop_front()
            .map(Zeroizing::new)
            .ok_or_else(|| LatchError::UserError(format!("unexpected prompt: {}", prompt)))
    }
}
