//! Tests for the lock engine.

use super::*;
use crate::test_support::{AdapterCall, DirGuard, TestEngine};
use std::fs;
use tempfile::TempDir;

fn folder(parent: &TempDir, name: &str) -> PathBuf {
    let path = parent.path().join(name);
    fs::create_dir_all(&path).unwrap();
    fs::canonicalize(path).unwrap()
}

fn key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

#[test]
fn test_lock_then_unlock_clears_registry() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");

    let locked = t.engine.lock_folder(&secret, "abcd").unwrap();
    assert_eq!(locked.path, secret);
    assert_eq!(locked.to_string(), "Folder locked successfully");
    assert!(t.engine.entries().contains_key(&key(&secret)));

    let unlocked = t.engine.unlock_folder(&secret, "abcd").unwrap();
    assert!(!unlocked.via_master_key);
    assert_eq!(unlocked.to_string(), "Folder unlocked successfully");
    assert!(t.engine.entries().is_empty());

    assert_eq!(
        t.adapter.calls(),
        vec![
            (AdapterCall::Lock, secret.clone()),
            (AdapterCall::Unlock, secret.clone())
        ]
    );
}

#[test]
fn test_lock_records_entry_metadata() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "Tax Returns");

    t.engine.lock_folder(&secret, "abcd").unwrap();

    let entry = &t.engine.entries()[&key(&secret)];
    assert_eq!(entry.original_path, key(&secret));
    assert_eq!(entry.display_name, "Tax Returns");
    assert_eq!(entry.platform, Platform::current());
    assert!(entry.locked_at.is_some());
    assert!(entry.password_hash.starts_with("$argon2id$"));
    assert!(!entry.password_hash.contains("abcd"));
}

#[test]
fn test_lock_persists_across_restart() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");

    t.engine.lock_folder(&secret, "abcd").unwrap();

    let mut reopened = t.reopen();
    assert!(reopened.entries().contains_key(&key(&secret)));
    reopened.unlock_folder(&secret, "abcd").unwrap();

    assert!(t.reopen().entries().is_empty());
}

#[test]
fn test_double_lock_is_rejected_without_mutation() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");

    t.engine.lock_folder(&secret, "abcd").unwrap();
    let before = fs::read_to_string(t.registry_path()).unwrap();

    let err = t.engine.lock_folder(&secret, "other").unwrap_err();

    assert!(matches!(err, LatchError::AlreadyLocked(_)));
    assert_eq!(t.engine.entries().len(), 1);
    assert_eq!(fs::read_to_string(t.registry_path()).unwrap(), before);
    // The adapter was only asked once.
    assert_eq!(t.adapter.calls().len(), 1);
    // The original password still works.
    t.engine.unlock_folder(&secret, "abcd").unwrap();
}

#[test]
fn test_lock_missing_folder_is_not_found() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();

    let err = t
        .engine
        .lock_folder(&work.path().join("nope"), "abcd")
        .unwrap_err();

    assert!(matches!(err, LatchError::NotFound(_)));
    assert!(t.adapter.calls().is_empty());
    assert!(!t.registry_path().exists());
}

#[test]
fn test_lock_file_is_not_a_directory() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let file = work.path().join("notes.txt");
    fs::write(&file, "hello").unwrap();

    let err = t.engine.lock_folder(&file, "abcd").unwrap_err();

    assert!(matches!(err, LatchError::NotADirectory(_)));
    assert!(t.adapter.calls().is_empty());
}

#[test]
fn test_adapter_failure_on_lock_leaves_registry_unchanged() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");
    t.adapter.fail_lock(true);

    let err = t.engine.lock_folder(&secret, "abcd").unwrap_err();

    assert!(matches!(err, LatchError::PermissionError { .. }));
    assert!(t.engine.entries().is_empty());
    assert!(!t.registry_path().exists());
}

#[test]
fn test_wrong_password_keeps_lock_and_permissions() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");
    t.engine.lock_folder(&secret, "abcd").unwrap();

    let err = t.engine.unlock_folder(&secret, "wrong").unwrap_err();

    assert!(matches!(err, LatchError::InvalidPassword));
    assert!(t.engine.entries().contains_key(&key(&secret)));
    // Only the lock call reached the adapter.
    assert_eq!(t.adapter.calls(), vec![(AdapterCall::Lock, secret)]);
}

#[test]
fn test_adapter_failure_on_unlock_keeps_entry() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");
    t.engine.lock_folder(&secret, "abcd").unwrap();
    t.adapter.fail_unlock(true);

    let err = t.engine.unlock_folder(&secret, "abcd").unwrap_err();

    assert!(matches!(err, LatchError::PermissionError { .. }));
    assert!(t.engine.entries().contains_key(&key(&secret)));
    assert!(t.reopen().entries().contains_key(&key(&secret)));
}

#[test]
fn test_unlock_unknown_folder_is_not_locked() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let plain = folder(&work, "plain");

    let err = t.engine.unlock_folder(&plain, "abcd").unwrap_err();

    assert!(matches!(err, LatchError::NotLocked(_)));
}

#[test]
fn test_master_key_unlocks_any_folder() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let first = folder(&work, "first");
    let second = folder(&work, "second");

    t.engine.set_master_key("master-pass").unwrap();
    t.engine.lock_folder(&first, "one1").unwrap();
    t.engine.lock_folder(&second, "two2").unwrap();

    let unlocked = t.engine.unlock_folder(&first, "master-pass").unwrap();
    assert!(unlocked.via_master_key);
    t.engine.unlock_folder(&second, "master-pass").unwrap();

    assert!(t.engine.entries().is_empty());
}

#[test]
fn test_verify_master_key_without_one_is_false() {
    let t = TestEngine::new();
    assert!(!t.engine.has_master_key());
    assert!(!t.engine.verify_master_key(""));
    assert!(!t.engine.verify_master_key("anything"));
}

#[test]
fn test_changing_master_key_invalidates_old_one() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");

    t.engine.set_master_key("old-master").unwrap();
    t.engine.set_master_key("new-master").unwrap();
    t.engine.lock_folder(&secret, "abcd").unwrap();

    assert!(!t.engine.verify_master_key("old-master"));
    assert!(t.engine.verify_master_key("new-master"));

    let err = t.engine.unlock_folder(&secret, "old-master").unwrap_err();
    assert!(matches!(err, LatchError::InvalidPassword));

    // The change survives a restart.
    let reopened = t.reopen();
    assert!(!reopened.verify_master_key("old-master"));
    assert!(reopened.verify_master_key("new-master"));
}

#[test]
fn test_legacy_registry_entries_unlock_with_old_digest() {
    let t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");
    // Written by the previous tool: bare mapping, unsalted sha256("abcd").
    let mut legacy = serde_json::Map::new();
    legacy.insert(
        key(&secret),
        serde_json::json!({
            "password_hash": "88d4266fd4e6338d13b845fcf289579d209c897823b9217da3e161936f031589",
            "original_path": key(&secret),
            "system": Platform::current().name(),
            "name": "secret"
        }),
    );
    let legacy = serde_json::Value::Object(legacy);
    fs::write(t.registry_path(), legacy.to_string()).unwrap();

    let mut engine = t.reopen();
    assert!(!engine.has_master_key());
    engine.unlock_folder(&secret, "abcd").unwrap();

    let saved: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(t.registry_path()).unwrap()).unwrap();
    assert!(saved["master_key_hash"].is_null());
    assert_eq!(saved["locks"], serde_json::json!({}));
}

#[test]
fn test_corrupt_registry_starts_empty() {
    let t = TestEngine::new();
    fs::write(t.registry_path(), "\u{0}\u{1}garbage").unwrap();

    let engine = t.reopen();

    assert!(engine.entries().is_empty());
    assert!(!engine.has_master_key());
}

#[test]
fn test_partial_lock_is_reported_distinctly() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");
    t.adapter.skip_on_lock(secret.join("stubborn.txt"));

    let outcome = t.engine.lock_folder(&secret, "abcd").unwrap();

    assert!(outcome.permissions.is_partial());
    assert_eq!(
        outcome.to_string(),
        "Folder locked, but 1 item(s) inside could not be restricted"
    );
    // The root is restricted, so the lock is still recorded.
    assert!(t.engine.entries().contains_key(&key(&secret)));
}

#[test]
fn test_failed_save_reverts_permission_change() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");
    // A directory where the registry file should be makes every save fail.
    fs::create_dir(t.registry_path()).unwrap();

    let err = t.engine.lock_folder(&secret, "abcd").unwrap_err();

    assert!(matches!(err, LatchError::Registry(_)));
    assert!(t.engine.entries().is_empty());
    assert_eq!(
        t.adapter.calls(),
        vec![
            (AdapterCall::Lock, secret.clone()),
            (AdapterCall::Unlock, secret.clone())
        ]
    );
}

#[test]
fn test_relative_path_is_stored_canonically() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");

    {
        let _cwd = DirGuard::new(work.path());
        t.engine.lock_folder(Path::new("./secret"), "abcd").unwrap();
    }

    assert!(t.engine.entries().contains_key(&key(&secret)));
    assert!(t.engine.find(&secret).is_some());
}

#[test]
fn test_missing_folder_entry_can_still_be_found() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");
    t.engine.lock_folder(&secret, "abcd").unwrap();

    fs::remove_dir(&secret).unwrap();

    let (path, _, entry) = t.engine.find(&secret).unwrap();
    assert_eq!(path, secret);
    assert_eq!(entry.display_name, "secret");
}

#[test]
fn test_missing_folder_found_through_parent_alias() {
    let mut t = TestEngine::new();
    let work = TempDir::new().unwrap();
    let secret = folder(&work, "secret");
    let other = folder(&work, "other");
    let alias = other.join("..").join("secret");
    t.engine.lock_folder(&secret, "abcd").unwrap();
    assert!(t.engine.find(&alias).is_some());

    fs::remove_dir(&secret).unwrap();

    let (path, _, _) = t.engine.find(&alias).unwrap();
    assert_eq!(path, secret);
    let outcome = t.engine.unlock_folder(&alias, "abcd").unwrap();
    assert_eq!(outcome.path, secret);
    assert!(t.engine.entries().is_empty());
}

#[test]
fn test_normalize_lexically_folds_dot_components() {
    assert_eq!(
        normalize_lexically(Path::new("/srv/a/./b/../c")),
        PathBuf::from("/srv/a/c")
    );
    assert_eq!(
        normalize_lexically(Path::new("/../srv/..")),
        PathBuf::from("/")
    );
}

#[cfg(unix)]
mod unix_scenario {
    use super::*;
    use crate::permissions::UnixAdapter;
    use crate::test_support::engine_with;
    use std::os::unix::fs::PermissionsExt;

    fn mode_of(path: &Path) -> u32 {
        fs::metadata(path).unwrap().permissions().mode() & 0o777
    }

    #[test]
    fn test_lock_unlock_secret_folder_with_real_permissions() {
        let state = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let secret = folder(&work, "secret");
        fs::write(secret.join("diary.txt"), "dear diary").unwrap();
        let mut engine = engine_with(state.path(), Box::new(UnixAdapter));

        engine.lock_folder(&secret, "abcd").unwrap();
        assert_eq!(engine.entries().len(), 1);
        assert_eq!(mode_of(&secret), 0o000);

        engine.unlock_folder(&secret, "abcd").unwrap();
        assert!(engine.entries().is_empty());
        assert_eq!(mode_of(&secret), 0o700);
        assert_eq!(
            fs::read_to_string(secret.join("diary.txt")).unwrap(),
            "dear diary"
        );

        let err = engine.unlock_folder(&secret, "abcd").unwrap_err();
        assert!(matches!(err, LatchError::NotLocked(_)));
    }

    #[test]
    fn test_wrong_password_leaves_mode_untouched() {
        let state = TempDir::new().unwrap();
        let work = TempDir::new().unwrap();
        let secret = folder(&work, "secret");
        let mut engine = engine_with(state.path(), Box::new(UnixAdapter));

        engine.lock_folder(&secret, "abcd").unwrap();
        assert!(engine.unlock_folder(&secret, "nope").is_err());
        assert_eq!(mode_of(&secret), 0o000);

        engine.unlock_folder(&secret, "abcd").unwrap();
    }
}
