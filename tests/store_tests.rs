//! End-to-end tests for the secret store engine.

use std::fs;

use strongbox::config::StoreConfig;
use strongbox::errors::StrongboxError;
use strongbox::store::{EditOutcome, SchemeKind, SecretStore};
use tempfile::TempDir;

const PHRASE: &str =
    "legal winner thank year wave sausage worth useful legal winner thank yellow";

fn new_store(dir: &TempDir) -> SecretStore {
    let config = StoreConfig::new(dir.path().join("store"));
    SecretStore::init_from_recovery_phrase(config, PHRASE).expect("init should succeed")
}

// ---------------------------------------------------------------------------
// Keyfile stores
// ---------------------------------------------------------------------------

#[test]
fn insert_show_remove_lifecycle() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    assert_eq!(store.scheme(), SchemeKind::Keyfile);

    store.insert("email/work", "hunter2", "correct-horse").unwrap();
    store.insert("bank/us/checking", "1234", "correct-horse").unwrap();

    assert_eq!(store.show("email/work", "correct-horse").unwrap().as_str(), "hunter2");
    assert_eq!(store.secret_names().unwrap(), vec!["bank/us/checking", "email/work"]);

    store.remove("bank/us/checking").unwrap();
    assert!(!store.root().join("bank").exists(), "empty folders should be pruned");
    assert!(store.root().join("email").exists());
}

#[test]
fn wrong_password_on_second_insert_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    store.insert("first", "a", "correct-horse").unwrap();
    store.cache().clear();

    let err = store.insert("second", "b", "battery-staple").unwrap_err();
    assert!(matches!(err.root(), StrongboxError::IncorrectMasterCredential));
    assert!(!store.exists("second").unwrap());
}

#[test]
fn wrong_password_on_show_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    store.insert("site", "value", "correct-horse").unwrap();

    let err = store.show("site", "nope").unwrap_err();
    assert!(matches!(
        err.root(),
        StrongboxError::IncorrectMasterCredential | StrongboxError::AuthenticationFailure
    ));
}

#[test]
fn insert_refuses_to_overwrite_but_update_does() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    store.insert("site", "one", "correct-horse").unwrap();

    let err = store.insert("site", "two", "correct-horse").unwrap_err();
    assert!(matches!(err.root(), StrongboxError::SecretAlreadyExists(_)));

    store.update("site", "two", "correct-horse").unwrap();
    assert_eq!(store.show("site", "correct-horse").unwrap().as_str(), "two");
}

#[test]
fn reinitializing_fails() {
    let dir = TempDir::new().unwrap();
    let _store = new_store(&dir);
    let again = SecretStore::init_from_recovery_phrase(StoreConfig::new(dir.path().join("store")), PHRASE);
    assert!(matches!(again, Err(StrongboxError::AlreadyInitialized(_))));
}

#[test]
fn recovered_keyfile_opens_existing_secrets() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    store.insert("site", "value", "correct-horse").unwrap();

    // Simulate a fresh clone: keyfile and cache are never synced.
    fs::remove_file(store.root().join(".keyfile")).unwrap();
    fs::remove_dir_all(store.root().join(".cache")).unwrap();
    drop(store);

    let restored =
        SecretStore::init_from_recovery_phrase(StoreConfig::new(dir.path().join("store")), PHRASE).unwrap();
    assert_eq!(restored.show("site", "correct-horse").unwrap().as_str(), "value");
}

#[test]
fn generated_password_is_stored() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    let password = store.generate("web/site", 24, false, "correct-horse", false).unwrap();

    assert_eq!(password.len(), 24);
    assert!(password.chars().all(|c| c.is_ascii_alphanumeric()));
    assert_eq!(store.show("web/site", "correct-horse").unwrap().as_str(), password.as_str());
}

#[test]
fn bad_names_are_rejected() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    for name in ["", "../escape", "a//b", ".hidden", "/abs"] {
        let err = store.insert(name, "x", "correct-horse").unwrap_err();
        assert!(
            matches!(err.root(), StrongboxError::InvalidSecretName { .. }),
            "{name:?} should be rejected, got {err}"
        );
    }
}

#[cfg(unix)]
#[test]
fn edit_runs_the_editor_and_saves_changes() {
    let dir = TempDir::new().unwrap();
    let store = new_store(&dir);
    store.insert("site", "old", "correct-horse").unwrap();

    let script = dir.path().join("editor.sh");
    fs::write(&script, "#!/bin/sh\nprintf 'new value\\n' > \"$1\"\n").unwrap();
    let editor = format!("sh {}", script.display());

    let outcome = store.edit("site", "correct-horse", &editor).unwrap();
    assert_eq!(outcome, EditOutcome::Updated);
    assert_eq!(store.show("site", "correct-horse").unwrap().as_str(), "new value");

    assert_eq!(store.edit("site", "correct-horse", "true").unwrap(), EditOutcome::Unchanged);
}

// ---------------------------------------------------------------------------
// Stored-hash stores
// ---------------------------------------------------------------------------

#[test]
fn stored_hash_store_checks_password_up_front() {
    let dir = TempDir::new().unwrap();
    let config = StoreConfig::new(dir.path().join("store"));
    let store = SecretStore::init_with_master_password(config, "correct-horse").unwrap();
    assert_eq!(store.scheme(), SchemeKind::StoredHash);

    // Even an empty store refuses a wrong password.
    let err = store.insert("site", "x", "wrong-password").unwrap_err();
    assert!(matches!(err.root(), StrongboxError::IncorrectMasterCredential));

    store.insert("site", "x", "correct-horse").unwrap();
    assert_eq!(store.show("site", "correct-horse").unwrap().as_str(), "x");
}

#[test]
fn opening_an_empty_directory_is_not_initialized() {
    let dir = TempDir::new().unwrap();
    let err = SecretStore::open(StoreConfig::new(dir.path())).err().unwrap();
    assert!(matches!(err, StrongboxError::NotInitialized(_)));
}
