//! Integration tests for the credential cache and its on-disk mirror.

use std::fs;
use std::thread;
use std::time::Duration;

use strongbox::cache::CredentialCache;
use strongbox::errors::StrongboxError;
use tempfile::TempDir;

#[test]
fn cached_password_expires() {
    let dir = TempDir::new().unwrap();
    let cache = CredentialCache::new(dir.path(), Duration::from_millis(300));
    cache.set("correct-horse").unwrap();
    assert_eq!(cache.get().unwrap().as_str(), "correct-horse");

    thread::sleep(Duration::from_millis(500));
    assert!(cache.get().is_none());
    assert!(cache.is_expired());
    assert_eq!(cache.remaining_time(), Duration::ZERO);
}

#[test]
fn mirror_is_shared_between_instances() {
    let dir = TempDir::new().unwrap();
    let first = CredentialCache::new(dir.path(), Duration::from_secs(60));
    first.set("correct-horse").unwrap();

    // A second process sees the same directory.
    let second = CredentialCache::new(dir.path(), Duration::from_secs(60));
    assert_eq!(second.get().unwrap().as_str(), "correct-horse");
    assert!(second.validate_session());
}

#[test]
fn mirror_does_not_hold_the_plaintext() {
    let dir = TempDir::new().unwrap();
    let cache = CredentialCache::new(dir.path(), Duration::from_secs(60));
    cache.set("correct-horse").unwrap();

    for entry in fs::read_dir(dir.path()).unwrap() {
        let data = fs::read(entry.unwrap().path()).unwrap();
        assert!(!String::from_utf8_lossy(&data).contains("correct-horse"));
    }
}

#[test]
fn tampered_session_file_fails_validation() {
    let dir = TempDir::new().unwrap();
    let cache = CredentialCache::new(dir.path(), Duration::from_secs(60));
    cache.set("correct-horse").unwrap();
    assert!(cache.validate_session());

    fs::write(dir.path().join("session"), b"someone-else").unwrap();
    assert!(!cache.validate_session());
}

#[test]
fn clear_removes_everything() {
    let dir = TempDir::new().unwrap();
    let cache = CredentialCache::new(dir.path(), Duration::from_secs(60));
    cache.set("correct-horse").unwrap();
    cache.clear();

    assert!(cache.get().is_none());
    assert!(!dir.path().join("credential.cache").exists());
    assert!(!dir.path().join("session").exists());
}

#[test]
fn zero_timeout_disables_caching() {
    let dir = TempDir::new().unwrap();
    let cache = CredentialCache::new(dir.path(), Duration::ZERO);
    cache.set("correct-horse").unwrap();
    assert!(cache.get().is_none());
}

#[test]
fn unreadable_mirror_is_a_miss_and_is_deleted() {
    let dir = TempDir::new().unwrap();
    let mirror = dir.path().join("credential.cache");
    fs::write(&mirror, b"{torn").unwrap();

    let cache = CredentialCache::new(dir.path(), Duration::from_secs(60));
    assert!(cache.get().is_none());
    assert!(!mirror.exists());
}

#[test]
fn mirror_under_another_session_key_is_a_miss() {
    let dir = TempDir::new().unwrap();
    let first = CredentialCache::new(dir.path(), Duration::from_secs(60));
    first.set("correct-horse").unwrap();

    // Swap in a token the ciphertext was not sealed under.
    let mirror = dir.path().join("credential.cache");
    let mut entry: serde_json::Value = serde_json::from_slice(&fs::read(&mirror).unwrap()).unwrap();
    entry["session_token"] = serde_json::Value::String("00".repeat(16));
    fs::write(&mirror, serde_json::to_vec(&entry).unwrap()).unwrap();

    let second = CredentialCache::new(dir.path(), Duration::from_secs(60));
    assert!(second.get().is_none());
    assert!(!mirror.exists());
}

#[test]
fn unwritable_cache_dir_is_a_cache_io_error() {
    let dir = TempDir::new().unwrap();
    let blocker = dir.path().join("not-a-dir");
    fs::write(&blocker, b"x").unwrap();

    let cache = CredentialCache::new(blocker.join("cache"), Duration::from_secs(60));
    assert!(matches!(cache.set("correct-horse"), Err(StrongboxError::CacheIo(_))));
}
