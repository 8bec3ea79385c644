//! Process-local master password cache with an encrypted on-disk mirror.
//!
//! Lifecycle: `Empty → Cached → {Expired, Cleared}`.
//!
//! - `set` stores the password in memory with an expiration, picks a new
//!   session token, and persists an encrypted mirror plus a bare session
//!   file under the cache directory.  Its I/O errors are returned.
//! - `get` serves the in-memory value while it is live, otherwise tries
//!   the mirror.  Any unreadable, expired or undecryptable mirror is a
//!   miss, and a broken one is deleted.  It never returns an error.
//! - `clear` wipes memory and both files; it is idempotent.
//!
//! Separate invocations share the mirror with no file lock: correctness
//! relies only on the expiration field, the GCM tag and token equality.

pub mod mirror;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};
use zeroize::Zeroizing;

use crate::errors::{StrongboxError, Result};
use crate::secure_fs;
use mirror::{new_session_token, CacheEntry};

/// Directory (under the store root) holding the cache files.
pub const CACHE_DIR_NAME: &str = ".cache";

/// Encrypted mirror file name.
const MIRROR_FILE: &str = "credential.cache";

/// Bare session token file name.
const SESSION_FILE: &str = "session";

/// Default time a validated password stays cached.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5 * 60);

#[derive(Default)]
struct CacheState {
    credential: Option<Zeroizing<String>>,
    expiration: Option<DateTime<Utc>>,
    session_token: Option<String>,
}

impl CacheState {
    fn live_credential(&self, now: DateTime<Utc>) -> Option<Zeroizing<String>> {
        match (&self.credential, self.expiration) {
            (Some(credential), Some(expiration)) if now < expiration => Some(credential.clone()),
            _ => None,
        }
    }

    fn reset(&mut self) {
        self.credential = None;
        self.expiration = None;
        self.session_token = None;
    }
}

/// Master password cache for one store.
///
/// Safe to share between threads: reads run concurrently, `set` and
/// `clear` hold the write lock for their whole duration.
pub struct CredentialCache {
    dir: PathBuf,
    timeout: RwLock<Duration>,
    state: RwLock<CacheState>,
}

impl CredentialCache {
    /// Create a cache persisting its mirror under `dir`.
    pub fn new(dir: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            dir: dir.into(),
            timeout: RwLock::new(timeout),
            state: RwLock::new(CacheState::default()),
        }
    }

    /// Create the cache for the store rooted at `store_root`.
    pub fn for_store(store_root: &Path, timeout: Duration) -> Self {
        Self::new(store_root.join(CACHE_DIR_NAME), timeout)
    }

    /// Cache `credential` for the configured timeout and persist the mirror.
    ///
    /// A zero timeout disables caching: the cache is cleared instead.
    pub fn set(&self, credential: &str) -> Result<()> {
        let timeout = *self.timeout.read();
        let mut state = self.state.write();

        if timeout.is_zero() {
            state.reset();
            self.remove_files();
            return Ok(());
        }

        let delta = TimeDelta::from_std(timeout)
            .map_err(|e| StrongboxError::ConfigError(format!("cache timeout out of range: {e}")))?;
        let expiration = Utc::now()
            .checked_add_signed(delta)
            .ok_or_else(|| StrongboxError::ConfigError("cache timeout out of range".into()))?;
        let session_token = new_session_token();

        state.credential = Some(Zeroizing::new(credential.to_string()));
        state.expiration = Some(expiration);
        state.session_token = Some(session_token.clone());

        let entry = CacheEntry::seal(credential, expiration, &session_token)?;
        let json = entry.to_json()?;

        secure_fs::create_private_dir(&self.dir).map_err(StrongboxError::CacheIo)?;
        secure_fs::write_private(&self.mirror_path(), &json).map_err(StrongboxError::CacheIo)?;
        secure_fs::write_private(&self.session_path(), session_token.as_bytes())
            .map_err(StrongboxError::CacheIo)?;

        debug!(dir = %self.dir.display(), %expiration, "credential cached");
        Ok(())
    }

    /// Return the cached password if it has not expired.
    pub fn get(&self) -> Option<Zeroizing<String>> {
        if let Some(credential) = self.state.read().live_credential(Utc::now()) {
            debug!("credential cache hit (memory)");
            return Some(credential);
        }

        let mut state = self.state.write();
        let now = Utc::now();

        // Another thread may have refreshed it while we waited for the lock.
        if let Some(credential) = state.live_credential(now) {
            return Some(credential);
        }

        match self.load_mirror(now) {
            Some((entry, credential)) => {
                debug!("credential cache hit (mirror)");
                state.credential = Some(credential.clone());
                state.expiration = Some(entry.expiration);
                state.session_token = Some(entry.session_token);
                Some(credential)
            }
            None => {
                debug!("credential cache miss");
                state.reset();
                None
            }
        }
    }

    /// Check the in-memory session token against the on-disk session file.
    pub fn validate_session(&self) -> bool {
        let Some(token) = self.state.read().session_token.clone() else {
            return false;
        };

        match fs::read(self.session_path()) {
            Ok(data) => token.as_bytes().ct_eq(&data).into(),
            Err(_) => false,
        }
    }

    /// Wipe the cached password from memory and disk.
    pub fn clear(&self) {
        let mut state = self.state.write();
        state.reset();
        self.remove_files();
        debug!(dir = %self.dir.display(), "credential cache cleared");
    }

    /// Time left before the cached password expires (zero when empty).
    pub fn remaining_time(&self) -> Duration {
        let state = self.state.read();
        match (&state.credential, state.expiration) {
            (Some(_), Some(expiration)) => (expiration - Utc::now()).to_std().unwrap_or(Duration::ZERO),
            _ => Duration::ZERO,
        }
    }

    /// Returns `true` when nothing live is cached in memory.
    pub fn is_expired(&self) -> bool {
        self.state.read().live_credential(Utc::now()).is_none()
    }

    pub fn timeout(&self) -> Duration {
        *self.timeout.read()
    }

    /// Change the timeout used by subsequent `set` calls.
    pub fn set_timeout(&self, timeout: Duration) {
        *self.timeout.write() = timeout;
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn mirror_path(&self) -> PathBuf {
        self.dir.join(MIRROR_FILE)
    }

    fn session_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    /// Load and decrypt the mirror, deleting it when it is stale or broken.
    fn load_mirror(&self, now: DateTime<Utc>) -> Option<(CacheEntry, Zeroizing<String>)> {
        let path = self.mirror_path();
        let data = fs::read(&path).ok()?;

        let entry = match CacheEntry::from_json(&data) {
            Ok(entry) => entry,
            Err(e) => {
                debug!(error = %e, "discarding unreadable cache mirror");
                self.discard_mirror();
                return None;
            }
        };

        if now >= entry.expiration {
            debug!("discarding expired cache mirror");
            self.discard_mirror();
            return None;
        }

        match entry.open() {
            Ok(credential) => Some((entry, credential)),
            Err(_) => {
                debug!("discarding undecryptable cache mirror");
                self.discard_mirror();
                None
            }
        }
    }

    fn discard_mirror(&self) {
        if let Err(e) = secure_fs::remove_if_exists(&self.mirror_path()) {
            warn!(error = %e, "could not delete cache mirror");
        }
    }

    fn remove_files(&self) {
        for path in [self.mirror_path(), self.session_path()] {
            if let Err(e) = secure_fs::remove_if_exists(&path) {
                warn!(path = %path.display(), error = %e, "could not delete cache file");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn cache(dir: &TempDir, timeout: Duration) -> CredentialCache {
        CredentialCache::for_store(dir.path(), timeout)
    }

    #[test]
    fn empty_cache_misses() {
        let dir = TempDir::new().unwrap();
        let c = cache(&dir, DEFAULT_TIMEOUT);
        assert!(c.get().is_none());
        assert!(c.is_expired());
        assert!(!c.validate_session());
        assert_eq!(c.remaining_time(), Duration::ZERO);
    }

    #[test]
    fn set_then_get_in_same_process() {
        let dir = TempDir::new().unwrap();
        let c = cache(&dir, DEFAULT_TIMEOUT);
        c.set("correct-horse").unwrap();
        assert_eq!(c.get().unwrap().as_str(), "correct-horse");
        assert!(c.validate_session());
        assert!(c.remaining_time() > Duration::from_secs(60));
    }

    #[test]
    fn second_instance_reads_the_mirror() {
        let dir = TempDir::new().unwrap();
        cache(&dir, DEFAULT_TIMEOUT).set("correct-horse").unwrap();

        let other = cache(&dir, DEFAULT_TIMEOUT);
        assert_eq!(other.get().unwrap().as_str(), "correct-horse");
        assert!(other.validate_session());
    }

    #[cfg(unix)]
    #[test]
    fn cache_dir_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let c = cache(&dir, DEFAULT_TIMEOUT);
        c.set("pw").unwrap();
        let mode = fs::metadata(c.dir()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o700);
    }

    #[test]
    fn zero_timeout_disables_caching() {
        let dir = TempDir::new().unwrap();
        let c = cache(&dir, Duration::ZERO);
        c.set("pw").unwrap();
        assert!(c.get().is_none());
        assert!(!c.dir().join(MIRROR_FILE).exists());
    }

    #[test]
    fn expired_mirror_is_deleted() {
        let dir = TempDir::new().unwrap();
        let c = cache(&dir, Duration::from_millis(30));
        c.set("pw").unwrap();
        thread::sleep(Duration::from_millis(80));

        let fresh = cache(&dir, Duration::from_millis(30));
        assert!(fresh.get().is_none());
        assert!(!fresh.dir().join(MIRROR_FILE).exists());
    }

    #[test]
    fn concurrent_readers_and_writers() {
        let dir = TempDir::new().unwrap();
        let c = Arc::new(cache(&dir, DEFAULT_TIMEOUT));
        c.set("initial").unwrap();

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let c = Arc::clone(&c);
                thread::spawn(move || {
                    if i % 4 == 0 {
                        c.set(&format!("pw-{i}")).unwrap();
                    } else {
                        // Either some password or a miss, never a panic.
                        let _ = c.get();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let value = c.get().unwrap();
        assert!(value.starts_with("pw-") || value.as_str() == "initial");
        assert!(c.validate_session());
    }
}
