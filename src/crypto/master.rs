//! Stored-hash master record (the simpler of the two unlock schemes).
//!
//! The record is 64 raw bytes: `salt[32] ‖ argon2id(password, salt)[32]`.
//! Unlock attempts are checked against it without touching any secret.

use std::path::Path;

use subtle::ConstantTimeEq;

use super::kdf::{derive_key, generate_salt, KEY_LEN, SALT_LEN};
use crate::errors::{StrongboxError, Result};
use crate::secure_fs;

/// Total on-disk size of a master record.
pub const RECORD_LEN: usize = SALT_LEN + KEY_LEN;

/// Salt and hash of the store's master password.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterRecord {
    salt: [u8; SALT_LEN],
    hash: [u8; KEY_LEN],
}

impl MasterRecord {
    /// Hash `master_credential` under a fresh salt and persist it at `path`.
    pub fn initialize(path: &Path, master_credential: &[u8]) -> Result<Self> {
        if path.exists() {
            return Err(StrongboxError::AlreadyInitialized(path.to_path_buf()));
        }

        let salt = generate_salt();
        let hash = derive_key(master_credential, &salt)?;
        let record = Self { salt, hash: *hash };

        secure_fs::write_private(path, &record.to_bytes())?;
        Ok(record)
    }

    /// Load the record stored at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let data = match std::fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(StrongboxError::NotInitialized(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_bytes(&data)
    }

    /// Check `candidate` against the stored hash in constant time.
    pub fn validate(&self, candidate: &[u8]) -> Result<()> {
        let derived = derive_key(candidate, &self.salt)?;
        if derived.as_slice().ct_eq(&self.hash).into() {
            Ok(())
        } else {
            Err(StrongboxError::IncorrectMasterCredential)
        }
    }

    /// Serialize as `salt ‖ hash`.
    pub fn to_bytes(&self) -> [u8; RECORD_LEN] {
        let mut out = [0u8; RECORD_LEN];
        out[..SALT_LEN].copy_from_slice(&self.salt);
        out[SALT_LEN..].copy_from_slice(&self.hash);
        out
    }

    /// Parse a 64-byte record.
    pub fn from_bytes(data: &[u8]) -> Result<Self> {
        if data.len() != RECORD_LEN {
            return Err(StrongboxError::MalformedBlob(format!(
                "master record must be exactly {RECORD_LEN} bytes, got {}",
                data.len()
            )));
        }
        let mut salt = [0u8; SALT_LEN];
        let mut hash = [0u8; KEY_LEN];
        salt.copy_from_slice(&data[..SALT_LEN]);
        hash.copy_from_slice(&data[SALT_LEN..]);
        Ok(Self { salt, hash })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn initialize_then_validate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".master");

        let record = MasterRecord::initialize(&path, b"correct-horse").unwrap();
        assert_eq!(std::fs::read(&path).unwrap().len(), RECORD_LEN);

        let loaded = MasterRecord::load(&path).unwrap();
        assert_eq!(record, loaded);
        assert!(loaded.validate(b"correct-horse").is_ok());
        assert!(matches!(
            loaded.validate(b"wrong"),
            Err(StrongboxError::IncorrectMasterCredential)
        ));
    }

    #[test]
    fn initialize_twice_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(".master");
        MasterRecord::initialize(&path, b"pw").unwrap();
        assert!(matches!(
            MasterRecord::initialize(&path, b"pw"),
            Err(StrongboxError::AlreadyInitialized(_))
        ));
    }

    #[test]
    fn load_missing_is_not_initialized() {
        let dir = TempDir::new().unwrap();
        assert!(matches!(
            MasterRecord::load(&dir.path().join(".master")),
            Err(StrongboxError::NotInitialized(_))
        ));
    }

    #[test]
    fn truncated_record_is_rejected() {
        assert!(MasterRecord::from_bytes(&[0u8; 63]).is_err());
    }
}
