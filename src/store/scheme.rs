//! Which unlock scheme a store uses, and the files that mark it.
//!
//! A store uses exactly one of:
//! - **Keyfile** (default): `.keyfile` holds 32 bytes derived from the
//!   recovery phrase; every secret key is derived from
//!   `password ‖ keyfile`.  A password is only proven by opening a secret.
//! - **Stored hash**: `.master` holds `salt ‖ argon2id(password)` and every
//!   unlock is checked against it; secret keys use the password alone.
//!
//! Finding both markers in one store is an error.

use std::path::Path;

use zeroize::Zeroizing;

use crate::crypto::kdf::combine_material;
use crate::crypto::{Keyfile, MasterRecord};
use crate::errors::{StrongboxError, Result};

/// File name of the recovery-phrase keyfile.
pub const KEYFILE_NAME: &str = ".keyfile";

/// File name of the stored-hash master record.
pub const MASTER_RECORD_NAME: &str = ".master";

/// Label for the scheme a store uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemeKind {
    Keyfile,
    StoredHash,
}

/// Loaded unlock material for an open store.
pub enum UnlockScheme {
    Keyfile(Keyfile),
    StoredHash(MasterRecord),
}

impl UnlockScheme {
    /// Inspect `root` and load whichever scheme marker it holds.
    pub fn detect(root: &Path) -> Result<Self> {
        let keyfile_path = root.join(KEYFILE_NAME);
        let master_path = root.join(MASTER_RECORD_NAME);

        match (keyfile_path.is_file(), master_path.is_file()) {
            (true, false) => Ok(Self::Keyfile(Keyfile::load(&keyfile_path)?)),
            (false, true) => Ok(Self::StoredHash(MasterRecord::load(&master_path)?)),
            (true, true) => Err(StrongboxError::ConfigError(format!(
                "store at {} has both {KEYFILE_NAME} and {MASTER_RECORD_NAME}; remove one",
                root.display()
            ))),
            (false, false) => Err(StrongboxError::NotInitialized(root.to_path_buf())),
        }
    }

    pub fn kind(&self) -> SchemeKind {
        match self {
            Self::Keyfile(_) => SchemeKind::Keyfile,
            Self::StoredHash(_) => SchemeKind::StoredHash,
        }
    }

    /// Up-front credential check.  Only the stored-hash scheme can do one.
    pub fn check(&self, credential: &[u8]) -> Result<()> {
        match self {
            Self::Keyfile(_) => Ok(()),
            Self::StoredHash(record) => record.validate(credential),
        }
    }

    /// Key material handed to the cipher for `credential`.
    pub fn key_material(&self, credential: &[u8]) -> Zeroizing<Vec<u8>> {
        match self {
            Self::Keyfile(keyfile) => keyfile.combined_key_material(credential),
            Self::StoredHash(_) => combine_material(credential, &[]),
        }
    }
}

/// Returns `true` if `root` carries either scheme marker.
pub fn is_initialized(root: &Path) -> bool {
    root.join(KEYFILE_NAME).is_file() || root.join(MASTER_RECORD_NAME).is_file()
}
