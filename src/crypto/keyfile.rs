//! Recovery-phrase keyfile: the second factor of every secret key.
//!
//! A keyfile is 32 bytes of secret material kept in the store root.  It
//! is never generated directly: it is the first 32 bytes of the BIP-39
//! seed of a 12-word recovery phrase (empty passphrase), so any device
//! that knows the phrase can rebuild the same keyfile without the file
//! itself ever being synced.
//!
//! Every encrypt/decrypt call feeds `password ‖ keyfile` into Argon2id.
//! There is no stored password hash: a password is only known to be
//! right once it has opened an existing secret.

use std::fs;
use std::path::Path;

use bip39::{Language, Mnemonic, MnemonicType, Seed};
use zeroize::Zeroizing;

use super::kdf::combine_material;
use crate::errors::{StrongboxError, Result};
use crate::secure_fs;

/// Expected length of a keyfile in bytes (256 bits).
pub const KEYFILE_LEN: usize = 32;

/// Keyfile bytes, wiped from memory on drop.
pub struct Keyfile {
    bytes: Zeroizing<[u8; KEYFILE_LEN]>,
}

impl Keyfile {
    /// Derive the keyfile material from a recovery phrase.
    ///
    /// Fails with `InvalidRecoveryPhrase` if a word is unknown or the
    /// checksum does not match.
    pub fn from_recovery_phrase(phrase: &str) -> Result<Self> {
        let normalized = normalize_phrase(phrase);
        let mnemonic = Mnemonic::from_phrase(&normalized, Language::English)
            .map_err(|_| StrongboxError::InvalidRecoveryPhrase)?;

        let seed = Seed::new(&mnemonic, "");
        let seed_bytes = seed.as_bytes();
        if seed_bytes.len() < KEYFILE_LEN {
            return Err(StrongboxError::KeyfileError("seed too short".into()));
        }

        let mut bytes = Zeroizing::new([0u8; KEYFILE_LEN]);
        bytes.copy_from_slice(&seed_bytes[..KEYFILE_LEN]);
        Ok(Self { bytes })
    }

    /// Load a keyfile from disk and validate its length.
    pub fn load(path: &Path) -> Result<Self> {
        let data = Zeroizing::new(fs::read(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StrongboxError::KeyfileError(format!("keyfile not found at {}", path.display()))
            } else {
                StrongboxError::KeyfileError(format!("failed to read keyfile: {e}"))
            }
        })?);

        if data.len() != KEYFILE_LEN {
            return Err(StrongboxError::KeyfileError(format!(
                "keyfile must be exactly {KEYFILE_LEN} bytes, got {}",
                data.len()
            )));
        }

        let mut bytes = Zeroizing::new([0u8; KEYFILE_LEN]);
        bytes.copy_from_slice(&data);
        Ok(Self { bytes })
    }

    /// Write the keyfile to `path` with owner-only permissions.
    pub fn save(&self, path: &Path) -> Result<()> {
        secure_fs::write_private(path, self.bytes.as_slice())
            .map_err(|e| StrongboxError::KeyfileError(format!("failed to write keyfile: {e}")))
    }

    /// `master_credential ‖ keyfile`, the key material for every secret.
    pub fn combined_key_material(&self, master_credential: &[u8]) -> Zeroizing<Vec<u8>> {
        combine_material(master_credential, self.bytes.as_slice())
    }

    /// Access the raw keyfile bytes.
    pub fn as_bytes(&self) -> &[u8; KEYFILE_LEN] {
        &self.bytes
    }
}

/// Generate a new 12-word recovery phrase (128 bits of entropy).
pub fn generate_recovery_phrase() -> Zeroizing<String> {
    let mnemonic = Mnemonic::new(MnemonicType::Words12, Language::English);
    Zeroizing::new(mnemonic.phrase().to_string())
}

/// Returns `true` if a keyfile exists at `path`.
pub fn has_keyfile(path: &Path) -> bool {
    path.is_file()
}

/// Validate `phrase`, derive the keyfile from it and persist it to `path`.
///
/// Overwrites an existing keyfile: re-deriving from the same phrase
/// always yields the same bytes.
pub fn create_keyfile_from_recovery_phrase(path: &Path, phrase: &str) -> Result<Keyfile> {
    let keyfile = Keyfile::from_recovery_phrase(phrase)?;
    keyfile.save(path)?;
    Ok(keyfile)
}

/// Lowercase and collapse whitespace so pasted phrases still validate.
fn normalize_phrase(phrase: &str) -> String {
    phrase
        .split_whitespace()
        .map(str::to_lowercase)
        .collect::<Vec<_>>()
        .join(" ")
}
