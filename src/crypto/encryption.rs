//! AES-256-GCM authenticated encryption of secret payloads.
//!
//! Each call to `encrypt` generates a fresh random salt and nonce, derives
//! the key with Argon2id, and returns one self-describing blob:
//!
//! ```text
//! [ 32-byte salt | 12-byte nonce | ciphertext + 16-byte auth tag ]
//! ```
//!
//! `decrypt` splits the blob back up, re-derives the key from the stored
//! salt, and opens the seal.  A bad tag is reported as
//! `AuthenticationFailure` whether the cause was a wrong credential or a
//! corrupted file; the two are never told apart.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use super::kdf::{combine_material, derive_key, generate_salt, SALT_LEN};
use crate::errors::{StrongboxError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Smallest structurally valid blob: salt + nonce.
pub const MIN_BLOB_LEN: usize = SALT_LEN + NONCE_LEN;

/// Encrypt `plaintext` under `key_material`.
pub fn encrypt(plaintext: &[u8], key_material: &[u8]) -> Result<Vec<u8>> {
    encrypt_with_aux(plaintext, key_material, &[])
}

/// Encrypt `plaintext` under `key_material ‖ aux_material`.
pub fn encrypt_with_aux(plaintext: &[u8], key_material: &[u8], aux_material: &[u8]) -> Result<Vec<u8>> {
    let salt = generate_salt();
    let material = combine_material(key_material, aux_material);
    let key = derive_key(&material, &salt)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| StrongboxError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(&nonce, plaintext)
        .map_err(|e| StrongboxError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut blob = Vec::with_capacity(MIN_BLOB_LEN + ciphertext.len());
    blob.extend_from_slice(&salt);
    blob.extend_from_slice(&nonce);
    blob.extend_from_slice(&ciphertext);
    Ok(blob)
}

/// Decrypt a blob produced by `encrypt`.
pub fn decrypt(blob: &[u8], key_material: &[u8]) -> Result<Vec<u8>> {
    decrypt_with_aux(blob, key_material, &[])
}

/// Decrypt a blob produced by `encrypt_with_aux`.
pub fn decrypt_with_aux(blob: &[u8], key_material: &[u8], aux_material: &[u8]) -> Result<Vec<u8>> {
    // Reject before spending an Argon2 derivation on it.
    if blob.len() < MIN_BLOB_LEN {
        return Err(StrongboxError::MalformedBlob(format!(
            "expected at least {MIN_BLOB_LEN} bytes, got {}",
            blob.len()
        )));
    }

    let (salt_bytes, rest) = blob.split_at(SALT_LEN);
    let (nonce_bytes, ciphertext) = rest.split_at(NONCE_LEN);

    let salt: &[u8; SALT_LEN] = salt_bytes
        .try_into()
        .map_err(|_| StrongboxError::MalformedBlob("bad salt length".into()))?;

    let material = combine_material(key_material, aux_material);
    let key = derive_key(&material, salt)?;

    let cipher = Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|_| StrongboxError::AuthenticationFailure)?;

    cipher
        .decrypt(Nonce::from_slice(nonce_bytes), ciphertext)
        .map_err(|_| StrongboxError::AuthenticationFailure)
}
