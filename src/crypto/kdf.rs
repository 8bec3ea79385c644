//! Password-based key derivation using Argon2id.
//!
//! Argon2id is a memory-hard KDF that protects against brute-force and
//! GPU-based attacks.  Every secret blob carries its own salt, so the
//! parameters below must never change: a blob written with one set of
//! parameters can only be opened with exactly the same set.

use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;
use zeroize::Zeroizing;

use crate::errors::{StrongboxError, Result};

/// Length of the salt in bytes (256 bits).
pub const SALT_LEN: usize = 32;

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// Memory cost in KiB (64 MiB).
const MEMORY_KIB: u32 = 65_536;

/// Number of passes over memory.
const ITERATIONS: u32 = 3;

/// Parallelism lanes.
const PARALLELISM: u32 = 4;

/// Derive a 32-byte key from secret material and a salt.
///
/// The same material + salt always produces the same key.  The returned
/// key is wiped from memory on drop.
pub fn derive_key(secret_material: &[u8], salt: &[u8; SALT_LEN]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let params = Params::new(MEMORY_KIB, ITERATIONS, PARALLELISM, Some(KEY_LEN))
        .map_err(|e| StrongboxError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut key = Zeroizing::new([0u8; KEY_LEN]);
    argon2
        .hash_password_into(secret_material, salt, &mut key[..])
        .map_err(|e| StrongboxError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(key)
}

/// Generate a cryptographically random 32-byte salt.
pub fn generate_salt() -> [u8; SALT_LEN] {
    let mut salt = [0u8; SALT_LEN];
    rand::rng().fill_bytes(&mut salt);
    salt
}

/// Concatenate key material with auxiliary material (`a ‖ b`).
///
/// The buffer is wiped from memory on drop.
pub fn combine_material(key_material: &[u8], aux_material: &[u8]) -> Zeroizing<Vec<u8>> {
    let mut combined = Zeroizing::new(Vec::with_capacity(key_material.len() + aux_material.len()));
    combined.extend_from_slice(key_material);
    combined.extend_from_slice(aux_material);
    combined
}
