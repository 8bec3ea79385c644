//! Cryptographic primitives for Strongbox.
//!
//! This module provides:
//! - Argon2id key derivation with fixed parameters (`kdf`)
//! - AES-256-GCM blob encryption and decryption (`encryption`)
//! - Recovery-phrase keyfiles (`keyfile`)
//! - The stored-hash master record (`master`)

pub mod encryption;
pub mod kdf;
pub mod keyfile;
pub mod master;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use encryption::{decrypt, decrypt_with_aux, encrypt, encrypt_with_aux};
pub use kdf::{derive_key, generate_salt};
pub use keyfile::{create_keyfile_from_recovery_phrase, generate_recovery_phrase, has_keyfile, Keyfile};
pub use master::MasterRecord;
