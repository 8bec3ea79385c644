//! On-disk mirror of the credential cache.
//!
//! The mirror is a small JSON document:
//!
//! ```json
//! {
//!   "encrypted_credential": "<base64 AES-256-GCM ciphertext>",
//!   "nonce": "<base64 12-byte nonce>",
//!   "expiration": "2026-10-18T12:00:00Z",
//!   "session_token": "<32 hex chars>"
//! }
//! ```
//!
//! The cache key is `SHA-256(session_token ‖ CACHE_KEY_DOMAIN)`.  Together
//! with the expiration field and the GCM tag this makes the file
//! self-validating: a torn write, a stale entry or a foreign file all
//! fail to load and are treated as a miss.

use aes_gcm::aead::{Aead, KeyInit, OsRng};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use zeroize::Zeroizing;

use crate::errors::{StrongboxError, Result};

/// Fixed domain string mixed into the cache key.
const CACHE_KEY_DOMAIN: &[u8] = b"strongbox-credential-cache-v1";

/// Session tokens are 16 random bytes, hex-encoded.
const SESSION_TOKEN_BYTES: usize = 16;

/// Serialized form of a cached credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub encrypted_credential: Vec<u8>,

    #[serde(serialize_with = "base64_encode", deserialize_with = "base64_decode")]
    pub nonce: Vec<u8>,

    pub expiration: DateTime<Utc>,

    pub session_token: String,
}

impl CacheEntry {
    /// Encrypt `credential` under the key bound to `session_token`.
    pub fn seal(credential: &str, expiration: DateTime<Utc>, session_token: &str) -> Result<Self> {
        let cipher = cipher_for(session_token)?;
        let nonce = Aes256Gcm::generate_nonce(&mut OsRng);
        let encrypted_credential = cipher
            .encrypt(&nonce, credential.as_bytes())
            .map_err(|e| StrongboxError::EncryptionFailed(format!("cache encryption error: {e}")))?;

        Ok(Self {
            encrypted_credential,
            nonce: nonce.to_vec(),
            expiration,
            session_token: session_token.to_string(),
        })
    }

    /// Decrypt the credential.  Any failure means the entry is unusable.
    pub fn open(&self) -> Result<Zeroizing<String>> {
        if self.nonce.len() != 12 {
            return Err(StrongboxError::MalformedBlob("cache nonce must be 12 bytes".into()));
        }
        let cipher = cipher_for(&self.session_token)?;
        let plaintext = Zeroizing::new(
            cipher
                .decrypt(Nonce::from_slice(&self.nonce), self.encrypted_credential.as_slice())
                .map_err(|_| StrongboxError::AuthenticationFailure)?,
        );
        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| StrongboxError::SerializationError("cached credential is not UTF-8".into()))?;
        Ok(Zeroizing::new(text.to_string()))
    }

    pub fn to_json(&self) -> Result<Vec<u8>> {
        serde_json::to_vec(self).map_err(|e| StrongboxError::SerializationError(format!("cache entry: {e}")))
    }

    pub fn from_json(data: &[u8]) -> Result<Self> {
        serde_json::from_slice(data)
            .map_err(|e| StrongboxError::SerializationError(format!("cache entry: {e}")))
    }
}

/// A fresh random session token (hex).
pub fn new_session_token() -> String {
    let mut bytes = [0u8; SESSION_TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn cipher_for(session_token: &str) -> Result<Aes256Gcm> {
    let mut hasher = Sha256::new();
    hasher.update(session_token.as_bytes());
    hasher.update(CACHE_KEY_DOMAIN);
    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(&hasher.finalize());

    Aes256Gcm::new_from_slice(key.as_slice())
        .map_err(|e| StrongboxError::EncryptionFailed(format!("invalid cache key: {e}")))
}

// ---------------------------------------------------------------------------
// Serde helpers for base64-encoded Vec<u8> fields
// ---------------------------------------------------------------------------

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;

fn base64_encode<S>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&BASE64.encode(data))
}

fn base64_decode<'de, D>(deserializer: D) -> std::result::Result<Vec<u8>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    BASE64.decode(&s).map_err(serde::de::Error::custom)
}
