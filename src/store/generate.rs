//! Random password generation.

use rand::Rng;
use zeroize::Zeroizing;

use crate::errors::{StrongboxError, Result};

/// Default length of generated passwords.
pub const DEFAULT_LENGTH: usize = 20;

const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const SYMBOLS: &[u8] = b"!@#$%^&*()_+-=[]{}|;:,.<>?";

/// Generate a random password of `length` characters.
///
/// Draws uniformly from `[a-zA-Z0-9]`, plus punctuation when `symbols`
/// is set.
pub fn generate_password(length: usize, symbols: bool) -> Result<Zeroizing<String>> {
    if length == 0 {
        return Err(StrongboxError::CommandFailed(
            "password length must be at least 1".into(),
        ));
    }

    let mut charset = ALPHANUMERIC.to_vec();
    if symbols {
        charset.extend_from_slice(SYMBOLS);
    }

    let mut rng = rand::rng();
    let mut password = Zeroizing::new(String::with_capacity(length));
    for _ in 0..length {
        let idx = rng.random_range(0..charset.len());
        password.push(char::from(charset[idx]));
    }

    Ok(password)
}
