//! The password store: a directory of encrypted secret blobs.
//!
//! This module provides:
//! - Secret naming and path mapping (`paths`)
//! - Unlock scheme detection (`scheme`)
//! - Password generation (`generate`)
//! - The `SecretStore` engine (`engine`)

pub mod engine;
pub mod generate;
pub mod paths;
pub mod scheme;

pub use engine::{EditOutcome, SecretStore};
pub use generate::{generate_password, DEFAULT_LENGTH};
pub use scheme::SchemeKind;

use crate::errors::Result;

/// Something that can record store changes, such as a git repository.
///
/// The store calls `commit` after every successful write or removal when
/// auto-sync is enabled.  Failures are logged and never undo the write.
pub trait Synchronizer {
    /// Returns `true` if the store directory is under version control.
    fn is_repository(&self) -> bool;

    /// Stage every change in the store and commit it with `message`.
    fn commit(&self, message: &str) -> Result<()>;
}
