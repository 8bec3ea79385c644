use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in Strongbox.
#[derive(Debug, Error)]
pub enum StrongboxError {
    // --- Crypto errors ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    /// Tag mismatch. Deliberately worded the same as `IncorrectMasterCredential`.
    #[error("Decryption failed — wrong master password or corrupted data")]
    AuthenticationFailure,

    #[error("Malformed encrypted blob: {0}")]
    MalformedBlob(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    // --- Master credential errors ---
    #[error("Decryption failed — wrong master password or corrupted data")]
    IncorrectMasterCredential,

    #[error("Password store not initialized at {0} (run `strongbox init`)")]
    NotInitialized(PathBuf),

    #[error("Password store already initialized at {0}")]
    AlreadyInitialized(PathBuf),

    #[error("Invalid recovery phrase — check the words and their order")]
    InvalidRecoveryPhrase,

    #[error("Keyfile error: {0}")]
    KeyfileError(String),

    // --- Secret errors ---
    #[error("Secret '{0}' not found")]
    SecretNotFound(String),

    #[error("Secret '{0}' already exists (use `edit` or `insert --force` to overwrite)")]
    SecretAlreadyExists(String),

    #[error("Invalid secret name '{name}': {reason}")]
    InvalidSecretName { name: String, reason: String },

    /// Failure of a named store operation, keeps the original cause.
    #[error("Failed to {op} '{name}': {source}")]
    Operation {
        op: &'static str,
        name: String,
        #[source]
        source: Box<StrongboxError>,
    },

    // --- Cache errors ---
    #[error("Could not persist the credential cache: {0}")]
    CacheIo(#[source] std::io::Error),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- Sync errors ---
    #[error("Sync error: {0}")]
    Sync(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Editor error: {0}")]
    EditorError(String),
}

impl StrongboxError {
    /// Wrap `self` with the failing operation and secret name.
    pub fn during(self, op: &'static str, name: &str) -> Self {
        Self::Operation {
            op,
            name: name.to_string(),
            source: Box::new(self),
        }
    }

    /// The innermost error, with any `Operation` wrapping peeled off.
    pub fn root(&self) -> &Self {
        match self {
            Self::Operation { source, .. } => source.root(),
            other => other,
        }
    }
}

impl From<git2::Error> for StrongboxError {
    fn from(e: git2::Error) -> Self {
        Self::Sync(e.message().to_string())
    }
}

impl From<walkdir::Error> for StrongboxError {
    fn from(e: walkdir::Error) -> Self {
        Self::Io(e.into())
    }
}

/// Convenience type alias for Strongbox results.
pub type Result<T> = std::result::Result<T, StrongboxError>;
