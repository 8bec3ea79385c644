//! Secret name validation and name ↔ file path mapping.
//!
//! A secret called `email/work` lives at `<root>/email/work.enc`.  The
//! `.enc` suffix is added and stripped transparently, so `email/work`
//! and `email/work.enc` name the same secret.

use std::path::{Path, PathBuf};

use crate::errors::{StrongboxError, Result};

/// File suffix of every secret blob.
pub const SECRET_SUFFIX: &str = ".enc";

/// Longest accepted secret name, in bytes.
const MAX_NAME_LEN: usize = 256;

/// Strip the `.enc` suffix, if present.
pub fn canonical_name(name: &str) -> &str {
    name.strip_suffix(SECRET_SUFFIX).unwrap_or(name)
}

/// Validate that a secret name is a safe relative path inside the store.
///
/// Rejected: empty names, absolute paths, backslashes, empty, `.` or `..`
/// components, and components starting with `.` (reserved for store
/// metadata such as `.keyfile` and `.cache`).
pub fn validate_secret_name(name: &str) -> Result<()> {
    let invalid = |reason: &str| StrongboxError::InvalidSecretName {
        name: name.to_string(),
        reason: reason.to_string(),
    };

    let bare = canonical_name(name);
    if bare.is_empty() {
        return Err(invalid("name cannot be empty"));
    }
    if bare.len() > MAX_NAME_LEN {
        return Err(invalid("name cannot exceed 256 bytes"));
    }
    if bare.starts_with('/') {
        return Err(invalid("name must be relative to the store"));
    }
    if bare.contains('\\') || bare.contains('\0') {
        return Err(invalid("name cannot contain backslashes or NUL bytes"));
    }

    for component in bare.split('/') {
        if component.is_empty() {
            return Err(invalid("name cannot contain empty path components"));
        }
        if component.starts_with('.') {
            return Err(invalid("path components cannot start with '.'"));
        }
    }

    Ok(())
}

/// Resolve a secret name to its blob path under `root`.
pub fn secret_path(root: &Path, name: &str) -> Result<PathBuf> {
    validate_secret_name(name)?;
    Ok(root.join(format!("{}{SECRET_SUFFIX}", canonical_name(name))))
}

/// Map a blob path back to its secret name (`/`-separated, no suffix).
pub fn name_from_path(root: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(root).ok()?;
    let joined = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/");
    joined.strip_suffix(SECRET_SUFFIX).map(str::to_string)
}

/// Returns `true` if `file_name` looks like a secret blob.
pub fn is_secret_file(file_name: &str) -> bool {
    file_name.len() > SECRET_SUFFIX.len() && file_name.ends_with(SECRET_SUFFIX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suffix_is_transparent() {
        let root = Path::new("/store");
        assert_eq!(
            secret_path(root, "email/work").unwrap(),
            secret_path(root, "email/work.enc").unwrap()
        );
        assert_eq!(
            secret_path(root, "email/work").unwrap(),
            PathBuf::from("/store/email/work.enc")
        );
    }

    #[test]
    fn valid_names() {
        for name in ["a", "a/b", "Email/gmail.com", "bank/acct-1_x", "ünïcode/名前"] {
            assert!(validate_secret_name(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn rejects_traversal_and_reserved_names() {
        for name in [
            "", ".enc", "/etc/passwd", "../outside", "a/../b", "a/./b", "a//b", "a/", ".keyfile",
            ".cache/session", "dir/.hidden", "a\\b",
        ] {
            assert!(validate_secret_name(name).is_err(), "{name:?} should be rejected");
        }
    }

    #[test]
    fn rejects_too_long_name() {
        assert!(validate_secret_name(&"a".repeat(257)).is_err());
        assert!(validate_secret_name(&"a".repeat(256)).is_ok());
    }

    #[test]
    fn name_from_path_inverts_secret_path() {
        let root = Path::new("/store");
        let path = secret_path(root, "a/b/c").unwrap();
        assert_eq!(name_from_path(root, &path).as_deref(), Some("a/b/c"));
        assert_eq!(name_from_path(root, Path::new("/store/notes.txt")), None);
    }

    #[test]
    fn secret_file_detection() {
        assert!(is_secret_file("x.enc"));
        assert!(!is_secret_file(".enc"));
        assert!(!is_secret_file("x.txt"));
    }
}
