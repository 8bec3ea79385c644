//! Owner-only file and directory helpers.
//!
//! Everything the store writes (secret blobs, keyfile, master record,
//! cache mirror, scratch files) goes through here so permissions are set
//! at creation time rather than patched afterwards.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

/// Create `dir` and any missing parents with mode 0700 on Unix.
pub fn create_private_dir(dir: &Path) -> io::Result<()> {
    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o700);
    }

    builder.create(dir)
}

/// Write `data` to `path` (create or truncate) with mode 0600 on Unix.
pub fn write_private(path: &Path, data: &[u8]) -> io::Result<()> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(path)?;
    file.write_all(data)?;
    file.flush()
}

/// Create a brand-new file with mode 0600, failing if it already exists.
pub fn create_private_new(path: &Path) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    options.write(true).create_new(true);

    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    options.open(path)
}

/// Remove a file, treating "already gone" as success.
pub fn remove_if_exists(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Overwrite a file's contents with zeros, then delete it.
///
/// Best-effort: failures are silently ignored.
pub fn secure_delete(path: &Path) {
    if let Ok(metadata) = fs::metadata(path) {
        let len = usize::try_from(metadata.len()).unwrap_or(0);
        if len > 0 {
            if let Ok(mut file) = fs::OpenOptions::new().write(true).open(path) {
                let zeros = vec![0u8; len];
                let _ = file.write_all(&zeros);
                let _ = file.flush();
            }
        }
    }
    let _ = fs::remove_file(path);
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn write_private_overwrites() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f");
        write_private(&path, b"first").unwrap();
        write_private(&path, b"2").unwrap();
        assert_eq!(fs::read(&path).unwrap(), b"2");
    }

    #[cfg(unix)]
    #[test]
    fn private_modes_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let sub = dir.path().join("a/b");
        create_private_dir(&sub).unwrap();
        let file = sub.join("f");
        write_private(&file, b"x").unwrap();

        let dir_mode = fs::metadata(&sub).unwrap().permissions().mode();
        let file_mode = fs::metadata(&file).unwrap().permissions().mode();
        assert_eq!(dir_mode & 0o777, 0o700);
        assert_eq!(file_mode & 0o777, 0o600);
    }

    #[test]
    fn create_private_new_refuses_existing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f");
        create_private_new(&path).unwrap();
        assert!(create_private_new(&path).is_err());
    }

    #[test]
    fn remove_if_exists_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("f");
        fs::write(&path, b"x").unwrap();
        remove_if_exists(&path).unwrap();
        remove_if_exists(&path).unwrap();
        assert!(!path.exists());
    }

    #[test]
    fn secure_delete_removes_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("scratch");
        fs::write(&path, b"plaintext").unwrap();
        secure_delete(&path);
        assert!(!path.exists());
    }
}
