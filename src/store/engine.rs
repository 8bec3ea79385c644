//! High-level store operations used by CLI commands.
//!
//! `SecretStore` ties secret naming, the unlock scheme, the blob cipher
//! and the credential cache together so that commands can call
//! `store.insert("email/work", "hunter2", &password)` and be done.
//!
//! Every write first proves the password against the existing secrets
//! (see [`SecretStore::validate_password_if_needed`]) so a mistyped
//! password can never leave a secret encrypted under the wrong key.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, info, warn};
use walkdir::WalkDir;
use zeroize::Zeroizing;

use crate::cache::CredentialCache;
use crate::config::StoreConfig;
use crate::crypto::{self, create_keyfile_from_recovery_phrase, generate_recovery_phrase, MasterRecord};
use crate::errors::{StrongboxError, Result};
use crate::secure_fs;

use super::generate::generate_password;
use super::paths;
use super::scheme::{self, SchemeKind, UnlockScheme, KEYFILE_NAME, MASTER_RECORD_NAME};
use super::Synchronizer;

/// Result of [`SecretStore::edit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EditOutcome {
    /// The editor saved different content; the secret was rewritten.
    Updated,
    /// The content is unchanged; nothing was written.
    Unchanged,
}

/// Handle on an initialized password store.
pub struct SecretStore {
    config: StoreConfig,
    scheme: UnlockScheme,
    cache: CredentialCache,
    sync: Option<Box<dyn Synchronizer>>,
}

impl SecretStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open an existing store.
    pub fn open(config: StoreConfig) -> Result<Self> {
        let scheme = UnlockScheme::detect(&config.root)?;
        let cache = CredentialCache::new(config.cache_dir.clone(), config.cache_timeout);
        debug!(root = %config.root.display(), scheme = ?scheme.kind(), "store opened");

        Ok(Self {
            config,
            scheme,
            cache,
            sync: None,
        })
    }

    /// Initialize a new keyfile store with a freshly generated recovery
    /// phrase.  The phrase is returned exactly once; it is never stored.
    pub fn init_new(config: StoreConfig) -> Result<(Self, Zeroizing<String>)> {
        let phrase = generate_recovery_phrase();
        let store = Self::init_from_recovery_phrase(config, &phrase)?;
        Ok((store, phrase))
    }

    /// Initialize a keyfile store from an existing recovery phrase.
    ///
    /// Used both for brand-new stores and to restore access to a cloned
    /// store whose `.keyfile` was never synced.
    pub fn init_from_recovery_phrase(config: StoreConfig, phrase: &str) -> Result<Self> {
        Self::prepare_root(&config.root)?;
        create_keyfile_from_recovery_phrase(&config.root.join(KEYFILE_NAME), phrase)?;
        info!(root = %config.root.display(), "initialized keyfile store");
        Self::open(config)
    }

    /// Initialize a store that checks the password against a stored
    /// salted hash instead of a keyfile.
    pub fn init_with_master_password(config: StoreConfig, credential: &str) -> Result<Self> {
        Self::prepare_root(&config.root)?;
        MasterRecord::initialize(&config.root.join(MASTER_RECORD_NAME), credential.as_bytes())?;
        info!(root = %config.root.display(), "initialized stored-hash store");
        Self::open(config)
    }

    fn prepare_root(root: &Path) -> Result<()> {
        if scheme::is_initialized(root) {
            return Err(StrongboxError::AlreadyInitialized(root.to_path_buf()));
        }
        secure_fs::create_private_dir(root)?;
        Ok(())
    }

    /// Attach a synchronizer that receives a commit after every write.
    pub fn with_synchronizer(mut self, sync: Box<dyn Synchronizer>) -> Self {
        self.sync = Some(sync);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn root(&self) -> &Path {
        &self.config.root
    }

    pub fn scheme(&self) -> SchemeKind {
        self.scheme.kind()
    }

    pub fn cache(&self) -> &CredentialCache {
        &self.cache
    }

    /// Blob path for `name` (validated).
    pub fn secret_path(&self, name: &str) -> Result<PathBuf> {
        paths::secret_path(&self.config.root, name)
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.secret_path(name)?.is_file())
    }

    // ------------------------------------------------------------------
    // Secret operations
    // ------------------------------------------------------------------

    /// Encrypt and store a new secret.  Fails if it already exists.
    pub fn insert(&self, name: &str, plaintext: &str, credential: &str) -> Result<()> {
        self.write_secret(name, plaintext, credential, false)
            .map_err(|e| e.during("insert", name))
    }

    /// Encrypt and store a secret, overwriting any existing one.
    pub fn update(&self, name: &str, plaintext: &str, credential: &str) -> Result<()> {
        self.write_secret(name, plaintext, credential, true)
            .map_err(|e| e.during("update", name))
    }

    /// Decrypt a secret.
    pub fn show(&self, name: &str, credential: &str) -> Result<Zeroizing<String>> {
        self.read_secret(name, credential)
            .map_err(|e| e.during("show", name))
    }

    /// Delete a secret and prune directories it leaves empty.
    ///
    /// No password is needed: anyone with write access to the store
    /// directory could delete the file anyway.
    pub fn remove(&self, name: &str) -> Result<()> {
        self.remove_secret(name).map_err(|e| e.during("remove", name))
    }

    /// Open a secret in `editor` and store the result if it changed.
    ///
    /// A missing secret starts out empty, so `edit` doubles as `insert`.
    pub fn edit(&self, name: &str, credential: &str, editor: &str) -> Result<EditOutcome> {
        self.edit_secret(name, credential, editor)
            .map_err(|e| e.during("edit", name))
    }

    /// Generate a random password and store it under `name`.
    pub fn generate(
        &self,
        name: &str,
        length: usize,
        symbols: bool,
        credential: &str,
        overwrite: bool,
    ) -> Result<Zeroizing<String>> {
        let password = generate_password(length, symbols)?;
        self.write_secret(name, &password, credential, overwrite)
            .map_err(|e| e.during("generate", name))?;
        Ok(password)
    }

    /// Prove `credential` against the store before a write.
    ///
    /// With a stored hash this is a direct comparison.  With a keyfile,
    /// the first secret (in sorted walk order) is decrypted; an empty
    /// store accepts any password.  Success caches the password.
    pub fn validate_password_if_needed(&self, credential: &str) -> Result<()> {
        self.verify_credential(credential)?;
        self.remember(credential);
        Ok(())
    }

    /// First secret blob in sorted walk order, skipping hidden entries.
    pub fn first_secret(&self) -> Result<Option<PathBuf>> {
        for entry in self.walk_secrets() {
            let entry = entry?;
            if is_secret_entry(&entry) {
                return Ok(Some(entry.into_path()));
            }
        }
        Ok(None)
    }

    /// Names of every secret, in sorted walk order.
    pub fn secret_names(&self) -> Result<Vec<String>> {
        let mut names = Vec::new();
        for entry in self.walk_secrets() {
            let entry = entry?;
            if is_secret_entry(&entry) {
                if let Some(name) = paths::name_from_path(&self.config.root, entry.path()) {
                    names.push(name);
                }
            }
        }
        Ok(names)
    }

    pub fn has_secrets(&self) -> Result<bool> {
        Ok(self.first_secret()?.is_some())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn verify_credential(&self, credential: &str) -> Result<()> {
        self.scheme.check(credential.as_bytes())?;

        if self.scheme.kind() == SchemeKind::StoredHash {
            return Ok(());
        }

        let Some(probe) = self.first_secret()? else {
            debug!("store is empty, accepting password");
            return Ok(());
        };

        let blob = fs::read(&probe)?;
        let key_material = self.scheme.key_material(credential.as_bytes());
        match crypto::decrypt(&blob, &key_material) {
            Ok(mut plaintext) => {
                zeroize::Zeroize::zeroize(&mut plaintext);
                debug!(probe = %probe.display(), "password verified");
                Ok(())
            }
            Err(StrongboxError::AuthenticationFailure) => Err(StrongboxError::IncorrectMasterCredential),
            Err(e) => Err(e),
        }
    }

    fn write_secret(&self, name: &str, plaintext: &str, credential: &str, overwrite: bool) -> Result<()> {
        let path = self.secret_path(name)?;

        self.verify_credential(credential)?;

        if !overwrite && path.exists() {
            return Err(StrongboxError::SecretAlreadyExists(paths::canonical_name(name).to_string()));
        }

        let key_material = self.scheme.key_material(credential.as_bytes());
        let blob = crypto::encrypt(plaintext.as_bytes(), &key_material)?;

        if let Some(parent) = path.parent() {
            secure_fs::create_private_dir(parent)?;
        }
        secure_fs::write_private(&path, &blob)?;
        debug!(path = %path.display(), "secret written");

        self.remember(credential);
        self.auto_commit(&format!("Update {}", paths::canonical_name(name)));
        Ok(())
    }

    fn read_secret(&self, name: &str, credential: &str) -> Result<Zeroizing<String>> {
        let path = self.secret_path(name)?;
        if !path.is_file() {
            return Err(StrongboxError::SecretNotFound(paths::canonical_name(name).to_string()));
        }

        self.scheme.check(credential.as_bytes())?;

        let blob = fs::read(&path)?;
        let key_material = self.scheme.key_material(credential.as_bytes());
        let plaintext = Zeroizing::new(crypto::decrypt(&blob, &key_material)?);

        let text = std::str::from_utf8(&plaintext)
            .map_err(|_| StrongboxError::SerializationError("secret is not valid UTF-8".into()))?;
        let text = Zeroizing::new(text.to_string());

        self.remember(credential);
        Ok(text)
    }

    fn remove_secret(&self, name: &str) -> Result<()> {
        let path = self.secret_path(name)?;
        if !path.is_file() {
            return Err(StrongboxError::SecretNotFound(paths::canonical_name(name).to_string()));
        }

        fs::remove_file(&path)?;
        self.prune_empty_parents(&path);
        debug!(path = %path.display(), "secret removed");

        self.auto_commit(&format!("Remove {}", paths::canonical_name(name)));
        Ok(())
    }

    /// Remove now-empty directories between `path` and the store root.
    fn prune_empty_parents(&self, path: &Path) {
        let root = self.config.root.as_path();
        let mut current = path.parent();

        while let Some(dir) = current {
            if dir == root || !dir.starts_with(root) {
                break;
            }
            let is_empty = fs::read_dir(dir).map(|mut it| it.next().is_none()).unwrap_or(false);
            if !is_empty || fs::remove_dir(dir).is_err() {
                break;
            }
            current = dir.parent();
        }
    }

    fn edit_secret(&self, name: &str, credential: &str, editor: &str) -> Result<EditOutcome> {
        let path = self.secret_path(name)?;

        let current = if path.is_file() {
            self.read_secret(name, credential)?
        } else {
            self.verify_credential(credential)?;
            Zeroizing::new(String::new())
        };

        let scratch = ScratchFile::create(&current)?;
        run_editor(editor, scratch.path())?;

        let mut edited = scratch.read()?;
        if edited.ends_with('\n') {
            edited.pop();
        }

        if *edited == *current {
            debug!("edited content unchanged");
            return Ok(EditOutcome::Unchanged);
        }

        self.write_secret(name, &edited, credential, true)?;
        Ok(EditOutcome::Updated)
    }

    fn walk_secrets(&self) -> impl Iterator<Item = walkdir::Result<walkdir::DirEntry>> {
        WalkDir::new(&self.config.root)
            .min_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| e.depth() == 0 || !is_hidden(e))
    }

    /// Feed a proven password into the cache.  Cache trouble is logged,
    /// never surfaced: the write already succeeded.
    fn remember(&self, credential: &str) {
        if let Err(e) = self.cache.set(credential) {
            warn!(error = %e, "could not cache master password");
        }
    }

    fn auto_commit(&self, message: &str) {
        if !self.config.auto_sync {
            return;
        }
        let Some(sync) = &self.sync else { return };
        if !sync.is_repository() {
            return;
        }
        if let Err(e) = sync.commit(message) {
            warn!(error = %e, "auto-commit failed");
        }
    }
}

fn is_hidden(entry: &walkdir::DirEntry) -> bool {
    entry.file_name().to_string_lossy().starts_with('.')
}

fn is_secret_entry(entry: &walkdir::DirEntry) -> bool {
    entry.file_type().is_file()
        && paths::is_secret_file(&entry.file_name().to_string_lossy())
}

// ----------------------------------------------------------------------
// Editor support
// ----------------------------------------------------------------------

/// Owner-only scratch file for `edit`, wiped and deleted on drop.
struct ScratchFile {
    path: PathBuf,
}

impl ScratchFile {
    fn create(contents: &str) -> Result<Self> {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_nanos())
            .unwrap_or(0);
        let path = std::env::temp_dir().join(format!(
            "strongbox-edit-{}-{nanos}.txt",
            std::process::id()
        ));

        let mut file = secure_fs::create_private_new(&path)
            .map_err(|e| StrongboxError::EditorError(format!("failed to create temp file: {e}")))?;
        let scratch = Self { path };
        file.write_all(contents.as_bytes())
            .and_then(|()| file.flush())
            .map_err(|e| StrongboxError::EditorError(format!("failed to write temp file: {e}")))?;
        Ok(scratch)
    }

    fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Zeroizing<String>> {
        fs::read_to_string(&self.path)
            .map(Zeroizing::new)
            .map_err(|e| StrongboxError::EditorError(format!("failed to read edited file: {e}")))
    }
}

impl Drop for ScratchFile {
    fn drop(&mut self) {
        secure_fs::secure_delete(&self.path);
    }
}

/// Run `editor` (split on whitespace into program and arguments) on `path`.
fn run_editor(editor: &str, path: &Path) -> Result<()> {
    let mut parts = editor.split_whitespace();
    let program = parts
        .next()
        .ok_or_else(|| StrongboxError::EditorError("no editor configured".into()))?;

    let status = Command::new(program)
        .args(parts)
        .arg(path)
        .status()
        .map_err(|e| StrongboxError::EditorError(format!("failed to launch '{program}': {e}")))?;

    if !status.success() {
        return Err(StrongboxError::EditorError(format!(
            "editor exited with code {}",
            status.code().unwrap_or(-1)
        )));
    }
    Ok(())
}
