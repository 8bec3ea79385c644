//! Git synchronization for the password store.
//!
//! The store directory doubles as a git working tree.  Only `*.enc` blobs
//! (and the `.gitignore`) are meant to be tracked; the keyfile, master
//! record, settings and cache never leave the device.
//!
//! Pulls are fast-forward only.  Diverged histories are reported and left
//! for the user to resolve with git itself.

pub mod auth;

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use git2::build::{CheckoutBuilder, RepoBuilder};
use git2::{
    Commit, FetchOptions, IndexAddOption, PushOptions, RemoteCallbacks, Repository, Signature, Status,
    StatusOptions,
};
use tracing::{debug, info, warn};

use crate::errors::{StrongboxError, Result};
use crate::secure_fs;
use crate::store::Synchronizer;

pub use auth::SyncAuth;

/// Name of the remote used for push and pull.
pub const REMOTE: &str = "origin";

/// Paths that must never be committed.
const IGNORED: &[&str] = &[
    ".cache/",
    ".keyfile",
    ".master",
    ".strongbox.toml",
    ".DS_Store",
    "*.tmp",
    "*.swp",
    "*~",
];

/// Give up after this many credential challenges in one operation.
const MAX_AUTH_ATTEMPTS: usize = 3;

/// What `initialize_with_remote` ended up doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InitOutcome {
    /// The store directory was empty and the remote was cloned into it.
    Cloned,
    /// A new repository was created; remote history (if any) was adopted.
    Initialized,
    /// The store was already a repository; only `origin` was updated.
    AlreadyInitialized,
}

/// Result of a pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PullOutcome {
    UpToDate,
    FastForwarded,
}

/// Kind of change reported by [`GitSync::status`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Added,
    Modified,
    Deleted,
    Renamed,
}

impl std::fmt::Display for ChangeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            Self::Added => "added",
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Renamed => "renamed",
        };
        f.write_str(label)
    }
}

/// One uncommitted change.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusEntry {
    pub path: String,
    pub kind: ChangeKind,
}

/// Git operations on one store directory.
pub struct GitSync {
    root: PathBuf,
}

impl GitSync {
    /// Operate on the store at `root`.  Credentials are detected from the
    /// `origin` URL when first needed.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns `true` if the store directory is a git repository.
    pub fn is_repository(&self) -> bool {
        Repository::open(&self.root).is_ok()
    }

    fn repo(&self) -> Result<Repository> {
        Repository::open(&self.root).map_err(|_| {
            StrongboxError::Sync(format!(
                "{} is not a git repository (run `strongbox git init`)",
                self.root.display()
            ))
        })
    }

    /// URL of `origin`, if configured.
    pub fn remote_url(&self) -> Option<String> {
        let repo = Repository::open(&self.root).ok()?;
        let remote = repo.find_remote(REMOTE).ok()?;
        remote.url().map(str::to_string)
    }

    // ------------------------------------------------------------------
    // Setup
    // ------------------------------------------------------------------

    /// Put the store under version control, optionally tracking `url`.
    ///
    /// An empty or missing store directory is cloned from `url`.  Otherwise
    /// a repository is created in place, `origin` is configured, and any
    /// history the remote already has is adopted before the initial commit.
    /// If a remote file would replace a local one, nothing is adopted and
    /// the new repository is removed again.
    pub fn initialize_with_remote(&self, url: Option<&str>) -> Result<InitOutcome> {
        if let Ok(repo) = Repository::open(&self.root) {
            if let Some(url) = url {
                set_origin(&repo, url)?;
            }
            self.ensure_gitignore()?;
            return Ok(InitOutcome::AlreadyInitialized);
        }

        if let Some(url) = url {
            if dir_is_empty(&self.root) {
                self.clone_from(url)?;
                self.ensure_gitignore()?;
                self.commit("Add .gitignore")?;
                info!(url, "cloned password store");
                return Ok(InitOutcome::Cloned);
            }
        }

        secure_fs::create_private_dir(&self.root)?;
        let repo = Repository::init(&self.root)?;
        if let Some(url) = url {
            set_origin(&repo, url)?;
            // Remote history goes in before our .gitignore so the two never collide.
            if let Err(e) = self.pull() {
                drop(repo);
                if let Err(cleanup) = fs::remove_dir_all(self.root.join(".git")) {
                    warn!(error = %cleanup, "could not remove half-initialized repository");
                }
                return Err(e);
            }
        }
        self.ensure_gitignore()?;
        self.commit("Initialize password store")?;
        info!(root = %self.root.display(), "initialized git repository");
        Ok(InitOutcome::Initialized)
    }

    fn clone_from(&self, url: &str) -> Result<()> {
        if let Some(parent) = self.root.parent() {
            secure_fs::create_private_dir(parent)?;
        }
        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks(SyncAuth::detect(url)));
        RepoBuilder::new().fetch_options(fetch).clone(url, &self.root)?;
        Ok(())
    }

    /// Make sure `.gitignore` lists every private store file, keeping any
    /// lines the user added, and untrack those files if they were
    /// committed before.
    pub fn ensure_gitignore(&self) -> Result<()> {
        let path = self.root.join(".gitignore");
        let existing = fs::read_to_string(&path).unwrap_or_default();

        let missing: Vec<&str> = IGNORED
            .iter()
            .copied()
            .filter(|pattern| !existing.lines().any(|line| line.trim() == *pattern))
            .collect();

        if !missing.is_empty() {
            let mut contents = existing.clone();
            if !contents.is_empty() && !contents.ends_with('\n') {
                contents.push('\n');
            }
            if existing.is_empty() {
                contents.push_str("# Private strongbox files, never synced\n");
            }
            for pattern in missing {
                contents.push_str(pattern);
                contents.push('\n');
            }
            fs::write(&path, contents)?;
            debug!(path = %path.display(), "updated .gitignore");
        }

        if let Ok(repo) = Repository::open(&self.root) {
            let mut index = repo.index()?;
            let private = [".cache", ".keyfile", ".master", ".strongbox.toml"];
            index.remove_all(private.iter(), None)?;
            index.write()?;
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Local history
    // ------------------------------------------------------------------

    /// Stage every non-ignored change (including deletions) and commit.
    ///
    /// Returns `false` without committing when the tree is unchanged.
    pub fn commit(&self, message: &str) -> Result<bool> {
        let repo = self.repo()?;
        let mut index = repo.index()?;
        index.add_all(["*"].iter(), IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"].iter(), None)?;
        index.write()?;

        let tree_id = index.write_tree()?;
        let parent = head_commit(&repo);
        if parent.as_ref().is_some_and(|p| p.tree_id() == tree_id) {
            debug!("nothing to commit");
            return Ok(false);
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = signature(&repo)?;
        let parents: Vec<&Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        debug!(%oid, msg = message, "committed");
        Ok(true)
    }

    /// Uncommitted changes, ignoring private files.
    pub fn status(&self) -> Result<Vec<StatusEntry>> {
        let repo = self.repo()?;
        let mut options = StatusOptions::new();
        options.include_untracked(true).recurse_untracked_dirs(true);

        let statuses = repo.statuses(Some(&mut options))?;
        let mut entries = Vec::new();
        for entry in statuses.iter() {
            let Some(path) = entry.path() else { continue };
            if let Some(kind) = change_kind(entry.status()) {
                entries.push(StatusEntry {
                    path: path.to_string(),
                    kind,
                });
            }
        }
        Ok(entries)
    }

    // ------------------------------------------------------------------
    // Remote
    // ------------------------------------------------------------------

    /// Push the current branch to `origin`.
    pub fn push(&self) -> Result<()> {
        let repo = self.repo()?;
        if head_commit(&repo).is_none() {
            return Err(StrongboxError::Sync("nothing to push: no commits yet".into()));
        }
        let branch_ref = head_ref_name(&repo)?;
        let mut remote = find_origin(&repo)?;

        let rejected = RefCell::new(None);
        let mut cbs = callbacks(auth_for(&remote));
        cbs.push_update_reference(|refname, status| {
            if let Some(message) = status {
                *rejected.borrow_mut() = Some(format!("{refname}: {message}"));
            }
            Ok(())
        });

        let mut options = PushOptions::new();
        options.remote_callbacks(cbs);
        remote.push(&[format!("{branch_ref}:{branch_ref}")], Some(&mut options))?;

        if let Some(reason) = rejected.take() {
            return Err(StrongboxError::Sync(format!("push rejected: {reason}")));
        }
        info!(branch = %branch_ref, "pushed");
        Ok(())
    }

    /// Fetch `origin` and fast-forward the current branch.
    pub fn pull(&self) -> Result<PullOutcome> {
        let repo = self.repo()?;
        let mut remote = find_origin(&repo)?;

        let mut fetch = FetchOptions::new();
        fetch.remote_callbacks(callbacks(auth_for(&remote)));
        remote.fetch(&[] as &[&str], Some(&mut fetch), None)?;

        let mut branch_ref = head_ref_name(&repo)?;
        let branch = branch_ref.trim_start_matches("refs/heads/").to_string();
        let upstream = match repo.find_reference(&format!("refs/remotes/{REMOTE}/{branch}")) {
            Ok(upstream) => upstream,
            // A fresh repository adopts whichever default branch the remote has.
            Err(_) if head_commit(&repo).is_none() => {
                let found = ["main", "master"].iter().find_map(|name| {
                    repo.find_reference(&format!("refs/remotes/{REMOTE}/{name}"))
                        .ok()
                        .map(|r| (*name, r))
                });
                match found {
                    Some((name, upstream)) => {
                        branch_ref = format!("refs/heads/{name}");
                        upstream
                    }
                    None => return Ok(PullOutcome::UpToDate),
                }
            }
            Err(_) => return Ok(PullOutcome::UpToDate),
        };

        let upstream_commit = repo.reference_to_annotated_commit(&upstream)?;
        let (analysis, _) = repo.merge_analysis(&[&upstream_commit])?;

        if analysis.is_up_to_date() {
            return Ok(PullOutcome::UpToDate);
        }

        let unborn = analysis.is_unborn() || head_commit(&repo).is_none();
        if !unborn && !analysis.is_fast_forward() {
            return Err(StrongboxError::Sync(
                "local and remote histories have diverged; resolve with git manually".into(),
            ));
        }

        // Update the working tree first: a conflict leaves refs untouched.
        let target = repo.find_commit(upstream_commit.id())?;
        let mut checkout = CheckoutBuilder::new();
        checkout.safe();
        repo.checkout_tree(target.as_object(), Some(&mut checkout))
            .map_err(checkout_error)?;

        if unborn {
            repo.reference(&branch_ref, target.id(), true, "strongbox: adopt remote history")?;
        } else {
            let mut reference = repo.find_reference(&branch_ref)?;
            reference.set_target(target.id(), "strongbox: fast-forward")?;
        }
        repo.set_head(&branch_ref)?;
        info!(branch = %branch_ref, "fast-forwarded");
        Ok(PullOutcome::FastForwarded)
    }
}

impl Synchronizer for GitSync {
    fn is_repository(&self) -> bool {
        GitSync::is_repository(self)
    }

    fn commit(&self, message: &str) -> Result<()> {
        GitSync::commit(self, message).map(|_| ())
    }
}

fn callbacks<'a>(auth: SyncAuth) -> RemoteCallbacks<'a> {
    let mut callbacks = RemoteCallbacks::new();
    let mut attempts = 0;
    callbacks.credentials(move |_url, username_from_url, allowed| {
        attempts += 1;
        if attempts > MAX_AUTH_ATTEMPTS {
            return Err(git2::Error::from_str("authentication failed"));
        }
        auth.credentials(username_from_url, allowed)
    });
    callbacks
}

fn checkout_error(e: git2::Error) -> StrongboxError {
    if e.code() == git2::ErrorCode::Conflict {
        StrongboxError::Sync(format!(
            "remote changes would overwrite local files ({}); nothing was changed",
            e.message()
        ))
    } else {
        e.into()
    }
}

fn auth_for(remote: &git2::Remote<'_>) -> SyncAuth {
    remote.url().map(SyncAuth::detect).unwrap_or(SyncAuth::None)
}

fn set_origin(repo: &Repository, url: &str) -> Result<()> {
    if repo.find_remote(REMOTE).is_ok() {
        repo.remote_set_url(REMOTE, url)?;
    } else {
        repo.remote(REMOTE, url)?;
    }
    Ok(())
}

fn find_origin(repo: &Repository) -> Result<git2::Remote<'_>> {
    repo.find_remote(REMOTE).map_err(|_| {
        StrongboxError::Sync(format!(
            "no '{REMOTE}' remote configured (run `strongbox git init <url>`)"
        ))
    })
}

fn head_commit(repo: &Repository) -> Option<Commit<'_>> {
    repo.head().ok()?.peel_to_commit().ok()
}

/// Full name of the branch HEAD points at, even before the first commit.
fn head_ref_name(repo: &Repository) -> Result<String> {
    let head = repo.find_reference("HEAD")?;
    head.symbolic_target()
        .map(str::to_string)
        .ok_or_else(|| StrongboxError::Sync("HEAD is detached".into()))
}

fn signature(repo: &Repository) -> Result<Signature<'static>> {
    match repo.signature() {
        Ok(sig) => Ok(sig.to_owned()),
        Err(_) => Ok(Signature::now("Strongbox", "strongbox@localhost")?),
    }
}

fn change_kind(status: Status) -> Option<ChangeKind> {
    if status.intersects(Status::WT_NEW | Status::INDEX_NEW) {
        Some(ChangeKind::Added)
    } else if status.intersects(Status::WT_DELETED | Status::INDEX_DELETED) {
        Some(ChangeKind::Deleted)
    } else if status.intersects(Status::WT_RENAMED | Status::INDEX_RENAMED) {
        Some(ChangeKind::Renamed)
    } else if status.intersects(Status::WT_MODIFIED | Status::INDEX_MODIFIED | Status::WT_TYPECHANGE | Status::INDEX_TYPECHANGE) {
        Some(ChangeKind::Modified)
    } else {
        None
    }
}

fn dir_is_empty(dir: &Path) -> bool {
    match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_none(),
        Err(_) => !dir.exists(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn local_repo() -> (TempDir, GitSync) {
        let dir = TempDir::new().unwrap();
        let sync = GitSync::new(dir.path().join("store"));
        sync.initialize_with_remote(None).unwrap();
        (dir, sync)
    }

    #[test]
    fn plain_directory_is_not_a_repository() {
        let dir = TempDir::new().unwrap();
        let sync = GitSync::new(dir.path());
        assert!(!sync.is_repository());
        assert!(matches!(sync.commit("x"), Err(StrongboxError::Sync(_))));
    }

    #[test]
    fn init_creates_repository_with_gitignore_commit() {
        let (_dir, sync) = local_repo();
        assert!(sync.is_repository());
        let ignore = fs::read_to_string(sync.root().join(".gitignore")).unwrap();
        for pattern in IGNORED {
            assert!(ignore.lines().any(|l| l == *pattern), "{pattern} missing");
        }
        assert!(sync.status().unwrap().is_empty());
        assert_eq!(
            sync.initialize_with_remote(None).unwrap(),
            InitOutcome::AlreadyInitialized
        );
    }

    #[test]
    fn commit_skips_private_files_and_unchanged_trees() {
        let (_dir, sync) = local_repo();
        fs::write(sync.root().join(".keyfile"), b"k").unwrap();
        fs::write(sync.root().join("a.enc"), b"blob").unwrap();

        let status = sync.status().unwrap();
        assert_eq!(
            status,
            vec![StatusEntry {
                path: "a.enc".into(),
                kind: ChangeKind::Added
            }]
        );

        assert!(sync.commit("Add a").unwrap());
        assert!(!sync.commit("Nothing").unwrap());

        let repo = Repository::open(sync.root()).unwrap();
        let tree = head_commit(&repo).unwrap().tree().unwrap();
        assert!(tree.get_name("a.enc").is_some());
        assert!(tree.get_name(".keyfile").is_none());
    }

    #[test]
    fn commit_records_deletions() {
        let (_dir, sync) = local_repo();
        fs::write(sync.root().join("a.enc"), b"blob").unwrap();
        sync.commit("Add a").unwrap();
        fs::remove_file(sync.root().join("a.enc")).unwrap();

        assert_eq!(sync.status().unwrap()[0].kind, ChangeKind::Deleted);
        assert!(sync.commit("Remove a").unwrap());
        assert!(sync.status().unwrap().is_empty());
    }

    #[test]
    fn gitignore_keeps_user_lines() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "notes/").unwrap();
        GitSync::new(dir.path()).ensure_gitignore().unwrap();

        let ignore = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert!(ignore.starts_with("notes/\n"));
        assert_eq!(ignore.matches(".keyfile").count(), 1);

        GitSync::new(dir.path()).ensure_gitignore().unwrap();
        let again = fs::read_to_string(dir.path().join(".gitignore")).unwrap();
        assert_eq!(ignore, again);
    }

    #[test]
    fn push_and_pull_through_a_bare_remote() {
        let dir = TempDir::new().unwrap();
        let remote_path = dir.path().join("remote.git");
        Repository::init_bare(&remote_path).unwrap();
        let url = remote_path.to_string_lossy().into_owned();

        // First device: fresh store, push.
        let first = GitSync::new(dir.path().join("first"));
        assert_eq!(
            first.initialize_with_remote(Some(&url)).unwrap(),
            InitOutcome::Cloned
        );
        fs::write(first.root().join("a.enc"), b"blob-a").unwrap();
        first.commit("Add a").unwrap();
        first.push().unwrap();

        // Second device: already has a keyfile, adopts remote history.
        let second_root = dir.path().join("second");
        fs::create_dir_all(&second_root).unwrap();
        fs::write(second_root.join(".keyfile"), b"k").unwrap();
        let second = GitSync::new(&second_root);
        assert_eq!(
            second.initialize_with_remote(Some(&url)).unwrap(),
            InitOutcome::Initialized
        );
        assert_eq!(fs::read(second_root.join("a.enc")).unwrap(), b"blob-a");
        assert!(second_root.join(".keyfile").exists());

        // Changes flow back to the first device.
        fs::write(second_root.join("b.enc"), b"blob-b").unwrap();
        second.commit("Add b").unwrap();
        second.push().unwrap();
        assert_eq!(first.pull().unwrap(), PullOutcome::FastForwarded);
        assert_eq!(fs::read(first.root().join("b.enc")).unwrap(), b"blob-b");
        assert_eq!(first.pull().unwrap(), PullOutcome::UpToDate);
    }

    #[test]
    fn diverged_histories_are_reported() {
        let dir = TempDir::new().unwrap();
        let remote_path = dir.path().join("remote.git");
        Repository::init_bare(&remote_path).unwrap();
        let url = remote_path.to_string_lossy().into_owned();

        let first = GitSync::new(dir.path().join("first"));
        first.initialize_with_remote(Some(&url)).unwrap();
        first.push().unwrap();

        let second = GitSync::new(dir.path().join("second"));
        second.initialize_with_remote(Some(&url)).unwrap();

        fs::write(first.root().join("a.enc"), b"a").unwrap();
        first.commit("Add a").unwrap();
        first.push().unwrap();

        fs::write(second.root().join("b.enc"), b"b").unwrap();
        second.commit("Add b").unwrap();

        assert!(matches!(second.pull(), Err(StrongboxError::Sync(_))));
    }

    fn bare_remote_with(dir: &TempDir, files: &[(&str, &[u8])]) -> String {
        let remote_path = dir.path().join("remote.git");
        Repository::init_bare(&remote_path).unwrap();
        let url = remote_path.to_string_lossy().into_owned();

        let seed = GitSync::new(dir.path().join("seed"));
        seed.initialize_with_remote(Some(&url)).unwrap();
        for (name, contents) in files {
            fs::write(seed.root().join(name), contents).unwrap();
        }
        seed.commit("Seed").unwrap();
        seed.push().unwrap();
        url
    }

    #[test]
    fn init_in_place_never_overwrites_local_secrets() {
        let dir = TempDir::new().unwrap();
        let url = bare_remote_with(&dir, &[("a.enc", b"REMOTE")]);

        let local = dir.path().join("local");
        fs::create_dir_all(&local).unwrap();
        fs::write(local.join(".keyfile"), b"k").unwrap();
        fs::write(local.join("a.enc"), b"LOCAL").unwrap();

        let sync = GitSync::new(&local);
        let err = sync.initialize_with_remote(Some(&url)).unwrap_err();
        assert!(matches!(err, StrongboxError::Sync(_)), "got {err}");

        assert_eq!(fs::read(local.join("a.enc")).unwrap(), b"LOCAL");
        assert!(local.join(".keyfile").exists());
        assert!(!sync.is_repository(), "half-initialized repository left behind");
    }

    #[test]
    fn init_in_place_keeps_unrelated_local_secrets() {
        let dir = TempDir::new().unwrap();
        let url = bare_remote_with(&dir, &[("a.enc", b"REMOTE")]);

        let local = dir.path().join("local");
        fs::create_dir_all(&local).unwrap();
        fs::write(local.join("b.enc"), b"LOCAL").unwrap();

        let sync = GitSync::new(&local);
        assert_eq!(
            sync.initialize_with_remote(Some(&url)).unwrap(),
            InitOutcome::Initialized
        );
        assert_eq!(fs::read(local.join("a.enc")).unwrap(), b"REMOTE");
        assert_eq!(fs::read(local.join("b.enc")).unwrap(), b"LOCAL");
        assert!(sync.status().unwrap().is_empty());
    }

    #[test]
    fn pull_keeps_uncommitted_local_edits() {
        let dir = TempDir::new().unwrap();
        let url = bare_remote_with(&dir, &[("a.enc", b"v1")]);

        let first = GitSync::new(dir.path().join("first"));
        first.initialize_with_remote(Some(&url)).unwrap();
        let second = GitSync::new(dir.path().join("second"));
        second.initialize_with_remote(Some(&url)).unwrap();

        fs::write(first.root().join("a.enc"), b"v2").unwrap();
        first.commit("Update a").unwrap();
        first.push().unwrap();

        fs::write(second.root().join("a.enc"), b"local edit").unwrap();
        assert!(matches!(second.pull(), Err(StrongboxError::Sync(_))));
        assert_eq!(fs::read(second.root().join("a.enc")).unwrap(), b"local edit");
    }

    #[test]
    fn push_without_remote_fails() {
        let (_dir, sync) = local_repo();
        assert!(matches!(sync.push(), Err(StrongboxError::Sync(_))));
    }
}
