//! Credential selection for git remotes.
//!
//! The method is chosen once per remote URL by [`SyncAuth::detect`]:
//! - ssh URLs (`git@host:…`, `ssh://…`) use the first default key in
//!   `~/.ssh`, falling back to the ssh agent;
//! - http(s) URLs use `STRONGBOX_GIT_USERNAME` / `STRONGBOX_GIT_PASSWORD`,
//!   then a matching `~/.netrc` entry;
//! - anything else (local paths, `file://`) needs no credentials.

use std::fs;
use std::path::{Path, PathBuf};

use git2::{Cred, CredentialType};
use tracing::debug;

/// Default ssh private keys, in preference order.
const SSH_KEY_NAMES: &[&str] = &["id_ed25519", "id_ecdsa", "id_rsa"];

/// How to authenticate against a remote.
#[derive(Clone, PartialEq, Eq)]
pub enum SyncAuth {
    SshAgent,
    SshKeyFile(PathBuf),
    Basic { username: String, password: String },
    None,
}

impl std::fmt::Debug for SyncAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::SshAgent => write!(f, "SshAgent"),
            Self::SshKeyFile(path) => f.debug_tuple("SshKeyFile").field(path).finish(),
            Self::Basic { username, .. } => f
                .debug_struct("Basic")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
            Self::None => write!(f, "None"),
        }
    }
}

impl SyncAuth {
    /// Pick an authentication method for `url` from the process
    /// environment and the user's home directory.
    pub fn detect(url: &str) -> Self {
        let home = dirs::home_dir();
        Self::detect_with(url, home.as_deref(), |key| {
            std::env::var(key).ok().filter(|v| !v.is_empty())
        })
    }

    /// Same as [`SyncAuth::detect`] with injectable home and environment.
    pub fn detect_with(url: &str, home: Option<&Path>, env: impl Fn(&str) -> Option<String>) -> Self {
        let auth = if is_ssh_url(url) {
            home.and_then(default_ssh_key)
                .map(Self::SshKeyFile)
                .unwrap_or(Self::SshAgent)
        } else if is_http_url(url) {
            match (env("STRONGBOX_GIT_USERNAME"), env("STRONGBOX_GIT_PASSWORD")) {
                (Some(username), Some(password)) => Self::Basic { username, password },
                _ => home
                    .and_then(|h| fs::read_to_string(h.join(".netrc")).ok())
                    .and_then(|contents| {
                        let host = host_of(url)?;
                        lookup_netrc(&parse_netrc(&contents), &host)
                    })
                    .map(|entry| Self::Basic {
                        username: entry.login,
                        password: entry.password,
                    })
                    .unwrap_or(Self::None),
            }
        } else {
            Self::None
        };

        debug!(?auth, "selected git authentication");
        auth
    }

    /// Produce a libgit2 credential for a transport challenge.
    pub fn credentials(
        &self,
        username_from_url: Option<&str>,
        allowed: CredentialType,
    ) -> Result<Cred, git2::Error> {
        let user = username_from_url.unwrap_or("git");
        match self {
            Self::SshAgent if allowed.contains(CredentialType::SSH_KEY) => Cred::ssh_key_from_agent(user),
            Self::SshKeyFile(path) if allowed.contains(CredentialType::SSH_KEY) => {
                Cred::ssh_key(user, None, path, None)
            }
            Self::Basic { username, password } if allowed.contains(CredentialType::USER_PASS_PLAINTEXT) => {
                Cred::userpass_plaintext(username, password)
            }
            _ if allowed.contains(CredentialType::USERNAME) => Cred::username(user),
            _ if allowed.contains(CredentialType::DEFAULT) => Cred::default(),
            _ => Err(git2::Error::from_str("no usable credentials for this remote")),
        }
    }
}

fn is_ssh_url(url: &str) -> bool {
    if url.starts_with("ssh://") || url.starts_with("git+ssh://") {
        return true;
    }
    // scp-like syntax: user@host:path
    !url.contains("://") && url.contains('@') && url.contains(':')
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

fn default_ssh_key(home: &Path) -> Option<PathBuf> {
    SSH_KEY_NAMES
        .iter()
        .map(|name| home.join(".ssh").join(name))
        .find(|path| path.is_file())
}

/// Host part of an http(s) URL, without credentials or port.
fn host_of(url: &str) -> Option<String> {
    let rest = url.split_once("://")?.1;
    let authority = rest.split('/').next()?;
    let host_port = authority.rsplit_once('@').map_or(authority, |(_, h)| h);
    let host = host_port.split(':').next()?;
    (!host.is_empty()).then(|| host.to_string())
}

/// One `machine` (or `default`) block of a `.netrc` file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetrcEntry {
    /// `None` for the `default` block.
    pub machine: Option<String>,
    pub login: String,
    pub password: String,
}

/// Parse `.netrc` contents.  Tokens may span lines; `#` starts a comment.
pub fn parse_netrc(contents: &str) -> Vec<NetrcEntry> {
    let mut entries = Vec::new();
    let mut current: Option<NetrcEntry> = None;

    let mut tokens = contents
        .lines()
        .map(|line| line.split('#').next().unwrap_or(""))
        .flat_map(str::split_whitespace);

    while let Some(token) = tokens.next() {
        match token {
            "machine" | "default" => {
                entries.extend(current.take());
                let machine = if token == "machine" {
                    tokens.next().map(str::to_string)
                } else {
                    None
                };
                current = Some(NetrcEntry {
                    machine,
                    login: String::new(),
                    password: String::new(),
                });
            }
            "login" => {
                if let (Some(entry), Some(value)) = (current.as_mut(), tokens.next()) {
                    entry.login = value.to_string();
                }
            }
            "password" => {
                if let (Some(entry), Some(value)) = (current.as_mut(), tokens.next()) {
                    entry.password = value.to_string();
                }
            }
            "account" | "macdef" => {
                tokens.next();
            }
            _ => {}
        }
    }
    entries.extend(current);
    entries
}

/// Entry for `host`, falling back to the `default` block.
fn lookup_netrc(entries: &[NetrcEntry], host: &str) -> Option<NetrcEntry> {
    entries
        .iter()
        .find(|e| e.machine.as_deref() == Some(host))
        .or_else(|| entries.iter().find(|e| e.machine.is_none()))
        .filter(|e| !e.login.is_empty() && !e.password.is_empty())
        .cloned()
}
