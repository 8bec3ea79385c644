use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CACHE_DIR_NAME;
use crate::errors::{StrongboxError, Result};
use crate::secure_fs;

/// Store-level configuration, loaded from `<store>/.strongbox.toml`.
///
/// Every field has a sensible default so Strongbox works out-of-the-box
/// without any config file at all.  Environment variables override the
/// file; command-line flags override both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Root directory of the password store.
    #[serde(skip)]
    pub store_dir: PathBuf,

    /// Editor used by `strongbox edit`.
    #[serde(default = "default_editor")]
    pub editor: String,

    /// How long a validated master password stays cached, in minutes.
    #[serde(default = "default_cache_timeout_minutes")]
    pub cache_timeout_minutes: u64,

    /// Remote repository used for sync, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub git_url: Option<String>,

    /// Commit every change automatically when the store is a repository.
    #[serde(default = "default_git_auto_sync")]
    pub git_auto_sync: bool,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_store_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".strongbox")
}

fn default_editor() -> String {
    "vi".to_string()
}

fn default_cache_timeout_minutes() -> u64 {
    5
}

fn default_git_auto_sync() -> bool {
    true
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            editor: default_editor(),
            cache_timeout_minutes: default_cache_timeout_minutes(),
            git_url: None,
            git_auto_sync: default_git_auto_sync(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the store root.
    pub const FILE_NAME: &'static str = ".strongbox.toml";

    /// Resolve settings from defaults, the store's config file and the
    /// process environment.  `store_override` (the `--store` flag) wins
    /// over `STRONGBOX_STORE_DIR`.
    pub fn load(store_override: Option<&Path>) -> Result<Self> {
        let store_dir = match store_override {
            Some(dir) => dir.to_path_buf(),
            None => env_var("STRONGBOX_STORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(default_store_dir),
        };

        let mut settings = Self::load_file(&store_dir)?;
        settings.apply_env(env_var);
        Ok(settings)
    }

    /// Load `<store_dir>/.strongbox.toml`, or defaults if it is absent.
    ///
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load_file(store_dir: &Path) -> Result<Self> {
        let config_path = store_dir.join(Self::FILE_NAME);

        let mut settings = if config_path.exists() {
            let contents = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&contents).map_err(|e| {
                StrongboxError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
            })?
        } else {
            Self::default()
        };

        settings.store_dir = store_dir.to_path_buf();
        Ok(settings)
    }

    /// Apply environment overrides.  Unparsable values are ignored.
    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(editor) = lookup("VISUAL").or_else(|| lookup("EDITOR")) {
            self.editor = editor;
        }

        if let Some(minutes) = lookup("STRONGBOX_CACHE_TIMEOUT").and_then(|v| v.parse::<u64>().ok()) {
            self.cache_timeout_minutes = minutes;
        }

        if let Some(url) = lookup("STRONGBOX_GIT_URL") {
            self.git_url = Some(url);
        }

        if let Some(auto_sync) = lookup("STRONGBOX_GIT_AUTO_SYNC").and_then(|v| parse_bool(&v)) {
            self.git_auto_sync = auto_sync;
        }
    }

    /// Change one or more fields in `<store_dir>/.strongbox.toml`.
    ///
    /// Starts from the file alone, so environment overrides in effect for
    /// this process are never written back.
    pub fn update_file(store_dir: &Path, change: impl FnOnce(&mut Settings)) -> Result<()> {
        let mut settings = Self::load_file(store_dir)?;
        change(&mut settings);
        settings.save()
    }

    /// Persist the file-backed fields to `<store_dir>/.strongbox.toml`.
    pub fn save(&self) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| StrongboxError::SerializationError(format!("settings: {e}")))?;
        secure_fs::write_private(&self.store_dir.join(Self::FILE_NAME), contents.as_bytes())?;
        Ok(())
    }

    /// Cache timeout as a `Duration`.
    pub fn cache_timeout(&self) -> Duration {
        Duration::from_secs(self.cache_timeout_minutes.saturating_mul(60))
    }

    /// Build the explicit configuration handed to the store engine.
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            root: self.store_dir.clone(),
            cache_dir: self.store_dir.join(CACHE_DIR_NAME),
            cache_timeout: self.cache_timeout(),
            auto_sync: self.git_auto_sync,
        }
    }
}

/// Everything a `SecretStore` needs to know about where it lives.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory of the store.
    pub root: PathBuf,
    /// Directory for the credential cache mirror and session file.
    pub cache_dir: PathBuf,
    /// How long a validated master password stays cached.
    pub cache_timeout: Duration,
    /// Commit after every successful write when the store is a repository.
    pub auto_sync: bool,
}

impl StoreConfig {
    /// Configuration rooted at `root` with default cache settings.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            cache_dir: root.join(CACHE_DIR_NAME),
            root,
            cache_timeout: crate::cache::DEFAULT_TIMEOUT,
            auto_sync: true,
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Some(true),
        "0" | "f" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.editor, "vi");
        assert_eq!(s.cache_timeout_minutes, 5);
        assert_eq!(s.cache_timeout(), Duration::from_secs(300));
        assert!(s.git_url.is_none());
        assert!(s.git_auto_sync);
        assert!(s.store_dir.ends_with(".strongbox"));
    }

    #[test]
    fn load_file_returns_defaults_when_absent() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load_file(tmp.path()).unwrap();
        assert_eq!(settings.store_dir, tmp.path());
        assert_eq!(settings.cache_timeout_minutes, 5);
    }

    #[test]
    fn load_file_parses_toml() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
editor = "nano"
cache_timeout_minutes = 15
git_url = "git@example.com:me/passwords.git"
git_auto_sync = false
"#;
        fs::write(tmp.path().join(Settings::FILE_NAME), config).unwrap();

        let settings = Settings::load_file(tmp.path()).unwrap();
        assert_eq!(settings.editor, "nano");
        assert_eq!(settings.cache_timeout_minutes, 15);
        assert_eq!(settings.git_url.as_deref(), Some("git@example.com:me/passwords.git"));
        assert!(!settings.git_auto_sync);
    }

    #[test]
    fn load_file_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(Settings::FILE_NAME), "not valid {{toml").unwrap();
        assert!(Settings::load_file(tmp.path()).is_err());
    }

    #[test]
    fn env_overrides_file_and_ignores_garbage() {
        let env: HashMap<&str, &str> = [
            ("EDITOR", "emacs"),
            ("STRONGBOX_CACHE_TIMEOUT", "not-a-number"),
            ("STRONGBOX_GIT_URL", "https://example.com/p.git"),
            ("STRONGBOX_GIT_AUTO_SYNC", "false"),
        ]
        .into_iter()
        .collect();

        let mut s = Settings::default();
        s.apply_env(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(s.editor, "emacs");
        assert_eq!(s.cache_timeout_minutes, 5);
        assert_eq!(s.git_url.as_deref(), Some("https://example.com/p.git"));
        assert!(!s.git_auto_sync);
    }

    #[test]
    fn visual_wins_over_editor() {
        let mut s = Settings::default();
        s.apply_env(|k| match k {
            "VISUAL" => Some("code --wait".into()),
            "EDITOR" => Some("vim".into()),
            _ => None,
        });
        assert_eq!(s.editor, "code --wait");
    }

    #[test]
    fn save_roundtrips_file_fields() {
        let tmp = TempDir::new().unwrap();
        let mut s = Settings::load_file(tmp.path()).unwrap();
        s.cache_timeout_minutes = 0;
        s.git_url = Some("file:///tmp/remote".into());
        s.save().unwrap();

        let loaded = Settings::load_file(tmp.path()).unwrap();
        assert_eq!(loaded.cache_timeout_minutes, 0);
        assert_eq!(loaded.git_url.as_deref(), Some("file:///tmp/remote"));
    }

    #[test]
    fn update_file_does_not_persist_env_overrides() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(Settings::FILE_NAME), "editor = \"nano\"\n").unwrap();

        let mut effective = Settings::load_file(tmp.path()).unwrap();
        effective.apply_env(|k| match k {
            "EDITOR" => Some("emacs".into()),
            "STRONGBOX_GIT_URL" => Some("https://example.com/p.git".into()),
            _ => None,
        });
        assert_eq!(effective.editor, "emacs");

        Settings::update_file(tmp.path(), |s| s.cache_timeout_minutes = 1).unwrap();

        let saved = Settings::load_file(tmp.path()).unwrap();
        assert_eq!(saved.editor, "nano");
        assert_eq!(saved.cache_timeout_minutes, 1);
        assert!(saved.git_url.is_none());
    }

    #[test]
    fn store_config_points_cache_inside_store() {
        let tmp = TempDir::new().unwrap();
        let s = Settings::load_file(tmp.path()).unwrap();
        let cfg = s.store_config();
        assert_eq!(cfg.root, tmp.path());
        assert_eq!(cfg.cache_dir, tmp.path().join(".cache"));
    }
}
