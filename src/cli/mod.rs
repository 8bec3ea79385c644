//! CLI surface: argument parser, prompts, output helpers and subcommands.

pub mod commands;
pub mod output;
pub mod prompt;

use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::Settings;
use crate::errors::Result;
use crate::store::{SecretStore, DEFAULT_LENGTH};
use crate::sync::GitSync;

/// Strongbox CLI: a local encrypted password store.
#[derive(Parser)]
#[command(name = "strongbox", about = "Local encrypted password store", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Password store directory (default: ~/.strongbox, or $STRONGBOX_STORE_DIR)
    #[arg(long, global = true)]
    pub store: Option<PathBuf>,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Initialize a new password store
    Init {
        /// Restore access with an existing recovery phrase
        #[arg(long, conflicts_with = "hash")]
        recover: bool,

        /// Use a stored password hash instead of a recovery-phrase keyfile
        #[arg(long)]
        hash: bool,

        /// Put the store under git and track this remote
        #[arg(long)]
        git_url: Option<String>,
    },

    /// Insert a new password (reads stdin when piped)
    #[command(alias = "add")]
    Insert {
        /// Secret name (e.g. email/work)
        name: String,
        /// Overwrite an existing secret
        #[arg(short, long)]
        force: bool,
    },

    /// Show a password
    Show {
        /// Secret name
        name: String,
        /// Copy to the clipboard instead of printing
        #[arg(short, long)]
        clip: bool,
    },

    /// List secrets as a tree
    #[command(alias = "ls")]
    List {
        /// Only list below this folder
        subfolder: Option<String>,
        /// One full name per line
        #[arg(long)]
        flat: bool,
        /// Table with size and modification time
        #[arg(long)]
        details: bool,
        /// Maximum folder depth
        #[arg(long)]
        depth: Option<usize>,
        /// Only names containing this text
        #[arg(long)]
        filter: Option<String>,
    },

    /// Find secrets whose name contains TEXT
    Find {
        text: String,
    },

    /// Remove a password
    #[command(alias = "rm")]
    Remove {
        /// Secret name
        name: String,
        /// Skip confirmation prompt
        #[arg(short, long)]
        force: bool,
    },

    /// Edit a password in $VISUAL / $EDITOR
    Edit {
        /// Secret name
        name: String,
    },

    /// Generate and store a random password
    Generate {
        /// Secret name
        name: String,
        /// Password length
        #[arg(default_value_t = DEFAULT_LENGTH)]
        length: usize,
        /// Letters and digits only
        #[arg(short = 'n', long)]
        no_symbols: bool,
        /// Overwrite an existing secret
        #[arg(short, long)]
        force: bool,
        /// Copy to the clipboard instead of printing
        #[arg(short, long)]
        clip: bool,
    },

    /// Manage the master password cache
    Cache {
        #[command(subcommand)]
        action: CacheAction,
    },

    /// Git synchronization
    Git {
        #[command(subcommand)]
        action: GitAction,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

/// Cache subcommands.
#[derive(clap::Subcommand)]
pub enum CacheAction {
    /// Show whether a password is cached and for how long
    Status,
    /// Forget the cached password
    Clear,
    /// Set the cache timeout in minutes (0 disables caching)
    Timeout { minutes: u64 },
}

/// Git subcommands.
#[derive(clap::Subcommand)]
pub enum GitAction {
    /// Put the store under git, optionally tracking a remote
    Init { url: Option<String> },
    /// Commit pending changes and push
    Push,
    /// Fetch and fast-forward
    Pull,
    /// Show uncommitted changes
    Status,
    /// Pull, commit, then push
    Sync,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve settings for this invocation (`--store` wins over the environment).
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    Settings::load(cli.store.as_deref())
}

/// Open the configured store with git auto-commit attached.
pub fn open_store(settings: &Settings) -> Result<SecretStore> {
    let store = SecretStore::open(settings.store_config())?;
    Ok(store.with_synchronizer(Box::new(GitSync::new(&settings.store_dir))))
}
