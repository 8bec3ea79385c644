//! `strongbox init`: create a new password store.
//!
//! By default a 12-word recovery phrase is generated, the keyfile is
//! derived from it and the phrase is printed once.  `--recover` rebuilds
//! the keyfile from an existing phrase (e.g. on a second device after
//! cloning), and `--hash` creates a store that checks the master password
//! against a stored hash instead.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::prompt::{new_credential, SecretPrompt, TerminalPrompt};
use crate::cli::{load_settings, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::store::SecretStore;
use crate::sync::{GitSync, InitOutcome};

/// Execute the `init` command.
pub fn execute(cli: &Cli, recover: bool, hash: bool, git_url: Option<&str>) -> Result<()> {
    let settings = load_settings(cli)?;
    let config = settings.store_config();
    let prompt = TerminalPrompt;

    if hash {
        let password = new_credential(&prompt)?;
        SecretStore::init_with_master_password(config, &password)?;
        output::success(&format!(
            "Password store initialized at {} (stored-hash mode)",
            settings.store_dir.display()
        ));
    } else if recover {
        let phrase = read_recovery_phrase(&prompt)?;
        SecretStore::init_from_recovery_phrase(config, &phrase)?;
        output::success(&format!(
            "Keyfile restored from recovery phrase at {}",
            settings.store_dir.display()
        ));
    } else {
        let (_store, phrase) = SecretStore::init_new(config)?;
        output::success(&format!(
            "Password store initialized at {}",
            settings.store_dir.display()
        ));
        output::recovery_phrase(&phrase);
    }

    if let Some(url) = git_url {
        let outcome = GitSync::new(&settings.store_dir).initialize_with_remote(Some(url))?;
        Settings::update_file(&settings.store_dir, |s| s.git_url = Some(url.to_string()))?;
        match outcome {
            InitOutcome::Initialized | InitOutcome::Cloned => {
                output::info(&format!("Git sync enabled with remote {url}"));
            }
            InitOutcome::AlreadyInitialized => output::info(&format!("Remote set to {url}")),
        }
    }

    output::tip("Run `strongbox insert <name>` to add your first password.");
    Ok(())
}

/// Read the phrase from piped stdin, or ask for it on a terminal.
fn read_recovery_phrase(prompt: &dyn SecretPrompt) -> Result<Zeroizing<String>> {
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        return Ok(buf);
    }
    prompt.read_line("Recovery phrase (12 words)").map(Zeroizing::new)
}
