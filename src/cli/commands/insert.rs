//! `strongbox insert`: add a new password.

use crate::cli::output;
use crate::cli::prompt::{obtain_credential, secret_value, TerminalPrompt};
use crate::cli::{load_settings, open_store, Cli};
use crate::errors::{StrongboxError, Result};
use crate::store::paths::canonical_name;

/// Execute the `insert` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let store = open_store(&settings)?;
    let prompt = TerminalPrompt;

    // Fail before asking for anything.
    if !force && store.exists(name)? {
        return Err(StrongboxError::SecretAlreadyExists(canonical_name(name).to_string()));
    }

    let value = secret_value(&prompt, name)?;
    let credential = obtain_credential(store.cache(), &prompt)?;

    if force {
        store.update(name, &value, &credential)?;
    } else {
        store.insert(name, &value, &credential)?;
    }

    output::success(&format!("Saved {}", canonical_name(name)));
    Ok(())
}
