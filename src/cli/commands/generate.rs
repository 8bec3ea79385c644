//! `strongbox generate`: create, store and print a random password.

use crate::cli::commands::copy_to_clipboard;
use crate::cli::output;
use crate::cli::prompt::{obtain_credential, TerminalPrompt};
use crate::cli::{load_settings, open_store, Cli};
use crate::errors::{StrongboxError, Result};
use crate::store::paths::canonical_name;

/// Execute the `generate` command.
pub fn execute(cli: &Cli, name: &str, length: usize, symbols: bool, force: bool, clip: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let store = open_store(&settings)?;
    let display = canonical_name(name);

    if !force && store.exists(name)? {
        return Err(StrongboxError::SecretAlreadyExists(display.to_string()));
    }

    let credential = obtain_credential(store.cache(), &TerminalPrompt)?;
    let password = store.generate(name, length, symbols, &credential, force)?;

    if clip {
        copy_to_clipboard(&password, display)?;
    } else {
        output::success(&format!("Generated password for {display}:"));
        println!("{}", password.as_str());
    }
    Ok(())
}
