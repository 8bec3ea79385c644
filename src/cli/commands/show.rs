//! `strongbox show`: decrypt and print (or copy) a password.

use crate::cli::commands::copy_to_clipboard;
use crate::cli::prompt::{obtain_credential, TerminalPrompt};
use crate::cli::{load_settings, open_store, Cli};
use crate::errors::Result;
use crate::store::paths::canonical_name;

/// Execute the `show` command.
pub fn execute(cli: &Cli, name: &str, clip: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let store = open_store(&settings)?;

    let credential = obtain_credential(store.cache(), &TerminalPrompt)?;
    let value = store.show(name, &credential)?;

    if clip {
        copy_to_clipboard(&value, canonical_name(name))?;
    } else {
        println!("{}", value.as_str());
    }
    Ok(())
}
