//! `strongbox remove`: delete a password.

use crate::cli::output;
use crate::cli::prompt::{confirm_or, TerminalPrompt};
use crate::cli::{load_settings, open_store, Cli};
use crate::errors::Result;
use crate::store::paths::canonical_name;

/// Execute the `remove` command.
pub fn execute(cli: &Cli, name: &str, force: bool) -> Result<()> {
    let settings = load_settings(cli)?;
    let store = open_store(&settings)?;
    let display = canonical_name(name);

    // Unless --force is set, ask for confirmation before deleting.
    if !force && !confirm_or(&TerminalPrompt, &format!("Remove {display}?"), false)? {
        output::info("Cancelled.");
        return Ok(());
    }

    store.remove(name)?;
    output::success(&format!("Removed {display}"));
    Ok(())
}
