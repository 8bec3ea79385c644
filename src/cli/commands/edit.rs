//! `strongbox edit`: open a password in an editor.
//!
//! The secret is decrypted to an owner-only scratch file, `$VISUAL` /
//! `$EDITOR` / `vi` is launched on it, and the result is stored only if
//! it changed.  The scratch file is zeroed and deleted afterwards.

use crate::cli::output;
use crate::cli::prompt::{obtain_credential, TerminalPrompt};
use crate::cli::{load_settings, open_store, Cli};
use crate::errors::Result;
use crate::store::paths::canonical_name;
use crate::store::EditOutcome;

/// Execute the `edit` command.
pub fn execute(cli: &Cli, name: &str) -> Result<()> {
    let settings = load_settings(cli)?;
    let store = open_store(&settings)?;

    let credential = obtain_credential(store.cache(), &TerminalPrompt)?;
    match store.edit(name, &credential, &settings.editor)? {
        EditOutcome::Updated => output::success(&format!("Updated {}", canonical_name(name))),
        EditOutcome::Unchanged => output::info("No changes."),
    }
    Ok(())
}
