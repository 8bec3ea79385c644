//! `strongbox list` / `strongbox find`: show what is in the store.
//!
//! Listing reads only file names, so no password is needed.

use crate::cli::output;
use crate::cli::{load_settings, Cli};
use crate::errors::{StrongboxError, Result};
use crate::list::{self, ListOptions};
use crate::store::paths::{canonical_name, validate_secret_name};
use crate::store::scheme::is_initialized;

/// Execute the `list` command.
pub fn execute(cli: &Cli, subfolder: Option<&str>, opts: &ListOptions) -> Result<()> {
    let settings = load_settings(cli)?;
    let root = &settings.store_dir;
    if !is_initialized(root) {
        return Err(StrongboxError::NotInitialized(root.clone()));
    }

    let (dir, title) = match subfolder.map(|s| s.trim_end_matches('/')) {
        Some(sub) if !sub.is_empty() => {
            validate_secret_name(sub)?;
            (root.join(canonical_name(sub)), sub.to_string())
        }
        _ => (root.clone(), "Password Store".to_string()),
    };

    match list::render(&dir, &title, opts)? {
        Some(rendered) => print!("{rendered}"),
        None if opts.filter.is_some() => output::info("No matching secrets."),
        None => {
            output::info("No secrets in this store yet.");
            output::tip("Run `strongbox insert <name>` to add your first password.");
        }
    }
    Ok(())
}

/// Execute the `find` command: a flat, filtered listing.
pub fn find(cli: &Cli, text: &str) -> Result<()> {
    let opts = ListOptions {
        flat: true,
        filter: Some(text.to_string()),
        ..ListOptions::default()
    };
    execute(cli, None, &opts)
}
