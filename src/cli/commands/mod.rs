//! One module per subcommand.  Each exposes an `execute` function that
//! `main` dispatches to.

pub mod cache_cmd;
pub mod completions;
pub mod edit;
pub mod generate;
pub mod git_cmd;
pub mod init;
pub mod insert;
pub mod list;
pub mod remove;
pub mod show;

use crate::cli::output;
use crate::errors::{StrongboxError, Result};

/// Copy `text` to the system clipboard.
pub(crate) fn copy_to_clipboard(text: &str, name: &str) -> Result<()> {
    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| StrongboxError::CommandFailed(format!("clipboard unavailable: {e}")))?;
    clipboard
        .set_text(text)
        .map_err(|e| StrongboxError::CommandFailed(format!("failed to copy to clipboard: {e}")))?;
    output::success(&format!("Copied {name} to clipboard"));
    Ok(())
}
