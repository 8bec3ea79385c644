//! `strongbox completions <shell>`: print a completion script.
//!
//!   strongbox completions bash > ~/.local/share/bash-completion/completions/strongbox
//!   strongbox completions zsh > "${fpath[1]}/_strongbox"

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::Shell;

use crate::cli::Cli;
use crate::errors::Result;

pub fn execute(shell: Shell) -> Result<()> {
    write_script(shell, &mut io::stdout().lock())?;
    Ok(())
}

/// Render the script for `shell` into `out`, covering every subcommand
/// and alias of the current CLI definition.
fn write_script(shell: Shell, out: &mut dyn Write) -> io::Result<()> {
    let mut cmd = Cli::command();
    let bin = cmd.get_name().to_string();
    clap_complete::generate(shell, &mut cmd, bin, out);
    out.flush()
}
