//! `strongbox git`: synchronize the store through a git remote.

use crate::cli::output;
use crate::cli::{load_settings, Cli, GitAction};
use crate::config::Settings;
use crate::errors::{StrongboxError, Result};
use crate::store::scheme::is_initialized;
use crate::sync::{GitSync, InitOutcome, PullOutcome};

/// Execute a `git` subcommand.
pub fn execute(cli: &Cli, action: &GitAction) -> Result<()> {
    let settings = load_settings(cli)?;
    let sync = GitSync::new(&settings.store_dir);

    if let GitAction::Init { url } = action {
        let url = url.as_deref().or(settings.git_url.as_deref()).map(str::to_string);
        let outcome = sync.initialize_with_remote(url.as_deref())?;

        match outcome {
            InitOutcome::Cloned => output::success("Password store cloned."),
            InitOutcome::Initialized => output::success("Git repository initialized."),
            InitOutcome::AlreadyInitialized => output::info("Already a git repository."),
        }

        if let Some(url) = url {
            if is_initialized(&settings.store_dir) {
                Settings::update_file(&settings.store_dir, |s| s.git_url = Some(url))?;
            }
        }
        if !is_initialized(&settings.store_dir) {
            output::tip("Run `strongbox init --recover` to restore access with your recovery phrase.");
        }
        return Ok(());
    }

    if !sync.is_repository() {
        return Err(StrongboxError::Sync(
            "git is not enabled for this store (run `strongbox git init [url]`)".into(),
        ));
    }

    match action {
        GitAction::Init { .. } => {}
        GitAction::Status => {
            output::print_changes(&sync.status()?);
            if let Some(url) = sync.remote_url() {
                output::tip(&format!("Remote: {url}"));
            }
        }
        GitAction::Push => {
            if sync.commit("Update password store")? {
                output::info("Committed local changes.");
            }
            sync.push()?;
            output::success("Changes pushed.");
        }
        GitAction::Pull => report_pull(sync.pull()?),
        GitAction::Sync => {
            if sync.commit("Sync password store")? {
                output::info("Committed local changes.");
            }
            report_pull(sync.pull()?);
            sync.push()?;
            output::success("Synchronization complete.");
        }
    }
    Ok(())
}

fn report_pull(outcome: PullOutcome) {
    match outcome {
        PullOutcome::UpToDate => output::info("Already up to date."),
        PullOutcome::FastForwarded => output::success("Pulled remote changes."),
    }
}
