//! `strongbox cache`: inspect and control the master password cache.

use std::time::Duration;

use crate::cache::CredentialCache;
use crate::cli::output::{self, format_duration};
use crate::cli::{load_settings, Cli, CacheAction};
use crate::config::Settings;
use crate::errors::Result;

/// Execute a `cache` subcommand.
pub fn execute(cli: &Cli, action: &CacheAction) -> Result<()> {
    let settings = load_settings(cli)?;
    let config = settings.store_config();
    let cache = CredentialCache::new(config.cache_dir, config.cache_timeout);

    match action {
        CacheAction::Status => {
            if cache.get().is_some() {
                output::info(&format!(
                    "Master password cached, expires in {}",
                    format_duration(cache.remaining_time())
                ));
            } else {
                output::info("No master password cached.");
            }
            if cache.timeout().is_zero() {
                output::tip("Caching is disabled (timeout 0).");
            } else {
                output::tip(&format!("Cache timeout: {}", format_duration(cache.timeout())));
            }
        }
        CacheAction::Clear => {
            cache.clear();
            output::success("Cache cleared.");
        }
        CacheAction::Timeout { minutes } => {
            Settings::update_file(&settings.store_dir, |s| s.cache_timeout_minutes = *minutes)?;
            cache.set_timeout(Duration::from_secs(minutes.saturating_mul(60)));
            if cache.timeout().is_zero() {
                cache.clear();
                output::success("Caching disabled.");
            } else {
                output::success(&format!("Cache timeout set to {minutes} minute(s)."));
            }
        }
    }
    Ok(())
}
