//! Interactive input: master password, new passwords, confirmations.
//!
//! Commands never talk to the terminal directly; they go through the
//! [`SecretPrompt`] trait so tests can script the answers.

use std::io::{self, IsTerminal, Read};

use zeroize::Zeroizing;

use crate::cache::CredentialCache;
use crate::errors::{StrongboxError, Result};

/// Environment variable consulted before any prompt (CI / scripting).
pub const PASSWORD_ENV: &str = "STRONGBOX_PASSWORD";

/// Source of interactive answers.
pub trait SecretPrompt {
    /// Ask for a secret without echoing it.
    fn read_secret(&self, prompt: &str) -> Result<Zeroizing<String>>;

    /// Ask for a secret twice and insist both entries match.
    fn read_new_secret(&self, prompt: &str, confirm: &str) -> Result<Zeroizing<String>>;

    /// Ask a yes/no question.
    fn confirm(&self, prompt: &str, default: bool) -> Result<bool>;

    /// Ask for a visible line of text.
    fn read_line(&self, prompt: &str) -> Result<String>;
}

/// `dialoguer`-backed prompt on the controlling terminal.
pub struct TerminalPrompt;

impl SecretPrompt for TerminalPrompt {
    fn read_secret(&self, prompt: &str) -> Result<Zeroizing<String>> {
        dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map(Zeroizing::new)
            .map_err(|e| StrongboxError::CommandFailed(format!("password prompt: {e}")))
    }

    fn read_new_secret(&self, prompt: &str, confirm: &str) -> Result<Zeroizing<String>> {
        dialoguer::Password::new()
            .with_prompt(prompt)
            .with_confirmation(confirm, "Entries do not match, try again")
            .interact()
            .map(Zeroizing::new)
            .map_err(|e| StrongboxError::CommandFailed(format!("password prompt: {e}")))
    }

    fn confirm(&self, prompt: &str, default: bool) -> Result<bool> {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .map_err(|e| StrongboxError::CommandFailed(format!("confirm prompt: {e}")))
    }

    fn read_line(&self, prompt: &str) -> Result<String> {
        dialoguer::Input::<String>::new()
            .with_prompt(prompt)
            .interact_text()
            .map_err(|e| StrongboxError::CommandFailed(format!("input prompt: {e}")))
    }
}

/// Get the master password, trying in order:
/// 1. `STRONGBOX_PASSWORD`
/// 2. the credential cache
/// 3. an interactive prompt
///
/// Nothing is cached here; the store caches a password once it has
/// proven it.
pub fn obtain_credential(cache: &CredentialCache, prompt: &dyn SecretPrompt) -> Result<Zeroizing<String>> {
    obtain_credential_from(env_password(), cache, prompt)
}

fn obtain_credential_from(
    env: Option<Zeroizing<String>>,
    cache: &CredentialCache,
    prompt: &dyn SecretPrompt,
) -> Result<Zeroizing<String>> {
    if let Some(password) = env {
        return Ok(password);
    }
    if let Some(password) = cache.get() {
        return Ok(password);
    }
    prompt.read_secret("Master password")
}

/// Choose a new master password (stored-hash stores).
///
/// Also respects `STRONGBOX_PASSWORD` for scripted use.
pub fn new_credential(prompt: &dyn SecretPrompt) -> Result<Zeroizing<String>> {
    let password = match env_password() {
        Some(password) => password,
        None => prompt.read_new_secret("Choose master password", "Confirm master password")?,
    };

    check_new_credential(password)
}

fn check_new_credential(password: Zeroizing<String>) -> Result<Zeroizing<String>> {
    if password.is_empty() {
        return Err(StrongboxError::CommandFailed("master password cannot be empty".into()));
    }
    Ok(password)
}

/// Read a secret value from piped stdin, or prompt twice on a terminal.
pub fn secret_value(prompt: &dyn SecretPrompt, name: &str) -> Result<Zeroizing<String>> {
    if !io::stdin().is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        io::stdin().read_to_string(&mut buf)?;
        let trimmed = buf.trim_end_matches(['\r', '\n']).len();
        buf.truncate(trimmed);
        return Ok(buf);
    }
    prompt.read_new_secret(&format!("Enter password for {name}"), &format!("Retype password for {name}"))
}

/// Ask for confirmation unless stdin is not a terminal, in which case
/// `default` is taken.
pub fn confirm_or(prompt: &dyn SecretPrompt, question: &str, default: bool) -> Result<bool> {
    if !io::stdin().is_terminal() {
        return Ok(default);
    }
    prompt.confirm(question, default)
}

fn env_password() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|v| !v.is_empty())
        .map(Zeroizing::new)
}
