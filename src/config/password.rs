//! Keystore password sourcing.
//!
//! Sources, first match wins: `--password-file`, `KEYFORGE_PASSWORD`,
//! then an interactive prompt when stdin is a terminal. The password is
//! never read from a config file.

use std::io::IsTerminal;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::constants;
use crate::env::Env;
use crate::models::Password;

/// Errors obtaining the keystore password.
#[derive(Error, Debug)]
pub enum PasswordError {
    #[error("failed to read password file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("password from {0} is empty")]
    Empty(String),

    #[error("failed to read password from terminal: {0}")]
    Prompt(std::io::Error),

    #[error(
        "no keystore password available: pass --password-file or set {}",
        constants::ENV_PASSWORD
    )]
    Unavailable,
}

/// Resolve the keystore password.
///
/// `allow_prompt` permits falling back to the terminal; the prompt is only
/// shown when stdin is actually a TTY.
pub fn resolve_password(
    password_file: Option<&Path>,
    env: &Env,
    allow_prompt: bool,
) -> Result<Password, PasswordError> {
    if let Some(path) = password_file {
        let content = std::fs::read_to_string(path).map_err(|source| PasswordError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        let value = content.trim_end_matches(['\r', '\n']);
        return Password::new(value)
            .ok_or_else(|| PasswordError::Empty(path.display().to_string()));
    }

    if let Ok(value) = env.var(constants::ENV_PASSWORD) {
        return Password::new(value)
            .ok_or_else(|| PasswordError::Empty(constants::ENV_PASSWORD.to_string()));
    }

    if allow_prompt && std::io::stdin().is_terminal() {
        let value =
            rpassword::prompt_password(constants::PASSWORD_PROMPT).map_err(PasswordError::Prompt)?;
        return Password::new(value).ok_or_else(|| PasswordError::Empty("prompt".to_string()));
    }

    Err(PasswordError::Unavailable)
}
