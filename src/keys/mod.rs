//! Key generation and insertion against the node binary.
//!
//! [`generate::KeyGenerator`] mints keys and writes the key-store file;
//! [`insert::KeyInserter`] reads it back and loads each secret into the
//! node keystore under its role.

pub mod generate;
pub mod insert;
pub mod parser;
pub mod store;

use thiserror::Error;

use crate::models::{KeyType, Scheme};
use crate::process::{CommandSpec, ProcessError};

pub use generate::KeyGenerator;
pub use insert::{ConflictPolicy, ConsumedTokens, KeyInserter};

/// Errors from the key pipeline. Both variants are fatal.
#[derive(Error, Debug)]
pub enum KeyError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Store(#[from] store::KeyStoreError),
}

/// Builds the node's `key` subcommand invocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeBinary {
    path: String,
}

impl NodeBinary {
    pub fn new(path: impl Into<String>) -> Self {
        Self { path: path.into() }
    }

    /// `<node> key generate --scheme <scheme> --password-interactive`
    pub fn generate_command(&self, scheme: Scheme) -> CommandSpec {
        let scheme: &'static str = scheme.into();
        CommandSpec::new(
            self.path.clone(),
            [
                "key",
                "generate",
                "--scheme",
                scheme,
                "--password-interactive",
            ],
        )
    }

    /// `<node> key insert --scheme <scheme> --password-interactive --key-type <role>`
    pub fn insert_command(&self, scheme: Scheme, key_type: &KeyType) -> CommandSpec {
        let scheme: &'static str = scheme.into();
        CommandSpec::new(
            self.path.clone(),
            [
                "key",
                "insert",
                "--scheme",
                scheme,
                "--password-interactive",
                "--key-type",
                key_type.as_str(),
            ],
        )
    }
}
