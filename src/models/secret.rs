//! Wrappers for secret material that must never reach logs.

use std::fmt;

use sha2::{Digest, Sha256};

/// Prefix of the hex token embedded in a secret-seed line.
pub const TOKEN_PREFIX: &str = "0x";

/// Number of hex characters shown in a token fingerprint.
const FINGERPRINT_LEN: usize = 12;

/// Keystore password fed to the node's interactive prompts.
#[derive(Clone, PartialEq, Eq)]
pub struct Password(String);

impl Password {
    /// Wrap a password, rejecting empty values.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let value = value.into();
        if value.is_empty() { None } else { Some(Self(value)) }
    }

    /// Stdin payload emulating interactive entry (password plus newline).
    pub fn stdin_payload(&self) -> String {
        format!("{}\n", self.0)
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}

/// The `0x`-prefixed secret seed extracted from node output.
///
/// Deduplication compares tokens by value; display and debug output only
/// ever show a SHA-256 fingerprint.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct SecretToken(String);

impl SecretToken {
    /// Wrap a token. Returns `None` unless it carries the `0x` prefix and
    /// at least one character after it.
    pub fn new(value: &str) -> Option<Self> {
        (value.starts_with(TOKEN_PREFIX) && value.len() > TOKEN_PREFIX.len())
            .then(|| Self(value.to_string()))
    }

    /// Short, stable, non-reversible identifier for operator output.
    pub fn fingerprint(&self) -> String {
        let digest = hex::encode(Sha256::digest(self.0.as_bytes()));
        digest[..FINGERPRINT_LEN].to_string()
    }

    /// The raw token text.
    #[cfg(test)]
    pub(crate) fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for SecretToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretToken({})", self.fingerprint())
    }
}
