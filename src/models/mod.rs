//! Shared types used across all modules.
//!
//! This module defines the signature schemes, keystore roles, secret
//! wrappers and run reports. Other modules import from here rather than
//! reaching into each other's internals.

pub mod report;
pub mod secret;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use report::{GenerateReport, InsertReport, ProvisionReport, RoundReport};
pub use secret::{Password, SecretToken};

/// Signature scheme accepted by the node's `--scheme` flag.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::IntoStaticStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum Scheme {
    Sr25519,
    Ed25519,
    Ecdsa,
}

impl Scheme {
    /// Prefix that marks this scheme's records in the key-store file.
    pub fn record_prefix(self) -> String {
        format!("{self}:")
    }
}

/// A key-type label rejected by [`KeyType::from_str`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("invalid key type '{0}': expected exactly 4 ASCII alphanumeric characters")]
pub struct InvalidKeyType(pub String);

/// Node keystore role, e.g. `babe` or `gran`.
///
/// The node identifies key types by four bytes, so labels are restricted
/// to four ASCII alphanumeric characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyType(String);

impl KeyType {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for KeyType {
    type Err = InvalidKeyType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.len() == 4 && s.chars().all(|c| c.is_ascii_alphanumeric()) {
            Ok(Self(s.to_string()))
        } else {
            Err(InvalidKeyType(s.to_string()))
        }
    }
}

impl TryFrom<String> for KeyType {
    type Error = InvalidKeyType;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<KeyType> for String {
    fn from(value: KeyType) -> Self {
        value.0
    }
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// One row of the role table: which scheme a keystore role requires.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleBinding {
    pub scheme: Scheme,
    pub key_type: KeyType,
}

impl RoleBinding {
    pub fn new(scheme: Scheme, key_type: KeyType) -> Self {
        Self { scheme, key_type }
    }
}

impl fmt::Display for RoleBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.scheme, self.key_type)
    }
}

/// Schemes minted per generation pass: three sr25519 keys and one ed25519 key.
pub fn default_schemes() -> Vec<Scheme> {
    vec![Scheme::Sr25519, Scheme::Sr25519, Scheme::Sr25519, Scheme::Ed25519]
}

/// Role table in insertion priority order.
pub fn default_bindings() -> Vec<RoleBinding> {
    [
        (Scheme::Sr25519, "babe"),
        (Scheme::Ed25519, "gran"),
        (Scheme::Sr25519, "imon"),
        (Scheme::Sr25519, "audi"),
    ]
    .into_iter()
    .map(|(scheme, role)| RoleBinding::new(scheme, KeyType(role.to_string())))
    .collect()
}
