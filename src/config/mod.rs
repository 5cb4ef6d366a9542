//! Configuration loading and layering.
//!
//! Handles `.keyforge.toml` loading, environment variable resolution,
//! CLI flag merging, and keystore password sourcing.

pub mod loader;
pub mod password;

pub use loader::{Config, ConfigError, KeysConfig, NodeConfig, ToolsConfig};
pub use password::{PasswordError, resolve_password};
