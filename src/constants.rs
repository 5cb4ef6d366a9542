//! App-wide constants.
//!
//! Centralises the tool name, config paths, environment variable names,
//! and the node's default provisioning layout so a rename only requires
//! changing this file.

/// Display name of the tool (lowercase).
pub const APP_NAME: &str = "keyforge";

/// Crate version, baked in at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Target triple the binary was compiled for (set by `build.rs`).
pub const TARGET: &str = env!("TARGET");

/// Local config filename (e.g. `.keyforge.toml` in the working directory).
pub const CONFIG_FILENAME: &str = ".keyforge.toml";

/// Directory name under `~/.config/` for global config.
pub const CONFIG_DIR: &str = "keyforge";

// ── Node layout defaults ────────────────────────────────────────────

/// Release binary produced by `cargo build --release` in the node workspace.
pub const DEFAULT_NODE_BINARY: &str = "./target/release/argochain";

/// Hand-off file between the generate and insert phases.
pub const DEFAULT_KEY_FILE: &str = "keys.txt";

/// Number of generate→insert cycles per provisioning run.
pub const DEFAULT_ROUNDS: usize = 2;

/// Prompt shown when the keystore password is read from the terminal.
pub const PASSWORD_PROMPT: &str = "Keystore password: ";

// ── Environment variable names ──────────────────────────────────────

pub const ENV_PASSWORD: &str = "KEYFORGE_PASSWORD";
pub const ENV_NODE_BINARY: &str = "KEYFORGE_NODE_BINARY";
pub const ENV_KEY_FILE: &str = "KEYFORGE_KEY_FILE";
pub const ENV_ROUNDS: &str = "KEYFORGE_ROUNDS";
