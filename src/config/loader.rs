//! Config struct and loading logic.
//!
//! Priority (highest to lowest):
//! 1. CLI flags
//! 2. Environment variables
//! 3. `.keyforge.toml` in the working directory (or `--config PATH`)
//! 4. `~/.config/keyforge/config.toml` (global defaults)
//! 5. Built-in defaults

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::constants;
use crate::env::Env;
use crate::keys::ConflictPolicy;
use crate::models::{self, RoleBinding, Scheme};

/// Errors during config loading.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    ReadFile {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    ParseFile {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub node: NodeConfig,
    pub keys: KeysConfig,
    pub tools: ToolsConfig,
}

/// How to build and invoke the node binary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeConfig {
    /// Path to the node binary, relative to the working directory.
    pub binary: String,
    /// Build invocation as an argv vector.
    pub build_command: Vec<String>,
    /// Directory every external command runs in.
    pub working_dir: Option<PathBuf>,
    /// Per-command time limit. Unset means wait indefinitely.
    pub command_timeout_secs: Option<u64>,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            binary: constants::DEFAULT_NODE_BINARY.to_string(),
            build_command: vec!["cargo".into(), "build".into(), "--release".into()],
            working_dir: None,
            command_timeout_secs: None,
        }
    }
}

/// Key generation and insertion tables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    /// Key-store hand-off file.
    pub file: PathBuf,
    /// Schemes minted per generation pass, in order.
    pub schemes: Vec<Scheme>,
    /// Role bindings in insertion priority order.
    pub bindings: Vec<RoleBinding>,
    /// Generate→insert cycles per provisioning run.
    pub rounds: usize,
    pub conflict_policy: ConflictPolicy,
}

impl Default for KeysConfig {
    fn default() -> Self {
        Self {
            file: PathBuf::from(constants::DEFAULT_KEY_FILE),
            schemes: models::default_schemes(),
            bindings: models::default_bindings(),
            rounds: constants::DEFAULT_ROUNDS,
            conflict_policy: ConflictPolicy::default(),
        }
    }
}

/// Pre-flight tool requirements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    /// Programs that must resolve on `PATH`. The build program is added
    /// automatically unless the build is skipped.
    pub required: Vec<String>,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            required: vec!["cargo".into()],
        }
    }
}

impl Config {
    /// Load configuration with proper layering.
    ///
    /// `explicit` replaces the project-local file and must exist.
    /// Otherwise `.keyforge.toml` is read from `project_dir` when present.
    pub fn load(
        explicit: Option<&Path>,
        project_dir: Option<&Path>,
        env: &Env,
    ) -> Result<Self, ConfigError> {
        let mut config = Config::default();

        // Layer 4: global config
        if let Some(global_path) = Self::global_config_path() {
            if global_path.exists() {
                let global = Self::load_file(&global_path)?;
                config.merge(global);
            }
        }

        // Layer 3: explicit or project-local config
        if let Some(path) = explicit {
            config.merge(Self::load_file(path)?);
        } else if let Some(dir) = project_dir {
            let local_path = dir.join(constants::CONFIG_FILENAME);
            if local_path.exists() {
                config.merge(Self::load_file(&local_path)?);
            }
        }

        // Layer 2: environment variables
        config.apply_env_vars(env);

        Ok(config)
    }

    /// Load a config from a specific file.
    fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadFile {
            path: path.to_path_buf(),
            source: e,
        })?;
        toml::from_str(&content).map_err(|e| ConfigError::ParseFile {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Get the global config file path.
    fn global_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join(constants::CONFIG_DIR).join("config.toml"))
    }

    /// Merge another config into this one (other takes precedence for non-default values).
    fn merge(&mut self, other: Config) {
        let default_node = NodeConfig::default();
        if other.node.binary != default_node.binary {
            self.node.binary = other.node.binary;
        }
        if other.node.build_command != default_node.build_command {
            self.node.build_command = other.node.build_command;
        }
        if other.node.working_dir.is_some() {
            self.node.working_dir = other.node.working_dir;
        }
        if other.node.command_timeout_secs.is_some() {
            self.node.command_timeout_secs = other.node.command_timeout_secs;
        }

        let default_keys = KeysConfig::default();
        if other.keys.file != default_keys.file {
            self.keys.file = other.keys.file;
        }
        if other.keys.schemes != default_keys.schemes {
            self.keys.schemes = other.keys.schemes;
        }
        if other.keys.bindings != default_keys.bindings {
            self.keys.bindings = other.keys.bindings;
        }
        if other.keys.rounds != default_keys.rounds {
            self.keys.rounds = other.keys.rounds;
        }
        if other.keys.conflict_policy != default_keys.conflict_policy {
            self.keys.conflict_policy = other.keys.conflict_policy;
        }

        if other.tools.required != ToolsConfig::default().required {
            self.tools.required = other.tools.required;
        }
    }

    /// Apply environment variable overrides.
    fn apply_env_vars(&mut self, env: &Env) {
        if let Some(val) = env.non_empty(constants::ENV_NODE_BINARY) {
            self.node.binary = val;
        }
        if let Some(val) = env.non_empty(constants::ENV_KEY_FILE) {
            self.keys.file = PathBuf::from(val);
        }
        if let Some(val) = env.non_empty(constants::ENV_ROUNDS) {
            match val.trim().parse::<usize>() {
                Ok(rounds) => self.keys.rounds = rounds,
                Err(_) => eprintln!(
                    "Warning: ignoring invalid {} value: {val}",
                    constants::ENV_ROUNDS
                ),
            }
        }
    }

    /// Reject settings the pipeline cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.node.binary.trim().is_empty() {
            return Err(ConfigError::Invalid("node.binary is empty".into()));
        }
        if self.node.build_command.is_empty() {
            return Err(ConfigError::Invalid("node.build_command is empty".into()));
        }
        if self.keys.rounds == 0 {
            return Err(ConfigError::Invalid("keys.rounds must be at least 1".into()));
        }
        if self.keys.schemes.is_empty() {
            return Err(ConfigError::Invalid("keys.schemes is empty".into()));
        }
        if self.node.command_timeout_secs == Some(0) {
            return Err(ConfigError::Invalid(
                "node.command_timeout_secs must be positive".into(),
            ));
        }
        for binding in &self.keys.bindings {
            if !self.keys.schemes.contains(&binding.scheme) {
                tracing::warn!(
                    %binding,
                    "binding scheme is never generated; it will always be skipped"
                );
            }
        }
        Ok(())
    }

    /// Per-command timeout as a `Duration`.
    pub fn command_timeout(&self) -> Option<Duration> {
        self.node.command_timeout_secs.map(Duration::from_secs)
    }

    /// Resolve a relative path against `node.working_dir`, where every node
    /// command runs. The result is absolute so it stays valid after the
    /// child changes directory.
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        match self.node.working_dir {
            Some(ref dir) if path.is_relative() => {
                let joined = dir.join(path);
                std::path::absolute(&joined).unwrap_or(joined)
            }
            _ => path.to_path_buf(),
        }
    }

    /// The key-store file as seen from this process.
    pub fn key_file_path(&self) -> PathBuf {
        self.resolve_path(&self.keys.file)
    }

    /// The node binary to invoke. Bare names are left for a `PATH` lookup.
    pub fn node_binary_path(&self) -> String {
        let binary = Path::new(&self.node.binary);
        if binary.components().count() > 1 {
            self.resolve_path(binary).to_string_lossy().into_owned()
        } else {
            self.node.binary.clone()
        }
    }
}
