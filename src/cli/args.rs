//! Clap argument types and config overrides.

use clap::{Args, Parser, ValueEnum};
use std::path::PathBuf;

use keyforge::config::Config;
use keyforge::keys::ConflictPolicy;
use keyforge::models::ProvisionReport;

/// Validator key provisioning for Substrate-style nodes.
#[derive(Parser, Debug)]
#[command(
    name = "keyforge",
    version = keyforge::constants::VERSION,
    about = super::ABOUT,
)]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug). `RUST_LOG` overrides.
    #[arg(long, short = 'v', global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress progress output on stderr and the terminal report.
    #[arg(long, short = 'q', global = true, default_value_t = false)]
    pub quiet: bool,

    /// Report format.
    #[arg(long, global = true, default_value = "terminal")]
    pub format: OutputFormat,

    #[command(subcommand)]
    pub command: Command,
}

/// Available commands.
#[derive(clap::Subcommand, Debug)]
pub enum Command {
    /// Build the node, then generate and insert keys for every round.
    Provision(ProvisionArgs),

    /// Run one generation pass and write the key file.
    Generate(RunArgs),

    /// Run one insertion pass against an existing key file.
    Insert(RunArgs),

    /// Check that required tools are available.
    Check(ConfigArgs),

    /// Sort the `[dependencies]` table of a Cargo manifest.
    SortDeps(SortDepsArgs),

    /// Print version and build information.
    Version,
}

/// Config file selection shared by every pipeline command.
#[derive(Args, Debug, Clone, Default)]
pub struct ConfigArgs {
    /// Config file to use instead of `.keyforge.toml` in the working directory.
    #[arg(long)]
    pub config: Option<PathBuf>,
}

/// Options shared by `generate`, `insert` and `provision`.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    #[command(flatten)]
    pub config: ConfigArgs,

    /// Path to the node binary.
    #[arg(long)]
    pub node_binary: Option<String>,

    /// Key file handed from the generate to the insert phase.
    #[arg(long)]
    pub key_file: Option<PathBuf>,

    /// File holding the keystore password (first line).
    #[arg(long)]
    pub password_file: Option<PathBuf>,

    /// How a binding reacts when its first matching key is already used.
    #[arg(long)]
    pub conflict_policy: Option<ConflictPolicy>,

    /// Per-command timeout in seconds.
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl RunArgs {
    /// Apply CLI overrides on top of the loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(ref binary) = self.node_binary {
            config.node.binary = binary.clone();
        }
        if let Some(ref file) = self.key_file {
            config.keys.file = file.clone();
        }
        if let Some(policy) = self.conflict_policy {
            config.keys.conflict_policy = policy;
        }
        if let Some(secs) = self.timeout {
            config.node.command_timeout_secs = Some(secs);
        }
    }
}

/// Arguments for the `provision` subcommand.
#[derive(Args, Debug, Clone, Default)]
pub struct ProvisionArgs {
    #[command(flatten)]
    pub run: RunArgs,

    /// Number of generate→insert rounds.
    #[arg(long)]
    pub rounds: Option<usize>,

    /// Use the existing node binary instead of building it.
    #[arg(long, default_value_t = false)]
    pub skip_build: bool,
}

impl ProvisionArgs {
    pub fn apply(&self, config: &mut Config) {
        self.run.apply(config);
        if let Some(rounds) = self.rounds {
            config.keys.rounds = rounds;
        }
    }
}

/// Arguments for the `sort-deps` subcommand.
#[derive(Args, Debug, Clone)]
pub struct SortDepsArgs {
    /// Manifest to sort.
    #[arg(long, default_value = "Cargo.toml")]
    pub manifest: PathBuf,

    /// Report whether the table is sorted without writing; exit non-zero if not.
    #[arg(long, default_value_t = false)]
    pub check: bool,
}

/// Output format options.
#[derive(Debug, Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum OutputFormat {
    Terminal,
    Json,
}

impl OutputFormat {
    /// Render a report using the renderer for this format.
    pub fn render(&self, report: &ProvisionReport) -> String {
        use keyforge::output::OutputRenderer;
        match self {
            OutputFormat::Terminal => keyforge::output::terminal::TerminalRenderer.render(report),
            OutputFormat::Json => keyforge::output::json::JsonRenderer.render(report),
        }
    }
}
