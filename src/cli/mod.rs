//! CLI command definitions and argument parsing.
//!
//! Uses clap derive macros for ergonomic argument definitions.

pub mod args;

/// One-line description shown in `--help`.
pub const ABOUT: &str =
    "Build a node, mint validator keys with it, and load them into its keystore.";

/// Initialise the `tracing` subscriber on stderr.
///
/// `RUST_LOG` wins when set; otherwise `-v` selects `info` and `-vv`
/// selects `debug`. `--quiet` drops to errors only.
pub fn init_tracing(verbose: u8, quiet: bool) {
    use tracing_subscriber::EnvFilter;

    let level = match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "info",
        (false, _) => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
