//! Generation phase: mint one key per configured scheme.

use std::path::Path;

use colored::Colorize;

use super::parser::{self, SeedLine};
use super::store::{KeyRecord, KeyStoreWriter};
use super::{KeyError, NodeBinary};
use crate::models::report::GeneratedKey;
use crate::models::{GenerateReport, Password, Scheme};
use crate::process::CommandRunner;

/// Drives `key generate` and records the secret-seed lines.
pub struct KeyGenerator<'a> {
    runner: &'a dyn CommandRunner,
    node: &'a NodeBinary,
    quiet: bool,
}

impl<'a> KeyGenerator<'a> {
    pub fn new(runner: &'a dyn CommandRunner, node: &'a NodeBinary) -> Self {
        Self {
            runner,
            node,
            quiet: false,
        }
    }

    /// Suppress skip warnings on stderr. They are still logged.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Run one generation pass.
    ///
    /// Truncates `output_path`, then invokes the node once per entry of
    /// `schemes` (repeats mint independent keys). Output without a secret-seed
    /// line is skipped with a warning rather than failing the pass.
    pub async fn generate(
        &self,
        password: &Password,
        output_path: &Path,
        schemes: &[Scheme],
    ) -> Result<GenerateReport, KeyError> {
        let mut writer = KeyStoreWriter::create(output_path)?;
        let mut report = GenerateReport::default();
        let payload = password.stdin_payload();

        for &scheme in schemes {
            let command = self.node.generate_command(scheme);
            let output = self.runner.run(&command, Some(&payload)).await?;

            match parser::find_secret_seed_line(&output) {
                SeedLine::Found(line) => {
                    writer.append(&KeyRecord {
                        scheme,
                        seed_line: line.to_string(),
                    })?;
                    let fingerprint = parser::extract_token(line).map(|t| t.fingerprint());
                    tracing::info!(%scheme, fingerprint = ?fingerprint, "generated key");
                    report.generated.push(GeneratedKey { scheme, fingerprint });
                }
                SeedLine::NotFound => {
                    if !self.quiet {
                        eprintln!(
                            "  {} no secret seed in {scheme} key output, skipping",
                            "⚠".yellow().bold(),
                        );
                    }
                    tracing::warn!(%scheme, "generate output had no secret seed line");
                    report.skipped.push(scheme);
                }
            }
        }

        tracing::debug!(
            path = %output_path.display(),
            records = writer.written(),
            "key file written"
        );
        Ok(report)
    }
}
