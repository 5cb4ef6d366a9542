//! Insertion phase: load generated secrets into the node keystore.
//!
//! Each role binding takes the first unconsumed token of its scheme, in
//! key-file order. A token is never handed to two bindings within one pass.

use std::path::Path;

use colored::Colorize;
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};

use super::parser;
use super::store;
use super::{KeyError, NodeBinary};
use crate::models::report::InsertedKey;
use crate::models::{InsertReport, Password, RoleBinding, Scheme, SecretToken};
use crate::process::CommandRunner;

/// What to do when the first key line of a scheme is already consumed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum ConflictPolicy {
    /// Keep scanning for a later unconsumed line of the same scheme.
    #[default]
    Advance,
    /// Give up on the binding at the first matching line.
    FirstMatchOnly,
}

/// Tokens already inserted during the current pass, in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ConsumedTokens(IndexSet<SecretToken>);

impl ConsumedTokens {
    pub fn contains(&self, token: &SecretToken) -> bool {
        self.0.contains(token)
    }

    /// Mark a token consumed. Returns `false` if it already was.
    pub fn consume(&mut self, token: SecretToken) -> bool {
        self.0.insert(token)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SecretToken> {
        self.0.iter()
    }
}

/// Pick the token a binding of `scheme` should receive.
///
/// Scans `lines` top to bottom for lines labelled with `scheme`. Under
/// [`ConflictPolicy::FirstMatchOnly`] only the first such line is
/// considered.
pub fn select_token(
    lines: &[String],
    scheme: Scheme,
    consumed: &ConsumedTokens,
    policy: ConflictPolicy,
) -> Option<SecretToken> {
    let prefix = scheme.record_prefix();
    let mut candidates = lines
        .iter()
        .filter(|line| line.starts_with(&prefix))
        .map(|line| parser::extract_token(line));

    match policy {
        ConflictPolicy::Advance => candidates
            .flatten()
            .find(|token| !consumed.contains(token)),
        ConflictPolicy::FirstMatchOnly => candidates
            .next()
            .flatten()
            .filter(|token| !consumed.contains(token)),
    }
}

/// Drives `key insert` for each role binding.
pub struct KeyInserter<'a> {
    runner: &'a dyn CommandRunner,
    node: &'a NodeBinary,
    policy: ConflictPolicy,
    quiet: bool,
}

impl<'a> KeyInserter<'a> {
    pub fn new(runner: &'a dyn CommandRunner, node: &'a NodeBinary) -> Self {
        Self {
            runner,
            node,
            policy: ConflictPolicy::default(),
            quiet: false,
        }
    }

    /// Suppress skip warnings on stderr. They are still logged.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    pub fn with_policy(mut self, policy: ConflictPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run one insertion pass against the key-store file at `key_store_path`.
    pub async fn insert(
        &self,
        password: &Password,
        key_store_path: &Path,
        bindings: &[RoleBinding],
    ) -> Result<InsertReport, KeyError> {
        let lines = store::read_lines(key_store_path)?;
        let (report, consumed) = self
            .insert_lines(password, &lines, bindings, ConsumedTokens::default())
            .await?;
        tracing::debug!(consumed = consumed.len(), "insert pass complete");
        Ok(report)
    }

    /// Insert from already-loaded key lines, threading the consumed set
    /// through explicitly.
    ///
    /// A failing insert command aborts the pass; keys inserted before it
    /// stay in the node keystore.
    pub async fn insert_lines(
        &self,
        password: &Password,
        lines: &[String],
        bindings: &[RoleBinding],
        mut consumed: ConsumedTokens,
    ) -> Result<(InsertReport, ConsumedTokens), KeyError> {
        let mut report = InsertReport::default();
        let payload = password.stdin_payload();

        for binding in bindings {
            let Some(token) = select_token(lines, binding.scheme, &consumed, self.policy) else {
                if !self.quiet {
                    eprintln!(
                        "  {} no unused {} key for {}, skipping",
                        "⚠".yellow().bold(),
                        binding.scheme,
                        binding.key_type.to_string().bold(),
                    );
                }
                tracing::warn!(%binding, "no matching key to insert");
                report.skipped.push(binding.clone());
                continue;
            };

            let fingerprint = token.fingerprint();
            consumed.consume(token);
            tracing::info!(%binding, %fingerprint, "inserting key");

            let command = self.node.insert_command(binding.scheme, &binding.key_type);
            self.runner.run(&command, Some(&payload)).await?;

            report.inserted.push(InsertedKey {
                scheme: binding.scheme,
                key_type: binding.key_type.clone(),
                fingerprint,
            });
        }

        Ok((report, consumed))
    }
}
