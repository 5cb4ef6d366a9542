//! Provisioning orchestrator: tool check, node build, and repeated
//! generate→insert rounds.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use colored::Colorize;
use thiserror::Error;

use crate::config::Config;
use crate::env::Env;
use crate::keys::{KeyError, KeyGenerator, KeyInserter, NodeBinary};
use crate::models::{GenerateReport, InsertReport, Password, ProvisionReport, RoundReport};
use crate::process::{self, CommandRunner, CommandSpec, ProcessError};

/// Errors from the orchestrator. All of them end the run.
#[derive(Error, Debug)]
pub enum ProvisionError {
    #[error(transparent)]
    Process(#[from] ProcessError),

    #[error(transparent)]
    Keys(#[from] KeyError),

    #[error("build command is empty")]
    EmptyBuildCommand,
}

/// Runs the provisioning pipeline with a fixed configuration.
pub struct Provisioner {
    runner: Arc<dyn CommandRunner>,
    config: Config,
    env: Env,
    node: NodeBinary,
    key_file: PathBuf,
    /// Skip `cargo build` when the node binary is already in place.
    skip_build: bool,
    quiet: bool,
}

impl Provisioner {
    pub fn new(runner: Arc<dyn CommandRunner>, config: &Config, env: Env) -> Self {
        Self {
            runner,
            node: NodeBinary::new(config.node_binary_path()),
            key_file: config.key_file_path(),
            config: config.clone(),
            env,
            skip_build: false,
            quiet: false,
        }
    }

    /// Suppress phase headers and skip warnings on stderr.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Key-store file the phases write and read.
    pub fn key_file(&self) -> &Path {
        &self.key_file
    }

    fn announce(&self, message: &str) {
        if !self.quiet {
            eprintln!("  {}", message.bold());
        }
    }

    pub fn skip_build(mut self, skip: bool) -> Self {
        self.skip_build = skip;
        self
    }

    /// Tools that must be on `PATH` before anything runs.
    pub fn required_tools(&self) -> Vec<String> {
        let mut tools = self.config.tools.required.clone();
        if !self.skip_build {
            if let Some(program) = self.config.node.build_command.first() {
                if !tools.contains(program) {
                    tools.push(program.clone());
                }
            }
        }
        tools
    }

    /// Fail fast if a required tool is missing.
    pub fn check_tools(&self) -> Result<(), ProvisionError> {
        process::require_tools(&self.required_tools(), &self.env)?;
        Ok(())
    }

    /// Build the node binary.
    pub async fn build(&self) -> Result<(), ProvisionError> {
        let command = CommandSpec::from_argv(&self.config.node.build_command)
            .ok_or(ProvisionError::EmptyBuildCommand)?;
        self.announce(&format!("Building node: {command}"));
        self.runner.run(&command, None).await?;
        Ok(())
    }

    /// One generation pass with the configured scheme list.
    pub async fn generate(&self, password: &Password) -> Result<GenerateReport, ProvisionError> {
        self.announce("Generating keys...");
        let report = KeyGenerator::new(self.runner.as_ref(), &self.node)
            .quiet(self.quiet)
            .generate(password, &self.key_file, &self.config.keys.schemes)
            .await?;
        Ok(report)
    }

    /// One insertion pass with the configured role bindings.
    pub async fn insert(&self, password: &Password) -> Result<InsertReport, ProvisionError> {
        self.announce("Inserting keys...");
        let report = KeyInserter::new(self.runner.as_ref(), &self.node)
            .with_policy(self.config.keys.conflict_policy)
            .quiet(self.quiet)
            .insert(password, &self.key_file, &self.config.keys.bindings)
            .await?;
        Ok(report)
    }

    /// Full run: check tools, build, then `rounds` × (generate, insert).
    ///
    /// Each round truncates the key file, so every insert pass only sees
    /// the batch generated immediately before it.
    pub async fn provision(&self, password: &Password) -> Result<ProvisionReport, ProvisionError> {
        self.check_tools()?;

        let mut report = ProvisionReport::default();
        if !self.skip_build {
            self.build().await?;
            report.built = true;
        }

        for round in 1..=self.config.keys.rounds {
            tracing::info!(round, total = self.config.keys.rounds, "starting round");
            let generate = self.generate(password).await?;
            let insert = self.insert(password).await?;
            report.rounds.push(RoundReport {
                round,
                generate: Some(generate),
                insert: Some(insert),
            });
        }

        Ok(report)
    }
}
