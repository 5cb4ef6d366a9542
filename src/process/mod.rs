//! External command invocation.
//!
//! Every interaction with the build tool and the node binary goes through
//! the [`CommandRunner`] trait. [`SystemRunner`] shells out via
//! `tokio::process::Command`; tests substitute a recording mock.

use std::fmt;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use colored::Colorize;
use regex::Regex;
use thiserror::Error;
use tokio::io::AsyncWriteExt;

use crate::env::Env;

/// Hex runs long enough to be key material.
static SECRET_HEX_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"0x[0-9a-fA-F]{16,}").unwrap());

/// Errors from running external commands.
#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("{0} is not installed or not found in PATH")]
    MissingTool(String),

    #[error("failed to run `{command}`: {source}")]
    Spawn {
        command: String,
        source: std::io::Error,
    },

    #[error("`{command}` failed ({status}): {stderr}")]
    Failed {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("`{command}` timed out after {secs}s")]
    TimedOut { command: String, secs: u64 },
}

/// A program plus its arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandSpec {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandSpec {
    pub fn new(
        program: impl Into<String>,
        args: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }

    /// Split a `["program", "arg", ...]` vector. Returns `None` when empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        let (program, args) = argv.split_first()?;
        Some(Self::new(program.clone(), args.iter().cloned()))
    }
}

impl fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Runs a command to completion and returns its trimmed stdout.
///
/// Implementations must treat a non-zero exit as [`ProcessError::Failed`].
#[async_trait]
pub trait CommandRunner: Send + Sync {
    async fn run(&self, command: &CommandSpec, input: Option<&str>) -> Result<String, ProcessError>;
}

/// Runs commands as real child processes.
#[derive(Debug, Clone, Default)]
pub struct SystemRunner {
    /// Working directory for every command (defaults to the current one).
    working_dir: Option<PathBuf>,
    /// Upper bound on a single command's run time.
    timeout: Option<Duration>,
    /// Suppress the per-command status line.
    quiet: bool,
}

impl SystemRunner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    fn report_status(&self, command: &CommandSpec, ok: bool) {
        if self.quiet {
            return;
        }
        if ok {
            eprintln!("  {} {} {}", "✔".green().bold(), "ran".dimmed(), command);
        } else {
            eprintln!("  {} {} {}", "✖".red().bold(), "failed".red(), command);
        }
    }

    async fn execute(
        &self,
        command: &CommandSpec,
        input: Option<&str>,
    ) -> Result<String, ProcessError> {
        let display = command.to_string();
        let spawn_err = |source| ProcessError::Spawn {
            command: display.clone(),
            source,
        };

        let mut cmd = tokio::process::Command::new(&command.program);
        cmd.args(&command.args)
            .stdin(if input.is_some() { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(ref dir) = self.working_dir {
            cmd.current_dir(dir);
        }

        let mut child = cmd.spawn().map_err(spawn_err)?;
        tracing::debug!(%command, "spawned");

        if let (Some(payload), Some(mut stdin)) = (input, child.stdin.take()) {
            // A child that exits without reading stdin closes the pipe early;
            // its exit status is what decides success.
            match stdin.write_all(payload.as_bytes()).await {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::BrokenPipe => {}
                Err(e) => return Err(spawn_err(e)),
            }
        }

        let wait = child.wait_with_output();
        let output = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| ProcessError::TimedOut {
                    command: display.clone(),
                    secs: limit.as_secs(),
                })?,
            None => wait.await,
        }
        .map_err(spawn_err)?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ProcessError::Failed {
                command: display,
                status: output.status.to_string(),
                stderr: redact_secrets(stderr.trim()),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

#[async_trait]
impl CommandRunner for SystemRunner {
    async fn run(&self, command: &CommandSpec, input: Option<&str>) -> Result<String, ProcessError> {
        let result = self.execute(command, input).await;
        self.report_status(command, result.is_ok());
        result
    }
}

/// Replace long `0x` hex runs with a placeholder.
pub fn redact_secrets(text: &str) -> String {
    SECRET_HEX_RE.replace_all(text, "0x[REDACTED]").into_owned()
}

/// Whether `name` resolves to an executable on this machine.
pub fn command_exists(name: &str, env: &Env) -> bool {
    env.find_program(name).is_some()
}

/// Fail with [`ProcessError::MissingTool`] for the first absent tool.
pub fn require_tools<S: AsRef<str>>(names: &[S], env: &Env) -> Result<(), ProcessError> {
    for name in names {
        let name = name.as_ref();
        if !command_exists(name, env) {
            return Err(ProcessError::MissingTool(name.to_string()));
        }
        tracing::debug!(tool = name, "found required tool");
    }
    Ok(())
}
