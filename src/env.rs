//! Environment variable abstraction for testability.
//!
//! Production code uses [`Env::real()`] which delegates to [`std::env::var`].
//! Tests use [`Env::mock()`] backed by a `HashMap`, so tool discovery and
//! password sourcing can be exercised without mutating the process
//! environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Environment variable reader.
///
/// Wraps lookups so that production code hits `std::env` while tests
/// can supply a controlled set of values.
#[derive(Clone, Debug)]
pub struct Env {
    overrides: Option<HashMap<String, String>>,
}

impl Env {
    /// Create an `Env` that reads from the real process environment.
    pub fn real() -> Self {
        Self { overrides: None }
    }

    /// Create an `Env` backed by explicit key-value pairs.
    #[cfg(test)]
    pub fn mock(vars: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>) -> Self {
        Self {
            overrides: Some(
                vars.into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Look up an environment variable by name.
    pub fn var(&self, name: &str) -> Result<String, std::env::VarError> {
        match &self.overrides {
            Some(map) => map.get(name).cloned().ok_or(std::env::VarError::NotPresent),
            None => std::env::var(name),
        }
    }

    /// Look up a variable, treating an empty or whitespace-only value as unset.
    pub fn non_empty(&self, name: &str) -> Option<String> {
        self.var(name).ok().filter(|v| !v.trim().is_empty())
    }

    /// Resolve a program the way a shell would, from the process's
    /// working directory.
    pub fn find_program(&self, name: &str) -> Option<PathBuf> {
        let cwd = std::env::current_dir().ok()?;
        self.find_program_in(name, &cwd)
    }

    /// Resolve a program relative to `cwd`.
    ///
    /// Names containing a path separator are checked against `cwd`; bare
    /// names are searched for on this environment's `PATH`.
    pub fn find_program_in(&self, name: &str, cwd: &Path) -> Option<PathBuf> {
        if name.is_empty() {
            return None;
        }
        which::which_in(name, self.var("PATH").ok(), cwd).ok()
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::real()
    }
}
