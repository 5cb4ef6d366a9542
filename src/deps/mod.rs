//! Cargo manifest `[dependencies]` sorting.
//!
//! Groups dependencies by the lowercase first character of their name and
//! orders the groups alphabetically. Within a group the original order is
//! kept, so the sort is stable and idempotent.
//!
//! Only the body of the `[dependencies]` section is rewritten, one
//! `name = <inline value>` line per entry; the rest of the manifest is
//! left as-is. Comments inside the section are not preserved.

use std::path::{Path, PathBuf};

use thiserror::Error;
use toml::{Table, Value};

/// Header of the section being sorted.
const SECTION_HEADER: &str = "[dependencies]";

/// Errors from reading, parsing or writing a manifest.
#[derive(Error, Debug)]
pub enum DepsError {
    #[error("failed to read manifest {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("failed to write manifest {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("{0}: `[dependencies.<name>]` sub-sections are not supported, use inline tables")]
    DottedSections(PathBuf),
}

/// Outcome of sorting one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SortOutcome {
    /// Whether the dependency order changed.
    pub changed: bool,
    /// Number of entries in the dependency table.
    pub entries: usize,
}

fn group_key(name: &str) -> Option<char> {
    name.chars().next().and_then(|c| c.to_lowercase().next())
}

/// Dependency names in sorted order.
pub fn sorted_names(table: &Table) -> Vec<&str> {
    let mut names: Vec<&str> = table.keys().map(String::as_str).collect();
    names.sort_by_key(|name| group_key(name));
    names
}

fn render_key(name: &str) -> String {
    let bare = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if bare {
        name.to_string()
    } else {
        Value::String(name.to_string()).to_string()
    }
}

fn is_header(line: &str) -> bool {
    line.trim_start().starts_with('[')
}

/// Sort the `[dependencies]` section of manifest `content`.
///
/// Returns the rewritten manifest when the order changed, or `None` when
/// it was already sorted or has no dependency section.
pub fn sort_manifest_str(
    content: &str,
    path: &Path,
) -> Result<(Option<String>, SortOutcome), DepsError> {
    let doc: Table = toml::from_str(content).map_err(|source| DepsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    let unchanged = |entries: usize| -> Result<(Option<String>, SortOutcome), DepsError> {
        Ok((None, SortOutcome { changed: false, entries }))
    };

    let Some(Value::Table(deps)) = doc.get("dependencies") else {
        return unchanged(0);
    };
    let entries = deps.len();
    let sorted = sorted_names(deps);
    if deps.keys().map(String::as_str).eq(sorted.iter().copied()) {
        return unchanged(entries);
    }
    if content
        .lines()
        .any(|line| line.trim_start().starts_with("[dependencies."))
    {
        return Err(DepsError::DottedSections(path.to_path_buf()));
    }

    let lines: Vec<&str> = content.lines().collect();
    let Some(header) = lines
        .iter()
        .position(|line| line.trim_start().starts_with(SECTION_HEADER))
    else {
        // Declared via a dotted key elsewhere; nothing safe to rewrite.
        return unchanged(entries);
    };
    let body_end = lines[header + 1..]
        .iter()
        .position(|line| is_header(line))
        .map_or(lines.len(), |offset| header + 1 + offset);

    let mut out: Vec<String> = lines[..=header].iter().map(|l| l.to_string()).collect();
    for name in &sorted {
        if let Some(value) = deps.get(*name) {
            out.push(format!("{} = {}", render_key(name), value));
        }
    }
    if body_end < lines.len() {
        out.push(String::new());
    }
    out.extend(lines[body_end..].iter().map(|l| l.to_string()));

    let mut rewritten = out.join("\n");
    if content.ends_with('\n') {
        rewritten.push('\n');
    }
    Ok((Some(rewritten), SortOutcome { changed: true, entries }))
}

/// Sort the manifest at `path`. With `check_only`, nothing is written.
pub fn sort_manifest_file(path: &Path, check_only: bool) -> Result<SortOutcome, DepsError> {
    let content = std::fs::read_to_string(path).map_err(|source| DepsError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let (sorted, outcome) = sort_manifest_str(&content, path)?;
    if let (Some(sorted), false) = (sorted, check_only) {
        std::fs::write(path, sorted).map_err(|source| DepsError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        tracing::info!(path = %path.display(), "dependencies reordered");
    }
    Ok(outcome)
}
