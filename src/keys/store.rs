//! The key-store file handed from the generate phase to the insert phase.
//!
//! One line per generated key: `<scheme>: <secret seed line>`. The file is
//! truncated at the start of every generation pass.

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::models::Scheme;

/// Errors reading or writing the key-store file.
#[derive(Error, Debug)]
pub enum KeyStoreError {
    #[error("failed to write key file {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to read key file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// A scheme-labelled secret-seed line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRecord {
    pub scheme: Scheme,
    pub seed_line: String,
}

impl KeyRecord {
    pub fn to_line(&self) -> String {
        format!("{}: {}", self.scheme, self.seed_line)
    }
}

/// Writes records to a freshly truncated key-store file.
pub struct KeyStoreWriter {
    path: PathBuf,
    out: BufWriter<File>,
    written: usize,
}

impl KeyStoreWriter {
    /// Create or truncate `path`. On Unix the file is owner-only.
    pub fn create(path: &Path) -> Result<Self, KeyStoreError> {
        let mut options = OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        {
            use std::os::unix::fs::OpenOptionsExt;
            options.mode(0o600);
        }
        let file = options.open(path).map_err(|source| KeyStoreError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            out: BufWriter::new(file),
            written: 0,
        })
    }

    /// Append one record and flush it to disk.
    pub fn append(&mut self, record: &KeyRecord) -> Result<(), KeyStoreError> {
        writeln!(self.out, "{}", record.to_line())
            .and_then(|()| self.out.flush())
            .map_err(|source| KeyStoreError::Write {
                path: self.path.clone(),
                source,
            })?;
        self.written += 1;
        Ok(())
    }

    /// Number of records written so far.
    pub fn written(&self) -> usize {
        self.written
    }
}

/// Read every line of the key-store file, in order.
pub fn read_lines(path: &Path) -> Result<Vec<String>, KeyStoreError> {
    let content = std::fs::read_to_string(path).map_err(|source| KeyStoreError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(content.lines().map(str::to_string).collect())
}
