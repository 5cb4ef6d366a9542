//! Scraping secrets out of the node's human-readable output.
//!
//! The node prints something like:
//!
//! ```text
//! Secret phrase:       bottom drive obey lake curtain smoke basket hold race lonely fit walk
//!   Network ID:        substrate
//!   Secret seed:       0xfac7959dbfe72f052e5a0c3c8d6530f202b02fd8f9f5ca3580ec8deb7797479e
//!   Public key (hex):  0x46ebddef8cd9bb167dc30878d7113b7e168e6f0646beffd77d69d39bad76b47a
//! ```
//!
//! Lines are matched after trimming leading whitespace, and the label
//! comparison ignores ASCII case.

use crate::models::SecretToken;
use crate::models::secret::TOKEN_PREFIX;

/// Label that opens the secret-seed line.
pub const SECRET_SEED_LABEL: &str = "secret seed";

/// Result of looking for the secret-seed line in generate output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedLine<'a> {
    /// The first matching line, trimmed.
    Found(&'a str),
    /// No line carried the label. Callers skip the record.
    NotFound,
}

/// Find the first line that begins with [`SECRET_SEED_LABEL`].
pub fn find_secret_seed_line(output: &str) -> SeedLine<'_> {
    output
        .lines()
        .map(str::trim)
        .find(|line| starts_with_label(line))
        .map_or(SeedLine::NotFound, SeedLine::Found)
}

fn starts_with_label(line: &str) -> bool {
    line.get(..SECRET_SEED_LABEL.len())
        .is_some_and(|head| head.eq_ignore_ascii_case(SECRET_SEED_LABEL))
}

/// First whitespace-delimited `0x…` token in `line`.
pub fn extract_token(line: &str) -> Option<SecretToken> {
    line.split_whitespace()
        .filter(|part| part.starts_with(TOKEN_PREFIX))
        .find_map(SecretToken::new)
}
