//! Outcome records for generate, insert and full provisioning runs.
//!
//! Reports carry token fingerprints, never the tokens themselves, so they
//! can be printed or serialized freely.

use serde::Serialize;

use super::{KeyType, RoleBinding, Scheme};

/// A key written to the key-store file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GeneratedKey {
    pub scheme: Scheme,
    /// Fingerprint of the extracted token, when the seed line carried one.
    pub fingerprint: Option<String>,
}

/// Result of one generation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct GenerateReport {
    /// Records written, in file order.
    pub generated: Vec<GeneratedKey>,
    /// Schemes whose output had no secret-seed line.
    pub skipped: Vec<Scheme>,
}

/// A key loaded into the node keystore.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InsertedKey {
    pub scheme: Scheme,
    pub key_type: KeyType,
    pub fingerprint: String,
}

/// Result of one insertion pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct InsertReport {
    /// Bindings that received a key, in binding order.
    pub inserted: Vec<InsertedKey>,
    /// Bindings left without a key because no unconsumed token matched.
    pub skipped: Vec<RoleBinding>,
}

/// One generate→insert cycle. Standalone phases fill only one side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RoundReport {
    pub round: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generate: Option<GenerateReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert: Option<InsertReport>,
}

/// Summary of a provisioning run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProvisionReport {
    /// Whether the node binary was built during this run.
    pub built: bool,
    pub rounds: Vec<RoundReport>,
}

impl ProvisionReport {
    /// Total keys inserted across all rounds.
    pub fn inserted_count(&self) -> usize {
        self.rounds
            .iter()
            .filter_map(|r| r.insert.as_ref())
            .map(|i| i.inserted.len())
            .sum()
    }

    /// Total non-fatal skips (missing seed lines plus unmatched bindings).
    pub fn skipped_count(&self) -> usize {
        self.rounds
            .iter()
            .map(|r| {
                r.generate.as_ref().map_or(0, |g| g.skipped.len())
                    + r.insert.as_ref().map_or(0, |i| i.skipped.len())
            })
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counts_sum_across_rounds() {
        let inserted = InsertedKey {
            scheme: Scheme::Sr25519,
            key_type: "babe".parse().unwrap(),
            fingerprint: "abc".into(),
        };
        let report = ProvisionReport {
            built: true,
            rounds: vec![
                RoundReport {
                    round: 1,
                    generate: Some(GenerateReport {
                        generated: vec![],
                        skipped: vec![Scheme::Ed25519],
                    }),
                    insert: Some(InsertReport {
                        inserted: vec![inserted.clone()],
                        skipped: vec![RoleBinding::new(Scheme::Ed25519, "gran".parse().unwrap())],
                    }),
                },
                RoundReport {
                    round: 2,
                    generate: None,
                    insert: Some(InsertReport {
                        inserted: vec![inserted],
                        skipped: vec![],
                    }),
                },
            ],
        };
        assert_eq!(report.inserted_count(), 2);
        assert_eq!(report.skipped_count(), 2);
    }

    #[test]
    fn standalone_round_omits_missing_phase() {
        let round = RoundReport {
            round: 1,
            generate: Some(GenerateReport::default()),
            insert: None,
        };
        let json = serde_json::to_value(&round).unwrap();
        assert!(json.get("insert").is_none());
        assert!(json.get("generate").is_some());
    }
}
