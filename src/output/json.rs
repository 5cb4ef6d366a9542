//! JSON output renderer.
//!
//! Outputs `{"report": {...}, "summary": {...}}` format. Only token
//! fingerprints appear in the output.

use crate::models::ProvisionReport;
use crate::output::OutputRenderer;

/// JSON output renderer.
pub struct JsonRenderer;

impl OutputRenderer for JsonRenderer {
    fn render(&self, report: &ProvisionReport) -> String {
        let output = serde_json::json!({
            "report": report,
            "summary": {
                "rounds": report.rounds.len(),
                "inserted": report.inserted_count(),
                "skipped": report.skipped_count(),
            },
        });

        serde_json::to_string_pretty(&output).unwrap_or_else(|_| "{}".to_string())
    }
}
