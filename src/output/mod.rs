//! Report renderers: terminal and JSON.

pub mod json;
pub mod terminal;

use crate::models::ProvisionReport;

/// Trait for rendering a provisioning report to an output format.
pub trait OutputRenderer {
    /// Render the report to a string.
    fn render(&self, report: &ProvisionReport) -> String;
}
