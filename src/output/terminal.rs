//! Terminal renderer: one block per round, keys listed by fingerprint.

use colored::Colorize;

use crate::models::{GenerateReport, InsertReport, ProvisionReport};
use crate::output::OutputRenderer;

/// Terminal output renderer with colored, flowing text.
pub struct TerminalRenderer;

impl OutputRenderer for TerminalRenderer {
    fn render(&self, report: &ProvisionReport) -> String {
        let mut output = String::new();

        if report.built {
            output.push_str(&format!(" {} node binary built\n", "✔".green().bold()));
        }

        for round in &report.rounds {
            output.push_str(&format!("\n {}\n", format!("Round {}", round.round).bold()));
            if let Some(ref generate) = round.generate {
                render_generate(&mut output, generate);
            }
            if let Some(ref insert) = round.insert {
                render_insert(&mut output, insert);
            }
        }

        let skipped = report.skipped_count();
        output.push_str(&format!("{}\n", "───────────────────────────────────".dimmed()));
        output.push_str(&format!(
            " {} inserted, {} skipped\n",
            report.inserted_count().to_string().green().bold(),
            if skipped == 0 {
                skipped.to_string().normal()
            } else {
                skipped.to_string().yellow().bold()
            },
        ));

        output
    }
}

fn render_generate(output: &mut String, report: &GenerateReport) {
    for key in &report.generated {
        output.push_str(&format!(
            "   {} generated {} {}\n",
            "+".green(),
            key.scheme,
            key.fingerprint.as_deref().unwrap_or("(no token)").dimmed(),
        ));
    }
    for scheme in &report.skipped {
        output.push_str(&format!(
            "   {} {} output had no secret seed\n",
            "⚠".yellow().bold(),
            scheme,
        ));
    }
}

fn render_insert(output: &mut String, report: &InsertReport) {
    for key in &report.inserted {
        output.push_str(&format!(
            "   {} {} ← {} {}\n",
            "→".cyan(),
            key.key_type.to_string().bold(),
            key.scheme,
            key.fingerprint.dimmed(),
        ));
    }
    for binding in &report.skipped {
        output.push_str(&format!(
            "   {} {} has no unused {} key\n",
            "⚠".yellow().bold(),
            binding.key_type.to_string().bold(),
            binding.scheme,
        ));
    }
}
