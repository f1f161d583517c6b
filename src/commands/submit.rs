//! Dispatch a submission from the command line or a form handler pipe

use colored::*;
use eyre::{Context, Result};
use std::io::{self, Read};

use crate::app::App;
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::dispatch::{DispatchReport, OutcomeStatus};
use crate::submission::Submission;

pub fn run(
    form_id: Option<&str>,
    submission_id: Option<&str>,
    payload: Option<&str>,
    format: OutputFormat,
    config: &Config,
) -> Result<()> {
    let raw = match payload {
        Some(p) => p.to_string(),
        None => {
            let mut buf = String::new();
            io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read submission from stdin")?;
            buf
        }
    };

    let value: serde_json::Value = if raw.trim().is_empty() {
        serde_json::Value::Object(Default::default())
    } else {
        serde_json::from_str(&raw).context("Submission payload is not valid JSON")?
    };

    let submission = Submission::from_payload(&value, form_id, submission_id)?;

    let app = App::bootstrap(config.clone())?;
    let report = app.dispatch(&submission);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&report)?),
        OutputFormat::Text => print_report(&report),
    }

    Ok(())
}

fn print_report(report: &DispatchReport) {
    println!(
        "{} Submission {} for form {}",
        "→".blue(),
        report.submission_id.dimmed(),
        report.form_id.cyan()
    );

    if report.outcomes.is_empty() {
        println!("  {}", "(no integrations enabled for this form)".dimmed());
        return;
    }

    for outcome in &report.outcomes {
        let symbol = match outcome.status {
            OutcomeStatus::Succeeded => "✓".green(),
            OutcomeStatus::Failed => "✗".red(),
            OutcomeStatus::Skipped => "○".dimmed(),
        };
        println!("  {} {} {}", symbol, outcome.integration_id, outcome.message.dimmed());
    }

    let failed = report.failures().count();
    let invoked = report.invoked().count();
    println!();
    if failed == 0 {
        println!("{} {} integration(s) succeeded", "✓".green().bold(), report.succeeded().count());
    } else {
        println!(
            "{} {} of {} integration(s) failed (see `formbridge log list --status error`)",
            "⚠".yellow().bold(),
            failed,
            invoked
        );
    }
}
