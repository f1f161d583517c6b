use chrono::{Duration, Local, Utc};
use colored::*;
use eyre::Result;

use crate::cli::{LogAction, OutputFormat};
use crate::config::Config;
use crate::storage::{LogEntry, LogFilter, LogStatus, SubmissionLog};

pub fn run(action: LogAction, config: &Config) -> Result<()> {
    let log = SubmissionLog::new(&config.logs_dir());

    match action {
        LogAction::List {
            form,
            submission,
            integration,
            status,
            last,
            format,
        } => {
            let filter = LogFilter {
                form_id: form,
                submission_id: submission,
                integration_id: integration,
                status: status.map(|s| s.parse::<LogStatus>()).transpose()?,
                last,
            };
            list(&filter, OutputFormat::resolve(format), &log)
        }
        LogAction::Prune { days } => prune(days, &log),
    }
}

fn list(filter: &LogFilter, format: OutputFormat, log: &SubmissionLog) -> Result<()> {
    let entries = log.query(filter)?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&entries)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&entries)?),
        OutputFormat::Text => {
            println!("{} ({}):", "Submission log".bold(), format!("{} entries", entries.len()).dimmed());
            println!();

            if entries.is_empty() {
                println!("  {}", "(no entries)".dimmed());
            }
            for entry in &entries {
                print_entry(entry);
            }
        }
    }

    Ok(())
}

fn print_entry(entry: &LogEntry) {
    let when = entry.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string();
    let status = match entry.status {
        LogStatus::Success => "success".green(),
        LogStatus::Error => "error".red(),
    };
    println!(
        "  {} {:8} {} {} {}",
        when.dimmed(),
        status,
        entry.form_id.cyan(),
        entry.integration_id,
        format!("[{}]", entry.submission_id).dimmed()
    );
    if !entry.message.is_empty() {
        println!("      {}", entry.message);
    }
}

fn prune(days: u32, log: &SubmissionLog) -> Result<()> {
    let cutoff = Utc::now() - Duration::days(i64::from(days));

    println!(
        "{} Pruning entries older than {} days from {}",
        "→".blue(),
        days,
        log.path().display()
    );
    let removed = log.prune(cutoff)?;
    println!("  {} Removed {} entries", "✓".green(), removed);

    Ok(())
}
