//! System status command
//!
//! Shows directories, discovered integrations, forms and log health.

use colored::*;
use eyre::Result;
use serde::Serialize;

use crate::app::App;
use crate::cli::OutputFormat;
use crate::config::Config;
use crate::integration::loader::SkippedFolder;
use crate::storage::LogStatus;

#[derive(Serialize)]
struct Status {
    version: String,
    base_dir: String,
    integrations_dir: String,
    forms_dir: String,
    logs_dir: String,
    integrations: Vec<IntegrationStatus>,
    configured: usize,
    skipped: Vec<SkippedFolder>,
    forms: Vec<FormStatus>,
    log: LogStats,
    observability: ObservabilityStatus,
}

#[derive(Serialize)]
struct IntegrationStatus {
    id: String,
    name: String,
    configured: bool,
}

#[derive(Serialize)]
struct FormStatus {
    form_id: String,
    enabled: Vec<String>,
}

#[derive(Serialize)]
struct LogStats {
    total: usize,
    errors: usize,
    latest: Option<String>,
    retention_days: Option<u32>,
}

#[derive(Serialize)]
struct ObservabilityStatus {
    enabled: bool,
    sinks: Vec<String>,
}

pub fn run(format: OutputFormat, config: &Config) -> Result<()> {
    let app = App::bootstrap(config.clone())?;

    let integrations = app
        .registry
        .all()
        .map(|i| IntegrationStatus {
            id: i.id().to_string(),
            name: i.meta().name.clone(),
            configured: i.is_configured(),
        })
        .collect();

    let forms = app
        .forms
        .list_forms()
        .unwrap_or_default()
        .into_iter()
        .map(|form_id| {
            let enabled = app
                .forms
                .enabled_integrations(&form_id)
                .iter()
                .filter(|(id, settings)| app.registry.get(id).is_some_and(|i| i.is_enabled(settings)))
                .map(|(id, _)| id.clone())
                .collect();
            FormStatus { form_id, enabled }
        })
        .collect();

    let entries = app.log.read_all().unwrap_or_default();
    let log = LogStats {
        total: entries.len(),
        errors: entries.iter().filter(|e| e.status == LogStatus::Error).count(),
        latest: entries
            .iter()
            .map(|e| e.created_at)
            .max()
            .map(|dt| dt.format("%Y-%m-%d %H:%M").to_string()),
        retention_days: config.log_retention_days,
    };

    let observability = ObservabilityStatus {
        enabled: config.observability.enabled,
        sinks: config
            .observability
            .sinks
            .iter()
            .map(|s| format!("{:?}", s).to_lowercase())
            .collect(),
    };

    let status = Status {
        version: env!("CARGO_PKG_VERSION").to_string(),
        base_dir: Config::base_dir().display().to_string(),
        integrations_dir: config.integrations_dir().display().to_string(),
        forms_dir: config.forms_dir().display().to_string(),
        logs_dir: config.logs_dir().display().to_string(),
        integrations,
        configured: app.registry.configured().count(),
        skipped: app.discovery.skipped.clone(),
        forms,
        log,
        observability,
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&status)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&status)?),
        OutputFormat::Text => print_text_status(&status),
    }

    Ok(())
}

fn print_text_status(status: &Status) {
    println!("{}", "formbridge Status".bold());
    println!();

    println!("  {:14} {}", "Version:".dimmed(), status.version);
    println!("  {:14} {}", "Base Dir:".dimmed(), status.base_dir);
    println!("  {:14} {}", "Integrations:".dimmed(), status.integrations_dir);
    println!("  {:14} {}", "Forms:".dimmed(), status.forms_dir);
    println!("  {:14} {}", "Logs:".dimmed(), status.logs_dir);
    println!();

    println!(
        "{} ({}):",
        "Integrations".cyan(),
        format!(
            "{} registered, {} configured",
            status.integrations.len(),
            status.configured
        )
        .dimmed()
    );
    if status.integrations.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for integration in &status.integrations {
        if integration.configured {
            println!("  {} {} {}", "✓".green(), integration.id.green(), integration.name.dimmed());
        } else {
            println!(
                "  {} {} {}",
                "○".dimmed(),
                integration.id,
                "(not configured)".dimmed()
            );
        }
    }
    for skipped in &status.skipped {
        println!(
            "  {} {} {}",
            "⚠".yellow(),
            skipped.folder,
            format!("(skipped: {})", skipped.reason).dimmed()
        );
    }
    println!();

    println!(
        "{} ({}):",
        "Forms".cyan(),
        format!("{} configured", status.forms.len()).dimmed()
    );
    if status.forms.is_empty() {
        println!("  {}", "(none)".dimmed());
    }
    for form in &status.forms {
        let enabled = if form.enabled.is_empty() {
            "(no integrations enabled)".dimmed().to_string()
        } else {
            form.enabled.join(", ")
        };
        println!("  {:20} → {}", form.form_id.cyan(), enabled);
    }
    println!();

    println!(
        "{} ({} entries total):",
        "Submission log".cyan(),
        status.log.total.to_string().yellow()
    );
    if status.log.errors > 0 {
        println!("  {} {} error entries", "⚠".yellow(), status.log.errors);
    }
    if let Some(ref latest) = status.log.latest {
        println!("  {:14} {}", "Latest:".dimmed(), latest);
    }
    match status.log.retention_days {
        Some(days) => println!("  {:14} {} days", "Retention:".dimmed(), days),
        None => println!("  {:14} {}", "Retention:".dimmed(), "keep forever".dimmed()),
    }
    println!();

    println!("{}:", "Observability".cyan());
    if status.observability.enabled {
        println!(
            "  {} Enabled: {}",
            "✓".green(),
            status.observability.sinks.join(", ").cyan()
        );
    } else {
        println!("  {} Disabled", "○".dimmed());
    }
}
