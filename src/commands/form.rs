//! Per-form integration settings

use colored::*;
use eyre::Result;

use crate::app::App;
use crate::cli::{FormAction, OutputFormat};
use crate::config::Config;
use crate::storage::{FormSettingsStore, SettingsMap};

pub fn run(action: FormAction, config: &Config) -> Result<()> {
    let store = FormSettingsStore::new(&config.forms_dir());

    match action {
        FormAction::Show { form_id, format } => match form_id {
            Some(form_id) => show(&form_id, OutputFormat::resolve(format), &App::bootstrap(config.clone())?),
            None => list(OutputFormat::resolve(format), &store),
        },
        FormAction::Enable {
            form_id,
            integration,
            set,
        } => {
            let app = App::bootstrap(config.clone())?;
            if !app.registry.has(&integration) {
                println!(
                    "{} {} is not a registered integration; submissions will skip it",
                    "⚠".yellow(),
                    integration.cyan()
                );
            }
            enable(&form_id, &integration, &set, &store)
        }
        FormAction::Disable { form_id, integration } => disable(&form_id, &integration, &store),
    }
}

fn list(format: OutputFormat, store: &FormSettingsStore) -> Result<()> {
    let forms = store.list_forms()?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&forms)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&forms)?),
        OutputFormat::Text => {
            println!("{}", "Forms with integration settings:".bold());
            println!();
            if forms.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for form in &forms {
                let enabled: Vec<String> = store
                    .enabled_integrations(form)
                    .iter()
                    .filter(|(_, settings)| settings.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false))
                    .map(|(id, _)| id.clone())
                    .collect();
                println!("  {:20} {}", form.cyan(), enabled.join(", ").dimmed());
            }
        }
    }

    Ok(())
}

fn show(form_id: &str, format: OutputFormat, app: &App) -> Result<()> {
    let integrations: SettingsMap = app
        .forms
        .load(form_id)?
        .iter()
        .map(|(id, settings)| (id.clone(), super::masked(app, id, settings)))
        .collect();

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&integrations)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&integrations)?),
        OutputFormat::Text => {
            println!("{} {}", "Form".bold(), form_id.cyan());
            println!();

            if integrations.is_empty() {
                println!("  {}", "(no integrations)".dimmed());
                return Ok(());
            }

            for (id, settings) in &integrations {
                let enabled = settings.get("enabled").and_then(|v| v.as_bool()).unwrap_or(false);
                if enabled {
                    println!("  {} {}", "✓".green(), id.green());
                } else {
                    println!("  {} {} {}", "○".dimmed(), id, "(disabled)".dimmed());
                }
                for (key, value) in settings.iter().filter(|(k, _)| k.as_str() != "enabled") {
                    println!("      {}: {}", key.dimmed(), value);
                }
            }
        }
    }

    Ok(())
}

fn enable(form_id: &str, integration: &str, set: &[String], store: &FormSettingsStore) -> Result<()> {
    let extra = super::parse_assignments(set)?;

    println!("{} Enabling {} for form {}", "→".blue(), integration.cyan(), form_id.cyan());
    store.enable(form_id, integration, extra)?;
    println!("  {} Saved to {}", "✓".green(), store.path(form_id)?.display());

    Ok(())
}

fn disable(form_id: &str, integration: &str, store: &FormSettingsStore) -> Result<()> {
    println!("{} Disabling {} for form {}", "→".blue(), integration.cyan(), form_id.cyan());

    if store.disable(form_id, integration)? {
        println!("  {} Saved to {}", "✓".green(), store.path(form_id)?.display());
    } else {
        println!("  {} {} was not set up for this form", "⚠".yellow(), integration);
    }

    Ok(())
}
