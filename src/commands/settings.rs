//! Global integration settings (credentials)

use colored::*;
use eyre::Result;

use crate::app::App;
use crate::cli::{OutputFormat, SettingsAction};
use crate::config::Config;
use crate::storage::GlobalSettingsStore;

pub fn run(action: SettingsAction, config: &Config) -> Result<()> {
    match action {
        SettingsAction::Set {
            integration,
            key,
            value,
        } => set(&integration, &key, &value, config),
        SettingsAction::Unset { integration, key } => unset(&integration, &key, config),
        SettingsAction::Show { integration, format } => show(&integration, OutputFormat::resolve(format), config),
    }
}

fn set(integration: &str, key: &str, value: &str, config: &Config) -> Result<()> {
    let store = GlobalSettingsStore::new(&config.settings_dir());

    println!("{} Setting {}.{}", "→".blue(), integration.cyan(), key.cyan());
    store.set(integration, key, super::parse_value(value))?;
    println!("  {} Saved to {}", "✓".green(), store.path().display());

    Ok(())
}

fn unset(integration: &str, key: &str, config: &Config) -> Result<()> {
    let store = GlobalSettingsStore::new(&config.settings_dir());

    if store.unset(integration, key)? {
        println!("{} Removed {}.{}", "✓".green(), integration.cyan(), key.cyan());
    } else {
        println!("{} {}.{} was not set", "⚠".yellow(), integration, key);
    }

    Ok(())
}

fn show(integration: &str, format: OutputFormat, config: &Config) -> Result<()> {
    let app = App::bootstrap(config.clone())?;
    let settings = super::masked(&app, integration, &app.globals.get(integration));

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&settings)?),
        OutputFormat::Yaml => println!("{}", serde_yaml::to_string(&settings)?),
        OutputFormat::Text => {
            println!("{} {}", "Settings for".bold(), integration.cyan());
            println!();
            if settings.is_empty() {
                println!("  {}", "(none)".dimmed());
            }
            for (key, value) in &settings {
                println!("  {:20} {}", key.dimmed(), value);
            }
        }
    }

    Ok(())
}
