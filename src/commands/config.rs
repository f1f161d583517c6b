use colored::*;
use eyre::{Context, Result};
use std::fs;

use crate::cli::{ConfigAction, OutputFormat};
use crate::config::{CONFIG_FILE, Config, LogLevel};

pub fn run(action: ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Show { format } => show(OutputFormat::resolve(format), config),
        ConfigAction::Get { key } => get(&key, config),
        ConfigAction::Set { key, value } => set(&key, &value, config),
    }
}

fn show(format: OutputFormat, config: &Config) -> Result<()> {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(config)?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(config)?);
        }
        OutputFormat::Text => {
            println!("{}", "formbridge Configuration".bold());
            println!();

            println!("{}: {}", "log_level".cyan(), config.log_level.as_filter());
            println!();

            println!("{}:", "paths".cyan());
            println!("  integrations: {}", config.paths.integrations.display());
            println!("  settings: {}", config.paths.settings.display());
            println!("  forms: {}", config.paths.forms.display());
            println!("  logs: {}", config.paths.logs.display());
            println!();

            println!("{}:", "http".cyan());
            println!("  timeout_secs: {}", config.http.timeout_secs);
            println!("  user_agent: {}", config.http.user_agent);
            println!();

            println!("{}:", "discovery".cyan());
            println!("  builtin_fallback: {}", config.discovery.builtin_fallback);
            println!();

            println!("{}:", "observability".cyan());
            println!("  enabled: {}", config.observability.enabled);
            println!();

            match config.log_retention_days {
                Some(days) => println!("{}: {}", "log_retention_days".cyan(), days),
                None => println!("{}: {}", "log_retention_days".cyan(), "(keep forever)".dimmed()),
            }
        }
    }

    Ok(())
}

fn get(key: &str, config: &Config) -> Result<()> {
    let value = match key {
        "paths.integrations" => Some(config.paths.integrations.display().to_string()),
        "paths.settings" => Some(config.paths.settings.display().to_string()),
        "paths.forms" => Some(config.paths.forms.display().to_string()),
        "paths.logs" => Some(config.paths.logs.display().to_string()),
        "http.timeout_secs" => Some(config.http.timeout_secs.to_string()),
        "http.user_agent" => Some(config.http.user_agent.clone()),
        "discovery.builtin_fallback" => Some(config.discovery.builtin_fallback.to_string()),
        "observability.enabled" => Some(config.observability.enabled.to_string()),
        "observability.http_endpoint" => Some(config.observability.http_endpoint.clone().unwrap_or_default()),
        "log_retention_days" => Some(config.log_retention_days.map(|d| d.to_string()).unwrap_or_default()),
        "log_level" | "log-level" => Some(config.log_level.as_filter().to_string()),
        _ => None,
    };

    match value {
        Some(v) => println!("{}", v),
        None => {
            eprintln!("{} Unknown config key: {}", "✗".red(), key);
            std::process::exit(1);
        }
    }

    Ok(())
}

fn apply(config: &mut Config, key: &str, value: &str) -> Result<()> {
    match key {
        "paths.integrations" => config.paths.integrations = value.into(),
        "paths.settings" => config.paths.settings = value.into(),
        "paths.forms" => config.paths.forms = value.into(),
        "paths.logs" => config.paths.logs = value.into(),
        "http.timeout_secs" => {
            config.http.timeout_secs = value.parse().context("Invalid number of seconds")?;
        }
        "http.user_agent" => config.http.user_agent = value.to_string(),
        "discovery.builtin_fallback" => {
            config.discovery.builtin_fallback =
                value.parse().context("Invalid boolean value (use 'true' or 'false')")?;
        }
        "observability.enabled" => {
            config.observability.enabled = value.parse().context("Invalid boolean value (use 'true' or 'false')")?;
        }
        "observability.http_endpoint" => {
            config.observability.http_endpoint = Some(value.to_string()).filter(|v| !v.is_empty());
        }
        "log_retention_days" => {
            config.log_retention_days = if value.is_empty() || value == "none" {
                None
            } else {
                Some(value.parse().context("Invalid number of days")?)
            };
        }
        "log_level" | "log-level" => {
            config.log_level = serde_yaml::from_str::<LogLevel>(value)
                .context("Invalid log level (trace, debug, info, warn, error, off)")?;
        }
        _ => {
            eyre::bail!("Unknown config key: {}", key);
        }
    }
    Ok(())
}

fn set(key: &str, value: &str, config: &Config) -> Result<()> {
    println!("{} Setting {} = {}", "→".blue(), key.cyan(), value.green());

    let mut new_config = config.clone();
    apply(&mut new_config, key, value)?;

    let config_path = Config::base_dir().join(CONFIG_FILE);
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent)?;
    }

    let yaml_str = serde_yaml::to_string(&new_config).context("Failed to serialize config")?;
    fs::write(&config_path, yaml_str).context("Failed to write config file")?;

    println!("  {} Saved to {}", "✓".green(), config_path.display());

    Ok(())
}
