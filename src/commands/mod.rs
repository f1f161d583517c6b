pub mod completions;
pub mod config;
pub mod form;
pub mod init;
pub mod integration;
pub mod log;
pub mod settings;
pub mod status;
pub mod submit;

use std::collections::HashSet;

use crate::app::App;
use crate::integration::Settings;

/// Parse a command-line value as JSON, falling back to a plain string
pub fn parse_value(raw: &str) -> serde_json::Value {
    serde_json::from_str(raw).unwrap_or_else(|_| serde_json::Value::String(raw.to_string()))
}

/// Split `key=value` pairs into a settings map
pub fn parse_assignments(pairs: &[String]) -> eyre::Result<crate::integration::Settings> {
    let mut settings = crate::integration::Settings::new();
    for pair in pairs {
        let Some((key, value)) = pair.split_once('=') else {
            eyre::bail!("Expected KEY=VALUE, got '{}'", pair);
        };
        let key = key.trim();
        if key.is_empty() {
            eyre::bail!("Empty key in '{}'", pair);
        }
        settings.insert(key.to_string(), parse_value(value));
    }
    Ok(settings)
}

/// Copy of `settings` with credentials hidden, for display.
///
/// Hides the keys `integration` declares secret plus anything named like a
/// credential; longer values keep their last 4 characters.
pub fn masked(app: &App, integration: &str, settings: &Settings) -> Settings {
    mask_secrets(settings, &secret_keys(app, integration))
}

fn secret_keys(app: &App, integration: &str) -> HashSet<String> {
    match app.registry.get(integration) {
        Some(integration) => integration
            .auth_fields()
            .into_iter()
            .chain(integration.settings_schema())
            .filter(|f| f.secret)
            .map(|f| f.key)
            .collect(),
        None => HashSet::new(),
    }
}

fn looks_secret(key: &str) -> bool {
    let key = key.to_lowercase();
    ["key", "token", "secret", "password"].iter().any(|s| key.contains(s))
}

fn mask_secrets(settings: &Settings, secrets: &HashSet<String>) -> Settings {
    settings
        .iter()
        .map(|(key, value)| {
            let text = match value {
                serde_json::Value::String(s) => Some(s.clone()),
                serde_json::Value::Number(n) => Some(n.to_string()),
                _ => None,
            };
            let masked = match text {
                Some(s) if secrets.contains(key) || looks_secret(key) => {
                    let chars: Vec<char> = s.chars().collect();
                    let tail: String = chars[chars.len().saturating_sub(4)..].iter().collect();
                    let hidden = if chars.len() > 8 { format!("****{}", tail) } else { "****".to_string() };
                    serde_json::Value::String(hidden)
                }
                _ => value.clone(),
            };
            (key.clone(), masked)
        })
        .collect()
}
