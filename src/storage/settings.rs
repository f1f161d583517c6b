//! Integration settings storage
//!
//! Two YAML-backed stores:
//! - global settings (credentials) keyed by integration id: `settings/integrations.yaml`
//! - per-form settings: `forms/<form_id>.yaml` with an `integrations:` map

use eyre::{Context, Result};
use indexmap::IndexMap;
use lazy_regex::regex_is_match;
use std::fs;
use std::path::{Path, PathBuf};

use crate::integration::Settings;

/// Integration id → settings, in file order
pub type SettingsMap = IndexMap<String, Settings>;

const GLOBAL_FILE: &str = "integrations.yaml";

/// Parse a YAML document into an ordered id → settings map.
///
/// `section` selects a top-level key (`integrations` for form files); `None`
/// reads the whole document. Entries that are not maps are dropped with a warning.
fn parse_settings_map(content: &str, section: Option<&str>, origin: &Path) -> Result<SettingsMap> {
    if content.trim().is_empty() {
        return Ok(SettingsMap::new());
    }

    let document: serde_json::Value = serde_yaml::from_str(content).context("Failed to parse settings YAML")?;

    let root = match section {
        Some(key) => document.get(key).cloned().unwrap_or(serde_json::Value::Null),
        None => document,
    };

    let entries = match root {
        serde_json::Value::Null => return Ok(SettingsMap::new()),
        serde_json::Value::Object(entries) => entries,
        _ => eyre::bail!("Expected a map of integration settings in {}", origin.display()),
    };

    let mut map = SettingsMap::new();
    for (id, value) in entries {
        match value {
            serde_json::Value::Object(settings) => {
                map.insert(id, settings);
            }
            serde_json::Value::Null => {
                map.insert(id, Settings::new());
            }
            other => {
                log::warn!(
                    "Ignoring malformed settings for '{}' in {}: expected a map, got {}",
                    id,
                    origin.display(),
                    other
                );
            }
        }
    }
    Ok(map)
}

fn write_yaml<T: serde::Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let yaml = serde_yaml::to_string(value).context("Failed to serialize settings")?;
    fs::write(path, yaml).with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(())
}

/// Global per-integration settings
pub struct GlobalSettingsStore {
    path: PathBuf,
}

impl GlobalSettingsStore {
    pub fn new(settings_dir: &Path) -> Self {
        Self {
            path: settings_dir.join(GLOBAL_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read all settings; a missing file is empty
    pub fn load(&self) -> Result<SettingsMap> {
        if !self.path.exists() {
            return Ok(SettingsMap::new());
        }
        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read {}", self.path.display()))?;
        parse_settings_map(&content, None, &self.path)
    }

    /// Like [`GlobalSettingsStore::load`] but never fails
    pub fn load_or_empty(&self) -> SettingsMap {
        self.load().unwrap_or_else(|e| {
            log::warn!("Failed to load global settings: {:#}", e);
            SettingsMap::new()
        })
    }

    pub fn get(&self, integration_id: &str) -> Settings {
        self.load_or_empty().shift_remove(integration_id).unwrap_or_default()
    }

    /// Set one key for one integration and persist
    pub fn set(&self, integration_id: &str, key: &str, value: serde_json::Value) -> Result<()> {
        let mut all = self.load()?;
        all.entry(integration_id.to_string())
            .or_default()
            .insert(key.to_string(), value);
        write_yaml(&self.path, &all)
    }

    /// Remove one key; returns whether it existed
    pub fn unset(&self, integration_id: &str, key: &str) -> Result<bool> {
        let mut all = self.load()?;
        let removed = all
            .get_mut(integration_id)
            .map(|settings| settings.remove(key).is_some())
            .unwrap_or(false);
        if removed {
            write_yaml(&self.path, &all)?;
        }
        Ok(removed)
    }
}

/// Per-form integration settings
pub struct FormSettingsStore {
    dir: PathBuf,
}

#[derive(serde::Serialize)]
struct FormFile<'a> {
    integrations: &'a SettingsMap,
}

impl FormSettingsStore {
    pub fn new(forms_dir: &Path) -> Self {
        Self {
            dir: forms_dir.to_path_buf(),
        }
    }

    /// Form ids become file names, so only a safe character set is allowed
    pub fn is_valid_form_id(form_id: &str) -> bool {
        regex_is_match!(r"^[A-Za-z0-9_-]{1,128}$", form_id)
    }

    pub fn path(&self, form_id: &str) -> Result<PathBuf> {
        if !Self::is_valid_form_id(form_id) {
            eyre::bail!("Invalid form id '{}': use letters, digits, '-' or '_'", form_id);
        }
        Ok(self.dir.join(format!("{}.yaml", form_id)))
    }

    /// Strict load; a missing file is an empty map, a malformed one an error
    pub fn load(&self, form_id: &str) -> Result<SettingsMap> {
        let path = self.path(form_id)?;
        if !path.exists() {
            return Ok(SettingsMap::new());
        }
        let content = fs::read_to_string(&path).with_context(|| format!("Failed to read {}", path.display()))?;
        parse_settings_map(&content, Some("integrations"), &path)
    }

    /// Enabled-integrations lookup used at submission time.
    ///
    /// Absent or malformed settings resolve to an empty map.
    pub fn enabled_integrations(&self, form_id: &str) -> SettingsMap {
        match self.load(form_id) {
            Ok(map) => map,
            Err(e) => {
                log::warn!("Ignoring integration settings for form '{}': {:#}", form_id, e);
                SettingsMap::new()
            }
        }
    }

    pub fn save(&self, form_id: &str, integrations: &SettingsMap) -> Result<()> {
        let path = self.path(form_id)?;
        write_yaml(&path, &FormFile { integrations })
    }

    /// Switch an integration on for a form, merging extra settings
    pub fn enable(&self, form_id: &str, integration_id: &str, extra: Settings) -> Result<()> {
        let mut all = self.load(form_id)?;
        let entry = all.entry(integration_id.to_string()).or_default();
        for (key, value) in extra {
            entry.insert(key, value);
        }
        entry.insert("enabled".to_string(), serde_json::Value::Bool(true));
        self.save(form_id, &all)
    }

    /// Switch an integration off for a form, keeping its other settings
    pub fn disable(&self, form_id: &str, integration_id: &str) -> Result<bool> {
        let mut all = self.load(form_id)?;
        let Some(entry) = all.get_mut(integration_id) else {
            return Ok(false);
        };
        entry.insert("enabled".to_string(), serde_json::Value::Bool(false));
        self.save(form_id, &all)?;
        Ok(true)
    }

    /// Form ids that have a settings file, sorted
    pub fn list_forms(&self) -> Result<Vec<String>> {
        if !self.dir.exists() {
            return Ok(Vec::new());
        }
        let mut forms = Vec::new();
        for entry in fs::read_dir(&self.dir).context("Failed to read forms directory")? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some("yaml") {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()).filter(|s| Self::is_valid_form_id(s)) {
                forms.push(stem.to_string());
            }
        }
        forms.sort();
        Ok(forms)
    }
}
