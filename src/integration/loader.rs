//! Integration discovery and registration
//!
//! Every sub-folder of the integrations directory that carries an
//! `integration.yaml` becomes one registry entry. The manifest names a
//! built-in kind (folder name by default); folders that cannot be turned into
//! an integration are skipped and reported, never fatal.

use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

use super::builtin::{self, BuildContext};
use super::manifest::{IntegrationManifest, MANIFEST_FILE};
use super::registry::IntegrationRegistry;
use crate::integrations::http::HttpClient;
use crate::storage::SettingsMap;

/// A folder that did not produce an integration
#[derive(Debug, Clone, Serialize)]
pub struct SkippedFolder {
    pub folder: String,
    pub reason: String,
}

/// Outcome of one discovery pass
#[derive(Debug, Clone, Default, Serialize)]
pub struct DiscoveryReport {
    pub registered: Vec<String>,
    pub skipped: Vec<SkippedFolder>,
}

/// Called once after discovery with the populated registry
pub type LoadedListener = Box<dyn FnMut(&mut IntegrationRegistry, &DiscoveryReport)>;

/// Builds the registry at startup
pub struct Bootstrapper {
    integrations_dir: PathBuf,
    globals: SettingsMap,
    http: HttpClient,
    builtin_fallback: bool,
    listeners: Vec<LoadedListener>,
}

impl Bootstrapper {
    pub fn new(integrations_dir: PathBuf, globals: SettingsMap, http: HttpClient) -> Self {
        Self {
            integrations_dir,
            globals,
            http,
            builtin_fallback: false,
            listeners: Vec::new(),
        }
    }

    /// Register every built-in kind when the integrations directory is missing
    pub fn with_builtin_fallback(mut self, enabled: bool) -> Self {
        self.builtin_fallback = enabled;
        self
    }

    /// Subscribe to the "integrations loaded" notification
    pub fn on_loaded(mut self, listener: impl FnMut(&mut IntegrationRegistry, &DiscoveryReport) + 'static) -> Self {
        self.listeners.push(Box::new(listener));
        self
    }

    /// Discover, register, then notify listeners exactly once.
    ///
    /// Never fails: an unreadable integrations directory is treated like a
    /// missing one.
    pub fn run(mut self, registry: &mut IntegrationRegistry) -> DiscoveryReport {
        let discovered = if self.integrations_dir.exists() {
            self.discover(registry)
        } else {
            None
        };

        let report = match discovered {
            Some(report) => report,
            None if self.builtin_fallback => {
                log::info!(
                    "No readable integrations directory at {}, registering built-ins",
                    self.integrations_dir.display()
                );
                DiscoveryReport {
                    registered: self.register_builtin(registry),
                    skipped: Vec::new(),
                }
            }
            None => DiscoveryReport::default(),
        };

        log::info!(
            "Integrations loaded: {} registered, {} skipped",
            report.registered.len(),
            report.skipped.len()
        );

        for listener in self.listeners.iter_mut() {
            listener(registry, &report);
        }

        report
    }

    /// Scan the integrations directory in folder-name order.
    ///
    /// Returns `None` when the directory itself cannot be listed.
    pub fn discover(&self, registry: &mut IntegrationRegistry) -> Option<DiscoveryReport> {
        let entries = match fs::read_dir(&self.integrations_dir) {
            Ok(entries) => entries,
            Err(e) => {
                log::warn!(
                    "Failed to read integrations directory {}: {}",
                    self.integrations_dir.display(),
                    e
                );
                return None;
            }
        };

        let mut folders: Vec<PathBuf> = Vec::new();
        for entry in entries {
            match entry {
                Ok(entry) if entry.path().is_dir() => folders.push(entry.path()),
                Ok(_) => {}
                Err(e) => log::warn!("Skipping unreadable entry in integrations directory: {}", e),
            }
        }
        folders.sort();

        let mut report = DiscoveryReport::default();
        for path in folders {
            let folder = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_default();

            match self.load_folder(&path, &folder, registry) {
                Ok(id) => report.registered.push(id),
                Err(reason) => {
                    log::warn!("Skipping integration folder '{}': {}", folder, reason);
                    report.skipped.push(SkippedFolder { folder, reason });
                }
            }
        }

        Some(report)
    }

    /// Turn one folder into a registered integration, or say why not
    fn load_folder(&self, path: &Path, folder: &str, registry: &mut IntegrationRegistry) -> Result<String, String> {
        let manifest_path = path.join(MANIFEST_FILE);
        if !manifest_path.exists() {
            return Err(format!("no {} found", MANIFEST_FILE));
        }

        let manifest =
            IntegrationManifest::load(&manifest_path).map_err(|e| format!("invalid {}: {}", MANIFEST_FILE, e))?;

        if !manifest.enabled {
            return Err("disabled in manifest".to_string());
        }

        let kind = manifest.kind_or(folder);
        let Some(constructor) = builtin::constructor(kind) else {
            return Err(format!("unknown integration kind '{}'", kind));
        };

        let id = manifest.id_or(folder).to_string();
        let ctx = self.context(&id).with_display(manifest.integration.clone());
        registry.register(constructor(ctx));
        Ok(id)
    }

    /// Register every built-in kind under its own name
    pub fn register_builtin(&self, registry: &mut IntegrationRegistry) -> Vec<String> {
        builtin::BUILTIN
            .iter()
            .map(|(kind, constructor)| {
                registry.register(constructor(self.context(kind)));
                kind.to_string()
            })
            .collect()
    }

    fn context(&self, id: &str) -> BuildContext {
        let settings = self.globals.get(id).cloned().unwrap_or_default();
        BuildContext::new(id, settings, self.http.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpConfig;
    use crate::integration::registry::tests::StubIntegration;
    use serde_json::json;
    use std::cell::Cell;
    use std::rc::Rc;
    use tempfile::tempdir;

    fn write_manifest(dir: &Path, folder: &str, content: &str) {
        let folder_dir = dir.join(folder);
        fs::create_dir_all(&folder_dir).unwrap();
        fs::write(folder_dir.join(MANIFEST_FILE), content).unwrap();
    }

    fn bootstrapper(dir: &Path) -> Bootstrapper {
        Bootstrapper::new(dir.to_path_buf(), SettingsMap::new(), HttpClient::new(&HttpConfig::default()))
    }

    #[test]
    fn test_discover_by_folder_convention() {
        let temp = tempdir().unwrap();
        write_manifest(temp.path(), "mailchimp", "");
        write_manifest(temp.path(), "hubspot", "enabled: true\n");

        let mut registry = IntegrationRegistry::new();
        let report = bootstrapper(temp.path()).run(&mut registry);

        // Folder-name order
        assert_eq!(report.registered, vec!["hubspot", "mailchimp"]);
        assert!(report.skipped.is_empty());
        assert!(registry.has("mailchimp"));
        assert!(registry.has("hubspot"));
    }

    #[test]
    fn test_folder_without_manifest_does_not_halt_discovery() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("aaa-empty")).unwrap();
        write_manifest(temp.path(), "hubspot", "");
        fs::write(temp.path().join("stray-file.txt"), "not a folder").unwrap();

        let mut registry = IntegrationRegistry::new();
        let report = bootstrapper(temp.path()).run(&mut registry);

        assert_eq!(report.registered, vec!["hubspot"]);
        assert_eq!(report.skipped.len(), 1);
        assert_eq!(report.skipped[0].folder, "aaa-empty");
        assert!(!registry.has("aaa-empty"));
        assert_eq!(registry.count(), 1);
    }

    #[test]
    fn test_unknown_kind_invalid_and_disabled_are_skipped() {
        let temp = tempdir().unwrap();
        write_manifest(temp.path(), "salesforce", "");
        write_manifest(temp.path(), "broken", "integration: [oops");
        write_manifest(temp.path(), "hubspot", "enabled: false\n");
        write_manifest(temp.path(), "mailchimp", "");

        let mut registry = IntegrationRegistry::new();
        let report = bootstrapper(temp.path()).run(&mut registry);

        assert_eq!(report.registered, vec!["mailchimp"]);
        let skipped: Vec<&str> = report.skipped.iter().map(|s| s.folder.as_str()).collect();
        assert_eq!(skipped, vec!["broken", "hubspot", "salesforce"]);
        assert!(report.skipped[2].reason.contains("unknown integration kind"));
    }

    #[test]
    fn test_manifest_id_and_kind_override() {
        let temp = tempdir().unwrap();
        write_manifest(
            temp.path(),
            "newsletter",
            "integration:\n  id: weekly\n  kind: mailchimp\n  name: Weekly news\n",
        );

        let mut registry = IntegrationRegistry::new();
        let report = bootstrapper(temp.path()).run(&mut registry);

        assert_eq!(report.registered, vec!["weekly"]);
        let weekly = registry.get("weekly").unwrap();
        assert_eq!(weekly.meta().name, "Weekly news");
    }

    #[test]
    fn test_global_settings_reach_instances() {
        let temp = tempdir().unwrap();
        write_manifest(temp.path(), "mailchimp", "");
        write_manifest(temp.path(), "hubspot", "");

        let mut globals = SettingsMap::new();
        globals.insert(
            "mailchimp".to_string(),
            json!({"api_key": "abc-us6"}).as_object().cloned().unwrap(),
        );

        let mut registry = IntegrationRegistry::new();
        Bootstrapper::new(temp.path().to_path_buf(), globals, HttpClient::new(&HttpConfig::default()))
            .run(&mut registry);

        let configured: Vec<&str> = registry.configured().map(|i| i.id()).collect();
        assert_eq!(configured, vec!["mailchimp"]);
    }

    #[test]
    fn test_missing_directory() {
        let temp = tempdir().unwrap();
        let missing = temp.path().join("nope");

        let mut registry = IntegrationRegistry::new();
        let report = bootstrapper(&missing).run(&mut registry);
        assert!(report.registered.is_empty());
        assert_eq!(registry.count(), 0);

        let mut registry = IntegrationRegistry::new();
        let report = bootstrapper(&missing)
            .with_builtin_fallback(true)
            .run(&mut registry);
        assert_eq!(report.registered, vec!["mailchimp", "hubspot"]);
        assert_eq!(registry.count(), 2);
    }

    #[test]
    fn test_unreadable_directory_is_not_fatal() {
        let temp = tempdir().unwrap();
        let not_a_dir = temp.path().join("integrations");
        fs::write(&not_a_dir, "a file, not a folder").unwrap();

        let mut registry = IntegrationRegistry::new();
        let report = bootstrapper(&not_a_dir).run(&mut registry);
        assert!(report.registered.is_empty());
        assert_eq!(registry.count(), 0);

        let mut registry = IntegrationRegistry::new();
        let report = bootstrapper(&not_a_dir).with_builtin_fallback(true).run(&mut registry);
        assert_eq!(report.registered, vec!["mailchimp", "hubspot"]);
    }

    #[test]
    fn test_loaded_listeners_fire_once_and_can_extend() {
        let temp = tempdir().unwrap();
        write_manifest(temp.path(), "hubspot", "");

        let seen = Rc::new(Cell::new(0usize));
        let calls = Rc::new(Cell::new(0usize));
        let (seen_in, calls_in) = (seen.clone(), calls.clone());

        let mut registry = IntegrationRegistry::new();
        bootstrapper(temp.path())
            .on_loaded(move |registry, report| {
                calls_in.set(calls_in.get() + 1);
                seen_in.set(registry.count());
                assert_eq!(report.registered, vec!["hubspot"]);
            })
            .on_loaded(|registry, _| {
                registry.register(Box::new(StubIntegration::new("custom", true)));
            })
            .run(&mut registry);

        assert_eq!(calls.get(), 1);
        assert_eq!(seen.get(), 1);
        assert!(registry.has("custom"));
        assert_eq!(registry.count(), 2);
    }
}
