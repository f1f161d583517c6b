//! Application wiring
//!
//! Builds stores, the HTTP client and the integration registry from a
//! [`Config`], and owns them for the lifetime of one command.

use eyre::Result;

use crate::config::Config;
use crate::dispatch::{DispatchReport, Dispatcher};
use crate::integration::loader::{Bootstrapper, DiscoveryReport};
use crate::integration::registry::IntegrationRegistry;
use crate::integrations::http::HttpClient;
use crate::observability::{Event, EventEmitter};
use crate::storage::{FormSettingsStore, GlobalSettingsStore, SubmissionLog};
use crate::submission::Submission;

pub struct App {
    pub config: Config,
    pub registry: IntegrationRegistry,
    pub discovery: DiscoveryReport,
    pub globals: GlobalSettingsStore,
    pub forms: FormSettingsStore,
    pub log: SubmissionLog,
    pub emitter: EventEmitter,
}

impl App {
    /// Discover integrations and wire the stores
    pub fn bootstrap(config: Config) -> Result<Self> {
        let globals = GlobalSettingsStore::new(&config.settings_dir());
        let forms = FormSettingsStore::new(&config.forms_dir());
        let log = SubmissionLog::new(&config.logs_dir());
        let emitter = EventEmitter::new(config.observability.clone(), config.logs_dir());
        let http = HttpClient::new(&config.http);

        let loaded = emitter.clone();
        let mut registry = IntegrationRegistry::new();
        let discovery = Bootstrapper::new(config.integrations_dir(), globals.load_or_empty(), http)
            .with_builtin_fallback(config.discovery.builtin_fallback)
            .on_loaded(move |registry, report| loaded.emit(&Event::integrations_loaded(registry.count(), report)))
            .run(&mut registry);

        Ok(Self {
            config,
            registry,
            discovery,
            globals,
            forms,
            log,
            emitter,
        })
    }

    /// Dispatch one submission, emit the event and apply log retention
    pub fn dispatch(&self, submission: &Submission) -> DispatchReport {
        let report = Dispatcher::new(&self.registry, &self.forms, &self.globals, &self.log).dispatch(submission);

        self.emitter.emit(&Event::submission_dispatched(&report));

        if let Some(days) = self.config.log_retention_days {
            let cutoff = chrono::Utc::now() - chrono::Duration::days(i64::from(days));
            if let Err(e) = self.log.prune(cutoff) {
                log::warn!("Log retention failed: {}", e);
            }
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PathsConfig;
    use serde_json::json;
    use std::fs;
    use tempfile::tempdir;

    fn config_in(base: &std::path::Path) -> Config {
        Config {
            paths: PathsConfig {
                integrations: base.join("integrations"),
                settings: base.join("settings"),
                forms: base.join("forms"),
                logs: base.join("logs"),
            },
            ..Config::default()
        }
    }

    #[test]
    fn test_bootstrap_falls_back_to_builtin() {
        let temp = tempdir().unwrap();
        let app = App::bootstrap(config_in(temp.path())).unwrap();

        assert!(app.registry.has("mailchimp"));
        assert!(app.registry.has("hubspot"));
        assert_eq!(app.registry.configured().count(), 0);
    }

    #[test]
    fn test_bootstrap_uses_manifests_when_present() {
        let temp = tempdir().unwrap();
        let folder = temp.path().join("integrations").join("hubspot");
        fs::create_dir_all(&folder).unwrap();
        fs::write(folder.join("integration.yaml"), "").unwrap();

        let app = App::bootstrap(config_in(temp.path())).unwrap();
        assert_eq!(app.registry.ids().collect::<Vec<_>>(), vec!["hubspot"]);
    }

    #[test]
    fn test_bootstrap_emits_loaded_event() {
        let temp = tempdir().unwrap();
        let mut config = config_in(temp.path());
        config.observability.enabled = true;
        config.observability.sinks = vec![crate::config::ObservabilitySink::File];

        let app = App::bootstrap(config).unwrap();

        let content = fs::read_to_string(app.emitter.events_path()).unwrap();
        let event: Event = serde_json::from_str(content.lines().next().unwrap()).unwrap();
        assert_eq!(event.payload["count"], 2);
        assert_eq!(event.payload["registered"], json!(["mailchimp", "hubspot"]));
    }

    #[test]
    fn test_dispatch_without_form_settings() {
        let temp = tempdir().unwrap();
        let app = App::bootstrap(config_in(temp.path())).unwrap();

        let submission = Submission::from_payload(&json!({"email": "a@example.com"}), Some("contact"), None).unwrap();
        let report = app.dispatch(&submission);

        assert_eq!(report.invoked().count(), 0);
        assert!(app.log.read_all().unwrap().is_empty());
    }

    #[test]
    fn test_unconfigured_integration_is_logged_as_error() {
        let temp = tempdir().unwrap();
        let app = App::bootstrap(config_in(temp.path())).unwrap();
        app.forms.enable("contact", "hubspot", Default::default()).unwrap();

        let submission = Submission::from_payload(&json!({"email": "a@example.com"}), Some("contact"), None).unwrap();
        let report = app.dispatch(&submission);

        assert_eq!(report.invoked().count(), 1);
        assert_eq!(report.failures().count(), 1);
        let entries = app.log.read_all().unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].integration_id, "hubspot");
    }
}
