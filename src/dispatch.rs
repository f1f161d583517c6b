//! Submission dispatching
//!
//! For each submission, look up the integrations enabled for its form and run
//! them one after another. Every integration is isolated: an `Err`, a panic or
//! a failed result is recorded for that integration only and the loop moves on.

use serde::{Deserialize, Serialize};
use std::panic::{self, AssertUnwindSafe};

use crate::integration::registry::IntegrationRegistry;
use crate::integration::{Integration, ProcessResult, Settings, merge_settings};
use crate::storage::{FormSettingsStore, GlobalSettingsStore, LogEntry, LogStatus, SubmissionLog};
use crate::submission::Submission;

/// What happened to one integration for one submission
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutcomeStatus {
    Succeeded,
    Failed,
    /// Not registered, or not enabled for the form
    Skipped,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct IntegrationOutcome {
    pub integration_id: String,
    pub status: OutcomeStatus,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl IntegrationOutcome {
    fn skipped(integration_id: &str, message: &str) -> Self {
        Self {
            integration_id: integration_id.to_string(),
            status: OutcomeStatus::Skipped,
            message: message.to_string(),
            data: None,
        }
    }
}

/// Per-integration results for one submission
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DispatchReport {
    pub form_id: String,
    pub submission_id: String,
    pub outcomes: Vec<IntegrationOutcome>,
}

impl DispatchReport {
    /// Outcomes for integrations that were actually called
    pub fn invoked(&self) -> impl Iterator<Item = &IntegrationOutcome> {
        self.outcomes.iter().filter(|o| o.status != OutcomeStatus::Skipped)
    }

    pub fn succeeded(&self) -> impl Iterator<Item = &IntegrationOutcome> {
        self.outcomes.iter().filter(|o| o.status == OutcomeStatus::Succeeded)
    }

    pub fn failures(&self) -> impl Iterator<Item = &IntegrationOutcome> {
        self.outcomes.iter().filter(|o| o.status == OutcomeStatus::Failed)
    }
}

/// Routes submissions to the integrations enabled for their form
pub struct Dispatcher<'a> {
    registry: &'a IntegrationRegistry,
    forms: &'a FormSettingsStore,
    globals: &'a GlobalSettingsStore,
    log: &'a SubmissionLog,
}

impl<'a> Dispatcher<'a> {
    pub fn new(
        registry: &'a IntegrationRegistry,
        forms: &'a FormSettingsStore,
        globals: &'a GlobalSettingsStore,
        log: &'a SubmissionLog,
    ) -> Self {
        Self {
            registry,
            forms,
            globals,
            log,
        }
    }

    /// Dispatch one submission. Never fails; problems end up in the report.
    pub fn dispatch(&self, submission: &Submission) -> DispatchReport {
        let enabled = self.forms.enabled_integrations(&submission.form_id);
        let mut outcomes = Vec::with_capacity(enabled.len());

        if enabled.is_empty() {
            log::debug!("Form '{}' has no integration settings", submission.form_id);
        } else {
            let globals = self.globals.load_or_empty();

            for (integration_id, form_settings) in &enabled {
                let Some(integration) = self.registry.get(integration_id) else {
                    log::debug!("Integration '{}' is not registered, skipping", integration_id);
                    outcomes.push(IntegrationOutcome::skipped(integration_id, "not registered"));
                    continue;
                };

                if !integration.is_enabled(form_settings) {
                    outcomes.push(IntegrationOutcome::skipped(integration_id, "disabled for this form"));
                    continue;
                }

                let global = globals.get(integration_id).cloned().unwrap_or_default();
                let settings = resolve_settings(integration, &global, form_settings);
                let outcome = self.invoke(integration, submission, &settings);
                outcomes.push(outcome);
            }
        }

        DispatchReport {
            form_id: submission.form_id.clone(),
            submission_id: submission.submission_id.clone(),
            outcomes,
        }
    }

    /// Run one integration and record the result
    fn invoke(&self, integration: &dyn Integration, submission: &Submission, settings: &Settings) -> IntegrationOutcome {
        let id = integration.id().to_string();
        log::info!(
            "Dispatching submission {} (form '{}') to '{}'",
            submission.submission_id,
            submission.form_id,
            id
        );

        let result = panic::catch_unwind(AssertUnwindSafe(|| {
            integration.process_submission(&submission.submission_id, &submission.fields, settings)
        }));

        let (status, message, data) = match result {
            Ok(Ok(ProcessResult {
                success: true,
                message,
                data,
            })) => (OutcomeStatus::Succeeded, message, data),
            Ok(Ok(ProcessResult {
                success: false,
                message,
                data,
            })) => (OutcomeStatus::Failed, message, data),
            Ok(Err(e)) => (OutcomeStatus::Failed, format!("{:#}", e), None),
            Err(panic) => (
                OutcomeStatus::Failed,
                format!("integration panicked: {}", panic_message(panic.as_ref())),
                None,
            ),
        };

        match status {
            OutcomeStatus::Succeeded => log::info!("'{}' succeeded: {}", id, message),
            _ => log::error!("'{}' failed: {}", id, message),
        }

        let log_status = if status == OutcomeStatus::Succeeded {
            LogStatus::Success
        } else {
            LogStatus::Error
        };
        let entry = LogEntry::new(
            &submission.form_id,
            &submission.submission_id,
            &id,
            log_status,
            message.clone(),
            data.clone().unwrap_or(serde_json::Value::Null),
        );
        if let Err(e) = self.log.append(&entry) {
            log::warn!("Failed to record submission log entry for '{}': {:#}", id, e);
        }

        IntegrationOutcome {
            integration_id: id,
            status,
            message,
            data,
        }
    }
}

/// Defaults, then global settings, then the form's own settings
pub fn resolve_settings(integration: &dyn Integration, global: &Settings, form: &Settings) -> Settings {
    let with_global = merge_settings(&integration.default_settings(), global);
    merge_settings(&with_global, form)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
