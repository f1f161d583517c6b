//! Event emitter with multiple sink support

use chrono::{Local, Utc};
use colored::*;
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;

use crate::config::{ObservabilityConfig, ObservabilitySink};
use crate::dispatch::DispatchReport;
use crate::integration::loader::DiscoveryReport;

const EVENTS_FILE: &str = "events.jsonl";

/// Kinds of observable events
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub enum EventKind {
    IntegrationsLoaded,
    SubmissionDispatched,
}

/// An observable event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    /// Timestamp (UTC ISO 8601)
    pub timestamp: String,
    /// Local time for display
    pub local_time: String,
    pub event_type: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub form_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission_id: Option<String>,
    pub payload: serde_json::Value,
}

impl Event {
    fn new(event_type: EventKind, payload: serde_json::Value) -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
            local_time: Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            event_type,
            form_id: None,
            submission_id: None,
            payload,
        }
    }

    /// Discovery finished; `count` is the registry size after listeners ran
    pub fn integrations_loaded(count: usize, report: &DiscoveryReport) -> Self {
        Self::new(
            EventKind::IntegrationsLoaded,
            serde_json::json!({
                "count": count,
                "registered": report.registered,
                "skipped": report.skipped.len(),
            }),
        )
    }

    pub fn submission_dispatched(report: &DispatchReport) -> Self {
        let mut event = Self::new(
            EventKind::SubmissionDispatched,
            serde_json::json!({
                "invoked": report.invoked().count(),
                "succeeded": report.succeeded().count(),
                "failed": report.failures().count(),
            }),
        );
        event.form_id = Some(report.form_id.clone());
        event.submission_id = Some(report.submission_id.clone());
        event
    }

    /// Format for stdout display
    pub fn format_display(&self) -> String {
        let event_colored = match self.event_type {
            EventKind::IntegrationsLoaded => "IntegrationsLoaded".cyan(),
            EventKind::SubmissionDispatched => "SubmissionDispatched".green(),
        };

        let mut parts = vec![self.local_time.dimmed().to_string(), event_colored.to_string()];

        if let Some(ref form) = self.form_id {
            parts.push(form.bold().to_string());
        }

        if let Some(ref submission) = self.submission_id {
            parts.push(format!("[{}]", submission).dimmed().to_string());
        }

        match self.event_type {
            EventKind::IntegrationsLoaded => {
                let count = self.payload.get("count").and_then(|v| v.as_u64()).unwrap_or(0);
                parts.push(format!("{} registered", count));
            }
            EventKind::SubmissionDispatched => {
                let invoked = self.payload.get("invoked").and_then(|v| v.as_u64()).unwrap_or(0);
                let failed = self.payload.get("failed").and_then(|v| v.as_u64()).unwrap_or(0);
                let summary = format!("{} invoked, {} failed", invoked, failed);
                parts.push(if failed > 0 { summary.red().to_string() } else { summary });
            }
        }

        parts.join(" ")
    }
}

/// Event emitter that sends to multiple sinks
#[derive(Clone)]
pub struct EventEmitter {
    config: ObservabilityConfig,
    logs_dir: PathBuf,
}

impl EventEmitter {
    pub fn new(config: ObservabilityConfig, logs_dir: PathBuf) -> Self {
        Self { config, logs_dir }
    }

    /// Emit an event to all configured sinks. Sink failures are logged only.
    pub fn emit(&self, event: &Event) {
        if !self.config.enabled {
            return;
        }

        for sink in &self.config.sinks {
            match sink {
                ObservabilitySink::File => {
                    if let Err(e) = self.emit_to_file(event) {
                        log::warn!("Failed to emit to file sink: {}", e);
                    }
                }
                ObservabilitySink::Stdout => {
                    // stdout carries command output
                    eprintln!("{}", event.format_display());
                }
                ObservabilitySink::Http => {
                    if let Err(e) = self.emit_to_http(event) {
                        log::warn!("Failed to emit to HTTP sink: {}", e);
                    }
                }
            }
        }
    }

    pub fn events_path(&self) -> PathBuf {
        self.logs_dir.join(EVENTS_FILE)
    }

    /// Append event to the JSONL events file
    fn emit_to_file(&self, event: &Event) -> std::io::Result<()> {
        fs::create_dir_all(&self.logs_dir)?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.events_path())?;

        let json = serde_json::to_string(event)?;
        writeln!(file, "{}", json)?;

        Ok(())
    }

    /// POST event to HTTP endpoint
    fn emit_to_http(&self, event: &Event) -> Result<(), String> {
        let endpoint = self
            .config
            .http_endpoint
            .as_ref()
            .ok_or_else(|| "HTTP endpoint not configured".to_string())?;

        let body = serde_json::to_string(event).map_err(|e| e.to_string())?;

        match ureq::post(endpoint)
            .header("Content-Type", "application/json")
            .send(body.as_bytes())
        {
            Ok(_) => Ok(()),
            Err(e) => Err(format!("HTTP request failed: {}", e)),
        }
    }
}
