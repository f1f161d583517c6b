//! Submission log
//!
//! One JSON line per integration invocation, appended to
//! `logs/submissions.jsonl`. Entries are never updated; retention rewrites
//! the file without entries older than a cutoff.
//!
//! Appends and retention both hold an exclusive lock on
//! `submissions.jsonl.lock`, so a prune in one process cannot drop lines a
//! concurrent `submit` appends.

use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

const LOG_FILE: &str = "submissions.jsonl";

/// Outcome recorded for one invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStatus {
    Success,
    Error,
}

impl std::fmt::Display for LogStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LogStatus::Success => "success",
            LogStatus::Error => "error",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for LogStatus {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "success" => Ok(Self::Success),
            "error" => Ok(Self::Error),
            other => eyre::bail!("Unknown log status: {}", other),
        }
    }
}

/// A submission log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    pub id: String,
    pub form_id: String,
    pub submission_id: String,
    pub integration_id: String,
    pub status: LogStatus,
    pub message: String,
    #[serde(default)]
    pub data: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl LogEntry {
    pub fn new(
        form_id: &str,
        submission_id: &str,
        integration_id: &str,
        status: LogStatus,
        message: impl Into<String>,
        data: serde_json::Value,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            form_id: form_id.to_string(),
            submission_id: submission_id.to_string(),
            integration_id: integration_id.to_string(),
            status,
            message: message.into(),
            data,
            created_at: Utc::now(),
        }
    }
}

/// Filter for [`SubmissionLog::query`]
#[derive(Debug, Clone, Default)]
pub struct LogFilter {
    pub form_id: Option<String>,
    pub submission_id: Option<String>,
    pub integration_id: Option<String>,
    pub status: Option<LogStatus>,
    /// Keep only the newest N matches
    pub last: Option<usize>,
}

impl LogFilter {
    fn matches(&self, entry: &LogEntry) -> bool {
        self.form_id.as_ref().is_none_or(|f| *f == entry.form_id)
            && self.submission_id.as_ref().is_none_or(|s| *s == entry.submission_id)
            && self.integration_id.as_ref().is_none_or(|i| *i == entry.integration_id)
            && self.status.is_none_or(|s| s == entry.status)
    }
}

/// Append-only submission log store
pub struct SubmissionLog {
    path: PathBuf,
}

impl SubmissionLog {
    pub fn new(logs_dir: &Path) -> Self {
        Self {
            path: logs_dir.join(LOG_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Exclusive lock held until the returned file is dropped
    fn lock(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).context("Failed to create logs directory")?;
        }

        let lock_path = self.path.with_extension("jsonl.lock");
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(&lock_path)
            .with_context(|| format!("Failed to open log lock: {}", lock_path.display()))?;
        file.lock().context("Failed to lock submission log")?;
        Ok(file)
    }

    /// Append one entry
    pub fn append(&self, entry: &LogEntry) -> Result<()> {
        let _lock = self.lock()?;

        let json_line = serde_json::to_string(entry).context("Failed to serialize log entry")?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .with_context(|| format!("Failed to open submission log: {}", self.path.display()))?;

        writeln!(file, "{}", json_line).context("Failed to write log entry")?;

        log::debug!(
            "Logged {} for {}/{} ({})",
            entry.status,
            entry.form_id,
            entry.integration_id,
            entry.submission_id
        );
        Ok(())
    }

    /// Read every entry, oldest first; unparsable lines are skipped
    pub fn read_all(&self) -> Result<Vec<LogEntry>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }

        let content = fs::read_to_string(&self.path).context("Failed to read submission log")?;

        let mut entries = Vec::new();
        for line in content.lines() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str(line) {
                Ok(entry) => entries.push(entry),
                Err(e) => log::warn!("Failed to parse log line: {}", e),
            }
        }
        Ok(entries)
    }

    pub fn query(&self, filter: &LogFilter) -> Result<Vec<LogEntry>> {
        let mut entries: Vec<LogEntry> = self.read_all()?.into_iter().filter(|e| filter.matches(e)).collect();
        if let Some(n) = filter.last {
            let excess = entries.len().saturating_sub(n);
            entries.drain(..excess);
        }
        Ok(entries)
    }

    /// Drop entries created before `cutoff`; returns how many were removed
    pub fn prune(&self, cutoff: DateTime<Utc>) -> Result<usize> {
        let _lock = self.lock()?;
        let entries = self.read_all()?;
        let before = entries.len();
        let kept: Vec<&LogEntry> = entries.iter().filter(|e| e.created_at >= cutoff).collect();
        let removed = before - kept.len();

        if removed == 0 {
            return Ok(0);
        }

        let mut content = String::new();
        for entry in kept {
            content.push_str(&serde_json::to_string(entry).context("Failed to serialize log entry")?);
            content.push('\n');
        }

        // Write-then-rename so a crash never leaves a half-written log
        let tmp = self.path.with_extension("jsonl.tmp");
        fs::write(&tmp, content).context("Failed to write pruned log")?;
        fs::rename(&tmp, &self.path).context("Failed to replace submission log")?;

        log::info!("Pruned {} submission log entries older than {}", removed, cutoff);
        Ok(removed)
    }
}
