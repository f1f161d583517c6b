//! Persistent state: integration settings and the submission log
//!
//! Both stores are plain files under the formbridge directory; single-line
//! appends and whole-file rewrites are the only write patterns.

pub mod log;
pub mod settings;

pub use self::log::{LogEntry, LogFilter, LogStatus, SubmissionLog};
pub use settings::{FormSettingsStore, GlobalSettingsStore, SettingsMap};
