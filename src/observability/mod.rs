//! Observability module for lifecycle events
//!
//! Provides event emission to multiple sinks:
//! - File (JSONL) - appends to logs/events.jsonl
//! - Stdout - prints formatted events (to stderr, stdout is command output)
//! - HTTP - POSTs events to configured endpoint

pub mod emitter;

pub use emitter::{Event, EventEmitter};
