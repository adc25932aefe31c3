//! Conversion lifecycle events and the sink they are delivered through.
//!
//! The job runner only ever talks to [`EventSink`]; the delivery transport
//! (WebSocket fan-out in the server) is wired in at composition time.

use serde::{Deserialize, Serialize};

use crate::job::{JobProgress, JobResult};

/// A lifecycle or progress event emitted while a job runs.
///
/// Serialized as `{ "event": <kind>, "data": <payload> }` on the wire.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ConversionEvent {
    /// A progress snapshot for the file currently converting.
    Progress(JobProgress),
    /// One file finished, successfully or not.
    FileComplete(FileCompletion),
    /// The job reached a terminal state.
    JobComplete(JobResult),
    /// A job-level failure (not a per-file one).
    Error(ErrorDetail),
}

impl ConversionEvent {
    /// Stable kind label, used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Progress(_) => "progress",
            Self::FileComplete(_) => "file-complete",
            Self::JobComplete(_) => "job-complete",
            Self::Error(_) => "error",
        }
    }
}

/// Payload of a `file-complete` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileCompletion {
    pub file: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Payload of an `error` event.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorDetail {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Receives events for delivery to observers.
///
/// Fire-and-forget from the runner's perspective: implementations must not
/// block and must not fail the caller.
pub trait EventSink: Send + Sync {
    fn emit(&self, event: ConversionEvent);
}

/// Sink that drops every event; useful for headless runs and tests.
pub struct NullSink;

impl EventSink for NullSink {
    fn emit(&self, _event: ConversionEvent) {}
}
