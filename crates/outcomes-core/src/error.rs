//! Error types for the outcome forwarding pipeline.

use thiserror::Error;

/// Errors that can occur while decoding a single transport payload.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] serde_json::Error),
}

/// Errors that can occur in the per-record pipeline.
///
/// None of these are fatal to a batch: the processor logs the failing record
/// and moves on. The only retry mechanism is upstream redelivery.
#[derive(Debug, Error)]
pub enum OutcomeError {
    #[error("Project {project_id} not found")]
    ProjectNotFound { project_id: u64 },

    #[error("Store error: {0}")]
    Store(String),

    #[error("Invalid timestamp '{value}': {reason}")]
    InvalidTimestamp { value: String, reason: String },
}

/// A failure inside a single signal listener.
///
/// Isolated by the hub's robust dispatch: it never stops delivery to other
/// listeners and never aborts the pipeline.
#[derive(Debug, Error)]
pub enum SignalError {
    #[error("Listener rejected signal: {reason}")]
    Rejected { reason: String },

    #[error("{0}")]
    Other(String),
}

/// Errors from the transport seam (poll/commit).
///
/// The only fatal path in the consumer: a transport failure aborts the run
/// loop and is handled by the embedding process.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Source connection failed: {reason}")]
    ConnectionFailed { reason: String },

    #[error("Commit failed: {reason}")]
    CommitFailed { reason: String },

    #[error("Source closed unexpectedly")]
    Closed,

    #[error("{0}")]
    Other(String),
}
