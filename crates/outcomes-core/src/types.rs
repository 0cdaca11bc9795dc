//! Shared types for the outcome forwarding pipeline.

use serde::{Deserialize, Serialize};

// ─── OutcomeKind ─────────────────────────────────────────────────────────────

/// The disposition of an ingested event, as encoded on the wire.
///
/// Only `Filtered` and `RateLimited` are actionable for signal forwarding;
/// every other kind passes through the consumer as a silent no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OutcomeKind {
    /// Event was accepted for ingestion (code 0).
    Accepted,
    /// Event was dropped by an inbound filter (code 1).
    Filtered,
    /// Event was dropped by a rate limiter (code 2).
    RateLimited,
    /// Event was rejected as invalid (code 3).
    Invalid,
    /// Event was rejected for abuse (code 4).
    Abuse,
    /// Any unrecognized or absent code.
    Unknown,
}

impl OutcomeKind {
    /// Map a wire code to an outcome kind. Unrecognized codes map to
    /// `Unknown` rather than failing — the decoder tolerates them and the
    /// processor skips them.
    pub fn from_code(code: i64) -> Self {
        match code {
            0 => Self::Accepted,
            1 => Self::Filtered,
            2 => Self::RateLimited,
            3 => Self::Invalid,
            4 => Self::Abuse,
            _ => Self::Unknown,
        }
    }

    /// Returns `true` if this kind triggers signal forwarding.
    pub fn is_actionable(&self) -> bool {
        matches!(self, Self::Filtered | Self::RateLimited)
    }

    /// Stable lowercase name, used for metric tags.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Accepted => "accepted",
            Self::Filtered => "filtered",
            Self::RateLimited => "rate_limited",
            Self::Invalid => "invalid",
            Self::Abuse => "abuse",
            Self::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ─── OutcomeRecord ───────────────────────────────────────────────────────────

/// A decoded outcome record — one per transport message.
///
/// Every field except `project_id` and `kind` is optional by design: the
/// decoder pushes unknown/missing fields downstream untouched and the
/// processor decides what to do with them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeRecord {
    /// Owning project. `0` means "no project" — a valid no-op, not an error.
    pub project_id: u64,
    /// Outcome kind decoded from the wire code.
    pub kind: OutcomeKind,
    /// Opaque event identifier, unique within a project.
    pub event_id: Option<String>,
    /// Why the event was filtered or rate limited.
    pub reason: Option<String>,
    /// Network address of the reporting client.
    pub remote_addr: Option<String>,
    /// Emission timestamp (`%Y-%m-%dT%H:%M:%S%.fZ`), used only for lag.
    pub timestamp: Option<String>,
}

// ─── Project ─────────────────────────────────────────────────────────────────

/// A project resolved from the external lookup store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: u64,
    pub slug: String,
}

impl Project {
    pub fn new(id: u64, slug: impl Into<String>) -> Self {
        Self {
            id,
            slug: slug.into(),
        }
    }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
