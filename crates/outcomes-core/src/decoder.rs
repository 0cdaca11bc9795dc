//! Payload decoder — raw transport bytes → `OutcomeRecord`.
//!
//! One-shot and stateless. The decoder tolerates unknown and missing fields:
//! a missing `project_id` becomes `0` (the no-project no-op) and a missing or
//! unrecognized `outcome` code becomes `OutcomeKind::Unknown`. Business
//! validation happens downstream in the processor, never here. The only
//! failure mode is a payload that is not parseable JSON.

use serde::Deserialize;

use crate::error::DecodeError;
use crate::types::{OutcomeKind, OutcomeRecord};

/// The outcome payload as both producers put it on the wire.
#[derive(Debug, Deserialize)]
struct RawOutcome {
    #[serde(default)]
    project_id: Option<u64>,
    #[serde(default)]
    outcome: Option<i64>,
    #[serde(default)]
    event_id: Option<String>,
    #[serde(default)]
    reason: Option<String>,
    #[serde(default)]
    remote_addr: Option<String>,
    #[serde(default)]
    timestamp: Option<String>,
}

/// Decode one raw message payload into an `OutcomeRecord`.
pub fn decode(payload: &[u8]) -> Result<OutcomeRecord, DecodeError> {
    let raw: RawOutcome = serde_json::from_slice(payload)?;
    Ok(OutcomeRecord {
        project_id: raw.project_id.unwrap_or(0),
        kind: raw
            .outcome
            .map(OutcomeKind::from_code)
            .unwrap_or(OutcomeKind::Unknown),
        event_id: raw.event_id,
        reason: raw.reason,
        remote_addr: raw.remote_addr,
        timestamp: raw.timestamp,
    })
}
