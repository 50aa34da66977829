use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::archive::ArchivedMessage;
use crate::destination::OutgoingMessage;

/// A message that could not be relayed. Persisted as `<ts>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureRecord {
    pub ts: String,
    pub channel: String,
    pub error: String,
    pub recorded_at: DateTime<Utc>,
    /// The record exactly as it appeared in the archive.
    pub message: ArchivedMessage,
    /// What was sent to the relay endpoint.
    pub payload: OutgoingMessage,
}
