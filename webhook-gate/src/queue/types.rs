//! Message type handed to downstream business handling.
//!
//! A [`VerifiedEvent`] only exists for deliveries that passed the signature
//! gate. It carries both the raw body that was verified and the parsed JSON
//! that business logic consumes, so the two can never drift apart.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// A webhook delivery whose signature has been checked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VerifiedEvent {
    /// Event name reported by the platform, when the payload carries one
    pub event_type: Option<String>,

    /// Unix seconds at which the delivery was accepted
    pub received_at: u64,

    /// The exact body text that was signed
    pub raw_body: String,

    /// Parsed form of `raw_body`
    pub payload: Value,
}

impl VerifiedEvent {
    /// Build an event from a verified body.
    ///
    /// Fails when the body is not UTF-8 JSON; callers must only pass bytes
    /// that already passed verification.
    pub fn from_verified_body(raw_body: &[u8]) -> Result<Self, serde_json::Error> {
        let payload: Value = serde_json::from_slice(raw_body)?;
        // from_slice accepted it, so it is valid UTF-8.
        let raw_body = String::from_utf8_lossy(raw_body).into_owned();

        let received_at = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs();

        Ok(Self {
            event_type: event_type(&payload),
            received_at,
            raw_body,
            payload,
        })
    }

    /// Identifier used for the queue message: event type plus the SHA-256
    /// of the verified body.
    ///
    /// Different bodies never share an ID; a redelivery of the same body
    /// keeps its ID so consumers can deduplicate on it.
    pub fn message_id(&self) -> String {
        format!(
            "{}-{}",
            self.event_type.as_deref().unwrap_or("unknown"),
            hex::encode(Sha256::digest(self.raw_body.as_bytes()))
        )
    }
}

/// Best-effort lookup of the event name.
///
/// Checks the usual top-level keys first, then the `data.meta.event_type`
/// envelope the platform uses for most deliveries.
pub fn event_type(payload: &Value) -> Option<String> {
    ["event", "event_type", "type"]
        .iter()
        .find_map(|key| payload.get(*key).and_then(Value::as_str))
        .or_else(|| payload.pointer("/data/meta/event_type").and_then(Value::as_str))
        .map(str::to_string)
}
