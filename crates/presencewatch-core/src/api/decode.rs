//! Unwrapping of proxy responses.
//!
//! Mirrors return the widget document in one of two shapes: passed through
//! untouched, or wrapped as a JSON string under `contents` (allorigins-style
//! `get` endpoints). Shapes are tried in a fixed order and the first
//! structural match wins.

use serde::Deserialize;

use crate::models::PresencePayload;

use super::FetchError;

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Envelope {
    Wrapped { contents: String },
    Direct(PresencePayload),
}

/// Decode a response body into a validated presence payload.
pub fn decode_payload(body: &str) -> Result<PresencePayload, FetchError> {
    let envelope: Envelope = serde_json::from_str(body).map_err(|e| {
        FetchError::Malformed(format!("unrecognised response shape: {}", e))
    })?;

    match envelope {
        Envelope::Wrapped { contents } => serde_json::from_str(&contents)
            .map_err(|e| FetchError::Malformed(format!("invalid wrapped contents: {}", e))),
        Envelope::Direct(payload) => Ok(payload),
    }
}
