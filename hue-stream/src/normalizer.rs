//! Event payload normalization
//!
//! The bridge sends each SSE `data:` payload as a JSON array of envelopes:
//!
//! ```json
//! [{"creationtime": "2024-01-01T00:00:00Z", "id": "...", "type": "update",
//!   "data": [{"id": "...", "type": "light", "dimming": {"brightness": 55.0}}]}]
//! ```
//!
//! Every resource delta in every envelope becomes one [`ResourceUpdate`].
//! Malformed records are dropped individually; a malformed payload yields
//! nothing. Nothing here returns an error.

use chrono::{DateTime, Utc};
use hue_api::{ResourceIdentifier, Xy};
use serde::Deserialize;
use serde_json::Value;

use crate::event::{EventKind, ResourceKind, ResourceUpdate};

#[derive(Debug, Deserialize)]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    creationtime: Option<String>,
    #[serde(default)]
    data: Vec<Value>,
}

#[derive(Debug, Deserialize)]
struct RawRecord {
    id: String,
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    owner: Option<ResourceIdentifier>,
    #[serde(default)]
    on: Option<RawOn>,
    #[serde(default)]
    dimming: Option<RawDimming>,
    #[serde(default)]
    color_temperature: Option<RawColorTemperature>,
    #[serde(default)]
    color: Option<RawColor>,
}

#[derive(Debug, Deserialize)]
struct RawOn {
    on: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct RawDimming {
    brightness: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawColorTemperature {
    #[serde(default)]
    mirek: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct RawColor {
    #[serde(default)]
    xy: Option<Xy>,
}

/// Turn one SSE payload into resource updates, in payload order
pub fn normalize_payload(payload: &[u8]) -> Vec<ResourceUpdate> {
    let root: Value = match serde_json::from_slice(payload) {
        Ok(value) => value,
        Err(e) => {
            tracing::debug!("dropping unparseable event payload: {}", e);
            return Vec::new();
        }
    };

    let Value::Array(envelopes) = root else {
        tracing::debug!("dropping event payload that is not an array");
        return Vec::new();
    };

    let mut updates = Vec::new();
    for raw in envelopes {
        let envelope: RawEnvelope = match serde_json::from_value(raw) {
            Ok(envelope) => envelope,
            Err(e) => {
                tracing::debug!("dropping malformed envelope: {}", e);
                continue;
            }
        };
        normalize_envelope(envelope, &mut updates);
    }
    updates
}

fn normalize_envelope(envelope: RawEnvelope, out: &mut Vec<ResourceUpdate>) {
    let event_kind = EventKind::parse(&envelope.kind);
    let created_at = envelope.creationtime.as_deref().and_then(parse_timestamp);

    for raw in envelope.data {
        match serde_json::from_value::<RawRecord>(raw) {
            Ok(record) => out.push(record_to_update(record, event_kind.clone(), created_at)),
            Err(e) => tracing::debug!("dropping malformed resource record: {}", e),
        }
    }
}

fn record_to_update(
    record: RawRecord,
    event_kind: EventKind,
    created_at: Option<DateTime<Utc>>,
) -> ResourceUpdate {
    ResourceUpdate {
        event_kind,
        resource_kind: ResourceKind::parse(&record.kind),
        resource_id: record.id,
        created_at,
        owner: record.owner,
        on: record.on.and_then(|o| o.on),
        brightness: record.dimming.and_then(|d| d.brightness),
        color_temp: record.color_temperature.and_then(|ct| ct.mirek),
        color_xy: record.color.and_then(|c| c.xy).map(|xy| (xy.x, xy.y)),
    }
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}
