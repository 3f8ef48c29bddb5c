//! Canonical records produced from the bridge's event stream

use chrono::{DateTime, Utc};
use hue_api::ResourceIdentifier;

/// The `type` tag of an event envelope
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    Update,
    Add,
    Delete,
    Error,
    Other(String),
}

impl EventKind {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "update" => EventKind::Update,
            "add" => EventKind::Add,
            "delete" => EventKind::Delete,
            "error" => EventKind::Error,
            other => EventKind::Other(other.to_string()),
        }
    }
}

/// The `type` of a resource inside an envelope's `data` array
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceKind {
    Light,
    GroupedLight,
    Room,
    Scene,
    Device,
    Other(String),
}

impl ResourceKind {
    pub fn parse(tag: &str) -> Self {
        match tag {
            "light" => ResourceKind::Light,
            "grouped_light" => ResourceKind::GroupedLight,
            "room" => ResourceKind::Room,
            "scene" => ResourceKind::Scene,
            "device" => ResourceKind::Device,
            other => ResourceKind::Other(other.to_string()),
        }
    }
}

/// One resource delta from the stream
///
/// Every state field is optional. `None` means the event said nothing about
/// that field, never "reset to default".
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceUpdate {
    pub event_kind: EventKind,
    pub resource_kind: ResourceKind,
    pub resource_id: String,
    /// Envelope creation time, when the bridge supplied a parseable one
    pub created_at: Option<DateTime<Utc>>,
    pub owner: Option<ResourceIdentifier>,
    pub on: Option<bool>,
    /// Percent, as sent by the bridge (may be fractional)
    pub brightness: Option<f64>,
    /// Mirek, unvalidated
    pub color_temp: Option<i64>,
    pub color_xy: Option<(f64, f64)>,
}

impl ResourceUpdate {
    /// A bare update carrying no state fields
    pub fn new(event_kind: EventKind, resource_kind: ResourceKind, resource_id: impl Into<String>) -> Self {
        Self {
            event_kind,
            resource_kind,
            resource_id: resource_id.into(),
            created_at: None,
            owner: None,
            on: None,
            brightness: None,
            color_temp: None,
            color_xy: None,
        }
    }

    /// True when no state field is present
    pub fn is_empty(&self) -> bool {
        self.on.is_none()
            && self.brightness.is_none()
            && self.color_temp.is_none()
            && self.color_xy.is_none()
    }
}

/// What the subscription delivers to its consumer
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A connection to the bridge was established
    Connected,
    /// The connection was lost or could not be made; a retry follows
    Disconnected(String),
    /// Updates from one batching window, in arrival order
    Batch(Vec<ResourceUpdate>),
}
