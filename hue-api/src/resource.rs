//! Wire types for CLIP v2 resources
//!
//! These mirror the JSON the bridge returns from `/clip/v2/resource/*` and
//! pushes on the event stream. Everything the bridge may omit is optional;
//! conversion into domain types happens in `hue-state`.

use serde::{Deserialize, Serialize};

/// Reference to another resource (`{"rid": ..., "rtype": ...}`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceIdentifier {
    pub rid: String,
    pub rtype: String,
}

impl ResourceIdentifier {
    pub fn new(rid: impl Into<String>, rtype: impl Into<String>) -> Self {
        Self {
            rid: rid.into(),
            rtype: rtype.into(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub archetype: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct On {
    pub on: bool,
}

/// Brightness in percent, 0.0-100.0
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dimming {
    pub brightness: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MirekSchema {
    pub mirek_minimum: u16,
    pub mirek_maximum: u16,
}

/// `mirek` is null while the light is in XY mode
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorTemperature {
    #[serde(default)]
    pub mirek: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirek_valid: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mirek_schema: Option<MirekSchema>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Xy {
    pub x: f64,
    pub y: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Gamut {
    pub red: Xy,
    pub green: Xy,
    pub blue: Xy,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ColorResource {
    #[serde(default)]
    pub xy: Option<Xy>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gamut: Option<Gamut>,
}

/// `GET /clip/v2/resource/light` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LightResource {
    pub id: String,
    #[serde(default)]
    pub owner: Option<ResourceIdentifier>,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub on: Option<On>,
    #[serde(default)]
    pub dimming: Option<Dimming>,
    #[serde(default)]
    pub color_temperature: Option<ColorTemperature>,
    #[serde(default)]
    pub color: Option<ColorResource>,
}

/// `GET /clip/v2/resource/room` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoomResource {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub children: Vec<ResourceIdentifier>,
    #[serde(default)]
    pub services: Vec<ResourceIdentifier>,
}

impl RoomResource {
    /// The grouped_light service used for room-wide on/off
    pub fn grouped_light_id(&self) -> Option<&str> {
        self.services
            .iter()
            .find(|svc| svc.rtype == "grouped_light")
            .map(|svc| svc.rid.as_str())
    }

    /// Device children of the room
    pub fn device_ids(&self) -> impl Iterator<Item = &str> {
        self.children
            .iter()
            .filter(|child| child.rtype == "device")
            .map(|child| child.rid.as_str())
    }
}

/// `GET /clip/v2/resource/device` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeviceResource {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub services: Vec<ResourceIdentifier>,
}

impl DeviceResource {
    /// Light services owned by this device
    pub fn light_ids(&self) -> impl Iterator<Item = &str> {
        self.services
            .iter()
            .filter(|svc| svc.rtype == "light")
            .map(|svc| svc.rid.as_str())
    }
}

/// `GET /clip/v2/resource/scene` entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneResource {
    pub id: String,
    #[serde(default)]
    pub metadata: Metadata,
    #[serde(default)]
    pub group: Option<ResourceIdentifier>,
    #[serde(default)]
    pub speed: Option<f64>,
    #[serde(default)]
    pub auto_dynamic: bool,
}

/// Response envelope shared by all CLIP v2 endpoints
#[derive(Debug, Clone, Deserialize)]
pub struct ApiResponse<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
    #[serde(default)]
    pub errors: Vec<ErrorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorEntry {
    pub description: String,
}

/// Everything `fetch_all` pulls from the bridge, unprocessed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BridgeSnapshot {
    pub rooms: Vec<RoomResource>,
    pub lights: Vec<LightResource>,
    pub devices: Vec<DeviceResource>,
    pub scenes: Vec<SceneResource>,
}
