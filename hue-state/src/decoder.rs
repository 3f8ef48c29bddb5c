//! Event decoder - converts stream updates into light updates
//!
//! The stream passes every resource kind through. The reconciler only
//! consumes `update` events for `light` resources; everything else is
//! filtered here.

use hue_stream::{EventKind, ResourceKind, ResourceUpdate};

use crate::model::{percent_from_bridge, LightId};

/// Field changes for one light from one stream record
///
/// Absent fields mean "unchanged". Brightness is already in the model's
/// percent unit; the color temperature is passed through unvalidated.
#[derive(Debug, Clone, PartialEq)]
pub struct LightUpdate {
    pub light_id: LightId,
    pub on: Option<bool>,
    pub brightness: Option<u8>,
    pub color_temp: Option<i64>,
    pub color_xy: Option<(f64, f64)>,
}

impl LightUpdate {
    pub fn new(light_id: impl Into<LightId>) -> Self {
        Self {
            light_id: light_id.into(),
            on: None,
            brightness: None,
            color_temp: None,
            color_xy: None,
        }
    }

    pub fn with_on(mut self, on: bool) -> Self {
        self.on = Some(on);
        self
    }

    pub fn with_brightness(mut self, brightness: u8) -> Self {
        self.brightness = Some(brightness);
        self
    }

    pub fn with_color_temp(mut self, mirek: i64) -> Self {
        self.color_temp = Some(mirek);
        self
    }

    pub fn with_color_xy(mut self, x: f64, y: f64) -> Self {
        self.color_xy = Some((x, y));
        self
    }
}

/// Decode one stream record; `None` for anything that is not a light update
pub fn decode_update(update: &ResourceUpdate) -> Option<LightUpdate> {
    if update.event_kind != EventKind::Update || update.resource_kind != ResourceKind::Light {
        return None;
    }
    if update.is_empty() {
        return None;
    }

    Some(LightUpdate {
        light_id: LightId::new(update.resource_id.as_str()),
        on: update.on,
        brightness: update.brightness.map(percent_from_bridge),
        color_temp: update.color_temp,
        color_xy: update.color_xy,
    })
}

/// Decode a batch, preserving order
pub fn decode_batch(updates: &[ResourceUpdate]) -> Vec<LightUpdate> {
    updates.iter().filter_map(decode_update).collect()
}
