//! A single light and its controllable state

use hue_api::LightResource;

use super::color::{Color, MIREK_MAX, MIREK_MIN};
use super::ids::LightId;

/// Convert a bridge brightness (fractional percent) to the model's unit
pub fn percent_from_bridge(brightness: f64) -> u8 {
    if brightness.is_nan() {
        return 0;
    }
    brightness.round().clamp(0.0, 100.0) as u8
}

/// True for temperatures the bridge accepts
///
/// The bridge reports 0 or null when a light leaves temperature mode.
pub fn mirek_in_range(mirek: i64) -> bool {
    (i64::from(MIREK_MIN)..=i64::from(MIREK_MAX)).contains(&mirek)
}

/// A light as rendered on the dashboard
///
/// Brightness is a percentage, 0..=100. State fields change only through
/// the setters, which report whether anything actually changed.
#[derive(Debug, Clone, PartialEq)]
pub struct Light {
    pub id: LightId,
    pub name: String,
    pub supports_color: bool,
    pub supports_color_temp: bool,
    /// Owning device, used to place the light in a room
    pub device_id: Option<String>,
    on: bool,
    brightness: u8,
    color: Option<Color>,
}

impl Light {
    pub fn new(id: impl Into<LightId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            supports_color: false,
            supports_color_temp: false,
            device_id: None,
            on: false,
            brightness: 0,
            color: None,
        }
    }

    /// Build from the bridge's light resource
    ///
    /// A valid temperature wins over xy: the bridge reports xy in every
    /// mode but nulls the temperature outside temperature mode.
    pub fn from_resource(resource: &LightResource) -> Self {
        let mut light = Light::new(resource.id.as_str(), resource.metadata.name.clone());
        light.device_id = resource.owner.as_ref().map(|owner| owner.rid.clone());
        light.supports_color = resource.color.is_some();
        light.supports_color_temp = resource.color_temperature.is_some();
        light.on = resource.on.map(|on| on.on).unwrap_or(false);
        light.brightness = match resource.dimming {
            Some(dimming) => percent_from_bridge(dimming.brightness),
            None => 100,
        };

        let live_mirek = resource
            .color_temperature
            .filter(|ct| ct.mirek_valid != Some(false))
            .and_then(|ct| ct.mirek)
            .filter(|m| mirek_in_range(*m));
        let xy = resource.color.and_then(|c| c.xy);

        light.color = match (live_mirek, xy) {
            (Some(mirek), _) => Some(Color::from_mirek(mirek as u16)),
            (None, Some(xy)) => Some(Color::from_xy(xy.x, xy.y)),
            (None, None) => None,
        };
        light
    }

    pub fn on(&self) -> bool {
        self.on
    }

    pub fn brightness(&self) -> u8 {
        self.brightness
    }

    pub fn color(&self) -> Option<&Color> {
        self.color.as_ref()
    }

    pub fn is_color_light(&self) -> bool {
        self.supports_color || self.supports_color_temp
    }

    pub fn set_on(&mut self, on: bool) -> bool {
        let changed = self.on != on;
        self.on = on;
        changed
    }

    /// Clamped to 100
    pub fn set_brightness(&mut self, brightness: u8) -> bool {
        let brightness = brightness.min(100);
        let changed = self.brightness != brightness;
        self.brightness = brightness;
        changed
    }

    /// Switch to temperature mode, creating the color state if needed
    pub fn set_mirek(&mut self, mirek: u16) -> bool {
        match self.color.as_mut() {
            Some(color) => color.set_mirek(mirek),
            None => {
                self.color = Some(Color::from_mirek(mirek));
                true
            }
        }
    }

    /// Switch to xy mode, creating the color state if needed
    pub fn set_xy(&mut self, x: f64, y: f64) -> bool {
        match self.color.as_mut() {
            Some(color) => color.set_xy(x, y),
            None => {
                self.color = Some(Color::from_xy(x, y));
                true
            }
        }
    }

    /// Apply a hue/saturation edit; returns the xy target to send
    pub fn set_hue_sat(&mut self, hue: u16, saturation: u8) -> (f64, f64) {
        self.color
            .get_or_insert_with(Color::default)
            .set_hue_sat_as_xy(hue, saturation)
    }
}
