//! Messages accepted by the reconciler and the bridge commands it issues

use hue_api::{BridgeClient, BridgeSnapshot, MIREK_MAX, MIREK_MIN};

use crate::decoder::LightUpdate;
use crate::model::{
    Color, GroupedLightId, Light, LightId, RoomId, SceneId, DEFAULT_MIREK, HUE_MAX, SATURATION_MAX,
};
use crate::pending::{Direction, Field, PendingTarget};

/// A user edit to one light
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LightChange {
    On(bool),
    /// Percent, clamped to 100
    Brightness(u8),
    /// Mirek, clamped to the bridge range
    ColorTemp(u16),
    ColorXy(f64, f64),
    /// Hue 0..=65535 and saturation 0..=254, sent to the bridge as xy
    HueSat(u16, u8),
    /// Relative brightness, resolved against the model when applied
    ///
    /// The result never drops below `min`; landing on zero turns the
    /// light off instead.
    BrightnessStep { delta: i8, min: u8 },
    /// Relative temperature in mirek
    ColorTempStep(i16),
    /// Relative hue (wrapping) and saturation (clamped)
    HueSatStep { hue: i32, saturation: i16 },
}

impl LightChange {
    pub fn field(&self) -> Field {
        match self {
            LightChange::On(_) => Field::On,
            LightChange::Brightness(_) | LightChange::BrightnessStep { .. } => Field::Brightness,
            LightChange::ColorTemp(_) | LightChange::ColorTempStep(_) => Field::ColorTemp,
            LightChange::ColorXy(..) | LightChange::HueSat(..) | LightChange::HueSatStep { .. } => {
                Field::ColorXy
            }
        }
    }

    /// The value the tracker waits for; `None` for unresolved `HueSat` and steps
    pub fn pending_target(&self) -> Option<PendingTarget> {
        match *self {
            LightChange::On(on) => Some(PendingTarget::Bool(on)),
            LightChange::Brightness(b) => Some(PendingTarget::Scalar(f64::from(b))),
            LightChange::ColorTemp(m) => Some(PendingTarget::Scalar(f64::from(m))),
            LightChange::ColorXy(x, y) => Some(PendingTarget::Pair(x, y)),
            LightChange::HueSat(..)
            | LightChange::BrightnessStep { .. }
            | LightChange::ColorTempStep(_)
            | LightChange::HueSatStep { .. } => None,
        }
    }

    /// Turn a step into an absolute change against `light`
    ///
    /// Absolute changes pass through with `direction`. Returns `None` when
    /// the step would leave the value where it is.
    pub fn resolve(self, light: &Light, direction: Direction) -> Option<(LightChange, Direction)> {
        match self {
            LightChange::BrightnessStep { delta, min } => {
                let current = light.brightness();
                let floor = i16::from(min.min(100));
                let target = (i16::from(current) + i16::from(delta)).clamp(floor, 100) as u8;
                if target == current {
                    return None;
                }
                if target == 0 {
                    return Some((LightChange::On(false), Direction::Exact));
                }
                Some((LightChange::Brightness(target), direction_between(current, target)))
            }
            LightChange::ColorTempStep(delta) => {
                let current = match light.color().map(Color::stored_mirek) {
                    Some(0) | None => DEFAULT_MIREK,
                    Some(mirek) => mirek,
                };
                let target = (i32::from(current) + i32::from(delta))
                    .clamp(i32::from(MIREK_MIN), i32::from(MIREK_MAX)) as u16;
                if target == current {
                    return None;
                }
                Some((LightChange::ColorTemp(target), direction_between(current, target)))
            }
            LightChange::HueSatStep { hue, saturation } => {
                let (current_hue, current_sat) = light.color().map(Color::editable_hue_sat).unwrap_or((0, 0));
                let circle = i32::from(HUE_MAX) + 1;
                let hue = (i32::from(current_hue) + hue).rem_euclid(circle) as u16;
                let sat = (i16::from(current_sat) + saturation).clamp(0, i16::from(SATURATION_MAX)) as u8;
                if (hue, sat) == (current_hue, current_sat) {
                    return None;
                }
                Some((LightChange::HueSat(hue, sat), Direction::Exact))
            }
            absolute => Some((absolute, direction)),
        }
    }

    /// Bring the value into the range the bridge accepts
    pub fn normalized(self) -> Self {
        match self {
            LightChange::Brightness(b) => LightChange::Brightness(b.min(100)),
            LightChange::ColorTemp(m) => LightChange::ColorTemp(m.clamp(MIREK_MIN, MIREK_MAX)),
            other => other,
        }
    }
}

/// A local edit to one light, sent before any bridge call is issued
#[derive(Debug, Clone, PartialEq)]
pub struct LocalIntent {
    pub light_id: LightId,
    pub change: LightChange,
    pub direction: Direction,
}

impl LocalIntent {
    pub fn new(light_id: impl Into<LightId>, change: LightChange, direction: Direction) -> Self {
        Self {
            light_id: light_id.into(),
            change,
            direction,
        }
    }

    /// An intent confirmed only by an exact echo (on/off, colors)
    pub fn exact(light_id: impl Into<LightId>, change: LightChange) -> Self {
        Self::new(light_id, change, Direction::Exact)
    }

    /// A brightness step; the direction follows from the current value
    pub fn brightness(light_id: impl Into<LightId>, current: u8, target: u8) -> Self {
        Self::new(light_id, LightChange::Brightness(target), direction_between(current, target))
    }

    /// Brighten or dim by `delta` percent from whatever the model holds
    /// when the intent is applied
    pub fn brightness_step(light_id: impl Into<LightId>, delta: i8, min: u8) -> Self {
        Self::new(light_id, LightChange::BrightnessStep { delta, min }, direction_of(delta.into()))
    }

    pub fn color_temp_step(light_id: impl Into<LightId>, delta: i16) -> Self {
        Self::new(light_id, LightChange::ColorTempStep(delta), direction_of(delta.into()))
    }

    /// A temperature step; the direction follows from the current value
    pub fn color_temp(light_id: impl Into<LightId>, current: u16, target: u16) -> Self {
        Self::new(light_id, LightChange::ColorTemp(target), direction_between(current, target))
    }

    pub fn field(&self) -> Field {
        self.change.field()
    }
}

fn direction_of(delta: i32) -> Direction {
    direction_between(0, delta)
}

fn direction_between<T: PartialOrd>(current: T, target: T) -> Direction {
    if target > current {
        Direction::Increasing
    } else if target < current {
        Direction::Decreasing
    } else {
        Direction::Exact
    }
}

/// A bridge call issued by the reconciler
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    SetOn { light_id: LightId, on: bool },
    SetBrightness { light_id: LightId, brightness: u8 },
    SetColorTemp { light_id: LightId, mirek: u16 },
    SetColorXy { light_id: LightId, x: f64, y: f64 },
    SetGroupOn { grouped_light_id: GroupedLightId, on: bool },
    ActivateScene { scene_id: SceneId },
}

impl Command {
    /// The bridge call for a light change
    ///
    /// `None` for `HueSat` and steps, which the model must resolve first.
    pub fn for_light(light_id: LightId, change: LightChange) -> Option<Self> {
        let command = match change {
            LightChange::On(on) => Command::SetOn { light_id, on },
            LightChange::Brightness(brightness) => Command::SetBrightness { light_id, brightness },
            LightChange::ColorTemp(mirek) => Command::SetColorTemp { light_id, mirek },
            LightChange::ColorXy(x, y) => Command::SetColorXy { light_id, x, y },
            LightChange::HueSat(..)
            | LightChange::BrightnessStep { .. }
            | LightChange::ColorTempStep(_)
            | LightChange::HueSatStep { .. } => return None,
        };
        Some(command)
    }

    /// Short label for error banners and logs
    pub fn describe(&self) -> String {
        match self {
            Command::SetOn { light_id, on } => format!("turn {} {}", light_id, if *on { "on" } else { "off" }),
            Command::SetBrightness { light_id, brightness } => {
                format!("set {} brightness to {}%", light_id, brightness)
            }
            Command::SetColorTemp { light_id, mirek } => format!("set {} temperature to {}", light_id, mirek),
            Command::SetColorXy { light_id, x, y } => format!("set {} color to ({:.4}, {:.4})", light_id, x, y),
            Command::SetGroupOn { grouped_light_id, on } => {
                format!("turn group {} {}", grouped_light_id, if *on { "on" } else { "off" })
            }
            Command::ActivateScene { scene_id } => format!("activate scene {}", scene_id),
        }
    }

    pub async fn execute(&self, client: &dyn BridgeClient) -> hue_api::Result<()> {
        match self {
            Command::SetOn { light_id, on } => client.set_light_on(light_id.as_str(), *on).await,
            Command::SetBrightness { light_id, brightness } => {
                client.set_light_brightness(light_id.as_str(), *brightness).await
            }
            Command::SetColorTemp { light_id, mirek } => {
                client.set_light_color_temp(light_id.as_str(), *mirek).await
            }
            Command::SetColorXy { light_id, x, y } => client.set_light_color_xy(light_id.as_str(), *x, *y).await,
            Command::SetGroupOn { grouped_light_id, on } => {
                client.set_grouped_light_on(grouped_light_id.as_str(), *on).await
            }
            Command::ActivateScene { scene_id } => client.activate_scene(scene_id.as_str()).await,
        }
    }
}

/// What the reconciler consumes
#[derive(Debug)]
pub enum Message {
    LocalIntent(LocalIntent),
    /// A decoded update from the event stream
    RemoteUpdate(LightUpdate),
    /// Room-wide on/off through grouped control
    GroupIntent { room_id: RoomId, on: bool },
    ActivateScene { scene_id: SceneId },
    /// Reload everything from the bridge
    Refresh,
    /// Result of a spawned bridge call
    CommandFinished {
        command: Command,
        result: Result<(), String>,
    },
    /// Result of a fetch-all
    SnapshotLoaded(Result<BridgeSnapshot, String>),
    Shutdown,
}

impl From<LocalIntent> for Message {
    fn from(intent: LocalIntent) -> Self {
        Message::LocalIntent(intent)
    }
}

impl From<LightUpdate> for Message {
    fn from(update: LightUpdate) -> Self {
        Message::RemoteUpdate(update)
    }
}
