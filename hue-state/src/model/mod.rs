//! Model types for hue-state

mod color;
mod ids;
mod light;
mod room;
mod scene;

pub use color::{
    hs_to_xy, hsv_to_rgb, mirek_to_rgb, rgb_to_hue_sat, rgb_to_xy, xy_to_rgb, Color, ColorMode, Rgb,
    DEFAULT_MIREK, HUE_MAX, MIREK_MAX, MIREK_MIN, SATURATION_MAX,
};
pub use ids::{GroupedLightId, LightId, RoomId, SceneId};
pub use light::{mirek_in_range, percent_from_bridge, Light};
pub use room::Room;
pub use scene::Scene;
