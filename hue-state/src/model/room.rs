//! Rooms and their derived on/off aggregate

use std::collections::HashMap;

use super::ids::{GroupedLightId, LightId, RoomId};
use super::light::Light;

/// A room and the lights it contains, in display order
///
/// `all_on` and `any_on` are derived from the member lights and are only
/// written by [`Room::update_state`].
#[derive(Debug, Clone, PartialEq)]
pub struct Room {
    pub id: RoomId,
    pub name: String,
    /// Target for room-wide on/off; absent for the synthetic room
    pub grouped_light: Option<GroupedLightId>,
    pub lights: Vec<LightId>,
    all_on: bool,
    any_on: bool,
}

impl Room {
    pub fn new(id: impl Into<RoomId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            grouped_light: None,
            lights: Vec::new(),
            all_on: false,
            any_on: false,
        }
    }

    pub fn all_on(&self) -> bool {
        self.all_on
    }

    pub fn any_on(&self) -> bool {
        self.any_on
    }

    /// Recompute the aggregate from the member lights
    ///
    /// An empty room is neither all-on nor any-on. Returns true if either
    /// flag changed.
    pub fn update_state(&mut self, lights: &HashMap<LightId, Light>) -> bool {
        let members = self.lights.iter().filter_map(|id| lights.get(id));

        let (mut all_on, mut any_on, mut count) = (true, false, 0usize);
        for light in members {
            count += 1;
            all_on &= light.on();
            any_on |= light.on();
        }
        let all_on = all_on && count > 0;

        let changed = self.all_on != all_on || self.any_on != any_on;
        self.all_on = all_on;
        self.any_on = any_on;
        changed
    }
}
