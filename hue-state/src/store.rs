//! The light model: a flat light index plus ordered rooms
//!
//! Lights live in one map keyed by id so stream updates resolve in O(1).
//! Rooms only hold ids. Every light mutation goes through
//! [`LightStore::update_light`], which keeps the owning room's aggregate
//! in sync.

use std::collections::HashMap;

use hue_api::BridgeSnapshot;

use crate::model::{Light, LightId, Room, RoomId, Scene, SceneId};

/// Display name of the room that collects unassigned lights
pub const UNASSIGNED_ROOM_NAME: &str = "Other Lights";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct LightStore {
    lights: HashMap<LightId, Light>,
    rooms: Vec<Room>,
    /// Light id -> index into `rooms`
    light_rooms: HashMap<LightId, usize>,
    scenes: Vec<Scene>,
}

impl LightStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the model from a fresh bridge snapshot
    ///
    /// Lights are placed in rooms through the device that owns them.
    /// Lights no room claims go to a trailing "Other Lights" room; rooms
    /// left without lights are dropped.
    pub fn from_snapshot(snapshot: &BridgeSnapshot) -> Self {
        let mut light_device: HashMap<&str, &str> = HashMap::new();
        for device in &snapshot.devices {
            for light_id in device.light_ids() {
                light_device.insert(light_id, device.id.as_str());
            }
        }

        let mut device_room: HashMap<&str, usize> = HashMap::new();
        for (idx, room) in snapshot.rooms.iter().enumerate() {
            for device_id in room.device_ids() {
                device_room.insert(device_id, idx);
            }
        }

        let mut grouped: Vec<Vec<Light>> = vec![Vec::new(); snapshot.rooms.len()];
        let mut unassigned = Vec::new();

        for resource in &snapshot.lights {
            let mut light = Light::from_resource(resource);
            if let Some(device) = light_device.get(resource.id.as_str()) {
                light.device_id = Some(device.to_string());
            }

            let room_idx = light
                .device_id
                .as_deref()
                .and_then(|device| device_room.get(device).copied());
            match room_idx {
                Some(idx) => grouped[idx].push(light),
                None => unassigned.push(light),
            }
        }

        let mut store = LightStore::new();
        for (resource, lights) in snapshot.rooms.iter().zip(grouped) {
            if lights.is_empty() {
                continue;
            }
            let mut room = Room::new(resource.id.as_str(), resource.metadata.name.clone());
            room.grouped_light = resource.grouped_light_id().map(Into::into);
            store.add_room(room, lights);
        }
        if !unassigned.is_empty() {
            store.add_room(Room::new(RoomId::unassigned(), UNASSIGNED_ROOM_NAME), unassigned);
        }

        let room_names: HashMap<&str, &str> = snapshot
            .rooms
            .iter()
            .map(|r| (r.id.as_str(), r.metadata.name.as_str()))
            .collect();
        store.scenes = snapshot
            .scenes
            .iter()
            .map(|resource| {
                let mut scene = Scene::from_resource(resource);
                if let Some(name) = scene
                    .room_id
                    .as_ref()
                    .and_then(|id| room_names.get(id.as_str()))
                {
                    scene.room_name = name.to_string();
                }
                scene
            })
            .collect();

        store
    }

    /// Append a room with its lights, replacing the room's light list
    pub fn add_room(&mut self, mut room: Room, lights: Vec<Light>) {
        let idx = self.rooms.len();
        room.lights = lights.iter().map(|light| light.id.clone()).collect();
        for light in lights {
            self.light_rooms.insert(light.id.clone(), idx);
            self.lights.insert(light.id.clone(), light);
        }
        room.update_state(&self.lights);
        self.rooms.push(room);
    }

    pub fn add_scene(&mut self, scene: Scene) {
        self.scenes.push(scene);
    }

    pub fn light(&self, id: &LightId) -> Option<&Light> {
        self.lights.get(id)
    }

    pub fn contains_light(&self, id: &LightId) -> bool {
        self.lights.contains_key(id)
    }

    pub fn light_count(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    pub fn rooms(&self) -> &[Room] {
        &self.rooms
    }

    pub fn room(&self, id: &RoomId) -> Option<&Room> {
        self.rooms.iter().find(|room| &room.id == id)
    }

    /// The room a light belongs to
    pub fn room_of(&self, light_id: &LightId) -> Option<&Room> {
        self.light_rooms
            .get(light_id)
            .and_then(|idx| self.rooms.get(*idx))
    }

    /// Lights of a room in display order
    pub fn room_lights<'a>(&'a self, room: &'a Room) -> impl Iterator<Item = &'a Light> + 'a {
        room.lights.iter().filter_map(move |id| self.lights.get(id))
    }

    pub fn scenes(&self) -> &[Scene] {
        &self.scenes
    }

    pub fn scene(&self, id: &SceneId) -> Option<&Scene> {
        self.scenes.iter().find(|scene| &scene.id == id)
    }

    pub fn scenes_for_room<'a>(&'a self, room_id: &RoomId) -> impl Iterator<Item = &'a Scene> + 'a {
        let room_id = room_id.clone();
        self.scenes
            .iter()
            .filter(move |scene| scene.room_id.as_ref() == Some(&room_id))
    }

    /// Mutate one light and refresh its room's aggregate
    ///
    /// `f` reports whether it changed anything. Returns `None` when the
    /// light is unknown, otherwise what `f` returned.
    pub fn update_light<F>(&mut self, id: &LightId, f: F) -> Option<bool>
    where
        F: FnOnce(&mut Light) -> bool,
    {
        let changed = f(self.lights.get_mut(id)?);
        if changed {
            if let Some(room) = self
                .light_rooms
                .get(id)
                .and_then(|idx| self.rooms.get_mut(*idx))
            {
                room.update_state(&self.lights);
            }
        }
        Some(changed)
    }
}
