//! Scenes offered in the scene picker

use super::ids::{RoomId, SceneId};

#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub id: SceneId,
    pub name: String,
    pub room_id: Option<RoomId>,
    /// Filled in from the room list; empty when the room is unknown
    pub room_name: String,
    pub is_dynamic: bool,
}

impl Scene {
    pub fn from_resource(resource: &hue_api::SceneResource) -> Self {
        Self {
            id: SceneId::new(resource.id.as_str()),
            name: resource.metadata.name.clone(),
            room_id: resource
                .group
                .as_ref()
                .map(|group| RoomId::new(group.rid.as_str())),
            room_name: String::new(),
            is_dynamic: resource.auto_dynamic,
        }
    }
}
