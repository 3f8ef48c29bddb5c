//! Identity types for bridge resources

use serde::{Deserialize, Serialize};
use std::fmt;

/// Macro to generate common ID type implementations
macro_rules! impl_id_type {
    ($name:ident) => {
        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<&str> for $name {
            fn from(s: &str) -> Self {
                $name::new(s)
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                $name::new(s)
            }
        }
    };
}

/// A `light` service id (not the owning device)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct LightId(String);

impl_id_type!(LightId);

/// A `room` resource id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(String);

impl_id_type!(RoomId);

impl RoomId {
    /// Id of the synthetic room that collects lights no room claims
    pub fn unassigned() -> Self {
        Self::new("other")
    }

    pub fn is_unassigned(&self) -> bool {
        self.0 == "other"
    }
}

/// A `scene` resource id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SceneId(String);

impl_id_type!(SceneId);

/// A `grouped_light` service id, the target of room-wide on/off
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GroupedLightId(String);

impl_id_type!(GroupedLightId);
