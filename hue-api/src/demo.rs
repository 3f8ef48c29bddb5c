//! In-memory bridge for running without hardware

use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::{BridgeClient, MIREK_MAX, MIREK_MIN};
use crate::error::{ApiError, Result};
use crate::resource::{
    BridgeSnapshot, ColorResource, ColorTemperature, DeviceResource, Dimming, LightResource,
    Metadata, On, ResourceIdentifier, RoomResource, SceneResource, Xy,
};

pub const DEMO_HOST: &str = "demo-bridge.local";
pub const DEMO_BRIDGE_ID: &str = "demo-bridge-001";

#[derive(Debug, Clone, Copy)]
enum Tint {
    Mirek(u16),
    Xy(f64, f64),
    /// Color-capable light without CT support
    XyOnly(f64, f64),
    /// CT-only light
    MirekOnly(u16),
    Unchanged,
}

struct DemoLight {
    id: &'static str,
    name: &'static str,
    on: bool,
    brightness: f64,
    tint: Tint,
}

const fn light(
    id: &'static str,
    name: &'static str,
    on: bool,
    brightness: f64,
    tint: Tint,
) -> DemoLight {
    DemoLight {
        id,
        name,
        on,
        brightness,
        tint,
    }
}

struct DemoRoom {
    id: &'static str,
    name: &'static str,
    grouped_light: &'static str,
    lights: &'static [DemoLight],
}

const ROOMS: &[DemoRoom] = &[
    DemoRoom {
        id: "room-living",
        name: "Living Room",
        grouped_light: "group-living",
        lights: &[
            light("light-lr-ceiling", "Ceiling Light", true, 80.0, Tint::Mirek(326)),
            light("light-lr-floor", "Floor Lamp", true, 60.0, Tint::Mirek(400)),
            light("light-lr-tv-bias", "TV Bias Light", true, 40.0, Tint::XyOnly(0.15, 0.06)),
            light("light-lr-accent", "Accent Strip", false, 100.0, Tint::XyOnly(0.64, 0.33)),
        ],
    },
    DemoRoom {
        id: "room-bedroom",
        name: "Bedroom",
        grouped_light: "group-bedroom",
        lights: &[
            light("light-br-left", "Bedside Left", true, 30.0, Tint::Mirek(454)),
            light("light-br-right", "Bedside Right", false, 50.0, Tint::Mirek(400)),
            light("light-br-ceiling", "Ceiling Light", false, 100.0, Tint::MirekOnly(326)),
        ],
    },
    DemoRoom {
        id: "room-kitchen",
        name: "Kitchen",
        grouped_light: "group-kitchen",
        lights: &[
            light("light-kt-main", "Main Light", true, 100.0, Tint::MirekOnly(233)),
            light("light-kt-cabinet", "Under Cabinet", true, 70.0, Tint::MirekOnly(250)),
        ],
    },
    DemoRoom {
        id: "room-office",
        name: "Office",
        grouped_light: "group-office",
        lights: &[
            light("light-of-desk", "Desk Lamp", true, 90.0, Tint::Mirek(300)),
            light("light-of-monitor", "Monitor Light", true, 50.0, Tint::MirekOnly(250)),
            light("light-of-bookshelf", "Bookshelf", true, 40.0, Tint::XyOnly(0.32, 0.15)),
        ],
    },
];

/// (scene id, name, room id, light presets)
type ScenePreset = (&'static str, &'static str, &'static str, &'static [DemoLight]);

const SCENES: &[ScenePreset] = &[
    (
        "scene-movie-night",
        "Movie Night",
        "room-living",
        &[
            light("light-lr-ceiling", "", false, 0.0, Tint::Unchanged),
            light("light-lr-floor", "", true, 25.0, Tint::Mirek(500)),
            light("light-lr-tv-bias", "", true, 30.0, Tint::Xy(0.15, 0.06)),
            light("light-lr-accent", "", true, 15.0, Tint::Xy(0.55, 0.41)),
        ],
    ),
    (
        "scene-energize",
        "Energize",
        "room-living",
        &[
            light("light-lr-ceiling", "", true, 100.0, Tint::Mirek(200)),
            light("light-lr-floor", "", true, 100.0, Tint::Mirek(200)),
            light("light-lr-tv-bias", "", true, 100.0, Tint::Xy(0.31, 0.32)),
            light("light-lr-accent", "", true, 100.0, Tint::Xy(0.31, 0.32)),
        ],
    ),
    (
        "scene-relax",
        "Relax",
        "room-living",
        &[
            light("light-lr-ceiling", "", true, 59.0, Tint::Mirek(400)),
            light("light-lr-floor", "", true, 50.0, Tint::Mirek(450)),
            light("light-lr-tv-bias", "", false, 0.0, Tint::Unchanged),
            light("light-lr-accent", "", true, 30.0, Tint::Xy(0.56, 0.35)),
        ],
    ),
    (
        "scene-sleep",
        "Sleep",
        "room-bedroom",
        &[
            light("light-br-left", "", true, 10.0, Tint::Mirek(500)),
            light("light-br-right", "", false, 0.0, Tint::Unchanged),
            light("light-br-ceiling", "", false, 0.0, Tint::Unchanged),
        ],
    ),
    (
        "scene-reading",
        "Reading",
        "room-bedroom",
        &[
            light("light-br-left", "", true, 79.0, Tint::Mirek(300)),
            light("light-br-right", "", true, 79.0, Tint::Mirek(300)),
            light("light-br-ceiling", "", false, 0.0, Tint::Unchanged),
        ],
    ),
    (
        "scene-cooking",
        "Cooking",
        "room-kitchen",
        &[
            light("light-kt-main", "", true, 100.0, Tint::Mirek(250)),
            light("light-kt-cabinet", "", true, 100.0, Tint::Mirek(250)),
        ],
    ),
    (
        "scene-morning",
        "Morning",
        "room-kitchen",
        &[
            light("light-kt-main", "", true, 71.0, Tint::Mirek(350)),
            light("light-kt-cabinet", "", true, 50.0, Tint::Mirek(400)),
        ],
    ),
    (
        "scene-focus",
        "Focus",
        "room-office",
        &[
            light("light-of-desk", "", true, 100.0, Tint::Mirek(250)),
            light("light-of-monitor", "", true, 59.0, Tint::Mirek(200)),
            light("light-of-bookshelf", "", false, 0.0, Tint::Unchanged),
        ],
    ),
];

/// Bridge that keeps a fixed house of rooms, lights and scenes in memory
///
/// Commands mutate the stored resources so a later `fetch_all` reflects
/// them. No events are pushed; callers rely on their own optimistic state.
#[derive(Debug)]
pub struct DemoBridge {
    state: Mutex<BridgeSnapshot>,
    latency: Duration,
}

impl Default for DemoBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl DemoBridge {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(demo_snapshot()),
            latency: Duration::ZERO,
        }
    }

    /// Delay every `fetch_all` to mimic a real network round trip
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn update_light<F>(&self, light_id: &str, f: F) -> Result<()>
    where
        F: FnOnce(&mut LightResource),
    {
        let mut state = self.state.lock();
        let light = state
            .lights
            .iter_mut()
            .find(|l| l.id == light_id)
            .ok_or_else(|| ApiError::NotFound(format!("light {}", light_id)))?;
        f(light);
        Ok(())
    }
}

#[async_trait]
impl BridgeClient for DemoBridge {
    async fn fetch_all(&self) -> Result<BridgeSnapshot> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        Ok(self.state.lock().clone())
    }

    async fn set_light_on(&self, light_id: &str, on: bool) -> Result<()> {
        self.update_light(light_id, |light| light.on = Some(On { on }))
    }

    async fn set_light_brightness(&self, light_id: &str, brightness: u8) -> Result<()> {
        self.update_light(light_id, |light| {
            light.dimming = Some(Dimming {
                brightness: f64::from(brightness.min(100)),
            })
        })
    }

    async fn set_light_color_temp(&self, light_id: &str, mirek: u16) -> Result<()> {
        self.update_light(light_id, |light| {
            apply_tint(light, Tint::Mirek(mirek.clamp(MIREK_MIN, MIREK_MAX)))
        })
    }

    async fn set_light_color_xy(&self, light_id: &str, x: f64, y: f64) -> Result<()> {
        self.update_light(light_id, |light| apply_tint(light, Tint::Xy(x, y)))
    }

    async fn set_grouped_light_on(&self, grouped_light_id: &str, on: bool) -> Result<()> {
        let mut state = self.state.lock();
        let BridgeSnapshot {
            rooms,
            lights,
            devices,
            ..
        } = &mut *state;

        let room = rooms
            .iter()
            .find(|r| r.grouped_light_id() == Some(grouped_light_id))
            .ok_or_else(|| ApiError::NotFound(format!("grouped_light {}", grouped_light_id)))?;

        let light_ids: Vec<&str> = room
            .device_ids()
            .filter_map(|dev| devices.iter().find(|d| d.id == dev))
            .flat_map(|d| d.light_ids())
            .collect();

        for light in lights.iter_mut().filter(|l| light_ids.contains(&l.id.as_str())) {
            light.on = Some(On { on });
        }
        Ok(())
    }

    async fn activate_scene(&self, scene_id: &str) -> Result<()> {
        let Some((_, _, _, presets)) = SCENES.iter().find(|(id, ..)| *id == scene_id) else {
            return Err(ApiError::NotFound(format!("scene {}", scene_id)));
        };

        let mut state = self.state.lock();
        for preset in presets.iter() {
            if let Some(light) = state.lights.iter_mut().find(|l| l.id == preset.id) {
                light.on = Some(On { on: preset.on });
                if preset.brightness > 0.0 {
                    light.dimming = Some(Dimming {
                        brightness: preset.brightness,
                    });
                }
                apply_tint(light, preset.tint);
            }
        }
        Ok(())
    }

    fn host(&self) -> &str {
        DEMO_HOST
    }

    fn bridge_id(&self) -> &str {
        DEMO_BRIDGE_ID
    }
}

/// Switch a light's color mode the way the bridge reports it
fn apply_tint(light: &mut LightResource, tint: Tint) {
    match tint {
        Tint::Mirek(mirek) | Tint::MirekOnly(mirek) => {
            if let Some(ct) = light.color_temperature.as_mut() {
                ct.mirek = Some(i64::from(mirek));
                ct.mirek_valid = Some(true);
            }
        }
        Tint::Xy(x, y) | Tint::XyOnly(x, y) => {
            if let Some(color) = light.color.as_mut() {
                color.xy = Some(Xy { x, y });
                if let Some(ct) = light.color_temperature.as_mut() {
                    ct.mirek = None;
                    ct.mirek_valid = Some(false);
                }
            }
        }
        Tint::Unchanged => {}
    }
}

fn demo_snapshot() -> BridgeSnapshot {
    let mut snapshot = BridgeSnapshot::default();

    for room in ROOMS {
        let mut children = Vec::new();
        for demo in room.lights {
            let device_id = format!("device-{}", demo.id);
            children.push(ResourceIdentifier::new(&device_id, "device"));
            snapshot.devices.push(DeviceResource {
                id: device_id.clone(),
                metadata: named(demo.name),
                services: vec![ResourceIdentifier::new(demo.id, "light")],
            });
            snapshot.lights.push(demo_light(demo, &device_id));
        }

        snapshot.rooms.push(RoomResource {
            id: room.id.to_string(),
            metadata: named(room.name),
            children,
            services: vec![ResourceIdentifier::new(room.grouped_light, "grouped_light")],
        });
    }

    snapshot.scenes = SCENES
        .iter()
        .map(|(id, name, room_id, _)| SceneResource {
            id: id.to_string(),
            metadata: named(name),
            group: Some(ResourceIdentifier::new(*room_id, "room")),
            speed: None,
            auto_dynamic: false,
        })
        .collect();

    snapshot
}

fn demo_light(demo: &DemoLight, device_id: &str) -> LightResource {
    let supports_ct = !matches!(demo.tint, Tint::XyOnly(..));
    let supports_color = !matches!(demo.tint, Tint::MirekOnly(_));

    let mut light = LightResource {
        id: demo.id.to_string(),
        owner: Some(ResourceIdentifier::new(device_id, "device")),
        metadata: named(demo.name),
        on: Some(On { on: demo.on }),
        dimming: Some(Dimming {
            brightness: demo.brightness,
        }),
        color_temperature: supports_ct.then(ColorTemperature::default),
        color: supports_color.then(ColorResource::default),
    };
    apply_tint(&mut light, demo.tint);
    light
}

fn named(name: &str) -> Metadata {
    Metadata {
        name: name.to_string(),
        archetype: None,
    }
}
