#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use hue_api::{ApiError, BridgeClient, BridgeSnapshot};
use hue_state::{Dashboard, LightId, LightStore};
use parking_lot::Mutex;
use tokio::sync::watch;

/// Two rooms plus one light no room claims
///
/// - `room-a` (grouped light `group-a`): `l1` on at 50% in temperature
///   mode, `l2` off
/// - `l3`: unassigned, on, xy color
pub fn house() -> BridgeSnapshot {
    let json = r#"{
        "rooms": [
            {"id": "room-a", "metadata": {"name": "Room A"},
             "children": [{"rid": "d1", "rtype": "device"}, {"rid": "d2", "rtype": "device"}],
             "services": [{"rid": "group-a", "rtype": "grouped_light"}]},
            {"id": "room-empty", "metadata": {"name": "Empty"}, "children": [], "services": []}
        ],
        "lights": [
            {"id": "l1", "owner": {"rid": "d1", "rtype": "device"}, "metadata": {"name": "One"},
             "on": {"on": true}, "dimming": {"brightness": 50.0},
             "color_temperature": {"mirek": 300, "mirek_valid": true},
             "color": {"xy": {"x": 0.45, "y": 0.41}}},
            {"id": "l2", "owner": {"rid": "d2", "rtype": "device"}, "metadata": {"name": "Two"},
             "on": {"on": false}, "dimming": {"brightness": 20.0}},
            {"id": "l3", "metadata": {"name": "Three"},
             "on": {"on": true}, "dimming": {"brightness": 70.0},
             "color_temperature": {"mirek": null, "mirek_valid": false},
             "color": {"xy": {"x": 0.2, "y": 0.1}}}
        ],
        "devices": [],
        "scenes": [
            {"id": "scene-a", "metadata": {"name": "Bright"}, "group": {"rid": "room-a", "rtype": "room"}}
        ]
    }"#;

    let value: serde_json::Value = serde_json::from_str(json).unwrap();
    BridgeSnapshot {
        rooms: serde_json::from_value(value["rooms"].clone()).unwrap(),
        lights: serde_json::from_value(value["lights"].clone()).unwrap(),
        devices: serde_json::from_value(value["devices"].clone()).unwrap(),
        scenes: serde_json::from_value(value["scenes"].clone()).unwrap(),
    }
}

pub fn house_store() -> LightStore {
    LightStore::from_snapshot(&house())
}

pub fn id(raw: &str) -> LightId {
    LightId::new(raw)
}

/// Bridge double that records every call
#[derive(Default)]
pub struct RecordingClient {
    snapshot: BridgeSnapshot,
    calls: Mutex<Vec<String>>,
    fetches: AtomicUsize,
    fail_commands: bool,
    latency: Duration,
}

impl RecordingClient {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::with_house())
    }

    pub fn failing() -> Arc<Self> {
        Arc::new(Self {
            fail_commands: true,
            ..Self::with_house()
        })
    }

    pub fn slow(latency: Duration) -> Arc<Self> {
        Arc::new(Self {
            latency,
            ..Self::with_house()
        })
    }

    fn with_house() -> Self {
        Self {
            snapshot: house(),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }

    async fn record(&self, call: String) -> hue_api::Result<()> {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        self.calls.lock().push(call);
        if self.fail_commands {
            return Err(ApiError::Http {
                status: 503,
                body: "bridge busy".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl BridgeClient for RecordingClient {
    async fn fetch_all(&self) -> hue_api::Result<BridgeSnapshot> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot.clone())
    }

    async fn set_light_on(&self, light_id: &str, on: bool) -> hue_api::Result<()> {
        self.record(format!("on {} {}", light_id, on)).await
    }

    async fn set_light_brightness(&self, light_id: &str, brightness: u8) -> hue_api::Result<()> {
        self.record(format!("brightness {} {}", light_id, brightness)).await
    }

    async fn set_light_color_temp(&self, light_id: &str, mirek: u16) -> hue_api::Result<()> {
        self.record(format!("mirek {} {}", light_id, mirek)).await
    }

    async fn set_light_color_xy(&self, light_id: &str, x: f64, y: f64) -> hue_api::Result<()> {
        self.record(format!("xy {} {:.4} {:.4}", light_id, x, y)).await
    }

    async fn set_grouped_light_on(&self, grouped_light_id: &str, on: bool) -> hue_api::Result<()> {
        self.record(format!("group {} {}", grouped_light_id, on)).await
    }

    async fn activate_scene(&self, scene_id: &str) -> hue_api::Result<()> {
        self.record(format!("scene {}", scene_id)).await
    }

    fn host(&self) -> &str {
        "test-bridge"
    }

    fn bridge_id(&self) -> &str {
        "test-bridge-id"
    }
}

/// Wait until the published state satisfies `pred`
pub async fn wait_for<F>(rx: &mut watch::Receiver<Arc<Dashboard>>, pred: F) -> Arc<Dashboard>
where
    F: FnMut(&Arc<Dashboard>) -> bool,
{
    let state = tokio::time::timeout(Duration::from_secs(10), rx.wait_for(pred))
        .await
        .expect("timed out waiting for dashboard state")
        .expect("reconciler dropped");
    Arc::clone(&state)
}

/// Poll `cond` until it holds
pub async fn eventually<F>(mut cond: F)
where
    F: FnMut() -> bool,
{
    tokio::time::timeout(Duration::from_secs(10), async {
        while !cond() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition never held");
}
