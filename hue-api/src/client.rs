//! HTTP client for the bridge's CLIP v2 REST API

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::{json, Value};
use url::Url;

use crate::error::{ApiError, Result};
use crate::resource::{
    ApiResponse, BridgeSnapshot, DeviceResource, LightResource, RoomResource, SceneResource,
};

/// Warmest color temperature the bridge accepts, in mirek
pub const MIREK_MIN: u16 = 153;
/// Coolest color temperature the bridge accepts, in mirek
pub const MIREK_MAX: u16 = 500;
/// Header carrying the application key on every authenticated request
pub const APP_KEY_HEADER: &str = "hue-application-key";

/// Operations a bridge must support
///
/// `HueBridge` talks to real hardware over HTTPS; `DemoBridge` keeps
/// everything in memory. The reconciler only ever sees this trait.
#[async_trait]
pub trait BridgeClient: Send + Sync {
    /// Fetch rooms, lights, devices and scenes in one pass
    async fn fetch_all(&self) -> Result<BridgeSnapshot>;

    async fn set_light_on(&self, light_id: &str, on: bool) -> Result<()>;

    /// Brightness in percent; values above 100 are clamped
    async fn set_light_brightness(&self, light_id: &str, brightness: u8) -> Result<()>;

    /// Color temperature in mirek; clamped to `MIREK_MIN..=MIREK_MAX`
    async fn set_light_color_temp(&self, light_id: &str, mirek: u16) -> Result<()>;

    async fn set_light_color_xy(&self, light_id: &str, x: f64, y: f64) -> Result<()>;

    async fn set_grouped_light_on(&self, grouped_light_id: &str, on: bool) -> Result<()>;

    async fn activate_scene(&self, scene_id: &str) -> Result<()>;

    fn host(&self) -> &str;

    fn bridge_id(&self) -> &str;
}

/// Client for a physical bridge
///
/// Bridges serve a self-signed certificate, so certificate validation is
/// disabled on the underlying connection.
#[derive(Debug, Clone)]
pub struct HueBridge {
    http: reqwest::Client,
    base_url: Url,
    host: String,
    app_key: String,
    bridge_id: String,
}

impl HueBridge {
    /// Create a client for the bridge at `host` (IP or hostname, no scheme)
    pub fn new(
        host: impl Into<String>,
        app_key: impl Into<String>,
        bridge_id: impl Into<String>,
    ) -> Result<Self> {
        let host = host.into();
        let base_url = Url::parse(&format!("https://{}/", host))?;
        let mut bridge = Self::with_base_url(base_url, app_key, bridge_id)?;
        bridge.host = host;
        Ok(bridge)
    }

    /// Create a client against an explicit base URL
    ///
    /// Used to point the client at a local mock server.
    pub fn with_base_url(
        base_url: Url,
        app_key: impl Into<String>,
        bridge_id: impl Into<String>,
    ) -> Result<Self> {
        let http = insecure_client()?;
        let host = base_url
            .host_str()
            .map(|h| match base_url.port() {
                Some(port) => format!("{}:{}", h, port),
                None => h.to_string(),
            })
            .ok_or_else(|| ApiError::InvalidUrl(format!("no host in {}", base_url)))?;

        Ok(Self {
            http,
            base_url,
            host,
            app_key: app_key.into(),
            bridge_id: bridge_id.into(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn app_key(&self) -> &str {
        &self.app_key
    }

    /// The underlying HTTP client, shared with the event stream
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }

    /// Resolve a path relative to the bridge root
    pub fn url(&self, path: &str) -> Result<Url> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    /// Authenticated GET request for the SSE endpoint
    pub fn event_stream_request(&self) -> Result<reqwest::RequestBuilder> {
        let url = self.url("eventstream/clip/v2")?;
        Ok(self
            .http
            .get(url)
            .header(APP_KEY_HEADER, &self.app_key)
            .header(reqwest::header::ACCEPT, "text/event-stream"))
    }

    async fn get_resources<T: DeserializeOwned>(&self, kind: &str) -> Result<Vec<T>> {
        let url = self.url(&format!("clip/v2/resource/{}", kind))?;
        tracing::debug!(%url, "GET");

        let response = self
            .http
            .get(url)
            .header(APP_KEY_HEADER, &self.app_key)
            .send()
            .await?;

        let body = checked_body(response).await?;
        let envelope: ApiResponse<T> = serde_json::from_str(&body)?;
        if let Some(err) = envelope.errors.first() {
            return Err(ApiError::Bridge(err.description.clone()));
        }
        Ok(envelope.data)
    }

    async fn put_resource(&self, kind: &str, id: &str, body: Value) -> Result<()> {
        let url = self.url(&format!("clip/v2/resource/{}/{}", kind, id))?;
        tracing::debug!(%url, %body, "PUT");

        let response = self
            .http
            .put(url)
            .header(APP_KEY_HEADER, &self.app_key)
            .json(&body)
            .send()
            .await?;

        let text = checked_body(response).await?;
        // A 2xx body that is not an envelope is accepted as success
        if let Ok(envelope) = serde_json::from_str::<ApiResponse<Value>>(&text) {
            if let Some(err) = envelope.errors.first() {
                return Err(ApiError::Bridge(err.description.clone()));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl BridgeClient for HueBridge {
    async fn fetch_all(&self) -> Result<BridgeSnapshot> {
        let rooms = self.get_resources::<RoomResource>("room").await?;
        let lights = self.get_resources::<LightResource>("light").await?;

        // Without devices lights cannot be mapped to rooms, but they still show up
        let devices = match self.get_resources::<DeviceResource>("device").await {
            Ok(devices) => devices,
            Err(e) => {
                tracing::warn!("device fetch failed, lights will be unassigned: {}", e);
                Vec::new()
            }
        };

        let scenes = self.get_resources::<SceneResource>("scene").await?;

        tracing::info!(
            rooms = rooms.len(),
            lights = lights.len(),
            devices = devices.len(),
            scenes = scenes.len(),
            "fetched bridge resources"
        );

        Ok(BridgeSnapshot {
            rooms,
            lights,
            devices,
            scenes,
        })
    }

    async fn set_light_on(&self, light_id: &str, on: bool) -> Result<()> {
        self.put_resource("light", light_id, on_body(on)).await
    }

    async fn set_light_brightness(&self, light_id: &str, brightness: u8) -> Result<()> {
        self.put_resource("light", light_id, brightness_body(brightness))
            .await
    }

    async fn set_light_color_temp(&self, light_id: &str, mirek: u16) -> Result<()> {
        self.put_resource("light", light_id, color_temp_body(mirek))
            .await
    }

    async fn set_light_color_xy(&self, light_id: &str, x: f64, y: f64) -> Result<()> {
        self.put_resource("light", light_id, color_xy_body(x, y)).await
    }

    async fn set_grouped_light_on(&self, grouped_light_id: &str, on: bool) -> Result<()> {
        self.put_resource("grouped_light", grouped_light_id, on_body(on))
            .await
    }

    async fn activate_scene(&self, scene_id: &str) -> Result<()> {
        self.put_resource("scene", scene_id, json!({"recall": {"action": "active"}}))
            .await
    }

    fn host(&self) -> &str {
        &self.host
    }

    fn bridge_id(&self) -> &str {
        &self.bridge_id
    }
}

pub(crate) fn insecure_client() -> Result<reqwest::Client> {
    Ok(reqwest::Client::builder()
        .danger_accept_invalid_certs(true)
        .build()?)
}

/// Return the body of a 2xx response, or an `Http` error carrying it
async fn checked_body(response: reqwest::Response) -> Result<String> {
    let status = response.status();
    let body = response.text().await?;
    if !status.is_success() {
        return Err(ApiError::Http {
            status: status.as_u16(),
            body,
        });
    }
    Ok(body)
}

// ============================================================================
// Request bodies
// ============================================================================

fn on_body(on: bool) -> Value {
    json!({"on": {"on": on}})
}

fn brightness_body(brightness: u8) -> Value {
    json!({"dimming": {"brightness": brightness.min(100)}})
}

fn color_temp_body(mirek: u16) -> Value {
    json!({"color_temperature": {"mirek": mirek.clamp(MIREK_MIN, MIREK_MAX)}})
}

fn color_xy_body(x: f64, y: f64) -> Value {
    json!({"color": {"xy": {"x": round4(x), "y": round4(y)}}})
}

fn round4(v: f64) -> f64 {
    (v * 10_000.0).round() / 10_000.0
}
