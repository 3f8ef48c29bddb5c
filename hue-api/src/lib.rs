//! Client for the Philips Hue bridge CLIP v2 API
//!
//! This crate covers the request/response side of talking to a bridge:
//! fetching resources, sending light commands, and pairing a new
//! application key. The event stream lives in `hue-stream`.
//!
//! ```rust,no_run
//! use hue_api::{BridgeClient, HueBridge};
//!
//! # async fn run() -> hue_api::Result<()> {
//! let bridge = HueBridge::new("192.168.1.2", "app-key", "001788fffe000000")?;
//! let snapshot = bridge.fetch_all().await?;
//! println!("{} lights", snapshot.lights.len());
//!
//! bridge.set_light_brightness(&snapshot.lights[0].id, 80).await?;
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod demo;
pub mod error;
pub mod pairing;
pub mod resource;

pub use client::{BridgeClient, HueBridge, APP_KEY_HEADER, MIREK_MAX, MIREK_MIN};
pub use demo::DemoBridge;
pub use error::{ApiError, Result};
pub use pairing::{create_app_key, create_app_key_at, AppKey, PairingOptions};
pub use resource::{
    BridgeSnapshot, ColorResource, ColorTemperature, DeviceResource, Dimming, LightResource,
    Metadata, On, ResourceIdentifier, RoomResource, SceneResource, Xy,
};
