//! Live event stream from a Hue bridge
//!
//! The bridge pushes resource changes as server-sent events. This crate
//! keeps a connection open, reconnecting with a fixed backoff, and turns
//! each payload into flat [`ResourceUpdate`] records.
//!
//! ```rust,no_run
//! use hue_api::HueBridge;
//! use hue_stream::{BridgeEventSource, EventSubscription, StreamConfig, StreamEvent};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let bridge = HueBridge::new("192.168.1.2", "app-key", "bridge-id")?;
//! let (mut subscription, mut events) =
//!     EventSubscription::new(BridgeEventSource::new(bridge), StreamConfig::default())?;
//! subscription.start();
//!
//! while let Some(event) = events.recv().await {
//!     if let StreamEvent::Batch(updates) = event {
//!         for update in updates {
//!             println!("{:?} {}", update.resource_kind, update.resource_id);
//!         }
//!     }
//! }
//! subscription.stop().await;
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod normalizer;
pub mod sse;
pub mod subscription;

pub use config::StreamConfig;
pub use error::{StreamError, StreamResult};
pub use event::{EventKind, ResourceKind, ResourceUpdate, StreamEvent};
pub use normalizer::normalize_payload;
pub use sse::SseDecoder;
pub use subscription::{BridgeEventSource, ByteStream, EventSource, EventSubscription};
