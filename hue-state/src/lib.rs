//! Hue State Management
//!
//! An optimistic light model kept in sync with a Hue bridge.
//!
//! # Features
//!
//! - **Optimistic edits**: user changes apply to the model immediately
//! - **Echo suppression**: a pending-operation tracker drops the bridge's
//!   echoes of our own writes, including intermediate values during fades
//! - **Single owner**: one loop applies every change; the UI watches
//!   published snapshots
//!
//! # Architecture
//!
//! ```text
//! UI intents ─┐
//!             ├─▶ Reconciler ──▶ watch<Arc<Dashboard>> ──▶ UI
//! hue-stream ─┘   (LightStore + PendingTracker)
//! ```
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use hue_api::DemoBridge;
//! use hue_state::{LocalIntent, LightChange, Message, Reconciler, ReconcilerConfig};
//!
//! # async fn run() -> Result<(), hue_state::StateError> {
//! let (reconciler, handle) = Reconciler::new(Arc::new(DemoBridge::new()), ReconcilerConfig::default());
//! tokio::spawn(reconciler.run(None));
//!
//! handle.send(Message::Refresh).await?;
//! handle
//!     .send(LocalIntent::exact("light-lr-accent", LightChange::On(true)))
//!     .await?;
//!
//! let mut state = handle.subscribe();
//! while state.changed().await.is_ok() {
//!     let dashboard = state.borrow().clone();
//!     println!("revision {}: {} lights", dashboard.revision, dashboard.store.light_count());
//! }
//! # Ok(())
//! # }
//! ```

pub mod dashboard;
pub mod decoder;
pub mod error;
pub mod logging;
pub mod message;
pub mod model;
pub mod pending;
pub mod reconciler;
pub mod store;

pub use dashboard::{ConnectionStatus, Dashboard};
pub use decoder::{decode_batch, decode_update, LightUpdate};
pub use error::{Result, StateError};
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use message::{Command, LightChange, LocalIntent, Message};
pub use model::{
    Color, ColorMode, GroupedLightId, Light, LightId, Rgb, Room, RoomId, Scene, SceneId,
};
pub use pending::{Direction, Field, PendingOp, PendingTarget, PendingTracker, TrackerConfig};
pub use reconciler::{Reconciler, ReconcilerConfig, ReconcilerHandle};
pub use store::{LightStore, UNASSIGNED_ROOM_NAME};
