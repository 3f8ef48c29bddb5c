//! The reconciliation loop
//!
//! One task owns the light model and the pending tracker. Local intents,
//! stream updates and command results all arrive as messages and are
//! applied one at a time; bridge calls run on their own tasks and report
//! back through the same inbox.
//!
//! ```text
//!  UI ──LocalIntent──▶ ┌────────────┐ ──spawn──▶ BridgeClient
//!                      │ Reconciler │ ◀─CommandFinished──┘
//!  stream ──Batch────▶ └────────────┘ ──watch──▶ Arc<Dashboard>
//! ```

use std::sync::Arc;
use std::time::Duration;

use hue_api::{BridgeClient, BridgeSnapshot};
use hue_stream::StreamEvent;
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn, Instrument, Span};

use crate::dashboard::{ConnectionStatus, Dashboard};
use crate::decoder::{decode_batch, LightUpdate};
use crate::error::{Result, StateError};
use crate::message::{Command, LightChange, LocalIntent, Message};
use crate::model::{mirek_in_range, LightId, RoomId, SceneId};
use crate::pending::{Direction, Field, PendingTarget, PendingTracker, TrackerConfig};
use crate::store::LightStore;

/// Reconciler tuning
#[derive(Debug, Clone, PartialEq)]
pub struct ReconcilerConfig {
    /// How often expired pending ops are swept
    ///
    /// Default: 1 second
    pub cleanup_interval: Duration,

    /// Upper bound on a single bridge call
    ///
    /// Default: 5 seconds
    pub command_timeout: Duration,

    /// Capacity of the message inbox
    ///
    /// Default: 100
    pub inbox_capacity: usize,

    pub tracker: TrackerConfig,
}

impl Default for ReconcilerConfig {
    fn default() -> Self {
        Self {
            cleanup_interval: Duration::from_secs(1),
            command_timeout: Duration::from_secs(5),
            inbox_capacity: 100,
            tracker: TrackerConfig::default(),
        }
    }
}

/// Sending side of the reconciler, held by the UI
#[derive(Debug, Clone)]
pub struct ReconcilerHandle {
    sender: mpsc::Sender<Message>,
    state: watch::Receiver<Arc<Dashboard>>,
}

impl ReconcilerHandle {
    pub async fn send(&self, message: impl Into<Message>) -> Result<()> {
        self.sender
            .send(message.into())
            .await
            .map_err(|_| StateError::NotRunning)
    }

    /// Non-blocking send for synchronous input handlers
    pub fn try_send(&self, message: impl Into<Message>) -> Result<()> {
        self.sender.try_send(message.into()).map_err(|err| match err {
            mpsc::error::TrySendError::Full(_) => StateError::Busy,
            mpsc::error::TrySendError::Closed(_) => StateError::NotRunning,
        })
    }

    /// Ask the loop to exit after the messages already queued
    pub async fn shutdown(&self) -> Result<()> {
        self.send(Message::Shutdown).await
    }

    /// A receiver that is notified on every publish
    pub fn subscribe(&self) -> watch::Receiver<Arc<Dashboard>> {
        self.state.clone()
    }

    /// The most recently published state
    pub fn current(&self) -> Arc<Dashboard> {
        self.state.borrow().clone()
    }
}

/// Owner of the light model
pub struct Reconciler {
    client: Arc<dyn BridgeClient>,
    tracker: PendingTracker,
    dashboard: Dashboard,
    dirty: bool,
    state_tx: watch::Sender<Arc<Dashboard>>,
    inbox: mpsc::Receiver<Message>,
    /// Weak so the inbox closes once every handle is dropped
    sender: mpsc::WeakSender<Message>,
    config: ReconcilerConfig,
    span: Span,
}

impl Reconciler {
    pub fn new(client: Arc<dyn BridgeClient>, config: ReconcilerConfig) -> (Self, ReconcilerHandle) {
        let (sender, inbox) = mpsc::channel(config.inbox_capacity.max(1));
        let (state_tx, state) = watch::channel(Arc::new(Dashboard::default()));

        let reconciler = Self {
            client,
            tracker: PendingTracker::with_config(config.tracker.clone()),
            dashboard: Dashboard::default(),
            dirty: false,
            state_tx,
            inbox,
            sender: sender.downgrade(),
            config,
            span: Span::none(),
        };
        (reconciler, ReconcilerHandle { sender, state })
    }

    /// Emit this loop's logs, and its tracker's, under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.tracker = PendingTracker::with_config(self.config.tracker.clone()).with_span(span.clone());
        self.span = span;
        self
    }

    pub fn tracker(&self) -> &PendingTracker {
        &self.tracker
    }

    pub fn dashboard(&self) -> &Dashboard {
        &self.dashboard
    }

    pub fn store(&self) -> &LightStore {
        &self.dashboard.store
    }

    /// Drive the loop until `Shutdown` or until every handle is dropped
    pub async fn run(mut self, mut events: Option<mpsc::Receiver<StreamEvent>>) {
        info!(parent: &self.span, "reconciler started");
        let mut cleanup = tokio::time::interval(self.config.cleanup_interval);
        cleanup.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                message = self.inbox.recv() => match message {
                    Some(message) => {
                        if !self.handle(message) {
                            break;
                        }
                    }
                    None => break,
                },
                event = next_event(&mut events) => match event {
                    Some(event) => self.handle_stream_event(event),
                    None => {
                        debug!(parent: &self.span, "event stream closed");
                        events = None;
                        self.set_connection(ConnectionStatus::Offline);
                        self.publish_if_dirty();
                    }
                },
                _ = cleanup.tick() => {
                    self.tracker.cleanup();
                }
            }
        }
        info!(parent: &self.span, "reconciler stopped");
    }

    /// Apply one message; returns false once the loop should stop
    pub fn handle(&mut self, message: Message) -> bool {
        match message {
            Message::LocalIntent(intent) => self.apply_intent(intent),
            Message::RemoteUpdate(update) => {
                self.apply_light_update(&update);
            }
            Message::GroupIntent { room_id, on } => self.apply_group_intent(&room_id, on),
            Message::ActivateScene { scene_id } => self.activate_scene(scene_id),
            Message::Refresh => self.refresh(),
            Message::CommandFinished { command, result } => self.command_finished(command, result),
            Message::SnapshotLoaded(result) => self.snapshot_loaded(result),
            Message::Shutdown => return false,
        }
        self.publish_if_dirty();
        true
    }

    /// Apply a stream event; a batch is published once
    pub fn handle_stream_event(&mut self, event: StreamEvent) {
        match event {
            StreamEvent::Connected => self.set_connection(ConnectionStatus::Connected),
            StreamEvent::Disconnected(reason) => {
                self.set_connection(ConnectionStatus::Reconnecting(reason))
            }
            StreamEvent::Batch(updates) => {
                for update in decode_batch(&updates) {
                    self.apply_light_update(&update);
                }
            }
        }
        self.publish_if_dirty();
    }

    /// Apply the fields of one remote update that are not echoes
    ///
    /// Returns whether the model changed. Unknown lights are dropped.
    pub fn apply_light_update(&mut self, update: &LightUpdate) -> bool {
        let id = &update.light_id;
        if !self.dashboard.store.contains_light(id) {
            debug!(parent: &self.span, light = %id, "update for unknown light dropped");
            return false;
        }

        let mut changed = false;

        if let Some(on) = update.on {
            if self.ignored(id, Field::On, PendingTarget::Bool(on)) {
                debug!(parent: &self.span, light = %id, on, "on ignored");
            } else {
                changed |= self.modify(id, |light| light.set_on(on));
            }
        }

        if let Some(brightness) = update.brightness {
            let incoming = PendingTarget::Scalar(f64::from(brightness));
            if self.ignored(id, Field::Brightness, incoming) {
                debug!(parent: &self.span, light = %id, brightness, "brightness ignored");
            } else {
                changed |= self.modify(id, |light| light.set_brightness(brightness));
            }
        }

        // Sampled before either color field consumes an entry
        let xy_pending = self.tracker.has_pending(id, Field::ColorXy);
        let ct_pending = self.tracker.has_pending(id, Field::ColorTemp);

        if let Some(mirek) = update.color_temp {
            if !mirek_in_range(mirek) {
                debug!(parent: &self.span, light = %id, mirek, "out-of-range temperature dropped");
            } else if xy_pending {
                debug!(parent: &self.span, light = %id, mirek, "temperature ignored, xy pending");
            } else if self.ignored(id, Field::ColorTemp, PendingTarget::Scalar(mirek as f64)) {
                debug!(parent: &self.span, light = %id, mirek, "temperature ignored");
            } else {
                changed |= self.modify(id, |light| light.set_mirek(mirek as u16));
            }
        }

        if let Some((x, y)) = update.color_xy {
            if xy_pending {
                // Dropped even on a mismatch: intermediate xy echoes of a
                // superseded write arrive before the latest one
                let confirmed = self.ignored(id, Field::ColorXy, PendingTarget::Pair(x, y));
                debug!(parent: &self.span, light = %id, x, y, confirmed, "xy ignored, xy pending");
            } else if ct_pending {
                debug!(parent: &self.span, light = %id, x, y, "xy ignored, temperature pending");
            } else {
                changed |= self.modify(id, |light| light.set_xy(x, y));
            }
        }

        if changed {
            self.dirty = true;
        }
        changed
    }

    fn ignored(&self, id: &LightId, field: Field, incoming: PendingTarget) -> bool {
        self.tracker.should_ignore(id, field, &incoming)
    }

    fn modify<F>(&mut self, id: &LightId, f: F) -> bool
    where
        F: FnOnce(&mut crate::model::Light) -> bool,
    {
        self.dashboard.store.update_light(id, f).unwrap_or(false)
    }

    fn apply_intent(&mut self, intent: LocalIntent) {
        let LocalIntent {
            light_id,
            change,
            direction,
        } = intent;

        // Steps resolve against the model this task owns, not a published snapshot
        let Some(light) = self.dashboard.store.light(&light_id) else {
            self.set_error(StateError::LightNotFound(light_id).to_string());
            return;
        };
        let Some((change, direction)) = change.resolve(light, direction) else {
            debug!(parent: &self.span, light = %light_id, ?change, "step has no effect");
            return;
        };
        let change = change.normalized();

        let mut resolved = change;
        let applied = self.dashboard.store.update_light(&light_id, |light| match change {
            LightChange::On(on) => light.set_on(on),
            LightChange::Brightness(b) => light.set_brightness(b),
            LightChange::ColorTemp(m) => light.set_mirek(m),
            LightChange::ColorXy(x, y) => light.set_xy(x, y),
            LightChange::HueSat(hue, sat) => {
                let (x, y) = light.set_hue_sat(hue, sat);
                resolved = LightChange::ColorXy(x, y);
                true
            }
            LightChange::BrightnessStep { .. } | LightChange::ColorTempStep(_) | LightChange::HueSatStep { .. } => {
                false
            }
        });

        let Some(changed) = applied else {
            self.set_error(StateError::LightNotFound(light_id).to_string());
            return;
        };
        self.dirty |= changed;

        let (Some(target), Some(command)) = (
            resolved.pending_target(),
            Command::for_light(light_id.clone(), resolved),
        ) else {
            return;
        };
        let direction = match target {
            PendingTarget::Scalar(_) => direction,
            PendingTarget::Bool(_) | PendingTarget::Pair(..) => Direction::Exact,
        };

        self.tracker.register(&light_id, resolved.field(), target, direction);
        self.dispatch(command);
    }

    fn apply_group_intent(&mut self, room_id: &RoomId, on: bool) {
        let Some(room) = self.dashboard.store.room(room_id) else {
            self.set_error(StateError::RoomNotFound(room_id.clone()).to_string());
            return;
        };
        let lights = room.lights.clone();
        let grouped = room.grouped_light.clone();

        for id in &lights {
            let changed = self.modify(id, |light| light.set_on(on));
            self.dirty |= changed;
            self.tracker.register(id, Field::On, PendingTarget::Bool(on), Direction::Exact);
        }

        match grouped {
            Some(grouped_light_id) => self.dispatch(Command::SetGroupOn { grouped_light_id, on }),
            // The synthetic room has no grouped control
            None => {
                for light_id in lights {
                    self.dispatch(Command::SetOn { light_id, on });
                }
            }
        }
    }

    fn activate_scene(&mut self, scene_id: SceneId) {
        if self.dashboard.store.scene(&scene_id).is_none() {
            self.set_error(StateError::SceneNotFound(scene_id).to_string());
            return;
        }
        self.dispatch(Command::ActivateScene { scene_id });
    }

    fn refresh(&mut self) {
        self.dashboard.loading = true;
        self.dirty = true;

        let Some(sender) = self.sender.upgrade() else {
            return;
        };
        let client = Arc::clone(&self.client);
        let timeout = self.config.command_timeout;
        tokio::spawn(
            async move {
                let result = match tokio::time::timeout(timeout, client.fetch_all()).await {
                    Ok(Ok(snapshot)) => Ok(snapshot),
                    Ok(Err(err)) => Err(StateError::from(err).to_string()),
                    Err(_) => Err(StateError::CommandTimeout("refresh".to_string()).to_string()),
                };
                let _ = sender.send(Message::SnapshotLoaded(result)).await;
            }
            .instrument(self.span.clone()),
        );
    }

    /// Replace the model wholesale with a fresh snapshot
    pub fn load(&mut self, snapshot: &BridgeSnapshot) {
        self.dashboard.store = LightStore::from_snapshot(snapshot);
        self.dashboard.loading = false;
        self.dashboard.error = None;
        self.dirty = true;
        info!(
            parent: &self.span,
            rooms = self.dashboard.store.rooms().len(),
            lights = self.dashboard.store.light_count(),
            scenes = self.dashboard.store.scenes().len(),
            "model loaded"
        );
    }

    fn snapshot_loaded(&mut self, result: std::result::Result<BridgeSnapshot, String>) {
        match result {
            Ok(snapshot) => self.load(&snapshot),
            Err(err) => {
                warn!(parent: &self.span, error = %err, "refresh failed");
                self.dashboard.loading = false;
                self.set_error(err);
            }
        }
    }

    fn command_finished(&mut self, command: Command, result: std::result::Result<(), String>) {
        match result {
            Ok(()) => {
                debug!(parent: &self.span, command = %command.describe(), "command finished");
                if matches!(command, Command::ActivateScene { .. }) {
                    self.refresh();
                }
            }
            // Optimistic state stays; the next event or refresh corrects it
            Err(err) => {
                warn!(parent: &self.span, command = %command.describe(), error = %err, "command failed");
                self.set_error(err);
            }
        }
    }

    fn dispatch(&self, command: Command) {
        let Some(sender) = self.sender.upgrade() else {
            debug!(parent: &self.span, command = %command.describe(), "inbox closed, command dropped");
            return;
        };
        let client = Arc::clone(&self.client);
        let timeout = self.config.command_timeout;

        tokio::spawn(
            async move {
                let result = match tokio::time::timeout(timeout, command.execute(client.as_ref())).await {
                    Ok(Ok(())) => Ok(()),
                    Ok(Err(err)) => Err(StateError::from(err).to_string()),
                    Err(_) => Err(StateError::CommandTimeout(command.describe()).to_string()),
                };
                let _ = sender.send(Message::CommandFinished { command, result }).await;
            }
            .instrument(self.span.clone()),
        );
    }

    fn set_error(&mut self, error: String) {
        self.dashboard.error = Some(error);
        self.dirty = true;
    }

    fn set_connection(&mut self, status: ConnectionStatus) {
        if self.dashboard.connection != status {
            info!(parent: &self.span, status = %status, "stream status changed");
            self.dashboard.connection = status;
            self.dirty = true;
        }
    }

    fn publish_if_dirty(&mut self) {
        if !self.dirty {
            return;
        }
        self.dirty = false;
        self.dashboard.revision += 1;
        self.state_tx.send_replace(Arc::new(self.dashboard.clone()));
    }
}

async fn next_event(events: &mut Option<mpsc::Receiver<StreamEvent>>) -> Option<StreamEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}
