//! Pending-operation tracking for optimistic writes
//!
//! Every local command registers the value it is driving a light toward.
//! Incoming stream updates are checked against that entry: echoes of our
//! own change (including intermediate values during a hardware fade) are
//! suppressed, while anything past the target is treated as an external
//! change and applied.
//!
//! ```
//! use hue_state::pending::{Direction, Field, PendingTarget, PendingTracker};
//! use hue_state::model::LightId;
//!
//! let tracker = PendingTracker::new();
//! let id = LightId::new("light-1");
//!
//! tracker.register(&id, Field::Brightness, PendingTarget::Scalar(80.0), Direction::Increasing);
//! assert!(tracker.should_ignore(&id, Field::Brightness, &PendingTarget::Scalar(65.0)));
//! assert!(tracker.should_ignore(&id, Field::Brightness, &PendingTarget::Scalar(80.0)));
//! assert!(!tracker.has_pending(&id, Field::Brightness));
//! ```

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::time::Instant;
use tracing::{debug, Span};

use crate::model::LightId;

/// Controllable field of a light
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    On,
    Brightness,
    ColorTemp,
    ColorXy,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::On => "on",
            Field::Brightness => "brightness",
            Field::ColorTemp => "color_temp",
            Field::ColorXy => "color_xy",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Expected direction of travel toward a target
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Only the target itself confirms the write
    Exact,
    /// Values up to the target are echoes
    Increasing,
    /// Values down to the target are echoes
    Decreasing,
}

/// Value a pending write is driving toward
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PendingTarget {
    Bool(bool),
    /// Brightness percent or mirek
    Scalar(f64),
    /// CIE xy chromaticity
    Pair(f64, f64),
}

impl PendingTarget {
    /// Equality under the per-variant rule
    ///
    /// Pairs compare component-wise within `tolerance`; the bridge echoes
    /// a rounded copy of what it was sent. Mismatched variants never match.
    pub fn matches(&self, incoming: &PendingTarget, tolerance: f64) -> bool {
        match (self, incoming) {
            (PendingTarget::Bool(a), PendingTarget::Bool(b)) => a == b,
            (PendingTarget::Scalar(a), PendingTarget::Scalar(b)) => a == b,
            (PendingTarget::Pair(ax, ay), PendingTarget::Pair(bx, by)) => {
                (ax - bx).abs() <= tolerance && (ay - by).abs() <= tolerance
            }
            _ => false,
        }
    }

    fn scalar(&self) -> Option<f64> {
        match self {
            PendingTarget::Scalar(v) => Some(*v),
            _ => None,
        }
    }
}

/// One outstanding local write
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingOp {
    pub target: PendingTarget,
    pub direction: Direction,
    pub expires_at: Instant,
}

impl PendingOp {
    pub fn is_expired(&self, now: Instant) -> bool {
        now >= self.expires_at
    }
}

/// Tracker tuning
#[derive(Debug, Clone, PartialEq)]
pub struct TrackerConfig {
    /// Lifetime of an unconfirmed entry
    ///
    /// Default: 5 seconds
    pub expiry: Duration,

    /// Absolute per-component tolerance for xy targets
    ///
    /// Default: 0.002
    pub xy_tolerance: f64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            expiry: Duration::from_secs(5),
            xy_tolerance: 0.002,
        }
    }
}

/// Outcome of checking one incoming value
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Verdict {
    /// Echo of our write; entry kept
    InFlight,
    /// Target reached; entry consumed
    Confirmed,
    /// Overshoot; entry dropped and the value applied
    Overtaken,
    /// Exact mismatch; entry kept and the value applied
    Mismatch,
}

impl Verdict {
    fn ignore(self) -> bool {
        matches!(self, Verdict::InFlight | Verdict::Confirmed)
    }

    fn consumes(self) -> bool {
        matches!(self, Verdict::Confirmed | Verdict::Overtaken)
    }
}

fn judge(op: &PendingOp, incoming: &PendingTarget, tolerance: f64) -> Verdict {
    let directional = match (op.direction, op.target.scalar(), incoming.scalar()) {
        (Direction::Increasing, Some(target), Some(value)) => Some((value, target, false)),
        (Direction::Decreasing, Some(target), Some(value)) => Some((value, target, true)),
        _ => None,
    };

    match directional {
        // Reached exactly
        Some((value, target, _)) if value == target => Verdict::Confirmed,
        // En route: below target going up, above target going down
        Some((value, target, descending)) if (value < target) != descending => Verdict::InFlight,
        Some(_) => Verdict::Overtaken,
        None if op.target.matches(incoming, tolerance) => Verdict::Confirmed,
        None => Verdict::Mismatch,
    }
}

/// Outstanding local writes keyed by `(light, field)`
///
/// All check-then-delete sequences run under one lock, so the tracker can
/// be shared between the reconciler and command tasks.
#[derive(Debug)]
pub struct PendingTracker {
    ops: Mutex<HashMap<(LightId, Field), PendingOp>>,
    config: TrackerConfig,
    span: Span,
}

impl Default for PendingTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl PendingTracker {
    pub fn new() -> Self {
        Self::with_config(TrackerConfig::default())
    }

    pub fn with_config(config: TrackerConfig) -> Self {
        Self {
            ops: Mutex::new(HashMap::new()),
            config,
            span: Span::none(),
        }
    }

    /// Emit this tracker's decisions under `span`
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Record a local write, replacing any entry for the same key
    pub fn register(&self, light: &LightId, field: Field, target: PendingTarget, direction: Direction) {
        self.register_at(light, field, target, direction, Instant::now());
    }

    pub fn register_at(
        &self,
        light: &LightId,
        field: Field,
        target: PendingTarget,
        direction: Direction,
        now: Instant,
    ) {
        let op = PendingOp {
            target,
            direction,
            expires_at: now + self.config.expiry,
        };
        debug!(parent: &self.span, light = %light, %field, ?target, ?direction, "pending op registered");
        self.ops.lock().insert((light.clone(), field), op);
    }

    /// Decide whether an incoming value is an echo of our own write
    ///
    /// May consume the entry: on confirmation, on overshoot, or when it
    /// has expired.
    pub fn should_ignore(&self, light: &LightId, field: Field, incoming: &PendingTarget) -> bool {
        self.should_ignore_at(light, field, incoming, Instant::now())
    }

    pub fn should_ignore_at(
        &self,
        light: &LightId,
        field: Field,
        incoming: &PendingTarget,
        now: Instant,
    ) -> bool {
        let key = (light.clone(), field);
        let mut ops = self.ops.lock();

        let Some(op) = ops.get(&key) else {
            return false;
        };
        if op.is_expired(now) {
            ops.remove(&key);
            debug!(parent: &self.span, light = %light, %field, "pending op expired");
            return false;
        }

        let verdict = judge(op, incoming, self.config.xy_tolerance);
        if verdict.consumes() {
            ops.remove(&key);
        }
        debug!(parent: &self.span, light = %light, %field, ?incoming, ?verdict, "pending check");
        verdict.ignore()
    }

    /// Whether a live entry exists, without consuming it
    pub fn has_pending(&self, light: &LightId, field: Field) -> bool {
        self.has_pending_at(light, field, Instant::now())
    }

    pub fn has_pending_at(&self, light: &LightId, field: Field, now: Instant) -> bool {
        let key = (light.clone(), field);
        let mut ops = self.ops.lock();
        match ops.get(&key) {
            Some(op) if op.is_expired(now) => {
                ops.remove(&key);
                false
            }
            Some(_) => true,
            None => false,
        }
    }

    /// Copy of the live entry for a key
    pub fn get(&self, light: &LightId, field: Field) -> Option<PendingOp> {
        self.ops.lock().get(&(light.clone(), field)).copied()
    }

    /// Evict expired entries; returns how many were removed
    pub fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now())
    }

    pub fn cleanup_at(&self, now: Instant) -> usize {
        let mut ops = self.ops.lock();
        let before = ops.len();
        ops.retain(|_, op| !op.is_expired(now));
        let removed = before - ops.len();
        if removed > 0 {
            debug!(parent: &self.span, removed, "expired pending ops evicted");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.ops.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.lock().is_empty()
    }
}
