//! The state published to the rendering layer

use std::fmt;

use crate::store::LightStore;

/// Health of the event stream as shown in the status line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ConnectionStatus {
    /// No stream attached (demo bridge, or before the first connect)
    #[default]
    Offline,
    Connected,
    /// Lost; the subscription is retrying
    Reconnecting(String),
}

impl fmt::Display for ConnectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionStatus::Offline => write!(f, "offline"),
            ConnectionStatus::Connected => write!(f, "live"),
            ConnectionStatus::Reconnecting(reason) => write!(f, "reconnecting ({})", reason),
        }
    }
}

/// An immutable snapshot of everything the UI renders
///
/// `revision` increases by one on every publish.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dashboard {
    pub store: LightStore,
    /// Last user-visible failure; cleared by a successful reload
    pub error: Option<String>,
    pub connection: ConnectionStatus,
    /// A fetch-all is in flight
    pub loading: bool,
    pub revision: u64,
}
