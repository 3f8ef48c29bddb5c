//! Configuration for the event subscription
//!
//! Controls reconnect pacing, batching of bursty updates and the limits
//! applied to the raw SSE stream.

use std::time::Duration;

use crate::error::StreamError;

/// Configuration for an [`EventSubscription`](crate::EventSubscription)
#[derive(Debug, Clone)]
pub struct StreamConfig {
    /// Wait between a dropped connection and the next attempt
    /// Default: 5 seconds
    pub reconnect_backoff: Duration,

    /// Updates arriving within this window are delivered as one batch
    /// Default: 50 milliseconds
    pub batch_window: Duration,

    /// Longest a batch may be held back while updates keep arriving
    /// Default: 250 milliseconds
    pub max_batch_delay: Duration,

    /// Capacity of the channel carrying batches to the consumer
    /// Default: 100
    pub channel_capacity: usize,

    /// Upper bound on a single SSE event's payload
    /// Default: 1 MiB
    pub max_event_bytes: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff: Duration::from_secs(5),
            batch_window: Duration::from_millis(50),
            max_batch_delay: Duration::from_millis(250),
            channel_capacity: 100,
            max_event_bytes: 1024 * 1024,
        }
    }
}

impl StreamConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Short timings for tests and local mock bridges
    pub fn fast() -> Self {
        Self {
            reconnect_backoff: Duration::from_millis(50),
            batch_window: Duration::from_millis(5),
            max_batch_delay: Duration::from_millis(25),
            ..Default::default()
        }
    }

    /// Deliver every update on its own
    pub fn unbatched() -> Self {
        Self {
            batch_window: Duration::ZERO,
            ..Default::default()
        }
    }

    pub fn validate(&self) -> Result<(), StreamError> {
        if self.channel_capacity == 0 {
            return Err(StreamError::Configuration(
                "Channel capacity must be greater than 0".to_string(),
            ));
        }

        if self.max_event_bytes == 0 {
            return Err(StreamError::Configuration(
                "Max event size must be greater than 0".to_string(),
            ));
        }

        if self.reconnect_backoff.is_zero() {
            return Err(StreamError::Configuration(
                "Reconnect backoff must be greater than 0".to_string(),
            ));
        }

        if !self.batch_window.is_zero() && self.max_batch_delay < self.batch_window {
            return Err(StreamError::Configuration(
                "Max batch delay must not be shorter than the batch window".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = StreamConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.batch_window, Duration::from_millis(50));
        assert_eq!(config.max_event_bytes, 1_048_576);
    }

    #[test]
    fn test_presets_are_valid() {
        assert!(StreamConfig::fast().validate().is_ok());
        assert!(StreamConfig::unbatched().validate().is_ok());
    }

    #[test]
    fn test_zero_capacity_rejected() {
        let config = StreamConfig {
            channel_capacity: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StreamError::Configuration(_))));
    }

    #[test]
    fn test_batch_delay_shorter_than_window_rejected() {
        let config = StreamConfig {
            batch_window: Duration::from_millis(50),
            max_batch_delay: Duration::from_millis(20),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(StreamError::Configuration(_))));

        let unbatched = StreamConfig {
            max_batch_delay: Duration::ZERO,
            ..StreamConfig::unbatched()
        };
        assert!(unbatched.validate().is_ok());
    }

    #[test]
    fn test_zero_backoff_rejected() {
        let config = StreamConfig {
            reconnect_backoff: Duration::ZERO,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
