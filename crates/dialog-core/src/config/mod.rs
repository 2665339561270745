//! Configuration module for dialog-core
//!
//! Plain data with RFC 3261 defaults and builder-style setters. Nothing here
//! reads files or the environment; applications build these in code or
//! deserialize them from whatever format they already use.

use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use crate::handle::ShutdownPolicy;
pub use crate::transaction::timer::TimerSettings;

/// Settings for the transaction controller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Protocol timers
    pub timers: TimerSettings,
    /// Inbound FIFO size above which new requests are refused (0 = unlimited)
    pub max_fifo_size: usize,
    /// Age of the oldest queued inbound item above which new requests are
    /// refused (zero = unlimited)
    pub max_fifo_time_depth: Duration,
    /// Items drained from each FIFO per processing step
    pub max_events_per_step: usize,
    /// How often the statistics snapshot is republished
    pub stats_interval: Duration,
    /// TU FIFO size above which new inbound requests are answered 503
    /// (0 = unlimited)
    pub tu_fifo_capacity: usize,
    /// Whether INVITE server transactions send 100 Trying after T100
    pub send_100_trying: bool,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            timers: TimerSettings::default(),
            max_fifo_size: 1000,
            max_fifo_time_depth: Duration::from_secs(2),
            max_events_per_step: 64,
            stats_interval: Duration::from_secs(60),
            tu_fifo_capacity: 1000,
            send_100_trying: true,
        }
    }
}

impl ControllerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timers(mut self, timers: TimerSettings) -> Self {
        self.timers = timers;
        self
    }

    pub fn with_max_fifo_size(mut self, size: usize) -> Self {
        self.max_fifo_size = size;
        self
    }

    pub fn with_max_fifo_time_depth(mut self, depth: Duration) -> Self {
        self.max_fifo_time_depth = depth;
        self
    }

    pub fn with_max_events_per_step(mut self, count: usize) -> Self {
        self.max_events_per_step = count.max(1);
        self
    }

    pub fn with_stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    pub fn with_tu_fifo_capacity(mut self, capacity: usize) -> Self {
        self.tu_fifo_capacity = capacity;
        self
    }

    pub fn with_send_100_trying(mut self, enabled: bool) -> Self {
        self.send_100_trying = enabled;
        self
    }
}

/// Settings for a [`HandleRegistry`](crate::handle::HandleRegistry) and the
/// [`DialogManager`](crate::manager::DialogManager) built on it
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryConfig {
    pub shutdown_policy: ShutdownPolicy,
}

impl RegistryConfig {
    pub fn with_shutdown_policy(mut self, policy: ShutdownPolicy) -> Self {
        self.shutdown_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ControllerConfig::default();
        assert_eq!(config.timers.t1, Duration::from_millis(500));
        assert!(config.send_100_trying);
        assert_eq!(
            RegistryConfig::default().shutdown_policy,
            ShutdownPolicy::FaultOnLiveHandles
        );
    }

    #[test]
    fn test_builders() {
        let config = ControllerConfig::new()
            .with_max_events_per_step(0)
            .with_tu_fifo_capacity(5)
            .with_timers(TimerSettings::default().with_t1(Duration::from_millis(100)));
        assert_eq!(config.max_events_per_step, 1);
        assert_eq!(config.tu_fifo_capacity, 5);
        assert_eq!(config.timers.timer_b, Duration::from_millis(6400));
    }

    #[test]
    fn test_config_round_trips_through_json() {
        let config = ControllerConfig::default().with_send_100_trying(false);
        let json = serde_json::to_string(&config).unwrap();
        let back: ControllerConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
