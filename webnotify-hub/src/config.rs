//! Hub configuration

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{HubError, Result};

/// Largest accepted history capacity
pub const MAX_BUFFER_SIZE: usize = 1 << 20;

/// Largest accepted per-subscriber live queue
pub const MAX_QUEUE_DEPTH: usize = 1 << 20;

/// What the hub does when a subscriber's queue is full
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverflowPolicy {
    /// Wait for the subscriber to drain (stalls the broadcaster)
    #[default]
    Block,
    /// Drop the frame for that subscriber only
    DropNewest,
    /// Remove the subscriber and close its channel
    Disconnect,
}

impl std::str::FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "block" => Ok(Self::Block),
            "drop_newest" => Ok(Self::DropNewest),
            "disconnect" => Ok(Self::Disconnect),
            other => Err(format!("Unknown overflow policy: {}", other)),
        }
    }
}

/// Hub configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Number of notifications kept for late joiners
    pub buffer_size: usize,

    /// Seconds between keepalive pings (0 disables the scheduler)
    pub ping_interval_secs: u64,

    /// Live frames a subscriber may have queued before the overflow policy applies
    pub queue_depth: usize,

    /// Slow-consumer handling
    pub overflow: OverflowPolicy,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            buffer_size: 10,
            ping_interval_secs: 0,
            queue_depth: 64,
            overflow: OverflowPolicy::Block,
        }
    }
}

impl HubConfig {
    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_ping_interval_secs(mut self, secs: u64) -> Self {
        self.ping_interval_secs = secs;
        self
    }

    pub fn with_queue_depth(mut self, queue_depth: usize) -> Self {
        self.queue_depth = queue_depth;
        self
    }

    pub fn with_overflow(mut self, overflow: OverflowPolicy) -> Self {
        self.overflow = overflow;
        self
    }

    /// Ping period, or `None` when pings are disabled
    pub fn ping_interval(&self) -> Option<Duration> {
        (self.ping_interval_secs > 0).then(|| Duration::from_secs(self.ping_interval_secs))
    }

    pub fn validate(&self) -> Result<()> {
        if self.buffer_size == 0 || self.buffer_size > MAX_BUFFER_SIZE {
            return Err(HubError::InvalidCapacity(self.buffer_size));
        }
        if self.queue_depth == 0 || self.queue_depth > MAX_QUEUE_DEPTH {
            return Err(HubError::InvalidQueueDepth(self.queue_depth));
        }
        Ok(())
    }
}
