//! Bounded rolling window of recent notifications
//!
//! The history keeps the last `capacity` messages. Pushing into a full
//! history evicts the oldest entry, so `len() <= capacity()` always holds.

use std::collections::VecDeque;
use std::sync::Arc;

use crate::config::MAX_BUFFER_SIZE;
use crate::error::{HubError, Result};
use crate::message::LogMessage;

#[derive(Debug)]
pub struct History {
    capacity: usize,
    entries: VecDeque<Arc<LogMessage>>,
}

impl History {
    /// Create an empty history; `capacity` must be in `1..=MAX_BUFFER_SIZE`
    pub fn with_capacity(capacity: usize) -> Result<Self> {
        if capacity == 0 || capacity > MAX_BUFFER_SIZE {
            return Err(HubError::InvalidCapacity(capacity));
        }

        Ok(Self {
            capacity,
            entries: VecDeque::with_capacity(capacity),
        })
    }

    /// Append a message, evicting from the front while over capacity
    pub fn push(&mut self, message: Arc<LogMessage>) {
        self.entries.push_back(message);
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Copy of the retained messages, oldest first
    pub fn snapshot(&self) -> Vec<Arc<LogMessage>> {
        self.entries.iter().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<LogMessage>> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}
