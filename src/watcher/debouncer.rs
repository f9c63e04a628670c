//! Debouncing for content file change events.
//!
//! Writers rarely produce a single event per save: editors truncate then
//! write, and large files land in several chunks. Waiting until a file
//! has been quiet for the debounce interval avoids reloading a
//! half-written document.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::DataFile;

/// Tracks recently changed content files and releases them once stable.
#[derive(Debug)]
pub struct Debouncer {
    /// Pending changes: target -> last change timestamp.
    pending: HashMap<DataFile, Instant>,
    /// How long a target must stay quiet before it is released.
    duration: Duration,
}

impl Debouncer {
    pub fn new(debounce_ms: u64) -> Self {
        Self {
            pending: HashMap::new(),
            duration: Duration::from_millis(debounce_ms),
        }
    }

    /// Record a change, resetting the timer for this target.
    pub fn record(&mut self, target: DataFile) {
        self.pending.insert(target, Instant::now());
    }

    /// Drop a pending target (its file was removed).
    pub fn remove(&mut self, target: &DataFile) {
        self.pending.remove(target);
    }

    /// Take every target that has been quiet for the full interval.
    pub fn take_ready(&mut self) -> Vec<DataFile> {
        let now = Instant::now();
        let mut ready = Vec::new();

        self.pending.retain(|target, last_change| {
            if now.duration_since(*last_change) >= self.duration {
                ready.push(*target);
                false
            } else {
                true
            }
        });

        ready
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}
