//! Round history
//!
//! Every crashed round is recorded, whether or not the player had a bet.
//! Newest first, oldest evicted past the cap.

use serde::{Deserialize, Serialize};

use crate::consts::MAX_HISTORY;

/// A single crashed round
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Round number
    pub id: u64,
    /// Crash multiplier the round ended at
    pub multiplier: f64,
    /// Unix timestamp (ms) of the crash
    pub timestamp: f64,
}

impl HistoryEntry {
    /// Rounds at 2x and above get highlighted in the history bar
    pub fn is_high(&self) -> bool {
        self.multiplier >= 2.0
    }
}

/// Bounded crash history
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundHistory {
    entries: Vec<HistoryEntry>,
    capacity: usize,
}

impl Default for RoundHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl RoundHistory {
    /// Create empty history with the default cap
    pub fn new() -> Self {
        Self::with_capacity(MAX_HISTORY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: Vec::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Prepend a crashed round, evicting the oldest past the cap
    pub fn record(&mut self, id: u64, multiplier: f64, timestamp: f64) {
        self.entries.insert(
            0,
            HistoryEntry {
                id,
                multiplier,
                timestamp,
            },
        );
        self.entries.truncate(self.capacity);
    }

    /// Entries, newest first
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Up to `n` most recent crash multipliers, newest first
    pub fn recent_multipliers(&self, n: usize) -> Vec<f64> {
        self.entries.iter().take(n).map(|e| e.multiplier).collect()
    }

    pub fn latest(&self) -> Option<&HistoryEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
