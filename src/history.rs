//! Bounded most-recent-first winner log.

use crate::{Address, Amount};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct WinnerRecord {
    pub address: Address,
    pub amount: Amount,
    pub timestamp: u64,
    pub height: u64,
}

/// Ring buffer of recent winners; the oldest entry is evicted in O(1)
/// once the cap is exceeded.
#[derive(Debug)]
pub struct WinnerHistory {
    records: VecDeque<WinnerRecord>,
    capacity: usize,
}

impl WinnerHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push(&mut self, record: WinnerRecord) {
        if self.records.len() == self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(record);
    }

    /// Up to `limit` most recent winners, newest first.
    pub fn recent(&self, limit: usize) -> Vec<WinnerRecord> {
        self.records.iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
