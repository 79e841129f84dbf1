//! Status - プールの観測用ビュー

use serde::{Deserialize, Serialize};

/// Slot table occupancy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolCounts {
    pub capacity: usize,
    pub free: usize,
    /// Owned by the poller, waiting for the next sweep.
    pub ready: usize,
    /// Handed to a worker, report not yet drained.
    pub in_flight: usize,
}

impl PoolCounts {
    pub fn active(&self) -> usize {
        self.ready + self.in_flight
    }
}

/// What a single `poll()` call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PollSummary {
    /// Main steps executed inline.
    pub ran_inline: usize,
    /// Tasks handed to the dispatch queue.
    pub dispatched: usize,
    /// Background reports drained that returned a task to the table (0 or 1).
    pub resolved: usize,
    /// Tasks whose slot was cleared.
    pub retired: usize,
    /// Background steps that panicked (0 or 1).
    pub panicked: usize,
}

impl PollSummary {
    /// Nothing happened during this poll.
    pub fn is_quiet(&self) -> bool {
        *self == Self::default()
    }

    pub fn merge(&mut self, other: PollSummary) {
        self.ran_inline += other.ran_inline;
        self.dispatched += other.dispatched;
        self.resolved += other.resolved;
        self.retired += other.retired;
        self.panicked += other.panicked;
    }
}
