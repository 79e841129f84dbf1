//! Affinity / Status - どのスレッドで step を走らせるか
//!
//! `Status` is the ownership token the poller and the workers pass between
//! each other: `pending == true` means the poller owns the task,
//! `pending == false` means a worker does.

use serde::{Deserialize, Serialize};

/// Execution context a step requires.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Affinity {
    /// Run inline on the thread that calls `WorkerPool::poll`.
    Main,

    /// Run on one of the pool's worker threads.
    Background,
}

/// `(affinity, pending)` pair carried by every task.
///
/// State transitions driven by the pool:
/// - (Main, true) -> execute inline -> (Main, true) | retired
/// - (Background, true) -> dispatch -> (Background, false)
/// - (Background, false) -> resolve -> (*, true) | retired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Status {
    pub affinity: Affinity,
    pub pending: bool,
}

impl Status {
    pub fn new(affinity: Affinity, pending: bool) -> Self {
        Self { affinity, pending }
    }

    /// Owned by the poller and ready to be evaluated.
    pub fn ready(affinity: Affinity) -> Self {
        Self::new(affinity, true)
    }

    /// Handed to a worker.
    pub fn in_flight() -> Self {
        Self::new(Affinity::Background, false)
    }

    pub fn is_in_flight(&self) -> bool {
        !self.pending
    }
}

impl Default for Status {
    fn default() -> Self {
        Self::ready(Affinity::Main)
    }
}
