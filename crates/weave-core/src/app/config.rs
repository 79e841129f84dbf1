//! Config - プール設定と affinity の扱い方

use std::thread;

use serde::{Deserialize, Serialize};

use crate::domain::{Affinity, Status};
use crate::ports::Task;

/// Default slot table size.
pub const DEFAULT_CAPACITY: usize = 1024;

/// Default worker thread name prefix (`weave-worker-0`, `weave-worker-1`, ...).
pub const DEFAULT_THREAD_NAME: &str = "weave-worker";

/// How a task's status is refreshed after one of its steps runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AffinityPolicy {
    /// Derive the affinity from the next step (`Main` once exhausted).
    /// A `[Background, Background]` chain stays on the workers.
    #[default]
    FollowStep,

    /// Inline execution leaves the status as it was and every resolved
    /// background step hops back to `Main`. A `[Background, Background]`
    /// chain runs its second step on the polling thread.
    ReturnToMain,
}

impl AffinityPolicy {
    /// Status a freshly submitted task starts with.
    pub(crate) fn on_submit(self, task: &mut dyn Task) {
        task.set_status(Status::ready(next_affinity(task)));
    }

    /// Status after a main step ran inline and more steps may remain.
    pub(crate) fn after_inline(self, task: &mut dyn Task) {
        match self {
            AffinityPolicy::FollowStep => task.set_status(Status::ready(next_affinity(task))),
            AffinityPolicy::ReturnToMain => {}
        }
    }

    /// Status after a worker reported that a background step ran.
    pub(crate) fn after_resolve(self, task: &mut dyn Task) {
        let affinity = match self {
            AffinityPolicy::FollowStep => next_affinity(task),
            AffinityPolicy::ReturnToMain => Affinity::Main,
        };
        task.set_status(Status::ready(affinity));
    }
}

// an exhausted task is retired by the next inline execute
fn next_affinity(task: &dyn Task) -> Affinity {
    task.current_affinity().unwrap_or(Affinity::Main)
}

/// Worker pool configuration.
///
/// Both queues are sized to `capacity`: at most one step per slot is ever in
/// flight, so neither the poller nor the workers block under normal load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Number of slots (maximum concurrently active tasks).
    pub capacity: usize,

    /// Number of background worker threads.
    pub workers: usize,

    pub affinity_policy: AffinityPolicy,

    /// Worker thread name prefix.
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            workers: default_workers(),
            affinity_policy: AffinityPolicy::default(),
            thread_name: DEFAULT_THREAD_NAME.to_string(),
        }
    }
}

fn default_workers() -> usize {
    thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
