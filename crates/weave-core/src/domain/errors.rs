//! Errors - エラー型
//!
//! Only capacity exhaustion is a runtime condition the caller is expected to
//! handle. Misuse of a chain is a programming error and panics; `ChainError`
//! exists for callers that prefer to check first.

use std::fmt;

use thiserror::Error;

/// Message used when a step is appended to a chain that already ran.
pub const APPEND_AFTER_START: &str = "can't append a step after the chain started executing";

/// Chain construction errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChainError {
    #[error("{msg} (cursor={cursor})", msg = APPEND_AFTER_START)]
    AlreadyStarted { cursor: usize },
}

/// Pool construction errors (fail-fast at `build()`).
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("pool capacity must be at least 1")]
    ZeroCapacity,

    #[error("pool needs at least one worker thread")]
    ZeroWorkers,

    #[error("failed to spawn worker thread {index}: {source}")]
    Spawn {
        index: usize,
        #[source]
        source: std::io::Error,
    },
}

/// Returned by `WorkerPool::submit` when every slot is taken.
///
/// The rejected task is handed back; it is not queued or retried.
#[derive(Error)]
#[error("worker pool is full (capacity={capacity})")]
pub struct PoolFull<T> {
    capacity: usize,
    task: T,
}

impl<T> PoolFull<T> {
    pub(crate) fn new(capacity: usize, task: T) -> Self {
        Self { capacity, task }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Take the rejected task back.
    pub fn into_inner(self) -> T {
        self.task
    }
}

// Manual impl: tasks hold closures, which are not Debug.
impl<T> fmt::Debug for PoolFull<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolFull")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_full_returns_task() {
        let err = PoolFull::new(4, "task");
        assert_eq!(err.capacity(), 4);
        assert_eq!(err.to_string(), "worker pool is full (capacity=4)");
        assert_eq!(err.into_inner(), "task");
    }

    #[test]
    fn chain_error_message_mentions_cursor() {
        let err = ChainError::AlreadyStarted { cursor: 2 };
        assert!(err.to_string().contains("cursor=2"));
    }
}
