//! PoolBuilder - ワーカープールの構築
//!
//! # Fail-fast 設計
//! - 設定値は build() 時にまとめて検証する
//! - 不正な値は BuildError として返す（スレッドは起動しない）

use super::config::{AffinityPolicy, PoolConfig};
use super::pool::WorkerPool;
use crate::domain::BuildError;

/// Builds a [`WorkerPool`].
///
/// # 使用例
/// ```
/// use weave_core::app::{AffinityPolicy, PoolBuilder};
///
/// let pool = PoolBuilder::new()
///     .capacity(64)
///     .workers(2)
///     .affinity_policy(AffinityPolicy::FollowStep)
///     .build()
///     .unwrap();
/// assert_eq!(pool.capacity(), 64);
/// pool.dispose();
/// ```
#[derive(Debug, Clone, Default)]
pub struct PoolBuilder {
    config: PoolConfig,
}

impl PoolBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: PoolConfig) -> Self {
        Self { config }
    }

    pub fn capacity(mut self, capacity: usize) -> Self {
        self.config.capacity = capacity;
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.workers = workers;
        self
    }

    pub fn affinity_policy(mut self, policy: AffinityPolicy) -> Self {
        self.config.affinity_policy = policy;
        self
    }

    pub fn thread_name(mut self, prefix: impl Into<String>) -> Self {
        self.config.thread_name = prefix.into();
        self
    }

    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Validate the configuration and spawn the workers.
    pub fn build(self) -> Result<WorkerPool, BuildError> {
        validate(&self.config)?;
        WorkerPool::spawn(self.config)
    }
}

pub(crate) fn validate(config: &PoolConfig) -> Result<(), BuildError> {
    if config.capacity == 0 {
        return Err(BuildError::ZeroCapacity);
    }
    if config.workers == 0 {
        return Err(BuildError::ZeroWorkers);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_success() {
        let pool = PoolBuilder::new().capacity(4).workers(1).build().unwrap();
        assert_eq!(pool.capacity(), 4);
        assert_eq!(pool.workers(), 1);
        pool.dispose();
    }

    #[test]
    fn test_build_zero_capacity() {
        let result = PoolBuilder::new().capacity(0).workers(1).build();
        assert!(matches!(result, Err(BuildError::ZeroCapacity)));
    }

    #[test]
    fn test_build_zero_workers() {
        let result = PoolBuilder::new().capacity(4).workers(0).build();
        assert!(matches!(result, Err(BuildError::ZeroWorkers)));
    }

    #[test]
    fn test_builder_overrides_config() {
        let builder = PoolBuilder::from_config(PoolConfig::default())
            .capacity(16)
            .thread_name("tick-worker")
            .affinity_policy(AffinityPolicy::ReturnToMain);
        let config = builder.config();
        assert_eq!(config.capacity, 16);
        assert_eq!(config.thread_name, "tick-worker");
        assert_eq!(config.affinity_policy, AffinityPolicy::ReturnToMain);
    }
}
