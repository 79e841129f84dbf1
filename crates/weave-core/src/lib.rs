//! weave-core
//!
//! Cooperative step scheduler: a `Chain` is an ordered list of steps over one
//! context, each tagged `Main` or `Background`. A `WorkerPool` runs the main
//! steps inline when polled and hands the background steps to worker threads.
//!
//! # モジュール構成
//! - **domain**: Affinity, Status, SlotId, errors
//! - **ports**: `Task` trait (what the pool schedules)
//! - **typed**: `Chain<C>` / `Step<C>`
//! - **app**: WorkerPool, builder, config, status views
//!
//! ```
//! use weave_core::app::WorkerPool;
//! use weave_core::typed::Chain;
//!
//! let mut pool = WorkerPool::builder().capacity(8).workers(2).build().unwrap();
//! pool.submit(
//!     Chain::new(Vec::new())
//!         .background(|v: &mut Vec<u64>| v.extend(1..=10))
//!         .main(|v| assert_eq!(v.iter().sum::<u64>(), 55)),
//! )
//! .unwrap();
//!
//! while !pool.is_idle() {
//!     pool.poll();
//!     std::thread::sleep(std::time::Duration::from_millis(1));
//! }
//! pool.dispose();
//! ```

pub mod app;
pub mod domain;
pub mod ports;
pub mod typed;

pub use app::{AffinityPolicy, PoolBuilder, PoolConfig, PollSummary, PoolCounts, WorkerPool};
pub use domain::{Affinity, BuildError, ChainError, PoolFull, SlotId, Status};
pub use ports::Task;
pub use typed::{Chain, Step};
