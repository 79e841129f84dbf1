//! App - スケジューラ本体
//!
//! # 主要コンポーネント
//! - **WorkerPool**: スロット表と poll/dispatch/resolve のプロトコル
//! - **PoolBuilder**: プールの構築と起動時検証
//! - **WorkerLoop**: バックグラウンド step を 1 つずつ実行するスレッド
//! - **Status**: PoolCounts / PollSummary

pub mod builder;
pub mod config;
pub mod pool;
pub mod status;

mod report;
mod worker_loop;

// 主要な型を再エクスポート
pub use self::builder::PoolBuilder;
pub use self::config::{AffinityPolicy, PoolConfig};
pub use self::pool::WorkerPool;
pub use self::status::{PollSummary, PoolCounts};
