//! Ports - 抽象化レイヤー
//!
//! The pool is written against the `Task` trait only; `typed::Chain` is the
//! implementation callers normally use.

pub mod task;

pub use self::task::Task;
