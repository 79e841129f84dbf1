//! Typed - コンテキスト型付きの Chain API
//!
//! # 二層構造
//! - **表層（Typed）**: `Chain<C>` / `Step<C>` - the context type is known
//! - **内部（Dyn）**: `Box<dyn Task>` - what the pool stores, type erased

pub mod chain;
pub mod step;

pub use self::chain::Chain;
pub use self::step::Step;
