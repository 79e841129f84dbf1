//! Domain model (affinity, status, slot ids, errors).

pub mod affinity;
pub mod errors;
pub mod ids;

pub use self::affinity::{Affinity, Status};
pub use self::errors::{BuildError, ChainError, PoolFull};
pub use self::ids::SlotId;
