//! Slot identifiers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of an entry in the pool's slot table.
///
/// Slot ids are reused once a task retires, so a `SlotId` only identifies a
/// task for as long as that task is alive.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SlotId(usize);

impl SlotId {
    pub fn new(index: usize) -> Self {
        Self(index)
    }

    pub fn index(self) -> usize {
        self.0
    }
}

impl From<usize> for SlotId {
    fn from(index: usize) -> Self {
        Self::new(index)
    }
}

impl fmt::Display for SlotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot-{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_has_prefix() {
        assert_eq!(SlotId::new(7).to_string(), "slot-7");
    }

    #[test]
    fn ordering_follows_index() {
        assert!(SlotId::new(1) < SlotId::new(2));
        assert_eq!(SlotId::from(3).index(), 3);
    }
}
