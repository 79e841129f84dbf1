//! Task port - プールがスケジュールする抽象的な単位
//!
//! `WorkerPool` never sees the context type of a chain. It only needs these
//! four operations, so chains over different contexts share one slot table as
//! `Box<dyn Task>`.

use crate::domain::{Affinity, Status};

/// A unit of work the pool can advance one step at a time.
///
/// # Ownership
/// None of these methods synchronize. The pool guarantees that exactly one
/// thread holds the task at a time by moving the box itself between the
/// poller and a worker; implementors must not share mutable state with other
/// tasks behind the pool's back.
pub trait Task: Send {
    fn status(&self) -> Status;

    fn set_status(&mut self, status: Status);

    /// Affinity of the next step, or `None` once exhausted.
    fn current_affinity(&self) -> Option<Affinity>;

    /// Run the next step. Returns `false` (and does nothing) when exhausted.
    fn execute(&mut self) -> bool;
}

impl<T: Task + ?Sized> Task for Box<T> {
    fn status(&self) -> Status {
        (**self).status()
    }

    fn set_status(&mut self, status: Status) {
        (**self).set_status(status)
    }

    fn current_affinity(&self) -> Option<Affinity> {
        (**self).current_affinity()
    }

    fn execute(&mut self) -> bool {
        (**self).execute()
    }
}
