//! Report - poller と worker の間でやり取りするメッセージ
//!
//! The task box travels inside the messages. Whoever holds the box owns the
//! task's context, steps and cursor; the slot table only ever sees it while
//! the poller holds it.

use std::any::Any;

use crate::domain::SlotId;
use crate::ports::Task;

/// Poller -> worker: run one step of this task.
pub(crate) struct Dispatch {
    pub slot: SlotId,
    pub task: Box<dyn Task>,
}

/// Worker -> poller: what happened to a dispatched task.
pub(crate) struct Report {
    pub slot: SlotId,
    pub outcome: Outcome,
}

pub(crate) enum Outcome {
    /// A step ran; more may remain.
    Ran(Box<dyn Task>),

    /// Nothing was left to run.
    Exhausted(Box<dyn Task>),

    /// The step body panicked. The task has been dropped.
    Panicked(String),
}

impl Outcome {
    pub fn from_execute(task: Box<dyn Task>, ran: bool) -> Self {
        if ran {
            Outcome::Ran(task)
        } else {
            Outcome::Exhausted(task)
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::typed::Chain;
    use std::panic;

    #[test]
    fn outcome_follows_execute_result() {
        let task: Box<dyn Task> = Box::new(Chain::new(()));
        assert!(matches!(Outcome::from_execute(task, true), Outcome::Ran(_)));

        let task: Box<dyn Task> = Box::new(Chain::new(()));
        assert!(matches!(
            Outcome::from_execute(task, false),
            Outcome::Exhausted(_)
        ));
    }

    #[test]
    fn panic_message_reads_str_and_string() {
        let payload = panic::catch_unwind(|| panic!("static text")).unwrap_err();
        assert_eq!(panic_message(&*payload), "static text");

        let payload = panic::catch_unwind(|| panic!("formatted {}", 7)).unwrap_err();
        assert_eq!(panic_message(&*payload), "formatted 7");

        let payload = panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
        assert_eq!(panic_message(&*payload), "non-string panic payload");
    }
}
