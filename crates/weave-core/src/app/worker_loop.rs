//! WorkerLoop - バックグラウンド step の実行ループ
//!
//! # フロー
//! 1. dispatch から `(slot, task)` を受け取る（空なら待つ）
//! 2. `task.execute()` を 1 回だけ実行
//! 3. 結果を resolve に送る
//!
//! The loop ends when the dispatch queue is closed and drained.

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::{debug, error, trace};

use super::report::{Dispatch, Outcome, Report, panic_message};

/// Dispatch receiver shared by every worker.
pub(crate) type SharedDispatch = Arc<Mutex<mpsc::Receiver<Dispatch>>>;

pub(crate) fn worker_loop(worker_id: usize, dispatch: SharedDispatch, resolve: mpsc::Sender<Report>) {
    debug!(worker_id, "worker started");

    loop {
        let next = {
            // poisoned only if another worker died while holding the guard
            let Ok(mut rx) = dispatch.lock() else {
                error!(worker_id, "dispatch queue lock poisoned");
                break;
            };
            rx.blocking_recv()
        };

        let Some(Dispatch { slot, mut task }) = next else {
            break;
        };
        trace!(worker_id, %slot, "running background step");

        let outcome = match panic::catch_unwind(AssertUnwindSafe(|| task.execute())) {
            Ok(ran) => Outcome::from_execute(task, ran),
            Err(payload) => {
                let message = panic_message(&*payload);
                // the poller logs the dropped task at error level on resolve
                debug!(worker_id, %slot, panic = %message, "background step panicked");
                Outcome::Panicked(message)
            }
        };

        // resolve is sized to the slot table, so this only waits when the
        // poller has stopped draining
        if resolve.blocking_send(Report { slot, outcome }).is_err() {
            error!(worker_id, %slot, "resolve queue closed, dropping report");
            break;
        }
    }

    debug!(worker_id, "worker stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SlotId;
    use crate::ports::Task;
    use crate::typed::Chain;
    use std::thread;

    fn spawn_one() -> (mpsc::Sender<Dispatch>, mpsc::Receiver<Report>, thread::JoinHandle<()>) {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(4);
        let (resolve_tx, resolve_rx) = mpsc::channel(4);
        let shared = Arc::new(Mutex::new(dispatch_rx));
        let join = thread::spawn(move || worker_loop(0, shared, resolve_tx));
        (dispatch_tx, resolve_rx, join)
    }

    #[test]
    fn worker_runs_exactly_one_step_per_dispatch() {
        let (tx, mut rx, join) = spawn_one();
        let chain = Chain::new(0u32).background(|n| *n += 1).background(|n| *n += 1);

        tx.blocking_send(Dispatch {
            slot: SlotId::new(3),
            task: Box::new(chain),
        })
        .unwrap();

        let report = rx.blocking_recv().unwrap();
        assert_eq!(report.slot, SlotId::new(3));
        let Outcome::Ran(task) = report.outcome else {
            panic!("expected Ran");
        };
        assert_eq!(task.current_affinity(), Some(crate::domain::Affinity::Background));

        drop(tx);
        join.join().unwrap();
    }

    #[test]
    fn worker_reports_exhaustion() {
        let (tx, mut rx, join) = spawn_one();
        tx.blocking_send(Dispatch {
            slot: SlotId::new(0),
            task: Box::new(Chain::new(())),
        })
        .unwrap();

        let report = rx.blocking_recv().unwrap();
        assert!(matches!(report.outcome, Outcome::Exhausted(_)));

        drop(tx);
        join.join().unwrap();
    }

    #[test]
    fn worker_survives_panicking_step() {
        let (tx, mut rx, join) = spawn_one();
        let bad = Chain::new(()).background(|_| panic!("boom"));
        let good = Chain::new(()).background(|_| {});

        tx.blocking_send(Dispatch { slot: SlotId::new(0), task: Box::new(bad) }).unwrap();
        tx.blocking_send(Dispatch { slot: SlotId::new(1), task: Box::new(good) }).unwrap();

        let first = rx.blocking_recv().unwrap();
        assert!(matches!(first.outcome, Outcome::Panicked(ref m) if m == "boom"));
        let second = rx.blocking_recv().unwrap();
        assert!(matches!(second.outcome, Outcome::Ran(_)));

        drop(tx);
        join.join().unwrap();
    }

    #[derive(Clone, Default)]
    struct Captured(Arc<Mutex<Vec<u8>>>);

    impl std::io::Write for Captured {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    impl<'a> tracing_subscriber::fmt::MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    #[test]
    fn panicking_step_is_not_logged_as_error_by_worker() {
        let (tx, dispatch_rx) = mpsc::channel(4);
        let (resolve_tx, mut resolve_rx) = mpsc::channel(4);
        tx.blocking_send(Dispatch {
            slot: SlotId::new(0),
            task: Box::new(Chain::new(()).background(|_| panic!("boom"))),
        })
        .unwrap();
        drop(tx);

        let captured = Captured::default();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_writer(captured.clone())
            .with_ansi(false)
            .finish();

        // run on this thread so the scoped subscriber sees the worker's events
        tracing::subscriber::with_default(subscriber, || {
            worker_loop(0, Arc::new(Mutex::new(dispatch_rx)), resolve_tx);
        });

        let report = resolve_rx.blocking_recv().unwrap();
        assert!(matches!(report.outcome, Outcome::Panicked(_)));

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("background step panicked"));
        assert!(!logs.contains("ERROR"));
    }

    #[test]
    fn worker_exits_when_dispatch_closes() {
        let (tx, _rx, join) = spawn_one();
        drop(tx);
        join.join().unwrap();
    }
}
