//! WorkerPool - スロット表 + dispatch/resolve キュー + ワーカースレッド
//!
//! # 所有権の受け渡し
//! - poller (the thread calling `poll`) owns every task sitting in a slot
//! - dispatch moves the task box to a worker; the slot is marked `InFlight`
//! - resolve moves it back; the slot becomes `Ready` again or is cleared
//!
//! The slot table is only ever touched through `&mut self`, so a second
//! poller or a concurrent `submit` is rejected by the borrow checker rather
//! than by a lock.

use std::cmp::Reverse;
use std::collections::BinaryHeap;
use std::mem;
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};

use tokio::sync::mpsc::{self, error::TryRecvError, error::TrySendError};
use tracing::{debug, error, info, trace, warn};

use super::builder::{PoolBuilder, validate};
use super::config::{AffinityPolicy, PoolConfig};
use super::report::{Dispatch, Outcome, Report};
use super::status::{PollSummary, PoolCounts};
use super::worker_loop::worker_loop;
use crate::domain::{Affinity, BuildError, PoolFull, SlotId, Status};
use crate::ports::Task;

enum Slot {
    Free,
    Ready(Box<dyn Task>),
    InFlight,
}

/// Fixed-capacity scheduler for [`Task`]s.
///
/// Call [`WorkerPool::poll`] repeatedly from one thread (e.g. once per tick).
/// Main-affinity steps run inside `poll`; background steps run on the
/// worker threads.
///
/// `poll` and `dispose` use blocking channel operations and must not be
/// called from inside an async runtime worker; use `spawn_blocking` or a
/// plain thread.
pub struct WorkerPool {
    slots: Vec<Slot>,
    /// Free slot indices, lowest first.
    free: BinaryHeap<Reverse<usize>>,
    policy: AffinityPolicy,
    dispatch: Option<mpsc::Sender<Dispatch>>,
    resolve: mpsc::Receiver<Report>,
    workers: Vec<JoinHandle<()>>,
    worker_count: usize,
}

impl WorkerPool {
    pub fn builder() -> PoolBuilder {
        PoolBuilder::new()
    }

    pub fn new(config: PoolConfig) -> Result<Self, BuildError> {
        validate(&config)?;
        Self::spawn(config)
    }

    /// Default config with `workers` background threads.
    pub fn with_workers(workers: usize) -> Result<Self, BuildError> {
        Self::builder().workers(workers).build()
    }

    pub(crate) fn spawn(config: PoolConfig) -> Result<Self, BuildError> {
        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.capacity);
        let (resolve_tx, resolve_rx) = mpsc::channel(config.capacity);
        let shared = Arc::new(Mutex::new(dispatch_rx));

        let mut workers = Vec::with_capacity(config.workers);
        for index in 0..config.workers {
            let dispatch = Arc::clone(&shared);
            let resolve = resolve_tx.clone();
            let spawned = thread::Builder::new()
                .name(format!("{}-{index}", config.thread_name))
                .spawn(move || worker_loop(index, dispatch, resolve));

            match spawned {
                Ok(handle) => workers.push(handle),
                Err(source) => {
                    // close dispatch so the workers already running exit
                    drop(dispatch_tx);
                    join_all(workers);
                    return Err(BuildError::Spawn { index, source });
                }
            }
        }

        info!(
            capacity = config.capacity,
            workers = config.workers,
            policy = ?config.affinity_policy,
            "worker pool started"
        );

        let mut slots = Vec::with_capacity(config.capacity);
        slots.resize_with(config.capacity, || Slot::Free);

        Ok(Self {
            slots,
            free: (0..config.capacity).map(Reverse).collect(),
            policy: config.affinity_policy,
            dispatch: Some(dispatch_tx),
            resolve: resolve_rx,
            workers,
            worker_count: config.workers,
        })
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn workers(&self) -> usize {
        self.worker_count
    }

    pub fn affinity_policy(&self) -> AffinityPolicy {
        self.policy
    }

    /// Install `task` in the lowest free slot.
    ///
    /// When every slot is taken the task is handed back inside the error.
    pub fn submit<T: Task + 'static>(&mut self, task: T) -> Result<SlotId, PoolFull<T>> {
        let Some(Reverse(index)) = self.free.pop() else {
            debug!(capacity = self.capacity(), "submit rejected, pool full");
            return Err(PoolFull::new(self.capacity(), task));
        };
        Ok(self.install(index, Box::new(task)))
    }

    /// [`WorkerPool::submit`] for an already type-erased task.
    pub fn submit_boxed(&mut self, task: Box<dyn Task>) -> Result<SlotId, PoolFull<Box<dyn Task>>> {
        let Some(Reverse(index)) = self.free.pop() else {
            debug!(capacity = self.capacity(), "submit rejected, pool full");
            return Err(PoolFull::new(self.capacity(), task));
        };
        Ok(self.install(index, task))
    }

    fn install(&mut self, index: usize, mut task: Box<dyn Task>) -> SlotId {
        self.policy.on_submit(&mut *task);
        self.slots[index] = Slot::Ready(task);

        let slot = SlotId::new(index);
        debug!(%slot, "task submitted");
        slot
    }

    /// Scheduling heartbeat.
    ///
    /// Sweeps the slots in index order: main-affinity tasks run one step
    /// inline, background-affinity tasks are handed to the workers, in-flight
    /// tasks are skipped. Then at most one worker report is drained without
    /// waiting.
    pub fn poll(&mut self) -> PollSummary {
        let mut summary = PollSummary::default();

        for index in 0..self.slots.len() {
            let Slot::Ready(task) = &mut self.slots[index] else {
                continue;
            };
            let status = task.status();
            if status.is_in_flight() {
                continue;
            }

            match status.affinity {
                Affinity::Main => {
                    if task.execute() {
                        self.policy.after_inline(&mut **task);
                        summary.ran_inline += 1;
                    } else {
                        self.release(index);
                        summary.retired += 1;
                    }
                }
                Affinity::Background => {
                    task.set_status(Status::in_flight());
                    let Slot::Ready(task) = mem::replace(&mut self.slots[index], Slot::InFlight)
                    else {
                        unreachable!("slot {index} was matched as Ready");
                    };
                    if self.send_dispatch(SlotId::new(index), task) {
                        summary.dispatched += 1;
                    } else {
                        summary.retired += 1;
                    }
                }
            }
        }

        self.resolve_one(&mut summary);
        if !summary.is_quiet() {
            trace!(?summary, "poll");
        }
        summary
    }

    fn send_dispatch(&mut self, slot: SlotId, task: Box<dyn Task>) -> bool {
        // `dispatch` is only cleared by `shutdown`, after which nothing polls;
        // treat it like a closed queue
        let result = match &self.dispatch {
            None => Err(()),
            Some(tx) => match tx.try_send(Dispatch { slot, task }) {
                Ok(()) => Ok(()),
                Err(TrySendError::Full(message)) => {
                    // backpressure: wait for a worker to pick something up
                    warn!(%slot, "dispatch queue full, waiting");
                    tx.blocking_send(message).map_err(|_| ())
                }
                // every worker has exited
                Err(TrySendError::Closed(_)) => Err(()),
            },
        };

        match result {
            Ok(()) => {
                debug!(%slot, "dispatched");
                true
            }
            Err(()) => {
                error!(%slot, "no worker left to receive dispatch, dropping task");
                self.release(slot.index());
                false
            }
        }
    }

    fn resolve_one(&mut self, summary: &mut PollSummary) {
        let report = match self.resolve.try_recv() {
            Ok(report) => report,
            Err(TryRecvError::Empty) => return,
            Err(TryRecvError::Disconnected) => {
                trace!("resolve queue disconnected");
                return;
            }
        };

        let Report { slot, outcome } = report;
        let index = slot.index();
        match outcome {
            Outcome::Ran(mut task) => {
                self.policy.after_resolve(&mut *task);
                self.slots[index] = Slot::Ready(task);
                summary.resolved += 1;
                debug!(%slot, status = ?self.status_of(slot), "resolved");
            }
            Outcome::Exhausted(task) => {
                drop(task);
                self.release(index);
                summary.retired += 1;
            }
            Outcome::Panicked(message) => {
                error!(%slot, panic = %message, "task dropped after background step panicked");
                self.release(index);
                summary.panicked += 1;
            }
        }
    }

    fn release(&mut self, index: usize) {
        self.slots[index] = Slot::Free;
        self.free.push(Reverse(index));
        debug!(slot = %SlotId::new(index), "task retired");
    }

    /// Status of the task in `slot`, or `None` if the slot is free.
    ///
    /// In-flight tasks report `(Background, pending=false)`.
    pub fn status_of(&self, slot: SlotId) -> Option<Status> {
        match self.slots.get(slot.index())? {
            Slot::Free => None,
            Slot::Ready(task) => Some(task.status()),
            Slot::InFlight => Some(Status::in_flight()),
        }
    }

    pub fn counts(&self) -> PoolCounts {
        let mut counts = PoolCounts {
            capacity: self.capacity(),
            ..Default::default()
        };
        for slot in &self.slots {
            match slot {
                Slot::Free => counts.free += 1,
                Slot::Ready(_) => counts.ready += 1,
                Slot::InFlight => counts.in_flight += 1,
            }
        }
        counts
    }

    /// No active tasks.
    pub fn is_idle(&self) -> bool {
        self.free.len() == self.slots.len()
    }

    /// Shut the pool down.
    ///
    /// Closes dispatch, waits for every worker to finish its current step and
    /// exit, then drops the resolve queue. Returns immediately when nothing
    /// is in flight. Tasks still in the table are dropped.
    pub fn dispose(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        if self.dispatch.take().is_none() {
            return;
        }
        join_all(mem::take(&mut self.workers));
        // drain reports so their tasks drop here, not with the channel
        while let Ok(Report { slot, .. }) = self.resolve.try_recv() {
            trace!(%slot, "discarding report after shutdown");
        }
        self.resolve.close();
        info!("worker pool disposed");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn join_all(workers: Vec<JoinHandle<()>>) {
    for handle in workers {
        let name = handle.thread().name().unwrap_or("worker").to_string();
        if handle.join().is_err() {
            error!(thread = %name, "worker thread panicked");
        }
    }
}
