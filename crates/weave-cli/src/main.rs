use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, bail};
use clap::{Parser, ValueEnum};
use rand::Rng;
use serde::Serialize;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::MakeWriter;
use weave_core::{AffinityPolicy, Chain, PollSummary, PoolCounts, WorkerPool};

/// Drive a worker pool with demo chains: prepare (main) -> compute
/// (background) -> verify (background) -> finish (main).
#[derive(Debug, Parser)]
#[command(name = "weave", version)]
struct Args {
    /// Number of chains to run.
    #[arg(long, env = "WEAVE_TASKS", default_value_t = 16)]
    tasks: usize,

    /// Background worker threads.
    #[arg(long, env = "WEAVE_WORKERS", default_value_t = 4)]
    workers: usize,

    /// Slot table size. Chains that don't fit wait for a free slot.
    #[arg(long, env = "WEAVE_CAPACITY", default_value_t = 8)]
    capacity: usize,

    /// Delay between polls.
    #[arg(long, env = "WEAVE_TICK_MS", default_value_t = 5)]
    tick_ms: u64,

    #[arg(long, env = "WEAVE_POLICY", value_enum, default_value_t = Policy::FollowStep)]
    policy: Policy,

    /// Give up after this many polls.
    #[arg(long, env = "WEAVE_MAX_TICKS", default_value_t = 10_000)]
    max_ticks: usize,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Policy {
    FollowStep,
    ReturnToMain,
}

impl From<Policy> for AffinityPolicy {
    fn from(policy: Policy) -> Self {
        match policy {
            Policy::FollowStep => AffinityPolicy::FollowStep,
            Policy::ReturnToMain => AffinityPolicy::ReturnToMain,
        }
    }
}

/// Context shared by the steps of one demo chain.
#[derive(Debug, Default)]
struct Job {
    id: usize,
    numbers: Vec<u64>,
    sum_of_squares: u64,
    verified: bool,
    ran_on: Vec<String>,
}

impl Job {
    fn mark(&mut self, step: &str) {
        let thread = thread::current();
        self.ran_on
            .push(format!("{step}@{}", thread.name().unwrap_or("main")));
    }
}

#[derive(Debug, Serialize)]
struct JobReport {
    id: usize,
    sum_of_squares: u64,
    verified: bool,
    ran_on: Vec<String>,
}

#[derive(Debug, Serialize)]
struct RunReport {
    policy: AffinityPolicy,
    ticks: usize,
    elapsed_ms: u128,
    rejected_submits: usize,
    totals: PollSummary,
    counts: PoolCounts,
    completed: Vec<JobReport>,
}

type Sink = Arc<Mutex<Vec<JobReport>>>;

fn demo_chain(id: usize, sink: Sink) -> Chain<Job> {
    Chain::with_capacity(Job { id, ..Default::default() }, 4)
        .main(|job| {
            job.mark("prepare");
            let mut rng = rand::thread_rng();
            let len = rng.gen_range(100..1_000);
            job.numbers = (0..len).map(|_| rng.gen_range(0..1_000)).collect();
        })
        .background(|job| {
            job.mark("compute");
            let pause = rand::thread_rng().gen_range(1..10);
            thread::sleep(Duration::from_millis(pause));
            job.sum_of_squares = job.numbers.iter().map(|n| n * n).sum();
        })
        .background(|job| {
            job.mark("verify");
            let expected = job.numbers.iter().fold(0u64, |acc, n| acc + n * n);
            job.verified = expected == job.sum_of_squares;
        })
        .main(move |job| {
            job.mark("finish");
            debug!(id = job.id, sum = job.sum_of_squares, "job finished");
            let report = JobReport {
                id: job.id,
                sum_of_squares: job.sum_of_squares,
                verified: job.verified,
                ran_on: std::mem::take(&mut job.ran_on),
            };
            if let Ok(mut sink) = sink.lock() {
                sink.push(report);
            }
        })
}

fn run(args: &Args) -> anyhow::Result<RunReport> {
    let mut pool = WorkerPool::builder()
        .capacity(args.capacity)
        .workers(args.workers)
        .affinity_policy(args.policy.into())
        .build()
        .context("failed to start worker pool")?;

    let sink: Sink = Arc::default();
    let mut backlog: VecDeque<Chain<Job>> =
        (0..args.tasks).map(|id| demo_chain(id, sink.clone())).collect();

    let tick = Duration::from_millis(args.tick_ms);
    let started = Instant::now();
    let mut totals = PollSummary::default();
    let mut rejected_submits = 0;
    let mut ticks = 0;

    while !(backlog.is_empty() && pool.is_idle()) {
        if ticks >= args.max_ticks {
            warn!(ticks, remaining = backlog.len(), counts = ?pool.counts(), "giving up");
            bail!("pool still busy after {ticks} ticks");
        }

        // the pool hands rejected chains back; keep them for the next tick
        while let Some(chain) = backlog.pop_front() {
            match pool.submit(chain) {
                Ok(slot) => debug!(%slot, "submitted"),
                Err(full) => {
                    rejected_submits += 1;
                    backlog.push_front(full.into_inner());
                    break;
                }
            }
        }

        totals.merge(pool.poll());
        ticks += 1;
        thread::sleep(tick);
    }

    let counts = pool.counts();
    let policy = pool.affinity_policy();
    pool.dispose();

    let mut completed = match Arc::try_unwrap(sink) {
        Ok(sink) => sink.into_inner().unwrap_or_default(),
        Err(sink) => sink.lock().map(|mut s| std::mem::take(&mut *s)).unwrap_or_default(),
    };
    completed.sort_by_key(|job| job.id);

    Ok(RunReport {
        policy,
        ticks,
        elapsed_ms: started.elapsed().as_millis(),
        rejected_submits,
        totals,
        counts,
        completed,
    })
}

/// Log subscriber for the CLI. Logs go to `writer`; stdout is reserved for
/// the JSON report.
fn log_subscriber<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_thread_names(true)
        .with_writer(writer)
        .finish()
}

fn render(report: &RunReport) -> anyhow::Result<String> {
    Ok(serde_json::to_string_pretty(report)?)
}

fn main() -> anyhow::Result<()> {
    tracing::subscriber::set_global_default(log_subscriber(std::io::stderr))
        .context("failed to install log subscriber")?;

    let args = Args::parse();
    info!(?args, "starting");

    let report = run(&args)?;
    let failed = report.completed.iter().filter(|job| !job.verified).count();
    info!(
        ticks = report.ticks,
        completed = report.completed.len(),
        failed,
        "done"
    );

    println!("{}", render(&report)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

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

    impl<'a> MakeWriter<'a> for Captured {
        type Writer = Captured;

        fn make_writer(&'a self) -> Self::Writer {
            self.clone()
        }
    }

    fn args(tasks: usize, capacity: usize, policy: &str) -> Args {
        let tasks = tasks.to_string();
        let capacity = capacity.to_string();
        Args::parse_from([
            "weave",
            "--tasks",
            tasks.as_str(),
            "--capacity",
            capacity.as_str(),
            "--workers",
            "2",
            "--tick-ms",
            "1",
            "--policy",
            policy,
        ])
    }

    #[test]
    fn logs_stay_out_of_the_json_report() {
        let captured = Captured::default();
        let report = tracing::subscriber::with_default(log_subscriber(captured.clone()), || {
            run(&args(4, 2, "return-to-main"))
        })
        .unwrap();

        let logs = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(logs.contains("worker pool started"));

        let output = render(&report).unwrap();
        assert!(!output.contains("worker pool"));
        let json: serde_json::Value = serde_json::from_str(&output).unwrap();
        assert_eq!(json["completed"].as_array().unwrap().len(), 4);
        assert_eq!(json["counts"]["free"], 2);
        assert_eq!(json["policy"], "return-to-main");
    }

    #[test]
    fn every_job_is_verified_and_hops_threads() {
        let report = run(&args(6, 3, "follow-step")).unwrap();
        assert_eq!(report.completed.len(), 6);
        assert!(report.rejected_submits > 0);
        for job in &report.completed {
            assert!(job.verified);
            assert!(job.ran_on[0].starts_with("prepare@"));
            assert!(job.ran_on[1].starts_with("compute@weave-worker-"));
            assert!(job.ran_on[3].starts_with("finish@"));
        }
    }
}
