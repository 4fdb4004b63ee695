//! Worker pool for asynchronous deliveries.
//!
//! Jobs are queued on an unbounded channel and picked up by named worker
//! threads. The pool keeps a core set of workers and grows whenever a job is
//! submitted while no worker is idle, so every job starts without waiting on
//! another one to finish. Extra workers retire after sitting idle.
//!
//! Submission never blocks and nothing is joined: when the executor is
//! dropped the queue disconnects, workers drain whatever is left and exit on
//! their own.

use crossbeam_channel::{unbounded, Receiver, RecvTimeoutError, Sender};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

type Job = Box<dyn FnOnce() + Send + 'static>;

/// State shared by the submitting side and every worker.
struct Pool {
    receiver: Receiver<Job>,
    /// Workers waiting for a job that no submitter has claimed yet.
    idle: AtomicUsize,
    /// Workers currently alive.
    live: AtomicUsize,
    next_index: AtomicUsize,
    thread_name: String,
    idle_timeout: Duration,
}

#[derive(Clone)]
pub(crate) struct Executor {
    sender: Sender<Job>,
    pool: Arc<Pool>,
}

impl Executor {
    /// Start `core` resident workers (at least one) named `{thread_name}-{index}`.
    /// Workers started on demand beyond those exit after `idle_timeout`.
    pub(crate) fn new(core: usize, thread_name: &str, idle_timeout: Duration) -> Self {
        let (sender, receiver) = unbounded::<Job>();
        let pool = Arc::new(Pool {
            receiver,
            idle: AtomicUsize::new(0),
            live: AtomicUsize::new(0),
            next_index: AtomicUsize::new(0),
            thread_name: thread_name.to_string(),
            idle_timeout,
        });

        for _ in 0..core.max(1) {
            if let Err(e) = start_worker(&pool, true) {
                tracing::warn!(target: "patchbay", error = %e, "failed to spawn worker");
            }
        }

        Self { sender, pool }
    }

    /// Queue a job, claiming an idle worker for it or starting a new one.
    pub(crate) fn spawn<F>(&self, job: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let claimed = self
            .pool
            .idle
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
            .is_ok();

        if !claimed {
            if let Err(e) = start_worker(&self.pool, false) {
                // The job still runs once a busy worker frees up.
                tracing::warn!(target: "patchbay", error = %e, "failed to grow worker pool");
            }
        }

        // The pool owns a receiver, so the queue cannot be disconnected here.
        let _ = self.sender.send(Box::new(job));
    }

    /// Jobs waiting for a worker.
    pub(crate) fn queued(&self) -> usize {
        self.sender.len()
    }

    #[cfg(test)]
    pub(crate) fn workers(&self) -> usize {
        self.pool.live.load(Ordering::Acquire)
    }
}

fn start_worker(pool: &Arc<Pool>, resident: bool) -> std::io::Result<()> {
    let index = pool.next_index.fetch_add(1, Ordering::Relaxed);
    let worker_pool = Arc::clone(pool);

    pool.live.fetch_add(1, Ordering::AcqRel);
    let spawned = thread::Builder::new()
        .name(format!("{}-{}", pool.thread_name, index))
        .spawn(move || run_worker(&worker_pool, resident));

    if spawned.is_err() {
        pool.live.fetch_sub(1, Ordering::AcqRel);
    }
    spawned.map(|_| ())
}

/// A worker starts busy: it was either started for a job that is already on
/// its way, or it is resident and announces itself idle before its first wait.
fn run_worker(pool: &Pool, resident: bool) {
    let mut announce = resident;

    loop {
        if announce {
            pool.idle.fetch_add(1, Ordering::AcqRel);
        }

        let received = if resident {
            pool.receiver.recv().map_err(|_| RecvTimeoutError::Disconnected)
        } else {
            pool.receiver.recv_timeout(pool.idle_timeout)
        };

        match received {
            Ok(job) => {
                // Jobs isolate their own panics; this keeps the worker alive
                // if one slips through anyway.
                if panic::catch_unwind(AssertUnwindSafe(job)).is_err() {
                    tracing::warn!(target: "patchbay", "async job panicked");
                }
                announce = true;
            }
            Err(RecvTimeoutError::Timeout) => {
                // Retire only if the idle slot is still unclaimed; otherwise a
                // job has been promised to some idle worker, so keep waiting.
                let retired = pool
                    .idle
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                    .is_ok();
                if retired {
                    break;
                }
                announce = false;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    pool.live.fetch_sub(1, Ordering::AcqRel);
    tracing::trace!(target: "patchbay", "worker exiting");
}
