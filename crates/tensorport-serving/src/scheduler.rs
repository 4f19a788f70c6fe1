use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;

use tensorport_core::Error;
use tokio::sync::mpsc;
use tracing::{debug, error, info};

use crate::{InferPayload, OnComplete};

/// Enqueue contract between a servable and its batching scheduler.
///
/// The scheduler guarantees the completion callback fires exactly once
/// with a terminal status, after the run path has (on success) driven
/// the response provider's finalize. Batching policy, timeouts, and
/// cancellation are the scheduler's own business.
pub trait Scheduler: Send + Sync {
    fn enqueue(&self, payload: InferPayload, on_complete: OnComplete);
}

/// Run-function signature supplied to a standard scheduler:
/// (runner index, payload) -> terminal status.
pub type StandardRunFn =
    Arc<dyn Fn(u32, &mut InferPayload) -> tensorport_core::Result<()> + Send + Sync>;

struct WorkItem {
    payload: InferPayload,
    on_complete: OnComplete,
}

/// Runner-pool scheduler a servable configures from its descriptor.
///
/// Work is distributed round-robin over dedicated runner threads, each
/// draining its own inbox, so enqueue is safe from any number of
/// concurrent callers and compute never ties up an async executor.
pub struct StandardScheduler {
    runner_txs: Vec<mpsc::UnboundedSender<WorkItem>>,
    runners: Vec<thread::JoinHandle<()>>,
    next: AtomicUsize,
}

impl StandardScheduler {
    pub fn new(runner_cnt: u32, on_run: StandardRunFn) -> Self {
        let cnt = runner_cnt.max(1);
        let mut runner_txs = Vec::with_capacity(cnt as usize);
        let mut runners = Vec::with_capacity(cnt as usize);
        for idx in 0..cnt {
            let (tx, rx) = mpsc::unbounded_channel();
            let run = Arc::clone(&on_run);
            runner_txs.push(tx);
            runners.push(thread::spawn(move || runner_loop(idx, rx, run)));
        }
        Self {
            runner_txs,
            runners,
            next: AtomicUsize::new(0),
        }
    }
}

fn runner_loop(idx: u32, mut inbox: mpsc::UnboundedReceiver<WorkItem>, on_run: StandardRunFn) {
    info!(runner = idx, "scheduler runner started");
    while let Some(mut item) = inbox.blocking_recv() {
        item.payload.stats.mark_dequeued();
        let status = on_run(idx, &mut item.payload);
        item.payload.stats.mark_compute_done();
        if let Err(err) = &status {
            debug!(runner = idx, error = %err, "inference run failed");
        }
        (item.on_complete)(status, item.payload);
    }
}

impl Scheduler for StandardScheduler {
    fn enqueue(&self, mut payload: InferPayload, on_complete: OnComplete) {
        payload.stats.mark_enqueued();
        let idx = self.next.fetch_add(1, Ordering::Relaxed) % self.runner_txs.len();
        debug!(
            model = payload.request.model_name(),
            runner = idx,
            "dispatching inference payload"
        );
        if let Err(mpsc::error::SendError(item)) = self.runner_txs[idx].send(WorkItem {
            payload,
            on_complete,
        }) {
            (item.on_complete)(
                Err(Error::unavailable("scheduler runner is gone")),
                item.payload,
            );
        }
    }
}

impl Drop for StandardScheduler {
    fn drop(&mut self) {
        // Closing the inboxes lets the runners drain and exit.
        self.runner_txs.clear();
        for runner in self.runners.drain(..) {
            if runner.join().is_err() {
                error!("scheduler runner panicked");
            }
        }
    }
}
