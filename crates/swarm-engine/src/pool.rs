//! The node's worker pool: a fixed set of OS threads pulling tasks off the
//! ring buffer and invoking the loaded predicate (section 4.4).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::mpsc::Sender;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use swarm_core::{TaskResult, RESULT_BUF_MIN_CAP};
use swarm_predicate::{ExecuteOutcome, PredicateLibrary};

use crate::ring::RingBuffer;

/// One task as handed to the ring buffer: the task-id plus its own byte
/// payload. Each worker owns the slice it pops, so there's no shared
/// receive-buffer-lifetime bookkeeping to do on this side of the queue.
pub struct WorkItem {
    pub task_id: u64,
    pub data: Vec<u8>,
}

/// Default ring buffer capacity, matching the spec's suggested default
/// (section 4.3).
pub const DEFAULT_RING_CAPACITY: usize = 1 << 20;

/// Default size of the per-worker scratch buffer passed to
/// `swarm_test_execute`. Predicates may write up to this many bytes.
const RESULT_BUF_CAP: usize = 4096;

/// A running pool of worker threads sharing one ring buffer and one loaded
/// predicate.
pub struct WorkerPool {
    ring: Arc<RingBuffer<WorkItem>>,
    pending_tasks: Arc<AtomicU64>,
    tasks_processed: Arc<AtomicU64>,
    tasks_succeeded: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    handles: Vec<JoinHandle<()>>,
}

impl WorkerPool {
    /// Spawns `num_workers` threads, each looping on the shared ring buffer
    /// until `shutdown` is called and the buffer is drained. Successes are
    /// sent on `result_tx` for the caller (the node's main loop) to forward
    /// to the coordinator under the socket mutex.
    pub fn spawn(
        num_workers: usize,
        ring_capacity: usize,
        predicate: Arc<PredicateLibrary>,
        result_tx: Sender<TaskResult>,
    ) -> Self {
        let ring = Arc::new(RingBuffer::with_capacity(ring_capacity));
        let pending_tasks = Arc::new(AtomicU64::new(0));
        let tasks_processed = Arc::new(AtomicU64::new(0));
        let tasks_succeeded = Arc::new(AtomicU64::new(0));
        let running = Arc::new(AtomicBool::new(true));

        let handles = (0..num_workers.max(1))
            .map(|_| {
                let ring = Arc::clone(&ring);
                let pending_tasks = Arc::clone(&pending_tasks);
                let tasks_processed = Arc::clone(&tasks_processed);
                let tasks_succeeded = Arc::clone(&tasks_succeeded);
                let running = Arc::clone(&running);
                let predicate = Arc::clone(&predicate);
                let result_tx = result_tx.clone();
                thread::spawn(move || {
                    worker_loop(
                        ring,
                        pending_tasks,
                        tasks_processed,
                        tasks_succeeded,
                        running,
                        predicate,
                        result_tx,
                    )
                })
            })
            .collect();

        WorkerPool {
            ring,
            pending_tasks,
            tasks_processed,
            tasks_succeeded,
            running,
            handles,
        }
    }

    /// Enqueues one task, spinning with a yield hint while the ring buffer
    /// is full (section 4.3).
    pub fn push(&self, item: WorkItem) {
        self.pending_tasks.fetch_add(1, Ordering::Release);
        let mut item = item;
        loop {
            match self.ring.push(item) {
                Ok(()) => return,
                Err(rejected) => {
                    item = rejected;
                    thread::yield_now();
                }
            }
        }
    }

    /// Number of tasks enqueued but not yet completed. The node's main loop
    /// must see this reach zero before requesting the next chunk, so the
    /// receive buffer backing in-flight task data is safe to reuse.
    pub fn pending(&self) -> u64 {
        self.pending_tasks.load(Ordering::Acquire)
    }

    pub fn tasks_processed(&self) -> u64 {
        self.tasks_processed.load(Ordering::Relaxed)
    }

    pub fn tasks_succeeded(&self) -> u64 {
        self.tasks_succeeded.load(Ordering::Relaxed)
    }

    /// A clonable handle onto the processed-count atomic, for threads (like
    /// the node's heartbeat emitter) that need to read it without borrowing
    /// the pool itself.
    pub fn tasks_processed_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.tasks_processed)
    }

    /// A clonable handle onto the succeeded-count atomic, same rationale as
    /// [`Self::tasks_processed_handle`].
    pub fn tasks_succeeded_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.tasks_succeeded)
    }

    /// Signals all workers to exit once the ring buffer is drained, and
    /// joins every worker thread.
    pub fn shutdown(mut self) {
        self.running.store(false, Ordering::Release);
        for handle in self.handles.drain(..) {
            let _ = handle.join();
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn worker_loop(
    ring: Arc<RingBuffer<WorkItem>>,
    pending_tasks: Arc<AtomicU64>,
    tasks_processed: Arc<AtomicU64>,
    tasks_succeeded: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
    predicate: Arc<PredicateLibrary>,
    result_tx: Sender<TaskResult>,
) {
    let mut scratch = vec![0u8; RESULT_BUF_CAP.max(RESULT_BUF_MIN_CAP)];
    loop {
        match ring.pop() {
            Some(item) => {
                run_one(
                    &item,
                    &predicate,
                    &mut scratch,
                    &tasks_processed,
                    &tasks_succeeded,
                    &result_tx,
                );
                pending_tasks.fetch_sub(1, Ordering::Release);
            }
            None => {
                if !running.load(Ordering::Acquire) {
                    return;
                }
                thread::yield_now();
            }
        }
    }
}

fn run_one(
    item: &WorkItem,
    predicate: &PredicateLibrary,
    scratch: &mut [u8],
    tasks_processed: &AtomicU64,
    tasks_succeeded: &AtomicU64,
    result_tx: &Sender<TaskResult>,
) {
    tasks_processed.fetch_add(1, Ordering::Relaxed);
    let outcome = match predicate.execute(&item.data, scratch) {
        Ok(outcome) => outcome,
        Err(_) => ExecuteOutcome::Error(-1),
    };
    if let ExecuteOutcome::Success { bytes_written } = outcome {
        tasks_succeeded.fetch_add(1, Ordering::Relaxed);
        let score = parse_score_prefix(&scratch[..bytes_written]);
        let _ = result_tx.send(TaskResult {
            task_id: item.task_id,
            success: true,
            score,
            data: scratch[..bytes_written].to_vec(),
        });
    }
}

/// Result buffers begin with `{success: u8, pad[7], score: f64, ...}`
/// (section 4.2); extracts just the score for the common case of forwarding
/// it onto the wire without needing the predicate-specific tail.
fn parse_score_prefix(buf: &[u8]) -> f64 {
    if buf.len() < 16 {
        return 0.0;
    }
    f64::from_le_bytes(buf[8..16].try_into().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_score_prefix_reads_second_field() {
        let mut buf = vec![0u8; 16];
        buf[0] = 1;
        buf[8..16].copy_from_slice(&42.5f64.to_le_bytes());
        assert_eq!(parse_score_prefix(&buf), 42.5);
    }

    #[test]
    fn parse_score_prefix_handles_short_buffer() {
        assert_eq!(parse_score_prefix(&[1, 2, 3]), 0.0);
    }
}
