//! A dedicated heartbeat thread sharing atomics with the worker pool,
//! grounded in the background-thread-plus-atomics pattern used for
//! heartbeats in `examples/other_examples/79918b58_oddurs-prime-hunter`'s
//! `WorkerClient` (a separate thread posting status on a fixed interval
//! while the CPU-bound work happens elsewhere).

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use swarm_core::Heartbeat;

use crate::connection::Connection;

pub fn spawn(
    connection: Arc<Connection>,
    assigned_id: u64,
    interval: Duration,
    tasks_processed: Arc<AtomicU64>,
    tasks_succeeded: Arc<AtomicU64>,
    running: Arc<AtomicBool>,
) -> JoinHandle<()> {
    let started = Instant::now();
    thread::spawn(move || {
        while running.load(Ordering::Acquire) {
            thread::sleep(interval);
            if !running.load(Ordering::Acquire) {
                break;
            }
            let hb = Heartbeat {
                assigned_id,
                tasks_processed: tasks_processed.load(Ordering::Relaxed),
                tasks_succeeded: tasks_succeeded.load(Ordering::Relaxed),
                uptime_secs: started.elapsed().as_secs() as u32,
            };
            if let Err(err) = connection.send_heartbeat(hb) {
                swarm_core::log_warn!("failed to send heartbeat: {err:#}");
            }
        }
    })
}
