mod cli;
mod connection;
mod heartbeat;
mod shutdown;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use connection::{Connection, ServerReply};
use swarm_core::{LogLevel, RequestWork};
use swarm_engine::{WorkItem, WorkerPool, DEFAULT_RING_CAPACITY};
use swarm_predicate::PredicateLibrary;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let log_level = LogLevel::from_env_or(cli.log_level);
    swarm_core::log::set_level(log_level);

    let predicate = Arc::new(
        PredicateLibrary::load(&cli.lib)
            .with_context(|| format!("failed to load predicate library at {}", cli.lib))?,
    );
    predicate
        .init(&cli.config)
        .context("predicate initialization failed")?;
    swarm_core::log_info!("loaded predicate library: {}", cli.lib);

    let cpu_cores = cli.threads.min(u16::MAX as usize) as u16;
    let worker_nonce = std::process::id() as u64 ^ 0x5357_4152_0000_0000u64;
    let (connection, assigned_id, chunk_size) =
        Connection::connect(&cli.queen, cli.port, cpu_cores, worker_nonce)
            .context("handshake with coordinator failed")?;
    let connection = Arc::new(connection);
    swarm_core::log_info!(
        "connected to {}:{} as worker {assigned_id} (chunk_size={chunk_size})",
        cli.queen,
        cli.port
    );

    let shutdown = shutdown::ShutdownController::new();
    shutdown::install(Arc::clone(&shutdown)).context("failed to install Ctrl+C handler")?;

    let (result_tx, result_rx) = mpsc::channel();
    let pool = WorkerPool::spawn(cli.threads, DEFAULT_RING_CAPACITY, Arc::clone(&predicate), result_tx);

    // Forward predicate successes to the coordinator one at a time, each
    // under the connection's socket mutex, waiting for the matching
    // ACK_RESULT before the next send (section 4.4/4.5 and the testable
    // property in section 8). Implemented as a dedicated forwarder thread
    // rather than inline in each worker thread, keeping `swarm-engine`
    // transport-agnostic; the socket-mutex serialization invariant holds
    // either way.
    let forwarder_connection = Arc::clone(&connection);
    let forwarder = thread::spawn(move || {
        for result in result_rx {
            if let Err(err) = forwarder_connection.submit_result(assigned_id, &result) {
                swarm_core::log_warn!("failed to submit result for task {}: {err:#}", result.task_id);
            }
        }
    });

    let heartbeat_running = Arc::new(AtomicBool::new(true));
    let heartbeat_handle = heartbeat::spawn(
        Arc::clone(&connection),
        assigned_id,
        Duration::from_secs(cli.heartbeat_interval_secs),
        pool.tasks_processed_handle(),
        pool.tasks_succeeded_handle(),
        Arc::clone(&heartbeat_running),
    );

    let work_loop_result = run_work_loop(&connection, &pool, assigned_id, chunk_size, &shutdown);

    heartbeat_running.store(false, Ordering::Release);
    let _ = heartbeat_handle.join();
    // Draining the pool drops its internal result-sender clones, which
    // closes `result_rx` and lets the forwarder thread exit its `for` loop.
    pool.shutdown();
    let _ = forwarder.join();

    match work_loop_result {
        Ok(()) => {
            swarm_core::log_info!("shut down cleanly");
            Ok(())
        }
        Err(err) => {
            swarm_core::log_error!("work loop exited: {err:#}");
            Err(err)
        }
    }
}

fn run_work_loop(
    connection: &Connection,
    pool: &WorkerPool,
    assigned_id: u64,
    chunk_size: u32,
    shutdown: &shutdown::ShutdownController,
) -> Result<()> {
    loop {
        if shutdown.is_requested() {
            swarm_core::log_info!("shutdown requested, stopping work requests and draining in-flight tasks");
            return Ok(());
        }

        let req = RequestWork {
            assigned_id,
            last_completed: pool.tasks_processed(),
            requested_count: chunk_size,
        };
        match connection.request_work(req)? {
            ServerReply::Dispatch(dispatch) => {
                for entry in dispatch.entries {
                    pool.push(WorkItem {
                        task_id: entry.task_id,
                        data: entry.data,
                    });
                }
                // Drain to zero before requesting the next chunk: this is
                // the node's back-pressure invariant (section 4.3/9) and
                // also what makes it safe to let `entry.data` above be
                // dropped/reused by a future dispatch's receive buffer.
                while pool.pending() > 0 {
                    if shutdown.is_requested() {
                        break;
                    }
                    thread::yield_now();
                }
            }
            ServerReply::NoWork => {
                thread::sleep(Duration::from_secs(1));
            }
            ServerReply::Shutdown => {
                swarm_core::log_info!("received SHUTDOWN from coordinator");
                return Ok(());
            }
        }
    }
}
