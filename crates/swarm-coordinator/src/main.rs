mod allocator;
mod cli;
mod handler;
mod registry;
mod shutdown;
mod stats;

use std::fs;
use std::io::ErrorKind;
use std::net::TcpListener;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;

use allocator::TaskAllocator;
use handler::HandlerContext;
use registry::WorkerRegistry;
use stats::Stats;
use swarm_core::{LogLevel, TaskSource};

const PROGRESS_INTERVAL: Duration = Duration::from_secs(10);

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    let log_level = LogLevel::from_env_or(cli.log_level);
    swarm_core::log::set_level(log_level);

    let task_source = Arc::new(build_task_source(&cli)?);
    let total_tasks = task_source.total_tasks();
    let allocator = Arc::new(TaskAllocator::new(total_tasks));
    let registry = Arc::new(WorkerRegistry::new());
    let stats = Arc::new(Stats::new());

    let ctx = Arc::new(HandlerContext {
        allocator: Arc::clone(&allocator),
        registry: Arc::clone(&registry),
        stats: Arc::clone(&stats),
        task_source: Arc::clone(&task_source),
        base_chunk_size: cli.chunk,
        test_fn_id: cli.test.as_kind().as_u32(),
    });

    let shutdown_controller = shutdown::ShutdownController::new();
    shutdown::install(Arc::clone(&shutdown_controller)).context("failed to install Ctrl+C handler")?;

    let listener = TcpListener::bind(("0.0.0.0", cli.port))
        .with_context(|| format!("failed to bind port {}", cli.port))?;
    listener
        .set_nonblocking(true)
        .context("failed to set listener non-blocking")?;
    swarm_core::log_info!("listening on 0.0.0.0:{} ({total_tasks} total tasks)", cli.port);

    let progress_handle = spawn_progress_thread(
        Arc::clone(&allocator),
        Arc::clone(&registry),
        Arc::clone(&stats),
        Arc::clone(&shutdown_controller),
    );

    let mut handler_handles = Vec::new();
    loop {
        if shutdown_controller.is_requested() {
            swarm_core::log_info!("shutdown requested, no longer accepting new connections");
            break;
        }
        match listener.accept() {
            Ok((stream, addr)) => {
                swarm_core::log_debug!("accepted connection from {addr}");
                let ctx = Arc::clone(&ctx);
                handler_handles.push(thread::spawn(move || handler::handle_connection(stream, ctx)));
            }
            Err(err) if err.kind() == ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(err) => {
                swarm_core::log_warn!("accept error: {err}");
            }
        }

        expire_stale_workers(&registry, cli.heartbeat_timeout_secs as f64);

        if run_is_complete(&allocator, &registry) {
            swarm_core::log_info!("all tasks completed");
            break;
        }
    }

    registry.broadcast_shutdown();
    for handle in handler_handles {
        let _ = handle.join();
    }
    let _ = progress_handle.join();

    let expected_solutions = expected_solution_count(&cli);
    stats::print_final_report(&allocator, &registry, &stats, expected_solutions);
    Ok(())
}

fn build_task_source(cli: &cli::Cli) -> Result<TaskSource> {
    if let Some(path) = &cli.tasks_file {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read tasks file {path}"))?;
        let items: Vec<Vec<u8>> = contents.lines().map(|line| line.as_bytes().to_vec()).collect();
        return Ok(TaskSource::Literal(items));
    }
    Ok(TaskSource::NumericRange {
        start: cli.start,
        end: cli.end,
    })
}

fn expected_solution_count(cli: &cli::Cli) -> Option<u64> {
    let secret = cli.secret?;
    if cli.tasks_file.is_some() {
        return None;
    }
    Some(if secret >= cli.start && secret < cli.end { 1 } else { 0 })
}

fn expire_stale_workers(registry: &WorkerRegistry, timeout_secs: f64) {
    for worker in registry.snapshot() {
        if worker.connected.load(Ordering::SeqCst) && worker.seconds_since_heartbeat() > timeout_secs {
            swarm_core::log_warn!(
                "worker {} missed its heartbeat deadline, marking disconnected",
                worker.assigned_id
            );
            registry.mark_disconnected(worker.assigned_id);
        }
    }
}

fn run_is_complete(allocator: &TaskAllocator, registry: &WorkerRegistry) -> bool {
    if !allocator.is_exhausted() {
        return false;
    }
    let completed: u64 = registry
        .snapshot()
        .iter()
        .map(|w| w.tasks_completed.load(Ordering::Relaxed))
        .sum();
    completed >= allocator.total_tasks()
}

fn spawn_progress_thread(
    allocator: Arc<TaskAllocator>,
    registry: Arc<WorkerRegistry>,
    stats: Arc<Stats>,
    shutdown: Arc<shutdown::ShutdownController>,
) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !shutdown.is_requested() {
            thread::sleep(PROGRESS_INTERVAL);
            if shutdown.is_requested() {
                break;
            }
            if run_is_complete(&allocator, &registry) {
                break;
            }
            let distributed = allocator.distributed();
            let total = allocator.total_tasks();
            let found = stats.results_found.load(Ordering::Relaxed);
            let connected = registry
                .snapshot()
                .iter()
                .filter(|w| w.connected.load(Ordering::SeqCst))
                .count();
            swarm_core::log_info!(
                "progress: {distributed}/{total} tasks distributed, {found} solutions, {connected} workers connected"
            );
        }
    })
}
