//! Per-connection handler thread: handshake, then a message loop dispatching
//! on message type (section 4.5).

use std::net::TcpStream;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

use anyhow::{bail, Context, Result};
use swarm_core::{
    wire, Heartbeat, MessageType, QueenWelcome, RequestWork, SubmitResult, TaskEntry, TaskSource,
    WorkDispatch, WorkDispatchHeader, WorkerHello, WorkerRecord,
};

use crate::allocator::{Allocation, TaskAllocator};
use crate::registry::WorkerRegistry;
use crate::stats::Stats;

pub struct HandlerContext {
    pub allocator: Arc<TaskAllocator>,
    pub registry: Arc<WorkerRegistry>,
    pub stats: Arc<Stats>,
    pub task_source: Arc<TaskSource>,
    pub base_chunk_size: u32,
    pub test_fn_id: u32,
}

pub fn handle_connection(stream: TcpStream, ctx: Arc<HandlerContext>) {
    if let Err(err) = run(stream, &ctx) {
        swarm_core::log_warn!("connection handler exited: {err:#}");
    }
}

fn run(mut stream: TcpStream, ctx: &HandlerContext) -> Result<()> {
    stream.set_nodelay(true).ok();

    let (msg_type, payload) = wire::read_frame(&mut stream).context("failed to read handshake")?;
    if msg_type != MessageType::WorkerHello {
        bail!("malformed hello: expected WORKER_HELLO, got {}", msg_type.name());
    }
    let hello = WorkerHello::decode(&payload).context("malformed WORKER_HELLO payload")?;
    let chunk_size = ctx.base_chunk_size * (hello.cpu_cores.max(1) as u32);

    let writer = Arc::new(Mutex::new(
        stream.try_clone().context("failed to clone socket for writer")?,
    ));
    let (assigned_id, record) = ctx.registry.register(hello.cpu_cores, chunk_size, Arc::clone(&writer));

    {
        let mut guard = writer.lock().unwrap();
        wire::write_frame(
            &mut *guard,
            MessageType::QueenWelcome,
            &QueenWelcome {
                assigned_id,
                chunk_size,
            }
            .encode(),
        )
        .context("failed to send QUEEN_WELCOME")?;
    }
    swarm_core::log_info!(
        "worker {assigned_id} connected ({} cores, chunk_size={chunk_size})",
        hello.cpu_cores
    );

    let result = message_loop(&mut stream, &writer, &record, ctx);
    ctx.registry.mark_disconnected(assigned_id);
    swarm_core::log_info!("worker {assigned_id} disconnected");
    result
}

fn message_loop(
    stream: &mut TcpStream,
    writer: &Arc<Mutex<TcpStream>>,
    record: &WorkerRecord,
    ctx: &HandlerContext,
) -> Result<()> {
    loop {
        let (msg_type, payload) = match wire::read_frame(stream) {
            Ok(v) => v,
            Err(_) => return Ok(()), // clean or unclean disconnect, not a bug to propagate
        };
        match msg_type {
            MessageType::RequestWork => {
                let req = RequestWork::decode(&payload)?;
                handle_request_work(writer, record, ctx, req.requested_count)?;
            }
            MessageType::SubmitResult => {
                let result = SubmitResult::decode(&payload)?;
                handle_submit_result(writer, &result, ctx)?;
            }
            MessageType::Heartbeat => {
                let hb = Heartbeat::decode(&payload)?;
                record.tasks_completed.store(hb.tasks_processed, Ordering::Relaxed);
                record.tasks_succeeded.store(hb.tasks_succeeded, Ordering::Relaxed);
                record.touch_heartbeat();
            }
            other => bail!("unexpected message on established connection: {}", other.name()),
        }
    }
}

fn handle_request_work(
    writer: &Arc<Mutex<TcpStream>>,
    record: &WorkerRecord,
    ctx: &HandlerContext,
    requested_count: u32,
) -> Result<()> {
    match ctx.allocator.allocate(requested_count) {
        Allocation::Chunk { start_id, count } => {
            let entries: Vec<TaskEntry> = (0..count as u64)
                .map(|i| {
                    let task_id = start_id + i;
                    TaskEntry {
                        task_id,
                        data: ctx.task_source.task_bytes(task_id),
                    }
                })
                .collect();
            record.tasks_assigned.fetch_add(count as u64, Ordering::Relaxed);
            let dispatch = WorkDispatch {
                header: WorkDispatchHeader {
                    start_task_id: start_id,
                    task_count: count,
                    test_fn_id: ctx.test_fn_id,
                },
                entries,
            };
            let mut guard = writer.lock().unwrap();
            wire::write_frame(&mut *guard, MessageType::DispatchWork, &dispatch.encode())
                .context("failed to send DISPATCH_WORK")?;
        }
        Allocation::Exhausted => {
            let mut guard = writer.lock().unwrap();
            wire::write_frame(&mut *guard, MessageType::NoWork, &[]).context("failed to send NO_WORK")?;
        }
    }
    Ok(())
}

fn handle_submit_result(
    writer: &Arc<Mutex<TcpStream>>,
    result: &SubmitResult,
    ctx: &HandlerContext,
) -> Result<()> {
    if result.success {
        ctx.stats.record_result(result.score);
        let preview_len = result.data.len().min(64);
        let preview = String::from_utf8_lossy(&result.data[..preview_len]);
        swarm_core::log_info!(
            "solution: task_id={} worker={} score={:.6} data={preview:?}",
            result.task_id,
            result.assigned_id,
            result.score
        );
    }
    let mut guard = writer.lock().unwrap();
    wire::write_frame(&mut *guard, MessageType::AckResult, &[]).context("failed to send ACK_RESULT")?;
    Ok(())
}
