//! The node's single coordinator connection.
//!
//! A single mutex guards every request/response round trip on this socket,
//! covering both the main loop's `REQUEST_WORK`/response exchange and a
//! worker result's `SUBMIT_RESULT`/`ACK_RESULT` exchange. This resolves the
//! apparent tension in section 4.4 between "reads are single-threaded"
//! (true of the DISPATCH_WORK/NO_WORK/SHUTDOWN replies, which only the main
//! loop ever triggers by sending REQUEST_WORK) and "workers wait for
//! ACK_RESULT" (true because a worker's own write-then-read happens inside
//! the same critical section, so no other thread can be mid-read at the
//! same time). See DESIGN.md for this decision.

use std::net::TcpStream;
use std::sync::Mutex;

use anyhow::{bail, Context, Result};
use swarm_core::{
    wire, Heartbeat, MessageType, QueenWelcome, RequestWork, SubmitResult, TaskResult, WorkDispatch,
    WorkerHello,
};

pub enum ServerReply {
    Dispatch(WorkDispatch),
    NoWork,
    Shutdown,
}

pub struct Connection {
    stream: Mutex<TcpStream>,
}

impl Connection {
    /// Connects to the coordinator and performs the `WORKER_HELLO` /
    /// `QUEEN_WELCOME` handshake. Any other reply is a protocol violation
    /// and the connection is dropped.
    pub fn connect(queen: &str, port: u16, cpu_cores: u16, worker_nonce: u64) -> Result<(Self, u64, u32)> {
        let mut stream = TcpStream::connect((queen, port))
            .with_context(|| format!("failed to connect to coordinator at {queen}:{port}"))?;
        stream.set_nodelay(true).ok();

        let hello = WorkerHello {
            cpu_cores,
            worker_nonce,
        };
        wire::write_frame(&mut stream, MessageType::WorkerHello, &hello.encode())
            .context("failed to send WORKER_HELLO")?;

        let (msg_type, payload) = wire::read_frame(&mut stream).context("failed to read handshake reply")?;
        if msg_type != MessageType::QueenWelcome {
            bail!(
                "handshake failed: expected QUEEN_WELCOME, got {}",
                msg_type.name()
            );
        }
        let welcome = QueenWelcome::decode(&payload).context("malformed QUEEN_WELCOME payload")?;

        Ok((
            Connection {
                stream: Mutex::new(stream),
            },
            welcome.assigned_id,
            welcome.chunk_size,
        ))
    }

    pub fn request_work(&self, req: RequestWork) -> Result<ServerReply> {
        let mut guard = self.stream.lock().unwrap();
        wire::write_frame(&mut *guard, MessageType::RequestWork, &req.encode())
            .context("failed to send REQUEST_WORK")?;
        let (msg_type, payload) = wire::read_frame(&mut *guard).context("failed to read work reply")?;
        match msg_type {
            MessageType::DispatchWork => {
                Ok(ServerReply::Dispatch(WorkDispatch::decode(&payload)?))
            }
            MessageType::NoWork => Ok(ServerReply::NoWork),
            MessageType::Shutdown => Ok(ServerReply::Shutdown),
            other => bail!("unexpected reply to REQUEST_WORK: {}", other.name()),
        }
    }

    pub fn submit_result(&self, assigned_id: u64, result: &TaskResult) -> Result<()> {
        let msg = SubmitResult {
            assigned_id,
            task_id: result.task_id,
            success: result.success,
            score: result.score,
            data: result.data.clone(),
        };
        let mut guard = self.stream.lock().unwrap();
        wire::write_frame(&mut *guard, MessageType::SubmitResult, &msg.encode())
            .context("failed to send SUBMIT_RESULT")?;
        let (msg_type, _payload) = wire::read_frame(&mut *guard).context("failed to read ACK_RESULT")?;
        if msg_type != MessageType::AckResult {
            bail!("expected ACK_RESULT, got {}", msg_type.name());
        }
        Ok(())
    }

    pub fn send_heartbeat(&self, hb: Heartbeat) -> Result<()> {
        let mut guard = self.stream.lock().unwrap();
        wire::write_frame(&mut *guard, MessageType::Heartbeat, &hb.encode())
            .context("failed to send HEARTBEAT")?;
        Ok(())
    }
}
