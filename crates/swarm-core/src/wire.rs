//! Wire protocol: message framing and typed payload codecs.
//!
//! Every message on the wire is `MessageHeader || Payload`. The header is a
//! fixed 12-byte little-endian prefix; the payload's shape depends on the
//! message type (section 4.1 of `SPEC_FULL.md`). This module only concerns
//! itself with encoding/decoding bytes — it knows nothing about sockets,
//! threads, or the sequencing rules a connection must follow.

use std::io::{Read, Write};

use crate::error::WireError;

/// Magic value every frame must begin with.
pub const MAGIC: u32 = 0x5357_4152; // "SWAR"

/// Size in bytes of a [`MessageHeader`] on the wire.
pub const HEADER_LEN: usize = 12;

/// Maximum payload size accepted from a peer. Larger frames are a framing
/// violation and the connection is dropped (section 4.1).
pub const MAX_PAYLOAD_LEN: u32 = 16 * 1024 * 1024;

/// Minimum capacity the host guarantees a predicate's result buffer has.
pub const RESULT_BUF_MIN_CAP: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u16)]
pub enum MessageType {
    WorkerHello = 1,
    QueenWelcome = 2,
    RequestWork = 3,
    DispatchWork = 4,
    NoWork = 5,
    SubmitResult = 6,
    AckResult = 7,
    Heartbeat = 8,
    Shutdown = 9,
}

impl MessageType {
    pub fn name(self) -> &'static str {
        match self {
            MessageType::WorkerHello => "WORKER_HELLO",
            MessageType::QueenWelcome => "QUEEN_WELCOME",
            MessageType::RequestWork => "REQUEST_WORK",
            MessageType::DispatchWork => "DISPATCH_WORK",
            MessageType::NoWork => "NO_WORK",
            MessageType::SubmitResult => "SUBMIT_RESULT",
            MessageType::AckResult => "ACK_RESULT",
            MessageType::Heartbeat => "HEARTBEAT",
            MessageType::Shutdown => "SHUTDOWN",
        }
    }

    pub fn from_u16(v: u16) -> Result<Self, WireError> {
        Ok(match v {
            1 => MessageType::WorkerHello,
            2 => MessageType::QueenWelcome,
            3 => MessageType::RequestWork,
            4 => MessageType::DispatchWork,
            5 => MessageType::NoWork,
            6 => MessageType::SubmitResult,
            7 => MessageType::AckResult,
            8 => MessageType::Heartbeat,
            9 => MessageType::Shutdown,
            other => return Err(WireError::UnknownMessageType(other)),
        })
    }
}

/// The fixed-size frame prefix: `{magic, msg_type, payload_len, reserved}`.
#[derive(Debug, Clone, Copy)]
pub struct MessageHeader {
    pub msg_type: MessageType,
    pub payload_len: u32,
}

impl MessageHeader {
    pub fn write_to<W: Write>(&self, w: &mut W) -> Result<(), WireError> {
        let mut buf = [0u8; HEADER_LEN];
        buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
        buf[4..6].copy_from_slice(&(self.msg_type as u16).to_le_bytes());
        buf[6..10].copy_from_slice(&self.payload_len.to_le_bytes());
        buf[10..12].copy_from_slice(&0u16.to_le_bytes());
        w.write_all(&buf)?;
        Ok(())
    }

    pub fn read_from<R: Read>(r: &mut R) -> Result<Self, WireError> {
        let mut buf = [0u8; HEADER_LEN];
        r.read_exact(&mut buf)?;
        let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
        if magic != MAGIC {
            return Err(WireError::BadMagic {
                expected: MAGIC,
                got: magic,
            });
        }
        let msg_type = MessageType::from_u16(u16::from_le_bytes(buf[4..6].try_into().unwrap()))?;
        let payload_len = u32::from_le_bytes(buf[6..10].try_into().unwrap());
        if payload_len > MAX_PAYLOAD_LEN {
            return Err(WireError::FrameTooLarge {
                len: payload_len,
                max: MAX_PAYLOAD_LEN,
            });
        }
        Ok(MessageHeader {
            msg_type,
            payload_len,
        })
    }
}

/// Writes a complete frame (header + payload) to `w`.
pub fn write_frame<W: Write>(w: &mut W, msg_type: MessageType, payload: &[u8]) -> Result<(), WireError> {
    MessageHeader {
        msg_type,
        payload_len: payload.len() as u32,
    }
    .write_to(w)?;
    if !payload.is_empty() {
        w.write_all(payload)?;
    }
    Ok(())
}

/// Reads a header and its payload bytes from `r`.
pub fn read_frame<R: Read>(r: &mut R) -> Result<(MessageType, Vec<u8>), WireError> {
    let header = MessageHeader::read_from(r)?;
    let mut payload = vec![0u8; header.payload_len as usize];
    r.read_exact(&mut payload)?;
    Ok((header.msg_type, payload))
}

fn expect_len(buf: &[u8], expected: usize) -> Result<(), WireError> {
    if buf.len() < expected {
        return Err(WireError::TruncatedPayload {
            expected,
            got: buf.len(),
        });
    }
    Ok(())
}

#[derive(Debug, Clone, Copy)]
pub struct WorkerHello {
    pub cpu_cores: u16,
    pub worker_nonce: u64,
}

impl WorkerHello {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(10);
        buf.extend_from_slice(&self.cpu_cores.to_le_bytes());
        buf.extend_from_slice(&self.worker_nonce.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        expect_len(buf, 10)?;
        Ok(WorkerHello {
            cpu_cores: u16::from_le_bytes(buf[0..2].try_into().unwrap()),
            worker_nonce: u64::from_le_bytes(buf[2..10].try_into().unwrap()),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct QueenWelcome {
    pub assigned_id: u64,
    pub chunk_size: u32,
}

impl QueenWelcome {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(12);
        buf.extend_from_slice(&self.assigned_id.to_le_bytes());
        buf.extend_from_slice(&self.chunk_size.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        expect_len(buf, 12)?;
        Ok(QueenWelcome {
            assigned_id: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            chunk_size: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct RequestWork {
    pub assigned_id: u64,
    pub last_completed: u64,
    pub requested_count: u32,
}

impl RequestWork {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(20);
        buf.extend_from_slice(&self.assigned_id.to_le_bytes());
        buf.extend_from_slice(&self.last_completed.to_le_bytes());
        buf.extend_from_slice(&self.requested_count.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        expect_len(buf, 20)?;
        Ok(RequestWork {
            assigned_id: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            last_completed: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            requested_count: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
        })
    }
}

/// One task within a `DISPATCH_WORK` payload: `{task_id, data_len} || data`.
#[derive(Debug, Clone)]
pub struct TaskEntry {
    pub task_id: u64,
    pub data: Vec<u8>,
}

impl TaskEntry {
    fn encode_into(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(&self.task_id.to_le_bytes());
        buf.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.data);
    }

    /// Decodes one entry starting at `buf[offset..]`, returning the entry and
    /// the offset of the byte immediately following it.
    fn decode_at(buf: &[u8], offset: usize) -> Result<(Self, usize), WireError> {
        expect_len(buf, offset + 12)?;
        let task_id = u64::from_le_bytes(buf[offset..offset + 8].try_into().unwrap());
        let data_len = u32::from_le_bytes(buf[offset + 8..offset + 12].try_into().unwrap()) as usize;
        let data_start = offset + 12;
        expect_len(buf, data_start + data_len)?;
        let data = buf[data_start..data_start + data_len].to_vec();
        Ok((TaskEntry { task_id, data }, data_start + data_len))
    }
}

/// The fixed prefix of a `DISPATCH_WORK` payload, before the `TaskEntry` list.
#[derive(Debug, Clone, Copy)]
pub struct WorkDispatchHeader {
    pub start_task_id: u64,
    pub task_count: u32,
    pub test_fn_id: u32,
}

/// A fully decoded `DISPATCH_WORK` payload.
#[derive(Debug, Clone)]
pub struct WorkDispatch {
    pub header: WorkDispatchHeader,
    pub entries: Vec<TaskEntry>,
}

impl WorkDispatch {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(16 + self.entries.len() * 16);
        buf.extend_from_slice(&self.header.start_task_id.to_le_bytes());
        buf.extend_from_slice(&self.header.task_count.to_le_bytes());
        buf.extend_from_slice(&self.header.test_fn_id.to_le_bytes());
        for entry in &self.entries {
            entry.encode_into(&mut buf);
        }
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        expect_len(buf, 16)?;
        let start_task_id = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let task_count = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        let test_fn_id = u32::from_le_bytes(buf[12..16].try_into().unwrap());
        let mut offset = 16;
        let mut entries = Vec::with_capacity(task_count as usize);
        for _ in 0..task_count {
            let (entry, next) = TaskEntry::decode_at(buf, offset)?;
            entries.push(entry);
            offset = next;
        }
        Ok(WorkDispatch {
            header: WorkDispatchHeader {
                start_task_id,
                task_count,
                test_fn_id,
            },
            entries,
        })
    }
}

/// A fully decoded `SUBMIT_RESULT` payload.
#[derive(Debug, Clone)]
pub struct SubmitResult {
    pub assigned_id: u64,
    pub task_id: u64,
    pub success: bool,
    pub score: f64,
    pub data: Vec<u8>,
}

impl SubmitResult {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(29 + self.data.len());
        buf.extend_from_slice(&self.assigned_id.to_le_bytes());
        buf.extend_from_slice(&self.task_id.to_le_bytes());
        buf.push(self.success as u8);
        buf.extend_from_slice(&[0u8; 7]); // pad
        buf.extend_from_slice(&self.score.to_le_bytes());
        buf.extend_from_slice(&(self.data.len() as u32).to_le_bytes());
        buf.extend_from_slice(&self.data);
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        expect_len(buf, 36)?;
        let assigned_id = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let task_id = u64::from_le_bytes(buf[8..16].try_into().unwrap());
        let success = buf[16] != 0;
        // buf[17..24] is padding.
        let score = f64::from_le_bytes(buf[24..32].try_into().unwrap());
        let data_len = u32::from_le_bytes(buf[32..36].try_into().unwrap()) as usize;
        expect_len(buf, 36 + data_len)?;
        let data = buf[36..36 + data_len].to_vec();
        Ok(SubmitResult {
            assigned_id,
            task_id,
            success,
            score,
            data,
        })
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Heartbeat {
    pub assigned_id: u64,
    pub tasks_processed: u64,
    pub tasks_succeeded: u64,
    pub uptime_secs: u32,
}

impl Heartbeat {
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(28);
        buf.extend_from_slice(&self.assigned_id.to_le_bytes());
        buf.extend_from_slice(&self.tasks_processed.to_le_bytes());
        buf.extend_from_slice(&self.tasks_succeeded.to_le_bytes());
        buf.extend_from_slice(&self.uptime_secs.to_le_bytes());
        buf
    }

    pub fn decode(buf: &[u8]) -> Result<Self, WireError> {
        expect_len(buf, 28)?;
        Ok(Heartbeat {
            assigned_id: u64::from_le_bytes(buf[0..8].try_into().unwrap()),
            tasks_processed: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
            tasks_succeeded: u64::from_le_bytes(buf[16..24].try_into().unwrap()),
            uptime_secs: u32::from_le_bytes(buf[24..28].try_into().unwrap()),
        })
    }
}
