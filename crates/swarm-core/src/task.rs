//! Shared data model: the task space, chunks, results, and the coordinator's
//! view of a connected node.

use std::sync::atomic::{AtomicBool, AtomicU64};
use std::sync::Mutex;
use std::time::Instant;

/// Where task bytes come from. A coordinator owns exactly one of these for
/// its lifetime (section 3 of `SPEC_FULL.md`).
pub enum TaskSource {
    /// Task `i` is the decimal ASCII encoding of `start + i`.
    NumericRange { start: u64, end: u64 },
    /// Task `i` is the `i`-th entry of a literal, pre-loaded list.
    Literal(Vec<Vec<u8>>),
}

impl TaskSource {
    pub fn total_tasks(&self) -> u64 {
        match self {
            TaskSource::NumericRange { start, end } => end.saturating_sub(*start),
            TaskSource::Literal(items) => items.len() as u64,
        }
    }

    /// Renders task `global_id` (0-based, not offset by `start`) to bytes.
    pub fn task_bytes(&self, global_id: u64) -> Vec<u8> {
        match self {
            TaskSource::NumericRange { start, .. } => (start + global_id).to_string().into_bytes(),
            TaskSource::Literal(items) => items[global_id as usize].clone(),
        }
    }
}

/// A contiguous half-open range of task-ids allocated to one dispatch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskChunk {
    pub start_id: u64,
    pub count: u32,
}

impl TaskChunk {
    pub fn end_id(&self) -> u64 {
        self.start_id + self.count as u64
    }
}

/// A successful predicate evaluation, ready to be transmitted or logged.
#[derive(Debug, Clone)]
pub struct TaskResult {
    pub task_id: u64,
    pub success: bool,
    pub score: f64,
    pub data: Vec<u8>,
}

/// The coordinator's bookkeeping for one connected (or formerly connected)
/// node. Created on handshake, retained after disconnect for final stats.
#[derive(Debug)]
pub struct WorkerRecord {
    pub assigned_id: u64,
    pub cpu_cores: u16,
    pub chunk_size: u32,
    pub tasks_assigned: AtomicU64,
    pub tasks_completed: AtomicU64,
    pub tasks_succeeded: AtomicU64,
    pub connected: AtomicBool,
    pub connected_since: Instant,
    pub last_heartbeat: Mutex<Instant>,
}

impl WorkerRecord {
    pub fn new(assigned_id: u64, cpu_cores: u16, chunk_size: u32) -> Self {
        let now = Instant::now();
        WorkerRecord {
            assigned_id,
            cpu_cores,
            chunk_size,
            tasks_assigned: AtomicU64::new(0),
            tasks_completed: AtomicU64::new(0),
            tasks_succeeded: AtomicU64::new(0),
            connected: AtomicBool::new(true),
            connected_since: now,
            last_heartbeat: Mutex::new(now),
        }
    }

    /// Seconds since this worker's last heartbeat (or since registration, if
    /// none has arrived yet). Used for the advisory disconnect timeout
    /// (section 5, section 6 `--heartbeat-timeout-secs`).
    pub fn seconds_since_heartbeat(&self) -> f64 {
        self.last_heartbeat.lock().unwrap().elapsed().as_secs_f64()
    }

    pub fn touch_heartbeat(&self) {
        *self.last_heartbeat.lock().unwrap() = Instant::now();
    }
}

/// A loaded predicate test library's identity as transmitted on the wire.
/// The body of the handle itself (the dlopen'd library and resolved symbols)
/// lives in `swarm-predicate`; this is just the id/name pairing used by the
/// dispatch protocol and the coordinator's `--test` CLI flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredicateKind {
    Compression = 0,
    Prime = 1,
    Hash = 2,
    NumericMatch = 3,
    Math = 4,
}

impl PredicateKind {
    pub fn as_u32(self) -> u32 {
        self as u32
    }

    pub fn from_u32(v: u32) -> Option<Self> {
        Some(match v {
            0 => PredicateKind::Compression,
            1 => PredicateKind::Prime,
            2 => PredicateKind::Hash,
            3 => PredicateKind::NumericMatch,
            4 => PredicateKind::Math,
            _ => return None,
        })
    }

    pub fn parse_name(name: &str) -> Option<Self> {
        Some(match name {
            "compression" => PredicateKind::Compression,
            "prime" => PredicateKind::Prime,
            "hash" => PredicateKind::Hash,
            "numeric_match" => PredicateKind::NumericMatch,
            "math" => PredicateKind::Math,
            _ => return None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_range_total_and_bytes() {
        let src = TaskSource::NumericRange {
            start: 5,
            end: 10,
        };
        assert_eq!(src.total_tasks(), 5);
        assert_eq!(src.task_bytes(0), b"5".to_vec());
        assert_eq!(src.task_bytes(4), b"9".to_vec());
    }

    #[test]
    fn empty_range_has_zero_tasks() {
        let src = TaskSource::NumericRange { start: 5, end: 5 };
        assert_eq!(src.total_tasks(), 0);
    }

    #[test]
    fn literal_source_total_and_bytes() {
        let src = TaskSource::Literal(vec![b"a".to_vec(), b"bb".to_vec()]);
        assert_eq!(src.total_tasks(), 2);
        assert_eq!(src.task_bytes(1), b"bb".to_vec());
    }

    #[test]
    fn predicate_kind_name_roundtrip() {
        for name in ["compression", "prime", "hash", "numeric_match", "math"] {
            let kind = PredicateKind::parse_name(name).unwrap();
            assert_eq!(PredicateKind::from_u32(kind.as_u32()), Some(kind));
        }
        assert!(PredicateKind::parse_name("bogus").is_none());
    }
}
