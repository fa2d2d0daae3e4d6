//! The coordinator's map of connected (and formerly connected) nodes,
//! guarded by a single mutex with short critical sections (section 5:
//! "coordinator's workers map is guarded by a single mutex").

use std::collections::HashMap;
use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use swarm_core::{wire, MessageType, WorkerRecord};

struct WorkerEntry {
    record: Arc<WorkerRecord>,
    writer: Arc<Mutex<TcpStream>>,
}

pub struct WorkerRegistry {
    next_id: AtomicU64,
    entries: Mutex<HashMap<u64, WorkerEntry>>,
}

impl WorkerRegistry {
    pub fn new() -> Self {
        WorkerRegistry {
            next_id: AtomicU64::new(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Registers a freshly handshaken node, returning its assigned-id and
    /// its [`WorkerRecord`].
    pub fn register(
        &self,
        cpu_cores: u16,
        chunk_size: u32,
        writer: Arc<Mutex<TcpStream>>,
    ) -> (u64, Arc<WorkerRecord>) {
        let assigned_id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let record = Arc::new(WorkerRecord::new(assigned_id, cpu_cores, chunk_size));
        self.entries.lock().unwrap().insert(
            assigned_id,
            WorkerEntry {
                record: Arc::clone(&record),
                writer,
            },
        );
        (assigned_id, record)
    }

    /// Marks a node disconnected. The record is retained for final stats
    /// (section 3: WorkerRecord lifecycle).
    pub fn mark_disconnected(&self, assigned_id: u64) {
        if let Some(entry) = self.entries.lock().unwrap().get(&assigned_id) {
            entry.record.connected.store(false, Ordering::SeqCst);
        }
    }

    /// A point-in-time copy of every known worker record, for the stats
    /// thread and the final statistics block.
    pub fn snapshot(&self) -> Vec<Arc<WorkerRecord>> {
        self.entries
            .lock()
            .unwrap()
            .values()
            .map(|entry| Arc::clone(&entry.record))
            .collect()
    }

    /// Best-effort `SHUTDOWN` broadcast to every still-connected node
    /// (section 4.5: coordinator may emit SHUTDOWN on completion).
    pub fn broadcast_shutdown(&self) {
        for entry in self.entries.lock().unwrap().values() {
            if !entry.record.connected.load(Ordering::SeqCst) {
                continue;
            }
            let mut guard = entry.writer.lock().unwrap();
            let _ = wire::write_frame(&mut *guard, MessageType::Shutdown, &[]);
        }
    }
}

impl Default for WorkerRegistry {
    fn default() -> Self {
        Self::new()
    }
}
