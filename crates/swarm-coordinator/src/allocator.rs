//! The task-index allocator (section 4.5): a single atomic counter, never
//! rewound, handed out via `fetch_add`.

use std::sync::atomic::{AtomicU64, Ordering};

pub struct TaskAllocator {
    next_task_idx: AtomicU64,
    total_tasks: u64,
}

/// One allocation's outcome: either a chunk to dispatch, or the signal that
/// the task space is exhausted (the caller sends `NO_WORK`).
pub enum Allocation {
    Chunk { start_id: u64, count: u32 },
    Exhausted,
}

impl TaskAllocator {
    pub fn new(total_tasks: u64) -> Self {
        TaskAllocator {
            next_task_idx: AtomicU64::new(0),
            total_tasks,
        }
    }

    pub fn total_tasks(&self) -> u64 {
        self.total_tasks
    }

    /// Allocates up to `requested_count` tasks, lock-free. Never returns a
    /// chunk that extends past `total_tasks`, and never returns a
    /// zero-length chunk (section 8: "a chunk of size zero is never
    /// dispatched").
    pub fn allocate(&self, requested_count: u32) -> Allocation {
        if requested_count == 0 {
            return Allocation::Exhausted;
        }
        let start = self
            .next_task_idx
            .fetch_add(requested_count as u64, Ordering::SeqCst);
        if start >= self.total_tasks {
            return Allocation::Chunk {
                start_id: start,
                count: 0,
            }
            .normalize();
        }
        let end = (start + requested_count as u64).min(self.total_tasks);
        Allocation::Chunk {
            start_id: start,
            count: (end - start) as u32,
        }
    }

    pub fn distributed(&self) -> u64 {
        self.next_task_idx.load(Ordering::SeqCst).min(self.total_tasks)
    }

    pub fn is_exhausted(&self) -> bool {
        self.next_task_idx.load(Ordering::SeqCst) >= self.total_tasks
    }
}

impl Allocation {
    fn normalize(self) -> Self {
        match self {
            Allocation::Chunk { count: 0, .. } => Allocation::Exhausted,
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn empty_range_is_immediately_exhausted() {
        let alloc = TaskAllocator::new(0);
        assert!(matches!(alloc.allocate(100), Allocation::Exhausted));
    }

    #[test]
    fn final_chunk_is_clamped_to_total() {
        let alloc = TaskAllocator::new(10);
        match alloc.allocate(8) {
            Allocation::Chunk { start_id, count } => {
                assert_eq!(start_id, 0);
                assert_eq!(count, 8);
            }
            Allocation::Exhausted => panic!("expected a chunk"),
        }
        match alloc.allocate(8) {
            Allocation::Chunk { start_id, count } => {
                assert_eq!(start_id, 8);
                assert_eq!(count, 2);
            }
            Allocation::Exhausted => panic!("expected a clamped chunk"),
        }
        assert!(matches!(alloc.allocate(8), Allocation::Exhausted));
    }

    #[test]
    fn concurrent_allocations_never_overlap() {
        let alloc = Arc::new(TaskAllocator::new(1_000_000));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let alloc = Arc::clone(&alloc);
                thread::spawn(move || {
                    let mut ranges = Vec::new();
                    loop {
                        match alloc.allocate(997) {
                            Allocation::Chunk { start_id, count } => {
                                ranges.push((start_id, start_id + count as u64))
                            }
                            Allocation::Exhausted => break,
                        }
                    }
                    ranges
                })
            })
            .collect();

        let mut all_ranges: Vec<(u64, u64)> =
            handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all_ranges.sort_unstable();

        let mut covered = 0u64;
        for (start, end) in &all_ranges {
            assert_eq!(*start, covered, "chunks must tile without gaps or overlap");
            covered = *end;
        }
        assert_eq!(covered, 1_000_000);
    }
}
