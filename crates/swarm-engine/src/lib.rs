//! Node-local concurrency primitives: the wait-free ring buffer decoupling
//! network I/O from predicate execution, and the worker pool built on top
//! of it (section 4.3–4.4 of `SPEC_FULL.md`).

pub mod pool;
pub mod ring;

pub use pool::{WorkItem, WorkerPool, DEFAULT_RING_CAPACITY};
pub use ring::RingBuffer;
