//! A bounded, wait-free single-producer/multi-consumer ring buffer
//! decoupling a node's network thread (the producer) from its worker pool
//! (the consumers), per section 4.3.
//!
//! The slot layout and push/pop algorithm follow the classic bounded
//! MPMC queue design (per-slot sequence numbers, CAS on the shared
//! position): it is safe under an arbitrary number of producers, so using
//! it with exactly one producer and many consumers is a strict
//! simplification of its guarantees, not a violation of them.

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

struct Slot<T> {
    sequence: AtomicUsize,
    value: UnsafeCell<MaybeUninit<T>>,
}

/// A fixed-capacity ring buffer. Capacity must be a power of two.
pub struct RingBuffer<T> {
    buffer: Box<[Slot<T>]>,
    mask: usize,
    enqueue_pos: AtomicUsize,
    dequeue_pos: AtomicUsize,
}

// SAFETY: access to each slot's `UnsafeCell` is gated by the sequence-number
// protocol below, which admits exactly one writer and one reader per slot
// between successive wraps; this makes `RingBuffer<T>` safe to share across
// threads whenever `T: Send`.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send> Sync for RingBuffer<T> {}

impl<T> RingBuffer<T> {
    /// Creates a ring buffer of the given capacity, rounded up to the next
    /// power of two if necessary (the spec permits non-power-of-two
    /// capacities but power-of-two lets the mask replace a modulus).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(2).next_power_of_two();
        let buffer = (0..capacity)
            .map(|i| Slot {
                sequence: AtomicUsize::new(i),
                value: UnsafeCell::new(MaybeUninit::uninit()),
            })
            .collect::<Vec<_>>()
            .into_boxed_slice();
        RingBuffer {
            buffer,
            mask: capacity - 1,
            enqueue_pos: AtomicUsize::new(0),
            dequeue_pos: AtomicUsize::new(0),
        }
    }

    pub fn capacity(&self) -> usize {
        self.mask + 1
    }

    /// Attempts to push `value`. Returns `Err(value)` if the buffer is
    /// currently full; the caller (the node's single producer thread)
    /// spins with a yield hint on that case (section 4.3).
    pub fn push(&self, value: T) -> Result<(), T> {
        let mut pos = self.enqueue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - pos as isize;
            if diff == 0 {
                if self
                    .enqueue_pos
                    .compare_exchange_weak(pos, pos + 1, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    // SAFETY: this producer just won the claim on `pos`; no
                    // other thread writes this slot until its sequence is
                    // published below, and no consumer reads it until then
                    // either.
                    unsafe { (*slot.value.get()).write(value) };
                    slot.sequence.store(pos + 1, Ordering::Release);
                    return Ok(());
                }
            } else if diff < 0 {
                return Err(value);
            } else {
                pos = self.enqueue_pos.load(Ordering::Relaxed);
            }
        }
    }

    /// Attempts to pop a value. Returns `None` if the buffer is currently
    /// empty; the caller (a worker thread) spins with a yield hint on that
    /// case.
    pub fn pop(&self) -> Option<T> {
        let mut pos = self.dequeue_pos.load(Ordering::Relaxed);
        loop {
            let slot = &self.buffer[pos & self.mask];
            let seq = slot.sequence.load(Ordering::Acquire);
            let diff = seq as isize - (pos + 1) as isize;
            if diff == 0 {
                if self
                    .dequeue_pos
                    .compare_exchange_weak(pos, pos + 1, Ordering::Relaxed, Ordering::Relaxed)
                    .is_ok()
                {
                    // SAFETY: this consumer just won the claim on `pos`; the
                    // producer published this slot's value before setting
                    // its sequence to `pos + 1`, which is what got us here.
                    let value = unsafe { (*slot.value.get()).assume_init_read() };
                    slot.sequence.store(pos + self.mask + 1, Ordering::Release);
                    return Some(value);
                }
            } else if diff < 0 {
                return None;
            } else {
                pos = self.dequeue_pos.load(Ordering::Relaxed);
            }
        }
    }
}

impl<T> Drop for RingBuffer<T> {
    fn drop(&mut self) {
        // Drain any values still queued so their destructors run; slots past
        // the current dequeue position but before the enqueue position hold
        // live data.
        while self.pop().is_some() {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn push_then_pop_returns_value_in_order() {
        let ring = RingBuffer::with_capacity(4);
        ring.push(1).unwrap();
        ring.push(2).unwrap();
        assert_eq!(ring.pop(), Some(1));
        assert_eq!(ring.pop(), Some(2));
        assert_eq!(ring.pop(), None);
    }

    #[test]
    fn push_fails_when_full() {
        let ring = RingBuffer::with_capacity(2);
        ring.push(1).unwrap();
        ring.push(2).unwrap();
        assert_eq!(ring.push(3), Err(3));
    }

    #[test]
    fn non_power_of_two_capacity_rounds_up() {
        let ring: RingBuffer<u8> = RingBuffer::with_capacity(5);
        assert_eq!(ring.capacity(), 8);
    }

    #[test]
    fn single_producer_many_consumers_see_every_item_exactly_once() {
        let ring = Arc::new(RingBuffer::with_capacity(64));
        const N: usize = 10_000;
        let popped = Arc::new(AtomicUsize::new(0));

        let producer = {
            let ring = Arc::clone(&ring);
            thread::spawn(move || {
                for i in 0..N {
                    loop {
                        if ring.push(i).is_ok() {
                            break;
                        }
                        thread::yield_now();
                    }
                }
            })
        };

        let consumers: Vec<_> = (0..4)
            .map(|_| {
                let ring = Arc::clone(&ring);
                let popped = Arc::clone(&popped);
                thread::spawn(move || {
                    let mut seen = Vec::new();
                    loop {
                        match ring.pop() {
                            Some(v) => {
                                seen.push(v);
                                popped.fetch_add(1, Ordering::Relaxed);
                            }
                            None => {
                                if popped.load(Ordering::Relaxed) >= N {
                                    break;
                                }
                                thread::yield_now();
                            }
                        }
                    }
                    seen
                })
            })
            .collect();

        producer.join().unwrap();
        let mut all = Vec::new();
        for c in consumers {
            all.extend(c.join().unwrap());
        }
        all.sort_unstable();
        assert_eq!(all, (0..N).collect::<Vec<_>>());
    }
}
