//! Fixed-capacity SPSC sample ring
//!
//! One ring carries one channel. The backing store is allocated once and its
//! length is always a power of two, so cursor wraparound is a bitmask.
//!
//! # Cursors
//!
//! ```text
//!            read                      write
//!             │                          │
//!   ┌─────────▼──────────────────────────▼─────────┐
//!   │  free   │▒▒▒▒▒▒▒▒ readable ▒▒▒▒▒▒▒▒│   free   │
//!   └──────────────────────────────────────────────┘
//!   physical index = cursor & (capacity - 1)
//! ```
//!
//! Both cursors grow monotonically (wrapping at `usize::MAX`); only their
//! difference matters. `write - read` never exceeds `capacity`.
//!
//! The ring is split at construction into a [`RingProducer`] and a
//! [`RingConsumer`]. Each handle is `Send` but not `Clone`, which is how the
//! single-writer / single-reader contract is enforced: exactly one thread can
//! own each end.
//!
//! Transfers are all-or-nothing: a write that does not fit, or a read that is
//! not fully available, moves no samples and returns a [`RingError`].

mod error;

pub use error::RingError;

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crossbeam::utils::CachePadded;

use crate::types::Sample;

/// Capacity actually allocated for a requested size
///
/// Smallest power of two that is `>= requested` (a request of 0 yields 1).
pub fn ring_capacity_for(requested: usize) -> usize {
    requested.max(1).next_power_of_two()
}

/// Storage shared between the two ends of one ring
struct Shared {
    slots: Box<[UnsafeCell<Sample>]>,
    mask: usize,
    /// Advanced only by the producer
    write: CachePadded<AtomicUsize>,
    /// Advanced only by the consumer
    read: CachePadded<AtomicUsize>,
}

// SAFETY: a slot is written only by the producer while it lies outside
// [read, write), and read only by the consumer while it lies inside it. The
// Release store of a cursor publishes the slots it covers to the Acquire load
// on the other side.
unsafe impl Sync for Shared {}

impl Shared {
    #[inline]
    fn capacity(&self) -> usize {
        self.mask + 1
    }

    #[inline]
    fn readable(&self) -> usize {
        let write = self.write.load(Ordering::Acquire);
        let read = self.read.load(Ordering::Acquire);
        // Clamped so a stale pair of loads can never report more than the store holds
        write.wrapping_sub(read).min(self.capacity())
    }

    #[inline]
    fn writable(&self) -> usize {
        self.capacity() - self.readable()
    }

    /// Raw pointer to the slot at physical index `idx`
    ///
    /// Caller guarantees `idx <= capacity` (one-past-the-end is allowed for
    /// zero-length copies).
    #[inline]
    fn slot_ptr(&self, idx: usize) -> *mut Sample {
        debug_assert!(idx <= self.capacity());
        UnsafeCell::raw_get(self.slots.as_ptr().wrapping_add(idx))
    }

    /// Split a logical run of `count` slots starting at `cursor` into the
    /// two physical segments `(start, first_len, second_len)`.
    #[inline]
    fn segments(&self, cursor: usize, count: usize) -> (usize, usize, usize) {
        let start = cursor & self.mask;
        let first = count.min(self.capacity() - start);
        (start, first, count - first)
    }
}

/// Create a ring for at least `requested` samples and split it into its ends
pub fn sample_ring(requested: usize) -> (RingProducer, RingConsumer) {
    let capacity = ring_capacity_for(requested);
    let slots: Box<[UnsafeCell<Sample>]> = (0..capacity).map(|_| UnsafeCell::new(0.0)).collect();
    let shared = Arc::new(Shared {
        slots,
        mask: capacity - 1,
        write: CachePadded::new(AtomicUsize::new(0)),
        read: CachePadded::new(AtomicUsize::new(0)),
    });
    (
        RingProducer {
            shared: Arc::clone(&shared),
        },
        RingConsumer { shared },
    )
}

/// Fill-level queries available on both ends of a ring
pub trait RingLevels {
    /// Samples currently readable
    fn readable(&self) -> usize;
    /// Samples currently writable
    fn writable(&self) -> usize;
    /// Total capacity (power of two)
    fn capacity(&self) -> usize;
}

/// Write end of a sample ring
pub struct RingProducer {
    shared: Arc<Shared>,
}

impl RingProducer {
    /// Write all of `samples`, or nothing
    ///
    /// Never blocks, never allocates. On success returns `samples.len()`.
    pub fn try_write(&mut self, samples: &[Sample]) -> Result<usize, RingError> {
        let count = samples.len();
        let shared = &*self.shared;
        let write = shared.write.load(Ordering::Relaxed);
        let read = shared.read.load(Ordering::Acquire);
        let writable = shared.capacity() - write.wrapping_sub(read);

        if writable < count {
            return Err(RingError::WouldOverflow {
                requested: count,
                writable,
            });
        }

        let (start, first, second) = shared.segments(write, count);
        // SAFETY: the `count` slots starting at `write` are outside the
        // readable region (checked above) and only this end writes them.
        unsafe {
            std::ptr::copy_nonoverlapping(samples.as_ptr(), shared.slot_ptr(start), first);
            std::ptr::copy_nonoverlapping(
                samples.as_ptr().add(first),
                shared.slot_ptr(0),
                second,
            );
        }

        shared
            .write
            .store(write.wrapping_add(count), Ordering::Release);
        Ok(count)
    }
}

impl RingLevels for RingProducer {
    #[inline]
    fn readable(&self) -> usize {
        self.shared.readable()
    }

    #[inline]
    fn writable(&self) -> usize {
        self.shared.writable()
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}

/// Read end of a sample ring
pub struct RingConsumer {
    shared: Arc<Shared>,
}

impl RingConsumer {
    /// Fill all of `dest` from the ring, or nothing
    ///
    /// Never blocks, never allocates. On success returns `dest.len()`.
    pub fn try_read(&mut self, dest: &mut [Sample]) -> Result<usize, RingError> {
        let count = dest.len();
        let shared = &*self.shared;
        let read = shared.read.load(Ordering::Relaxed);
        let write = shared.write.load(Ordering::Acquire);
        let readable = write.wrapping_sub(read);

        if readable < count {
            return Err(RingError::WouldUnderflow {
                requested: count,
                readable,
            });
        }

        let (start, first, second) = shared.segments(read, count);
        // SAFETY: the `count` slots starting at `read` were published by the
        // producer's Release store and are not touched by it until we advance.
        unsafe {
            std::ptr::copy_nonoverlapping(shared.slot_ptr(start), dest.as_mut_ptr(), first);
            std::ptr::copy_nonoverlapping(
                shared.slot_ptr(0),
                dest.as_mut_ptr().add(first),
                second,
            );
        }

        shared.read.store(read.wrapping_add(count), Ordering::Release);
        Ok(count)
    }
}

impl RingLevels for RingConsumer {
    #[inline]
    fn readable(&self) -> usize {
        self.shared.readable()
    }

    #[inline]
    fn writable(&self) -> usize {
        self.shared.writable()
    }

    #[inline]
    fn capacity(&self) -> usize {
        self.shared.capacity()
    }
}
