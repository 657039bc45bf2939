//! Bounded single-producer/single-consumer ring.
//!
//! Carries [`ZoomCommand`](super::ZoomCommand) values from the input hook
//! callbacks to the render thread. `push` and `pop` take `&self` so the ring
//! can live inside the process-wide shared state; the single-producer /
//! single-consumer discipline is a caller contract (input actor produces,
//! render actor consumes, nobody else touches it).

use std::cell::UnsafeCell;
use std::mem::MaybeUninit;
use std::sync::atomic::{AtomicUsize, Ordering};

pub struct SpscRing<T: Copy, const N: usize> {
    slots: [UnsafeCell<MaybeUninit<T>>; N],
    /// Producer-owned write index.
    head: AtomicUsize,
    /// Consumer-owned read index.
    tail: AtomicUsize,
}

// The producer and consumer each mutate only their own index; slot contents
// are handed over by the release store on that index.
unsafe impl<T: Copy + Send, const N: usize> Sync for SpscRing<T, N> {}

impl<T: Copy, const N: usize> SpscRing<T, N> {
    pub fn new() -> Self {
        assert!(N.is_power_of_two(), "ring capacity must be a power of two");
        Self {
            slots: std::array::from_fn(|_| UnsafeCell::new(MaybeUninit::uninit())),
            head: AtomicUsize::new(0),
            tail: AtomicUsize::new(0),
        }
    }

    /// Producer side. Returns `false` when the ring is full; the item is
    /// dropped and the caller decides whether that deserves a diagnostic
    /// (hook callbacks must not log, so they report upstream instead).
    pub fn push(&self, item: T) -> bool {
        let head = self.head.load(Ordering::Relaxed);
        let next = (head + 1) & (N - 1);
        if next == self.tail.load(Ordering::Acquire) {
            return false;
        }
        unsafe {
            (*self.slots[head].get()).write(item);
        }
        self.head.store(next, Ordering::Release);
        true
    }

    /// Consumer side.
    pub fn pop(&self) -> Option<T> {
        let tail = self.tail.load(Ordering::Relaxed);
        if tail == self.head.load(Ordering::Acquire) {
            return None;
        }
        let item = unsafe { (*self.slots[tail].get()).assume_init() };
        self.tail.store((tail + 1) & (N - 1), Ordering::Release);
        Some(item)
    }

    pub fn is_empty(&self) -> bool {
        self.tail.load(Ordering::Relaxed) == self.head.load(Ordering::Acquire)
    }
}

impl<T: Copy, const N: usize> Default for SpscRing<T, N> {
    fn default() -> Self {
        Self::new()
    }
}
