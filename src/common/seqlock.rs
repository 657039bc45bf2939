//! Sequence lock for small trivially-copyable payloads.
//!
//! The accessibility thread writes focus/caret rectangles a few times a
//! second; the render thread reads them every frame. A torn rectangle is
//! unacceptable but a mutex on the frame tick is worse, so the writer bumps
//! an even/odd sequence around the payload copy and the reader retries when
//! it observes a write in flight.
//!
//! Single-writer contract: exactly one thread may call `write`.

use std::cell::UnsafeCell;
use std::sync::atomic::{AtomicU32, Ordering};

pub struct SeqLock<T: Copy> {
    seq: AtomicU32,
    data: UnsafeCell<T>,
}

unsafe impl<T: Copy + Send> Sync for SeqLock<T> {}

impl<T: Copy> SeqLock<T> {
    pub fn new(value: T) -> Self {
        Self {
            seq: AtomicU32::new(0),
            data: UnsafeCell::new(value),
        }
    }

    /// Publish a new payload. Odd sequence = write in progress.
    pub fn write(&self, value: T) {
        self.seq.fetch_add(1, Ordering::Release);
        // Volatile keeps the payload store between the two sequence bumps.
        unsafe { std::ptr::write_volatile(self.data.get(), value) };
        self.seq.fetch_add(1, Ordering::Release);
    }

    /// Copy out a consistent payload, retrying across concurrent writes.
    pub fn read(&self) -> T {
        loop {
            let before = self.seq.load(Ordering::Acquire);
            if before & 1 == 1 {
                std::hint::spin_loop();
                continue;
            }
            let value = unsafe { std::ptr::read_volatile(self.data.get()) };
            let after = self.seq.load(Ordering::Acquire);
            if before == after {
                return value;
            }
        }
    }
}

impl<T: Copy + Default> Default for SeqLock<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
