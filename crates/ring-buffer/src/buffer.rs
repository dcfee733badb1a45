//! Blocking Ring Buffer Implementation

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};

use serde::Serialize;

/// Default buffer capacity for real-time demo runs (batch verification
/// typically uses 100 or more).
pub const DEFAULT_CAPACITY: usize = 15;

/// Cells and cursors, guarded by a single mutex.
struct Slots<T> {
    cells: Box<[Option<T>]>,
    write_pos: usize,
    read_pos: usize,
    count: usize,
    peak: usize,
}

/// Bounded SPSC queue with a non-blocking overwriting writer and a
/// blocking reader.
///
/// `write` stores the newest element unconditionally: when the buffer is
/// full the oldest unread element is dropped. `read` blocks while the
/// buffer is open and empty, and returns `None` once it is closed and
/// drained. `None` is the end-of-stream marker; no sentinel element is
/// needed.
pub struct RingBuffer<T> {
    slots: Mutex<Slots<T>>,
    not_empty: Condvar,
    capacity: usize,
    closed: AtomicBool,
    total_written: AtomicU64,
    total_read: AtomicU64,
    total_dropped: AtomicU64,
}

/// Snapshot of the buffer counters, for the final report.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct BufferStats {
    pub capacity: usize,
    pub len: usize,
    pub peak_size: usize,
    pub total_written: u64,
    pub total_read: u64,
    pub total_dropped: u64,
    pub closed: bool,
}

impl<T> RingBuffer<T> {
    /// Create a ring buffer with the given capacity. A capacity of 0 is
    /// rounded up to 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let cells: Vec<Option<T>> = (0..capacity).map(|_| None).collect();
        Self {
            slots: Mutex::new(Slots {
                cells: cells.into_boxed_slice(),
                write_pos: 0,
                read_pos: 0,
                count: 0,
                peak: 0,
            }),
            not_empty: Condvar::new(),
            capacity,
            closed: AtomicBool::new(false),
            total_written: AtomicU64::new(0),
            total_read: AtomicU64::new(0),
            total_dropped: AtomicU64::new(0),
        }
    }

    /// Create a buffer with the default demo capacity.
    pub fn with_default_capacity() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }

    // Every critical section leaves the slots consistent, so a lock
    // poisoned by a panicking peer thread can be recovered: write must
    // never fail and read must still drain.
    fn lock_slots(&self) -> MutexGuard<'_, Slots<T>> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Write an element. Never blocks, never fails.
    ///
    /// When the buffer is full the oldest unread element is dropped and
    /// `total_dropped` is incremented. Writes after `close` are silently
    /// ignored.
    pub fn write(&self, item: T) {
        let mut slots = self.lock_slots();
        if self.closed.load(Ordering::Acquire) {
            return;
        }

        if slots.count == self.capacity {
            // Full: overwrite the oldest, advance the read cursor.
            slots.read_pos = (slots.read_pos + 1) % self.capacity;
            self.total_dropped.fetch_add(1, Ordering::Relaxed);
        } else {
            slots.count += 1;
        }

        let pos = slots.write_pos;
        slots.cells[pos] = Some(item);
        slots.write_pos = (pos + 1) % self.capacity;

        if slots.count > slots.peak {
            slots.peak = slots.count;
        }
        self.total_written.fetch_add(1, Ordering::Relaxed);

        self.not_empty.notify_one();
    }

    /// Read the oldest element, blocking while the buffer is open and
    /// empty. Returns `None` once the buffer is closed and drained.
    pub fn read(&self) -> Option<T> {
        let mut slots = self.lock_slots();
        while slots.count == 0 {
            if self.closed.load(Ordering::Acquire) {
                return None;
            }
            slots = self
                .not_empty
                .wait(slots)
                .unwrap_or_else(PoisonError::into_inner);
        }

        let pos = slots.read_pos;
        let item = slots.cells[pos].take();
        debug_assert!(item.is_some(), "occupied slot must hold an element");
        slots.read_pos = (pos + 1) % self.capacity;
        slots.count -= 1;

        self.total_read.fetch_add(1, Ordering::Relaxed);
        item
    }

    /// Close the buffer and wake all blocked readers. Remaining elements
    /// stay readable; after they drain, `read` returns `None`. Idempotent.
    pub fn close(&self) {
        let _slots = self.lock_slots();
        self.closed.store(true, Ordering::Release);
        self.not_empty.notify_all();
    }

    /// Current number of buffered elements.
    pub fn len(&self) -> usize {
        self.lock_slots().count
    }

    /// Whether the buffer is currently empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Maximum number of elements before overwriting starts.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Total elements written since creation (dropped ones included).
    pub fn total_written(&self) -> u64 {
        self.total_written.load(Ordering::Relaxed)
    }

    /// Total elements returned by `read` since creation.
    pub fn total_read(&self) -> u64 {
        self.total_read.load(Ordering::Relaxed)
    }

    /// Total elements dropped (overwritten before being read).
    pub fn total_dropped(&self) -> u64 {
        self.total_dropped.load(Ordering::Relaxed)
    }

    /// Maximum occupancy ever observed.
    pub fn peak_size(&self) -> usize {
        self.lock_slots().peak
    }

    /// Whether `close` has been called.
    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    /// Snapshot of all counters.
    pub fn stats(&self) -> BufferStats {
        let slots = self.lock_slots();
        BufferStats {
            capacity: self.capacity,
            len: slots.count,
            peak_size: slots.peak,
            total_written: self.total_written.load(Ordering::Relaxed),
            total_read: self.total_read.load(Ordering::Relaxed),
            total_dropped: self.total_dropped.load(Ordering::Relaxed),
            closed: self.closed.load(Ordering::Acquire),
        }
    }
}
