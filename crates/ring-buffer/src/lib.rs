//! Bounded Overwrite-on-Full Ring Buffer
//!
//! Back-pressure policy of the pipeline: the producer never blocks and
//! never fails; under overload the oldest unread element is dropped in
//! favor of the newest. The consumer blocks until data arrives or the
//! buffer is closed.

mod buffer;

pub use buffer::{BufferStats, RingBuffer, DEFAULT_CAPACITY};
