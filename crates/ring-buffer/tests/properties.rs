//! Property tests for the ring buffer invariants.

use std::sync::Arc;
use std::thread;

use proptest::prelude::*;

use ring_buffer::RingBuffer;

proptest! {
    /// For n writes with no intervening reads and capacity k:
    /// count = min(n, k), dropped = max(0, n - k), written = n.
    #[test]
    fn write_only_fill_and_drop_arithmetic(n in 0usize..200, k in 1usize..32) {
        let buffer = RingBuffer::new(k);
        for i in 0..n {
            buffer.write(i);
        }

        prop_assert_eq!(buffer.len(), n.min(k));
        prop_assert_eq!(buffer.total_dropped(), n.saturating_sub(k) as u64);
        prop_assert_eq!(buffer.total_written(), n as u64);
        prop_assert_eq!(buffer.peak_size(), n.min(k));
    }

    /// After close, the survivors are exactly the newest min(n, k)
    /// elements, in write order, followed by end-of-stream forever.
    #[test]
    fn drain_returns_newest_suffix_in_order(n in 0usize..200, k in 1usize..32) {
        let buffer = RingBuffer::new(k);
        for i in 0..n {
            buffer.write(i);
        }
        buffer.close();

        let mut drained = Vec::new();
        while let Some(item) = buffer.read() {
            drained.push(item);
        }
        prop_assert_eq!(buffer.read(), None);

        let expected: Vec<usize> = (n.saturating_sub(k)..n).collect();
        prop_assert_eq!(drained, expected);
    }

    /// Single-producer/single-consumer: the consumer observes a strictly
    /// increasing subsequence of the writes, with no duplicates and no
    /// fabricated elements, and the counters balance.
    #[test]
    fn concurrent_reads_are_a_subsequence_of_writes(
        n in 1usize..500,
        k in 1usize..16,
    ) {
        let buffer = Arc::new(RingBuffer::new(k));

        let consumer = {
            let buffer = Arc::clone(&buffer);
            thread::spawn(move || {
                let mut seen = Vec::new();
                while let Some(item) = buffer.read() {
                    seen.push(item);
                }
                seen
            })
        };

        for i in 0..n {
            buffer.write(i);
        }
        buffer.close();

        let seen = consumer.join().expect("consumer thread panicked");

        // Strictly increasing => subsequence of 0..n, no element twice.
        prop_assert!(seen.windows(2).all(|w| w[0] < w[1]));
        prop_assert!(seen.iter().all(|&item| item < n));
        prop_assert_eq!(buffer.total_read(), seen.len() as u64);
        prop_assert_eq!(
            buffer.total_written(),
            buffer.total_read() + buffer.total_dropped() + buffer.len() as u64
        );
        prop_assert!(buffer.peak_size() <= k);
    }
}
