//! Sequencer
//!
//! Generic driver loop: pulls inputs from the ring buffer and advances a
//! deterministic semantics until the stream ends or the semantics halts.
//! The sequencer does not know which semantics it is running; swap the
//! semantics, get different behavior.

use std::sync::Arc;
use std::time::{Duration, Instant};

use ring_buffer::RingBuffer;
use semantics::DeterministicSemantics;
use serde::Serialize;
use tracing::{debug, info};

/// Listener for each consumed input and the configuration it met.
pub type InputListener<I, C> = Box<dyn FnMut(&I, &C) + Send>;

/// Listener for each produced output. This is the viewer interface.
pub type OutputListener<O> = Box<dyn FnMut(&O) + Send>;

/// Run statistics, for the final report.
#[derive(Debug, Clone, Copy, Default, Serialize)]
pub struct SequencerStats {
    pub inputs_processed: u64,
    pub outputs_produced: u64,
    pub elapsed: Duration,
}

/// Drives a [`DeterministicSemantics`] over the inputs of a ring buffer.
///
/// Listeners run synchronously on the sequencer thread: a slow listener
/// slows the consumer, which raises the buffer's drop probability. That
/// routing is intentional. Listener panics are not caught; they unwind
/// the sequencer thread.
pub struct Sequencer<S: DeterministicSemantics> {
    sli: S,
    buffer: Arc<RingBuffer<S::Input>>,
    input_listeners: Vec<InputListener<S::Input, S::Config>>,
    output_listeners: Vec<OutputListener<S::Output>>,
    stats: SequencerStats,
}

impl<S: DeterministicSemantics> Sequencer<S> {
    pub fn new(sli: S, buffer: Arc<RingBuffer<S::Input>>) -> Self {
        Self {
            sli,
            buffer,
            input_listeners: Vec::new(),
            output_listeners: Vec::new(),
            stats: SequencerStats::default(),
        }
    }

    /// Register a listener invoked for every input read from the buffer,
    /// together with the configuration before the step.
    pub fn on_input(&mut self, listener: impl FnMut(&S::Input, &S::Config) + Send + 'static) {
        self.input_listeners.push(Box::new(listener));
    }

    /// Register a listener invoked for every output the semantics
    /// produces.
    pub fn on_output(&mut self, listener: impl FnMut(&S::Output) + Send + 'static) {
        self.output_listeners.push(Box::new(listener));
    }

    pub fn stats(&self) -> SequencerStats {
        self.stats
    }

    /// Execute the driver loop to completion.
    ///
    /// Stops on end-of-stream, or as soon as `initial`, `actions` or
    /// `execute` returns nothing. Each input is delivered to listeners at
    /// most once.
    pub fn run(&mut self) -> SequencerStats {
        let started = Instant::now();

        let Some(mut config) = self.sli.initial() else {
            info!("sequencer: no initial configuration, nothing to run");
            self.stats.elapsed = started.elapsed();
            return self.stats;
        };
        debug!("sequencer: started, blocking on buffer");

        loop {
            let Some(input) = self.buffer.read() else {
                debug!("sequencer: buffer closed, end of stream");
                break;
            };
            self.stats.inputs_processed += 1;

            for listener in &mut self.input_listeners {
                listener(&input, &config);
            }

            let Some(action) = self.sli.actions(&input, &config) else {
                debug!("sequencer: semantics offered no action, stopping");
                break;
            };

            let Some((output, next)) = self.sli.execute(&action, &input, &config) else {
                debug!("sequencer: semantics halted, stopping");
                break;
            };
            config = next;
            self.stats.outputs_produced += 1;

            for listener in &mut self.output_listeners {
                listener(&output);
            }
        }

        self.stats.elapsed = started.elapsed();
        info!(
            "sequencer: done, {} inputs / {} outputs in {:?}",
            self.stats.inputs_processed, self.stats.outputs_produced, self.stats.elapsed
        );
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    /// Sums its inputs; halts once the running total passes a limit.
    struct SumUpTo {
        limit: u64,
    }

    impl DeterministicSemantics for SumUpTo {
        type Input = u64;
        type Output = u64;
        type Action = ();
        type Config = u64;

        fn initial(&self) -> Option<u64> {
            Some(0)
        }

        fn actions(&self, _input: &u64, config: &u64) -> Option<()> {
            (*config <= self.limit).then_some(())
        }

        fn execute(&self, _action: &(), input: &u64, config: &u64) -> Option<(u64, u64)> {
            let total = config + input;
            Some((total, total))
        }
    }

    /// Never starts: `initial` is absent.
    struct NeverStarts;

    impl DeterministicSemantics for NeverStarts {
        type Input = u64;
        type Output = u64;
        type Action = ();
        type Config = u64;

        fn initial(&self) -> Option<u64> {
            None
        }

        fn actions(&self, _input: &u64, _config: &u64) -> Option<()> {
            Some(())
        }

        fn execute(&self, _action: &(), _input: &u64, _config: &u64) -> Option<(u64, u64)> {
            None
        }
    }

    fn filled_buffer(items: &[u64]) -> Arc<RingBuffer<u64>> {
        let buffer = Arc::new(RingBuffer::new(items.len().max(1)));
        for item in items {
            buffer.write(*item);
        }
        buffer.close();
        buffer
    }

    #[test]
    fn test_drives_semantics_to_end_of_stream() {
        let buffer = filled_buffer(&[1, 2, 3]);
        let outputs = Arc::new(AtomicU64::new(0));
        let mut sequencer = Sequencer::new(SumUpTo { limit: u64::MAX }, buffer);
        {
            let outputs = Arc::clone(&outputs);
            sequencer.on_output(move |total| {
                outputs.store(*total, Ordering::Relaxed);
            });
        }

        let stats = sequencer.run();
        assert_eq!(stats.inputs_processed, 3);
        assert_eq!(stats.outputs_produced, 3);
        assert_eq!(outputs.load(Ordering::Relaxed), 6);
    }

    #[test]
    fn test_each_input_delivered_at_most_once() {
        let buffer = filled_buffer(&[10, 20, 30]);
        let delivered = Arc::new(AtomicU64::new(0));
        let mut sequencer = Sequencer::new(SumUpTo { limit: u64::MAX }, buffer);
        {
            let delivered = Arc::clone(&delivered);
            sequencer.on_input(move |_, _| {
                delivered.fetch_add(1, Ordering::Relaxed);
            });
        }

        sequencer.run();
        assert_eq!(delivered.load(Ordering::Relaxed), 3);
    }

    #[test]
    fn test_halts_when_actions_absent() {
        // Limit 5: inputs 3 and 4 process, the third input finds the
        // total above the limit and the loop stops before executing.
        let buffer = filled_buffer(&[3, 4, 100, 100]);
        let mut sequencer = Sequencer::new(SumUpTo { limit: 5 }, buffer);
        let stats = sequencer.run();

        assert_eq!(stats.inputs_processed, 3);
        assert_eq!(stats.outputs_produced, 2);
    }

    #[test]
    fn test_absent_initial_configuration_runs_nothing() {
        let buffer = filled_buffer(&[1, 2]);
        let mut sequencer = Sequencer::new(NeverStarts, Arc::clone(&buffer));
        let stats = sequencer.run();

        assert_eq!(stats.inputs_processed, 0);
        assert_eq!(stats.outputs_produced, 0);
        // Inputs stay in the buffer: the sequencer never consumed them.
        assert_eq!(buffer.len(), 2);
    }
}
