//! Pipeline Runner
//!
//! Wires the trace emulator, the ring buffer and the sequencer into the
//! two-thread pipeline, and reports the outcome. Two run shapes: a plain
//! trace run that emits steps to the viewer, and a verification run that
//! checks the trace against a guarded automaton.

use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::thread;
use std::time::Duration;

use measurement::Measurement;
use membership::{
    Automaton, AutomatonSemantics, MembershipConfig, RelaxedMembership, SpecError, Verdict,
};
use ring_buffer::{RingBuffer, DEFAULT_CAPACITY};
use semantics::{DeterministicSemantics, Step, TraceSemantics};
use sequencer::{Sequencer, SequencerStats};
use serde::Serialize;
use thiserror::Error;
use trace_source::{time_value, SourceError, TraceEmulator};
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

mod report;

pub use report::{RunReport, StepRecord, VerificationSummary};

/// Longest consumer-side sleep between measurements in replay mode.
const MAX_REPLAY_SLEEP_SECS: f64 = 5.0;

/// Errors of a pipeline run.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error(transparent)]
    Source(#[from] SourceError),

    #[error(transparent)]
    Spec(#[from] SpecError),

    #[error("failed to spawn {name} thread: {source}")]
    Spawn {
        name: &'static str,
        source: std::io::Error,
    },

    #[error("{0} thread panicked")]
    WorkerPanic(&'static str),
}

/// How the recorded trace is replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum EmulatorMode {
    /// The producer sleeps a fixed period between emissions.
    #[default]
    FixedPeriod,
    /// The producer runs unpaced; the consumer sleeps the recorded
    /// delta-t (capped at 5 s) between measurements.
    RealDeltaT,
}

/// Pipeline configuration.
#[derive(Debug, Clone, Serialize)]
pub struct RunnerConfig {
    /// Ring buffer capacity
    pub capacity: usize,
    /// Producer pacing in milliseconds; 0 = full speed
    pub period_ms: u64,
    pub mode: EmulatorMode,
    /// Verification mode: strict freezes the spec configurations on the
    /// first FAIL
    pub strict: bool,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        // Real-time demo defaults: small buffer, 25 Hz sensor rate.
        Self {
            capacity: DEFAULT_CAPACITY,
            period_ms: 40,
            mode: EmulatorMode::FixedPeriod,
            strict: false,
        }
    }
}

impl RunnerConfig {
    /// Batch-verification defaults: generous buffer, unpaced producer.
    pub fn verification() -> Self {
        Self {
            capacity: 100,
            period_ms: 0,
            mode: EmulatorMode::FixedPeriod,
            strict: false,
        }
    }
}

/// Initialize the process-wide log sink.
pub fn init_logging() {
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");
}

/// Duration between two measurements: difference of their recognized
/// time columns when both have one, otherwise their index distance in
/// seconds.
fn measured_duration(last: &Measurement, current: &Measurement) -> Duration {
    if let (Some(t1), Some(t2)) = (time_value(last), time_value(current)) {
        let dt = (t2 - t1).abs();
        if dt.is_finite() {
            return Duration::from_secs_f64(dt);
        }
    }
    Duration::from_secs(current.index().saturating_sub(last.index()))
}

/// Observational wrapper around a semantics: forwards every operation
/// and hands each successful execution to a hook. Mirrors the reporting
/// layer the sequencer cannot provide itself, since listeners never see
/// the configuration *after* a step.
struct Reporting<S: DeterministicSemantics> {
    inner: S,
    hook: Mutex<Box<dyn FnMut(&S::Input, &S::Output, &S::Config) + Send>>,
}

impl<S: DeterministicSemantics> Reporting<S> {
    fn new(inner: S, hook: impl FnMut(&S::Input, &S::Output, &S::Config) + Send + 'static) -> Self {
        Self {
            inner,
            hook: Mutex::new(Box::new(hook)),
        }
    }
}

impl<S: DeterministicSemantics> DeterministicSemantics for Reporting<S> {
    type Input = S::Input;
    type Output = S::Output;
    type Action = S::Action;
    type Config = S::Config;

    fn initial(&self) -> Option<Self::Config> {
        self.inner.initial()
    }

    fn actions(&self, input: &Self::Input, config: &Self::Config) -> Option<Self::Action> {
        self.inner.actions(input, config)
    }

    fn execute(
        &self,
        action: &Self::Action,
        input: &Self::Input,
        config: &Self::Config,
    ) -> Option<(Self::Output, Self::Config)> {
        let result = self.inner.execute(action, input, config);
        if let Some((output, next)) = &result {
            let mut hook = self.hook.lock().unwrap_or_else(PoisonError::into_inner);
            hook(input, output, next);
        }
        result
    }
}

/// In replay mode the consumer paces itself: sleep the recorded time
/// between measurements, capped so a gap in the trace cannot stall the
/// run.
fn attach_replay_pacing<S>(sequencer: &mut Sequencer<S>)
where
    S: DeterministicSemantics<Input = Measurement>,
{
    let mut prev: Option<Measurement> = None;
    sequencer.on_input(move |measurement, _config| {
        if let Some(last) = &prev {
            if let (Some(t1), Some(t2)) = (time_value(last), time_value(measurement)) {
                let dt = (t2 - t1).abs();
                if dt.is_finite() && dt > 0.0 {
                    thread::sleep(Duration::from_secs_f64(dt.min(MAX_REPLAY_SLEEP_SECS)));
                }
            }
        }
        prev = Some(measurement.clone());
    });
}

/// Two-thread pipeline runner.
pub struct Runner {
    config: RunnerConfig,
    on_step: Option<Box<dyn FnMut(StepRecord) + Send>>,
}

impl Runner {
    pub fn new(config: RunnerConfig) -> Self {
        Self {
            config,
            on_step: None,
        }
    }

    /// Register a callback invoked for every verified step of a
    /// verification run. Runs on the sequencer thread.
    pub fn on_step(mut self, callback: impl FnMut(StepRecord) + Send + 'static) -> Self {
        self.on_step = Some(Box::new(callback));
        self
    }

    /// Replay the trace through the trace semantics alone, emitting each
    /// step to the viewer (the log sink).
    pub fn run_trace(self, trace: impl AsRef<Path>) -> Result<RunReport, RunnerError> {
        let config = self.config.clone();
        let emulator = self.open_emulator(trace)?;
        let buffer = Arc::new(RingBuffer::new(config.capacity));

        let sli = TraceSemantics::new(measured_duration);
        let mut sequencer = Sequencer::new(sli, Arc::clone(&buffer));
        if config.mode == EmulatorMode::RealDeltaT {
            attach_replay_pacing(&mut sequencer);
        }
        sequencer.on_output(|output: &Option<Step<Measurement>>| match output {
            Some(step) => info!(
                "step: m{} -> m{}, dt={:?}",
                step.last.measurement_number(),
                step.current.measurement_number(),
                step.duration
            ),
            None => info!("step: first reading, configuration initialized"),
        });

        let (stats, readings_produced) = launch(emulator, sequencer, &buffer)?;
        Ok(RunReport {
            readings_produced,
            buffer: buffer.stats(),
            sequencer: stats,
            verification: None,
        })
    }

    /// Check the trace against the automaton, step by step.
    pub fn run_verification(
        mut self,
        trace: impl AsRef<Path>,
        automaton: Automaton,
    ) -> Result<RunReport, RunnerError> {
        automaton.validate()?;
        let config = self.config.clone();
        let emulator = self.open_emulator(trace)?;
        let buffer = Arc::new(RingBuffer::new(config.capacity));

        let sli = RelaxedMembership::with_mode(
            TraceSemantics::new(measured_duration),
            AutomatonSemantics::new(automaton),
            config.strict,
        );

        let steps = Arc::new(AtomicU64::new(0));
        let ok = Arc::new(AtomicU64::new(0));
        let fail = Arc::new(AtomicU64::new(0));

        let hook = {
            let steps = Arc::clone(&steps);
            let ok = Arc::clone(&ok);
            let fail = Arc::clone(&fail);
            let mut on_step = self.on_step.take();
            move |input: &Measurement,
                  verdict: &Verdict,
                  next: &MembershipConfig<Measurement, String>| {
                let step = steps.fetch_add(1, Ordering::Relaxed) + 1;
                match verdict {
                    Verdict::Ok => ok.fetch_add(1, Ordering::Relaxed),
                    Verdict::Fail => fail.fetch_add(1, Ordering::Relaxed),
                };
                if let Some(callback) = on_step.as_mut() {
                    let mut states: Vec<String> = next.spec.iter().cloned().collect();
                    states.sort();
                    callback(StepRecord {
                        step,
                        verdict: *verdict,
                        measurement: input.clone(),
                        states,
                    });
                }
            }
        };

        let mut sequencer = Sequencer::new(Reporting::new(sli, hook), Arc::clone(&buffer));
        if config.mode == EmulatorMode::RealDeltaT {
            attach_replay_pacing(&mut sequencer);
        }

        let (stats, readings_produced) = launch(emulator, sequencer, &buffer)?;
        Ok(RunReport {
            readings_produced,
            buffer: buffer.stats(),
            sequencer: stats,
            verification: Some(VerificationSummary {
                total_steps: steps.load(Ordering::Relaxed),
                ok: ok.load(Ordering::Relaxed),
                fail: fail.load(Ordering::Relaxed),
                strict: config.strict,
            }),
        })
    }

    fn open_emulator(&self, trace: impl AsRef<Path>) -> Result<TraceEmulator, RunnerError> {
        // In replay mode the producer is unpaced; the consumer sleeps.
        let period_ms = match self.config.mode {
            EmulatorMode::FixedPeriod => self.config.period_ms,
            EmulatorMode::RealDeltaT => 0,
        };
        Ok(TraceEmulator::open(trace, period_ms)?)
    }
}

/// Spawn the consumer, then the producer; join both. The buffer is
/// closed between the joins so a panicked producer can never leave the
/// consumer blocked.
fn launch<S>(
    mut emulator: TraceEmulator,
    mut sequencer: Sequencer<S>,
    buffer: &Arc<RingBuffer<Measurement>>,
) -> Result<(SequencerStats, u64), RunnerError>
where
    S: DeterministicSemantics<Input = Measurement> + Send + 'static,
{
    let consumer = thread::Builder::new()
        .name("sequencer".to_string())
        .spawn(move || sequencer.run())
        .map_err(|source| RunnerError::Spawn {
            name: "sequencer",
            source,
        })?;

    let producer = {
        let buffer = Arc::clone(buffer);
        thread::Builder::new()
            .name("trace-source".to_string())
            .spawn(move || emulator.run(&buffer))
            .map_err(|source| RunnerError::Spawn {
                name: "trace-source",
                source,
            })?
    };

    let producer_result = producer.join();
    buffer.close();
    let consumer_result = consumer.join();

    let stats = consumer_result.map_err(|_| RunnerError::WorkerPanic("sequencer"))?;
    let readings = producer_result
        .map_err(|_| RunnerError::WorkerPanic("trace-source"))?
        .map_err(RunnerError::Source)?;
    Ok((stats, readings))
}
