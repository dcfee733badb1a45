//! Trace Semantics
//!
//! Deterministic semantics whose configuration is the previous
//! measurement. Each input after the first emits exactly one step.

use std::time::Duration;

use crate::contract::DeterministicSemantics;
use crate::step::Step;

/// How to measure the time between two consecutive measurements.
pub type DurationFn<M> = Box<dyn Fn(&M, &M) -> Duration + Send + Sync>;

/// The single action of the trace semantics: record the incoming
/// measurement, emitting a step when a previous one exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordStep;

/// Pairs successive measurements into timestamped [`Step`]s.
///
/// Configuration is `Option<M>`: the previous measurement, or `None`
/// before the first input. The output is `Option<Step<M>>`, absent for
/// the very first input and present exactly once per input afterwards.
pub struct TraceSemantics<M> {
    duration_fn: DurationFn<M>,
}

impl<M> TraceSemantics<M> {
    /// Create a trace semantics with the given duration function.
    pub fn new(duration_fn: impl Fn(&M, &M) -> Duration + Send + Sync + 'static) -> Self {
        Self {
            duration_fn: Box::new(duration_fn),
        }
    }
}

impl<M: Clone> DeterministicSemantics for TraceSemantics<M> {
    type Input = M;
    type Output = Option<Step<M>>;
    type Action = RecordStep;
    type Config = Option<M>;

    fn initial(&self) -> Option<Self::Config> {
        // Present configuration with empty content: no previous
        // measurement yet.
        Some(None)
    }

    fn actions(&self, _input: &M, _config: &Self::Config) -> Option<RecordStep> {
        Some(RecordStep)
    }

    fn execute(
        &self,
        _action: &RecordStep,
        input: &M,
        config: &Self::Config,
    ) -> Option<(Self::Output, Self::Config)> {
        match config {
            None => Some((None, Some(input.clone()))),
            Some(last) => {
                let duration = (self.duration_fn)(last, input);
                let step = Step::new(last.clone(), duration, input.clone());
                Some((Some(step), Some(input.clone())))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use measurement::{Measurement, Value};

    fn meas(index: u64, t: f64) -> Measurement {
        Measurement::new(index, vec![("t".to_string(), Value::Float(t))])
    }

    /// Duration from the `t` column, in seconds.
    fn by_time_column() -> TraceSemantics<Measurement> {
        TraceSemantics::new(|last: &Measurement, current: &Measurement| {
            let t1 = last.get_f64("t").unwrap_or(0.0);
            let t2 = current.get_f64("t").unwrap_or(0.0);
            Duration::from_secs_f64((t2 - t1).abs())
        })
    }

    fn drive(
        sli: &TraceSemantics<Measurement>,
        inputs: &[Measurement],
    ) -> Vec<Option<Step<Measurement>>> {
        let mut config = sli.initial().expect("trace semantics always starts");
        let mut outputs = Vec::new();
        for input in inputs {
            let action = sli.actions(input, &config).expect("action present");
            let (output, next) = sli.execute(&action, input, &config).expect("executes");
            outputs.push(output);
            config = next;
        }
        outputs
    }

    #[test]
    fn test_first_input_emits_no_step() {
        let sli = by_time_column();
        let outputs = drive(&sli, &[meas(0, 0.0)]);
        assert_eq!(outputs, vec![None]);
    }

    #[test]
    fn test_step_emission_with_time_column() {
        // m1(t=0), m2(t=1.5), m3(t=2.0) -> absent, step(m1, 1.5s, m2),
        // step(m2, 0.5s, m3).
        let sli = by_time_column();
        let m1 = meas(0, 0.0);
        let m2 = meas(1, 1.5);
        let m3 = meas(2, 2.0);
        let outputs = drive(&sli, &[m1.clone(), m2.clone(), m3.clone()]);

        assert_eq!(outputs[0], None);
        assert_eq!(
            outputs[1],
            Some(Step::new(m1, Duration::from_secs_f64(1.5), m2.clone()))
        );
        assert_eq!(
            outputs[2],
            Some(Step::new(m2, Duration::from_secs_f64(0.5), m3))
        );
    }

    #[test]
    fn test_every_later_input_emits_exactly_one_step() {
        let sli = by_time_column();
        let inputs: Vec<Measurement> = (0..10).map(|i| meas(i, i as f64)).collect();
        let outputs = drive(&sli, &inputs);

        assert_eq!(outputs.len(), 10);
        assert!(outputs[0].is_none());
        for (i, output) in outputs.iter().enumerate().skip(1) {
            let step = output.as_ref().expect("one step per later input");
            assert_eq!(step.current, inputs[i]);
            assert_eq!(step.last, inputs[i - 1]);
        }
    }

    #[test]
    fn test_index_fallback_duration() {
        let sli = TraceSemantics::new(|last: &Measurement, current: &Measurement| {
            Duration::from_secs(current.index().saturating_sub(last.index()))
        });
        let outputs = drive(&sli, &[meas(3, 0.0), meas(7, 0.0)]);
        assert_eq!(
            outputs[1].as_ref().map(|s| s.duration),
            Some(Duration::from_secs(4))
        );
    }
}
