//! Relaxed Membership
//!
//! Deterministic combinator over a trace semantics and a nondeterministic
//! specification semantics. Each measurement yields a verdict; the set of
//! surviving specification configurations evolves step by step.

use std::collections::HashSet;
use std::hash::Hash;

use semantics::{DeterministicSemantics, Semantics, Step, TraceSemantics};
use serde::{Deserialize, Serialize};

/// Per-step membership verdict. `Fail` is a value, never an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Verdict {
    Ok,
    Fail,
}

impl Verdict {
    pub fn is_ok(self) -> bool {
        matches!(self, Verdict::Ok)
    }
}

/// The single action of the membership semantics: check one measurement
/// against the specification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CheckStep;

/// Membership configuration: the previous measurement plus the set of
/// specification configurations still alive.
#[derive(Debug, Clone)]
pub struct MembershipConfig<M, C> {
    pub last: Option<M>,
    pub spec: HashSet<C>,
}

/// Wraps a trace semantics and a spec semantics into a deterministic
/// OK/FAIL decision procedure.
///
/// In relaxed mode (the default) a FAIL is a local event: the surviving
/// configurations are carried over unchanged, so the stream can recover.
/// In strict mode the first FAIL empties the set, and every later verdict
/// is FAIL.
pub struct RelaxedMembership<M, S>
where
    S: Semantics<Input = Step<M>>,
{
    trace: TraceSemantics<M>,
    spec: S,
    strict: bool,
}

impl<M, S> RelaxedMembership<M, S>
where
    S: Semantics<Input = Step<M>>,
{
    /// Relaxed-mode membership (FAIL does not poison later verdicts).
    pub fn new(trace: TraceSemantics<M>, spec: S) -> Self {
        Self::with_mode(trace, spec, false)
    }

    /// Membership with an explicit mode. `strict = true` freezes the
    /// configuration set on the first FAIL.
    pub fn with_mode(trace: TraceSemantics<M>, spec: S, strict: bool) -> Self {
        Self {
            trace,
            spec,
            strict,
        }
    }

    pub fn is_strict(&self) -> bool {
        self.strict
    }
}

impl<M, S> DeterministicSemantics for RelaxedMembership<M, S>
where
    M: Clone,
    S: Semantics<Input = Step<M>>,
    S::Config: Clone + Eq + Hash,
{
    type Input = M;
    type Output = Verdict;
    type Action = CheckStep;
    type Config = MembershipConfig<M, S::Config>;

    fn initial(&self) -> Option<Self::Config> {
        let spec: HashSet<S::Config> = self.spec.initial().into_iter().collect();
        if spec.is_empty() {
            // No surviving spec configuration: the system cannot start.
            return None;
        }
        let last = self.trace.initial()?;
        Some(MembershipConfig { last, spec })
    }

    fn actions(&self, _input: &M, _config: &Self::Config) -> Option<CheckStep> {
        Some(CheckStep)
    }

    fn execute(
        &self,
        _action: &CheckStep,
        input: &M,
        config: &Self::Config,
    ) -> Option<(Verdict, Self::Config)> {
        let trace_action = self.trace.actions(input, &config.last)?;
        let (step, last) = self.trace.execute(&trace_action, input, &config.last)?;

        // First measurement: no step yet, trivially conforming.
        let Some(step) = step else {
            return Some((
                Verdict::Ok,
                MembershipConfig {
                    last,
                    spec: config.spec.clone(),
                },
            ));
        };

        let mut next: HashSet<S::Config> = HashSet::new();
        for spec_config in &config.spec {
            for action in self.spec.actions(&step, spec_config) {
                for (_output, target) in self.spec.execute(&action, &step, spec_config) {
                    next.insert(target);
                }
            }
        }

        if next.is_empty() {
            let spec = if self.strict {
                next
            } else {
                config.spec.clone()
            };
            return Some((Verdict::Fail, MembershipConfig { last, spec }));
        }

        Some((Verdict::Ok, MembershipConfig { last, spec: next }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::automaton::{Automaton, AutomatonSemantics, Comparison, Condition, Guard, Transition};
    use measurement::{Measurement, Value};
    use std::time::Duration;

    fn meas(index: u64, v: f64) -> Measurement {
        Measurement::new(index, vec![("v".to_string(), Value::Float(v))])
    }

    /// {s0 -> s1 on v > 0, s1 -> s1 on v > 0}, starting at s0.
    fn positive_spec() -> AutomatonSemantics {
        let guard = Guard(vec![Condition {
            column: "v".to_string(),
            op: Comparison::Greater,
            value: 0.0,
        }]);
        AutomatonSemantics::new(Automaton {
            name: "positive".to_string(),
            states: vec!["s0".to_string(), "s1".to_string()],
            initial: vec!["s0".to_string()],
            transitions: vec![
                Transition {
                    name: "start".to_string(),
                    from: "s0".to_string(),
                    to: "s1".to_string(),
                    guard: guard.clone(),
                },
                Transition {
                    name: "stay".to_string(),
                    from: "s1".to_string(),
                    to: "s1".to_string(),
                    guard,
                },
            ],
        })
    }

    fn membership(strict: bool) -> RelaxedMembership<Measurement, AutomatonSemantics> {
        let trace = TraceSemantics::new(|last: &Measurement, current: &Measurement| {
            Duration::from_secs(current.index().saturating_sub(last.index()))
        });
        RelaxedMembership::with_mode(trace, positive_spec(), strict)
    }

    fn drive(
        sli: &RelaxedMembership<Measurement, AutomatonSemantics>,
        values: &[f64],
    ) -> (Vec<Verdict>, MembershipConfig<Measurement, String>) {
        let mut config = sli.initial().expect("spec has an initial state");
        let mut verdicts = Vec::new();
        for (i, v) in values.iter().enumerate() {
            let input = meas(i as u64, *v);
            let action = sli.actions(&input, &config).expect("action present");
            let (verdict, next) = sli.execute(&action, &input, &config).expect("executes");
            verdicts.push(verdict);
            config = next;
        }
        (verdicts, config)
    }

    fn states(config: &MembershipConfig<Measurement, String>) -> Vec<String> {
        let mut states: Vec<String> = config.spec.iter().cloned().collect();
        states.sort();
        states
    }

    #[test]
    fn test_first_input_is_unconditionally_ok() {
        let sli = membership(false);
        let (verdicts, config) = drive(&sli, &[-100.0]);
        assert_eq!(verdicts, vec![Verdict::Ok]);
        // Spec configs untouched by the bootstrapping input.
        assert_eq!(states(&config), vec!["s0".to_string()]);
    }

    #[test]
    fn test_relaxed_conformance() {
        // v = 1, 2, 3 from s0: OK, OK, OK; final configs = {s1}.
        let sli = membership(false);
        let (verdicts, config) = drive(&sli, &[1.0, 2.0, 3.0]);
        assert_eq!(verdicts, vec![Verdict::Ok, Verdict::Ok, Verdict::Ok]);
        assert_eq!(states(&config), vec!["s1".to_string()]);
    }

    #[test]
    fn test_relaxed_recovery_after_fail() {
        // v = 1, -1, 2: OK, FAIL, OK. The FAIL preserves the live
        // configs, so the stream recovers.
        let sli = membership(false);
        let (verdicts, config) = drive(&sli, &[1.0, -1.0, 2.0]);
        assert_eq!(verdicts, vec![Verdict::Ok, Verdict::Fail, Verdict::Ok]);
        assert_eq!(states(&config), vec!["s1".to_string()]);
    }

    #[test]
    fn test_strict_poisoning() {
        // Same inputs in strict mode: OK, FAIL, FAIL; configs empty after
        // the first violation.
        let sli = membership(true);
        let (verdicts, config) = drive(&sli, &[1.0, -1.0, 2.0]);
        assert_eq!(verdicts, vec![Verdict::Ok, Verdict::Fail, Verdict::Fail]);
        assert!(config.spec.is_empty());
    }

    #[test]
    fn test_strict_fail_never_converts_back_to_ok() {
        let sli = membership(true);
        let (verdicts, _) = drive(&sli, &[1.0, -1.0, 2.0, 3.0, 4.0]);
        assert_eq!(verdicts[0], Verdict::Ok);
        assert!(verdicts[1..].iter().all(|v| *v == Verdict::Fail));
    }

    #[test]
    fn test_no_initial_spec_config_cannot_start() {
        let trace = TraceSemantics::new(|_: &Measurement, _: &Measurement| Duration::ZERO);
        let spec = AutomatonSemantics::new(Automaton {
            name: "empty".to_string(),
            states: vec!["s0".to_string()],
            initial: Vec::new(),
            transitions: Vec::new(),
        });
        let sli = RelaxedMembership::new(trace, spec);
        assert!(sli.initial().is_none());
    }
}
