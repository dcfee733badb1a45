//! Guarded Finite-State Automaton
//!
//! The reference specification provider: states connected by transitions
//! whose guards are evaluated against the current measurement of each
//! step. Loadable from JSON.

use std::fs;
use std::path::Path;

use measurement::Measurement;
use semantics::{Semantics, Step};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors while loading or validating an automaton definition.
#[derive(Debug, Error)]
pub enum SpecError {
    #[error("failed to read automaton file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse automaton: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("automaton has no states")]
    NoStates,

    #[error("transition '{transition}' references unknown state '{state}'")]
    UnknownState { transition: String, state: String },

    #[error("initial state '{0}' is not in the state set")]
    UnknownInitialState(String),
}

/// Comparison operator of a guard condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    #[serde(rename = "<")]
    Less,
    #[serde(rename = "<=")]
    LessEq,
    #[serde(rename = ">")]
    Greater,
    #[serde(rename = ">=")]
    GreaterEq,
    #[serde(rename = "==")]
    Eq,
    #[serde(rename = "!=")]
    NotEq,
}

impl Comparison {
    fn holds(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Less => lhs < rhs,
            Comparison::LessEq => lhs <= rhs,
            Comparison::Greater => lhs > rhs,
            Comparison::GreaterEq => lhs >= rhs,
            Comparison::Eq => lhs == rhs,
            Comparison::NotEq => lhs != rhs,
        }
    }
}

/// Single guard condition `column op value`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub column: String,
    pub op: Comparison,
    pub value: f64,
}

impl Condition {
    /// Evaluate against a measurement. A missing or non-numeric column
    /// fails closed.
    pub fn holds(&self, measurement: &Measurement) -> bool {
        match measurement.get_f64(&self.column) {
            Some(observed) => self.op.holds(observed, self.value),
            None => false,
        }
    }
}

/// Conjunction of conditions. An empty guard always holds.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Guard(pub Vec<Condition>);

impl Guard {
    pub fn holds(&self, measurement: &Measurement) -> bool {
        self.0.iter().all(|condition| condition.holds(measurement))
    }
}

/// Guarded transition between two states.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub name: String,
    pub from: String,
    pub to: String,
    #[serde(default)]
    pub guard: Guard,
}

/// Finite-state automaton with guarded transitions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Automaton {
    pub name: String,
    pub states: Vec<String>,
    pub initial: Vec<String>,
    pub transitions: Vec<Transition>,
}

impl Automaton {
    /// Load and validate an automaton from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, SpecError> {
        let text = fs::read_to_string(path)?;
        let automaton: Automaton = serde_json::from_str(&text)?;
        automaton.validate()?;
        Ok(automaton)
    }

    /// Check referential integrity of states and transitions.
    pub fn validate(&self) -> Result<(), SpecError> {
        if self.states.is_empty() {
            return Err(SpecError::NoStates);
        }
        for state in &self.initial {
            if !self.states.contains(state) {
                return Err(SpecError::UnknownInitialState(state.clone()));
            }
        }
        for transition in &self.transitions {
            for state in [&transition.from, &transition.to] {
                if !self.states.contains(state) {
                    return Err(SpecError::UnknownState {
                        transition: transition.name.clone(),
                        state: state.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Transitions leaving the given state.
    pub fn transitions_from<'a>(&'a self, state: &'a str) -> impl Iterator<Item = &'a Transition> {
        self.transitions
            .iter()
            .filter(move |transition| transition.from == state)
    }
}

/// Nondeterministic semantics over steps, backed by a guarded automaton.
///
/// Configurations are state names; an action is an enabled transition.
/// Guards are evaluated against the *current* measurement of the step.
pub struct AutomatonSemantics {
    automaton: Automaton,
}

impl AutomatonSemantics {
    pub fn new(automaton: Automaton) -> Self {
        Self { automaton }
    }

    pub fn automaton(&self) -> &Automaton {
        &self.automaton
    }
}

impl Semantics for AutomatonSemantics {
    type Input = Step<Measurement>;
    type Output = String;
    type Action = Transition;
    type Config = String;

    fn initial(&self) -> Vec<String> {
        self.automaton.initial.clone()
    }

    fn actions(&self, step: &Step<Measurement>, state: &String) -> Vec<Transition> {
        self.automaton
            .transitions_from(state)
            .filter(|transition| transition.guard.holds(&step.current))
            .cloned()
            .collect()
    }

    fn execute(
        &self,
        action: &Transition,
        _step: &Step<Measurement>,
        _state: &String,
    ) -> Vec<(String, String)> {
        vec![(action.to.clone(), action.to.clone())]
    }
}
