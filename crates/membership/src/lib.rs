//! Trace Membership
//!
//! Decides, step by step, whether a measurement stream stays consistent
//! with a specification. The specification is any nondeterministic
//! semantics over steps; the reference provider is a finite-state
//! automaton with guarded transitions.

pub mod automaton;
pub mod relaxed;

pub use automaton::{
    Automaton, AutomatonSemantics, Comparison, Condition, Guard, SpecError, Transition,
};
pub use relaxed::{CheckStep, MembershipConfig, RelaxedMembership, Verdict};
