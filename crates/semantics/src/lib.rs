//! I/O Semantics
//!
//! The deterministic and nondeterministic step-function contracts the
//! sequencer drives, the `Step` record, and the trace semantics that
//! pairs successive measurements into timestamped steps.

pub mod contract;
pub mod step;
pub mod trace;

pub use contract::{DeterministicSemantics, Semantics};
pub use step::Step;
pub use trace::{DurationFn, RecordStep, TraceSemantics};
