//! Trace steps

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Two consecutive measurements annotated with the duration between them.
///
/// Produced only when a second measurement arrives after a first; the
/// first measurement of a trace never produces a step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step<M> {
    /// The earlier measurement.
    pub last: M,
    /// Non-negative time between `last` and `current`.
    pub duration: Duration,
    /// The later measurement.
    pub current: M,
}

impl<M> Step<M> {
    pub fn new(last: M, duration: Duration, current: M) -> Self {
        Self {
            last,
            duration,
            current,
        }
    }
}
