//! Semantics contracts

/// Deterministic, effect-free step function over inputs `I`, outputs `O`,
/// actions `A` and configurations `C` (all associated types).
///
/// Implementations must be pure: identical `(input, config)` pairs yield
/// identical results, with no hidden state and no I/O. Returning `None`
/// from any operation halts the driver without error.
///
/// Inputs are always present: the sequencer stops on end-of-stream before
/// consulting the semantics, so `actions` and `execute` never see a
/// missing input.
pub trait DeterministicSemantics {
    type Input;
    type Output;
    type Action;
    type Config;

    /// Configuration before any input is processed. `None` means the
    /// system cannot start.
    fn initial(&self) -> Option<Self::Config>;

    /// Select the single action to perform for this input.
    fn actions(&self, input: &Self::Input, config: &Self::Config) -> Option<Self::Action>;

    /// Perform the action, producing an output and the next configuration.
    fn execute(
        &self,
        action: &Self::Action,
        input: &Self::Input,
        config: &Self::Config,
    ) -> Option<(Self::Output, Self::Config)>;
}

/// Nondeterministic counterpart of [`DeterministicSemantics`]: every
/// operation returns all possibilities instead of at most one. Used for
/// the underlying specification semantics, where several transitions may
/// be enabled at once.
pub trait Semantics {
    type Input;
    type Output;
    type Action;
    type Config;

    /// All configurations the system may start in.
    fn initial(&self) -> Vec<Self::Config>;

    /// All actions enabled for this input in this configuration.
    fn actions(&self, input: &Self::Input, config: &Self::Config) -> Vec<Self::Action>;

    /// All `(output, next configuration)` results of performing the action.
    fn execute(
        &self,
        action: &Self::Action,
        input: &Self::Input,
        config: &Self::Config,
    ) -> Vec<(Self::Output, Self::Config)>;
}
