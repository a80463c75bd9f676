//! Configuration for the symbolic execution engine.

/// Budgets and optional features of a [`SymbolicExecution`](crate::analysis::symbolic::SymbolicExecution) run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionConfig {
    /// Maximum number of exploded nodes expanded per procedure (default: 2000).
    pub max_steps: usize,

    /// Maximum number of times one program point is visited along one path (default: 2).
    pub max_operation_visits: u32,

    /// Forget dead locals and parameters on block transitions (default: true).
    pub live_variable_analysis: bool,

    /// Explore the paths on which operations inside `try` regions throw (default: true).
    pub track_exceptions: bool,
}

impl Default for ExecutionConfig {
    fn default() -> Self {
        Self {
            max_steps: 2000,
            max_operation_visits: 2,
            live_variable_analysis: true,
            track_exceptions: true,
        }
    }
}

impl ExecutionConfig {
    /// Creates a new configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a configuration for exhaustive exploration of small procedures.
    ///
    /// This configuration uses:
    /// - 10x the default step budget
    /// - Three visits per program point, so loops are unrolled once more
    #[must_use]
    pub fn thorough() -> Self {
        Self {
            max_steps: 20_000,
            max_operation_visits: 3,
            ..Self::default()
        }
    }

    /// Creates a configuration for quick processing of large code bases.
    ///
    /// This configuration uses:
    /// - A quarter of the default step budget
    /// - A single visit per program point
    /// - No exceptional paths
    #[must_use]
    pub fn fast() -> Self {
        Self {
            max_steps: 500,
            max_operation_visits: 1,
            track_exceptions: false,
            ..Self::default()
        }
    }

    /// Sets the step budget.
    #[must_use]
    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps;
        self
    }

    /// Sets the per-path visit budget of a program point.
    #[must_use]
    pub fn with_max_operation_visits(mut self, max_operation_visits: u32) -> Self {
        self.max_operation_visits = max_operation_visits;
        self
    }

    /// Enables or disables dead-variable cleanup.
    #[must_use]
    pub fn with_live_variable_analysis(mut self, enabled: bool) -> Self {
        self.live_variable_analysis = enabled;
        self
    }

    /// Enables or disables exceptional paths.
    #[must_use]
    pub fn with_track_exceptions(mut self, enabled: bool) -> Self {
        self.track_exceptions = enabled;
        self
    }
}
