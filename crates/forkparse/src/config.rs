//! Configuration for parsers

#[cfg(feature = "serialize")]
use serde::{Deserialize, Serialize};

/// How parse attempts are scheduled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
pub enum ExecutionStrategy {
    /// Advance all attempts one step at a time on the calling thread.
    /// Among several valid parses, the one completing in the fewest steps wins.
    #[default]
    Sequential,
    /// Run every attempt as a task on a thread pool; `threads == 0` uses
    /// rayon's global pool. Falls back to [`Sequential`](Self::Sequential)
    /// when the `parallel` feature is disabled.
    Concurrent { threads: usize },
}

impl ExecutionStrategy {
    /// Concurrent execution on rayon's global pool
    #[must_use]
    pub const fn concurrent() -> Self {
        Self::Concurrent { threads: 0 }
    }
}

/// Configuration options for a [`Parser`](crate::Parser)
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serialize", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serialize", serde(default))]
pub struct ParserConfig {
    /// Scheduling of parse attempts
    pub strategy: ExecutionStrategy,

    /// Splice the branches of non-terminals generated while simplifying the
    /// grammar into their parents before running the other processors
    pub unfold_synthetic: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            strategy: ExecutionStrategy::Sequential,
            unfold_synthetic: true,
        }
    }
}

impl ParserConfig {
    /// Create a new configuration with default settings
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the execution strategy
    #[must_use]
    pub const fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Enable or disable unfolding of generated non-terminals
    #[must_use]
    pub const fn with_unfold_synthetic(mut self, enabled: bool) -> Self {
        self.unfold_synthetic = enabled;
        self
    }
}
