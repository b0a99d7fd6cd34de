//! Stepwise term selection
//!
//! This module provides the greedy stepwise search over term sets:
//! - candidate scoring criteria (F-test, chi-square, AIC/BIC, R²),
//! - QR-based redundancy detection,
//! - the session state machine with append-only history,
//! - progress observers,
//! - a least-squares fit oracle.

pub mod criterion;
pub mod engine;
pub mod history;
pub mod observer;
pub mod oracle;
pub mod redundancy;

#[cfg(test)]
mod tests;

// Re-exports
pub use criterion::{Criterion, Polarity, ScoreFn, StepReport};
pub use engine::{Bounds, StepOutcome, Stepwise};
pub use history::{Action, History, HistoryEntry};
pub use observer::{Direction, LogObserver, NullObserver, StepEvent, StepObserver};
pub use oracle::LeastSquaresOracle;
pub use redundancy::{is_redundant, orthonormal_basis};

use ts_core::TermSet;

use crate::base::{FitOracle, Result};

/// Stepwise session configuration
#[derive(Debug, Clone)]
pub struct StepwiseConfig {
    /// Selection criterion
    pub criterion: Criterion,
    /// Enter threshold override (criterion default when `None`)
    pub enter: Option<f64>,
    /// Remove threshold override (criterion default when `None`)
    pub remove: Option<f64>,
    /// Step budget per run (`None` = unbounded)
    pub max_steps: Option<usize>,
    /// Verbosity for the convenience entry point: 0 silent, 1 commits,
    /// 2 every candidate
    pub verbosity: u8,
}

impl Default for StepwiseConfig {
    fn default() -> Self {
        Self {
            criterion: Criterion::Sse,
            enter: None,
            remove: None,
            max_steps: None,
            verbosity: 0,
        }
    }
}

impl StepwiseConfig {
    /// Set the selection criterion
    pub fn criterion(mut self, criterion: Criterion) -> Self {
        self.criterion = criterion;
        self
    }

    /// Override the enter threshold
    pub fn enter(mut self, enter: f64) -> Self {
        self.enter = Some(enter);
        self
    }

    /// Override the remove threshold
    pub fn remove(mut self, remove: f64) -> Self {
        self.remove = Some(remove);
        self
    }

    /// Limit the number of committed steps per run
    pub fn max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = Some(max_steps);
        self
    }

    /// Set the verbosity level
    pub fn verbosity(mut self, verbosity: u8) -> Self {
        self.verbosity = verbosity;
        self
    }
}

/// Convenience function: run a stepwise session to termination
///
/// Logs through the `log` facade at the configured verbosity.
pub fn stepwise<O: FitOracle>(
    start: TermSet,
    bounds: Bounds,
    config: StepwiseConfig,
    oracle: &O,
) -> Result<Stepwise> {
    let verbosity = config.verbosity;
    let mut session = Stepwise::new(start, bounds, config)?;
    if verbosity > 0 {
        let mut observer = LogObserver::new(verbosity);
        session.run(oracle, &mut observer)?;
    } else {
        let mut observer = NullObserver;
        session.run(oracle, &mut observer)?;
    }
    Ok(session)
}
