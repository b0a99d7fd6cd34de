//! Step observers
//!
//! The engine reports progress through an injected observer instead of
//! writing to the console, so callers choose between silence, logging, and
//! capturing events in tests. Events are emitted immediately as they
//! occur, giving observable partial progress during a long run.

use crate::stepwise::criterion::StepReport;
use crate::stepwise::history::HistoryEntry;

/// Search direction of a candidate evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// Candidate considered for entry
    Add,
    /// Candidate considered for removal
    Remove,
}

/// Progress events emitted by the stepwise engine
#[derive(Debug)]
pub enum StepEvent<'a> {
    /// A candidate was fitted and scored
    CandidateEvaluated {
        /// Search direction
        direction: Direction,
        /// Candidate term name
        term: &'a str,
        /// Criterion score
        score: f64,
        /// Reported test values
        report: StepReport,
    },
    /// A candidate was skipped without fitting
    CandidateSkipped {
        /// Candidate term name
        term: &'a str,
        /// Why the candidate was skipped
        reason: &'a str,
    },
    /// A step was committed
    StepCommitted {
        /// The appended history entry
        entry: &'a HistoryEntry,
    },
    /// The run ended
    SessionEnded {
        /// Termination reason
        reason: &'a str,
    },
}

/// Receiver of engine progress events
pub trait StepObserver {
    /// Handle one event
    fn on_event(&mut self, event: &StepEvent<'_>);
}

/// Observer that discards all events
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl StepObserver for NullObserver {
    fn on_event(&mut self, _event: &StepEvent<'_>) {}
}

/// Observer forwarding events to the `log` facade
///
/// Verbosity 0 is silent, 1 logs each committed step and the termination
/// reason, 2 additionally logs every candidate evaluated or skipped.
#[derive(Debug, Clone, Copy)]
pub struct LogObserver {
    verbosity: u8,
}

impl LogObserver {
    /// Create a log observer with the given verbosity
    pub fn new(verbosity: u8) -> Self {
        Self { verbosity }
    }
}

impl StepObserver for LogObserver {
    fn on_event(&mut self, event: &StepEvent<'_>) {
        match event {
            StepEvent::CandidateEvaluated {
                direction,
                term,
                score,
                ..
            } if self.verbosity >= 2 => {
                log::debug!("{:?} candidate {}: score {:.6}", direction, term, score);
            }
            StepEvent::CandidateSkipped { term, reason } if self.verbosity >= 2 => {
                log::debug!("Skipped candidate {}: {}", term, reason);
            }
            StepEvent::StepCommitted { entry } if self.verbosity >= 1 => {
                log::info!(
                    "{} {} -> {} ({} coefficients)",
                    entry.action,
                    entry.term,
                    entry.terms,
                    entry.n_coefficients
                );
            }
            StepEvent::SessionEnded { reason } if self.verbosity >= 1 => {
                log::info!("Stepwise run ended: {}", reason);
            }
            _ => {}
        }
    }
}
