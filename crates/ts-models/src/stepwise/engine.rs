//! The greedy stepwise selection loop
//!
//! Each step first tries to add the best-scoring legal candidate; if none
//! qualifies against the enter threshold, it tries to remove the
//! least-harmful legal candidate; if neither direction qualifies the
//! session terminates. Candidate generation, anti-cycling, and hierarchy
//! constraints live in `ts-core`; scoring lives in
//! [`Criterion`](crate::stepwise::Criterion).

use ndarray::Array2;
use serde::{Deserialize, Serialize};

use ts_core::term::{candidates_to_add, candidates_to_remove, sort_terms};
use ts_core::{Term, TermSet};

use crate::base::{FitOracle, FitStatistics, Result};
use crate::error::StepwiseError;
use crate::stepwise::criterion::{Criterion, StepReport};
use crate::stepwise::history::{Action, History, HistoryEntry};
use crate::stepwise::observer::{Direction, StepEvent, StepObserver};
use crate::stepwise::redundancy::{is_redundant, orthonormal_basis};
use crate::stepwise::StepwiseConfig;

// ==================== Bounds ====================

/// Lower and upper bounds of the search
///
/// The lower set must remain in every candidate model; the upper set is the
/// universe of terms ever considered. The discipline
/// `lower ⊆ current ⊆ upper` is assumed by the loop rather than enforced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    lower: TermSet,
    upper: TermSet,
}

impl Bounds {
    /// Create bounds, canonicalizing both sets
    pub fn new(lower: TermSet, upper: TermSet) -> Result<Self> {
        lower.check_width(&upper)?;
        let (lower, _) = sort_terms(&lower);
        let (upper, _) = sort_terms(&upper);
        Ok(Self { lower, upper })
    }

    /// Terms that must remain in every model
    pub fn lower(&self) -> &TermSet {
        &self.lower
    }

    /// Universe of terms ever considered
    pub fn upper(&self) -> &TermSet {
        &self.upper
    }
}

// ==================== Step outcomes ====================

/// Result of one stepwise step
#[derive(Debug, Clone, PartialEq)]
pub enum StepOutcome {
    /// A term entered the model
    Added {
        /// Name of the added term
        term: String,
        /// Criterion score the add committed on
        score: f64,
    },
    /// A term left the model
    Removed {
        /// Name of the removed term
        term: String,
        /// Criterion score the removal committed on (NaN for a non-nested
        /// comparison)
        score: f64,
    },
    /// Neither direction qualified; the search is finished
    NoChange,
}

/// Best candidate tracked during one evaluation round
struct Candidate {
    term: Term,
    name: String,
    set: TermSet,
    fit: FitStatistics,
    score: f64,
    report: StepReport,
}

// ==================== Session ====================

/// A stepwise selection session
///
/// Owns the current term set and fit, the bounds, the resolved criterion
/// and thresholds, and the append-only history. Repeated [`run`] calls on
/// the same session extend the history rather than restart it.
///
/// [`run`]: Stepwise::run
#[derive(Debug)]
pub struct Stepwise {
    current: TermSet,
    fitted: Option<FitStatistics>,
    bounds: Bounds,
    criterion: Criterion,
    enter: f64,
    remove: f64,
    max_steps: Option<usize>,
    history: History,
    just_added: Option<Term>,
    just_removed: Option<Term>,
}

impl Stepwise {
    /// Create a session
    ///
    /// Configuration is validated eagerly: threshold ordering violations
    /// and width mismatches fail here, before any model is fitted, so no
    /// partial state is ever produced.
    pub fn new(start: TermSet, bounds: Bounds, config: StepwiseConfig) -> Result<Self> {
        start.check_width(bounds.upper())?;

        let enter = config
            .enter
            .unwrap_or_else(|| config.criterion.default_enter());
        let remove = config
            .remove
            .unwrap_or_else(|| config.criterion.default_remove());
        config.criterion.validate_thresholds(enter, remove)?;

        let (current, _) = sort_terms(&start);

        Ok(Self {
            current,
            fitted: None,
            bounds,
            criterion: config.criterion,
            enter,
            remove,
            max_steps: config.max_steps,
            history: History::new(),
            just_added: None,
            just_removed: None,
        })
    }

    /// Current term set
    pub fn terms(&self) -> &TermSet {
        &self.current
    }

    /// Statistics of the current fit, once the initial fit has happened
    pub fn fit_statistics(&self) -> Option<FitStatistics> {
        self.fitted
    }

    /// Session history
    pub fn history(&self) -> &History {
        &self.history
    }

    /// Active criterion
    pub fn criterion(&self) -> &Criterion {
        &self.criterion
    }

    /// Resolved (enter, remove) thresholds
    pub fn thresholds(&self) -> (f64, f64) {
        (self.enter, self.remove)
    }

    /// Search bounds
    pub fn bounds(&self) -> &Bounds {
        &self.bounds
    }

    /// Run steps until no change qualifies or the step budget is exhausted
    ///
    /// The budget applies per call: a second call gets a fresh budget and
    /// extends the same history. Oracle errors propagate immediately; the
    /// session keeps every step committed before the failure.
    pub fn run<O: FitOracle>(&mut self, oracle: &O, observer: &mut dyn StepObserver) -> Result<()> {
        let mut remaining = self.max_steps;
        loop {
            if remaining == Some(0) {
                observer.on_event(&StepEvent::SessionEnded {
                    reason: "step budget exhausted",
                });
                return Ok(());
            }
            match self.step(oracle, observer)? {
                StepOutcome::NoChange => {
                    observer.on_event(&StepEvent::SessionEnded {
                        reason: "no qualifying candidates",
                    });
                    return Ok(());
                }
                _ => {
                    if let Some(r) = remaining.as_mut() {
                        *r -= 1;
                    }
                }
            }
        }
    }

    /// Execute a single step: try an add, then a remove, else no change
    pub fn step<O: FitOracle>(
        &mut self,
        oracle: &O,
        observer: &mut dyn StepObserver,
    ) -> Result<StepOutcome> {
        let current_fit = self.ensure_fitted(oracle)?;

        if let Some(outcome) = self.try_add(oracle, observer, current_fit)? {
            return Ok(outcome);
        }
        if let Some(outcome) = self.try_remove(oracle, observer, current_fit)? {
            return Ok(outcome);
        }
        Ok(StepOutcome::NoChange)
    }

    /// Fit the starting model and record the `Start` entry, exactly once
    fn ensure_fitted<O: FitOracle>(&mut self, oracle: &O) -> Result<FitStatistics> {
        if let Some(fit) = self.fitted {
            return Ok(fit);
        }
        let fit = oracle.fit(&self.current)?;
        self.history.push(HistoryEntry {
            action: Action::Start,
            term: String::new(),
            terms: self.current.to_string(),
            n_coefficients: fit.n_coefficients,
            df_change: 0.0,
            report: None,
        });
        self.fitted = Some(fit);
        Ok(fit)
    }

    /// Evaluate add candidates; commit the best if it qualifies
    fn try_add<O: FitOracle>(
        &mut self,
        oracle: &O,
        observer: &mut dyn StepObserver,
        current_fit: FitStatistics,
    ) -> Result<Option<StepOutcome>> {
        let candidates =
            candidates_to_add(&self.current, self.bounds.upper(), self.just_removed.as_ref())?;
        if candidates.is_empty() {
            return Ok(None);
        }

        // One basis for the whole round; an empty design spans nothing.
        let basis: Option<Array2<f64>> = if self.current.is_empty() {
            None
        } else {
            Some(orthonormal_basis(&oracle.design_columns(&self.current)?)?)
        };

        let mut best: Option<Candidate> = None;
        for &index in &candidates {
            let term = self.bounds.upper().term(index);
            let name = self.bounds.upper().term_name(index);

            if let Some(q) = &basis {
                let singleton = TermSet::from_terms(
                    std::slice::from_ref(&term),
                    &variable_strs(self.bounds.upper()),
                )?;
                let columns = oracle.design_columns(&singleton)?;
                if is_redundant(q.view(), columns.view()) {
                    observer.on_event(&StepEvent::CandidateSkipped {
                        term: &name,
                        reason: "linearly dependent on current design",
                    });
                    continue;
                }
            }

            let (set, _) = self.current.with_term(&term)?;
            let fit = oracle.fit(&set)?;
            let (score, report) = self.criterion.score(&current_fit, &fit)?;
            observer.on_event(&StepEvent::CandidateEvaluated {
                direction: Direction::Add,
                term: &name,
                score,
                report,
            });

            let improves = match &best {
                None => true,
                Some(b) => self.criterion.better_add(score, b.score),
            };
            if improves {
                best = Some(Candidate {
                    term,
                    name,
                    set,
                    fit,
                    score,
                    report,
                });
            }
        }

        match best {
            Some(b) if self.criterion.qualifies_enter(b.score, self.enter) => {
                let outcome = StepOutcome::Added {
                    term: b.name.clone(),
                    score: b.score,
                };
                self.commit(Action::Add, b, current_fit, observer);
                Ok(Some(outcome))
            }
            _ => Ok(None),
        }
    }

    /// Evaluate remove candidates; commit the least harmful if it qualifies
    fn try_remove<O: FitOracle>(
        &mut self,
        oracle: &O,
        observer: &mut dyn StepObserver,
        current_fit: FitStatistics,
    ) -> Result<Option<StepOutcome>> {
        let candidates =
            candidates_to_remove(&self.current, self.bounds.lower(), self.just_added.as_ref())?;
        if candidates.is_empty() {
            return Ok(None);
        }

        let mut best: Option<Candidate> = None;
        for &index in &candidates {
            let term = self.current.term(index);
            let name = self.current.term_name(index);
            let set = self.current.without_term(index)?;
            let fit = oracle.fit(&set)?;
            let (score, report) = self.criterion.score(&fit, &current_fit)?;
            observer.on_event(&StepEvent::CandidateEvaluated {
                direction: Direction::Remove,
                term: &name,
                score,
                report,
            });

            // An undefined statistic marks a non-nested comparison: remove
            // this term now, without scanning the rest.
            if score.is_nan() {
                best = Some(Candidate {
                    term,
                    name,
                    set,
                    fit,
                    score,
                    report,
                });
                break;
            }

            let improves = match &best {
                None => true,
                Some(b) => self.criterion.better_remove(score, b.score),
            };
            if improves {
                best = Some(Candidate {
                    term,
                    name,
                    set,
                    fit,
                    score,
                    report,
                });
            }
        }

        match best {
            Some(b) if self.criterion.qualifies_remove(b.score, self.remove) => {
                let outcome = StepOutcome::Removed {
                    term: b.name.clone(),
                    score: b.score,
                };
                self.commit(Action::Remove, b, current_fit, observer);
                Ok(Some(outcome))
            }
            _ => Ok(None),
        }
    }

    /// Commit a chosen candidate: history, anti-cycling memory, state
    fn commit(
        &mut self,
        action: Action,
        candidate: Candidate,
        current_fit: FitStatistics,
        observer: &mut dyn StepObserver,
    ) {
        let entry = HistoryEntry {
            action,
            term: candidate.name,
            terms: candidate.set.to_string(),
            n_coefficients: candidate.fit.n_coefficients,
            df_change: candidate.fit.dfe - current_fit.dfe,
            report: Some(candidate.report),
        };
        observer.on_event(&StepEvent::StepCommitted { entry: &entry });
        self.history.push(entry);

        match action {
            Action::Add => {
                self.just_added = Some(candidate.term);
                self.just_removed = None;
            }
            Action::Remove => {
                self.just_removed = Some(candidate.term);
                self.just_added = None;
            }
            Action::Start => {}
        }

        self.current = candidate.set;
        self.fitted = Some(candidate.fit);
    }
}

/// Variable names of a term set as `&str` slices
fn variable_strs(terms: &TermSet) -> Vec<&str> {
    terms.variables().iter().map(String::as_str).collect()
}
