//! Append-only session history
//!
//! One entry per committed action, including the initial `Start`
//! pseudo-action. Entries are never mutated after being appended.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::stepwise::criterion::StepReport;

/// Kind of committed action
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    /// Initial model at session start
    Start,
    /// A term entered the model
    Add,
    /// A term left the model
    Remove,
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::Start => write!(f, "Start"),
            Action::Add => write!(f, "Add"),
            Action::Remove => write!(f, "Remove"),
        }
    }
}

/// One committed step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Action kind
    pub action: Action,
    /// Name of the term affected (empty for `Start`)
    pub term: String,
    /// Rendering of the resulting term set
    pub terms: String,
    /// Coefficient count of the resulting model
    pub n_coefficients: usize,
    /// Change in degrees of freedom for error (zero for `Start`)
    pub df_change: f64,
    /// Criterion-reported values for the committed comparison
    pub report: Option<StepReport>,
}

/// Append-only log of committed steps
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct History {
    entries: Vec<HistoryEntry>,
}

impl History {
    /// Create an empty history
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a committed entry
    pub fn push(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// All entries in commit order
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no entry has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over entries in commit order
    pub fn iter(&self) -> impl Iterator<Item = &HistoryEntry> {
        self.entries.iter()
    }
}

impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<5} {:<7} {:<16} {:>6} {:>8}  {}",
            "Step", "Action", "Term", "Coefs", "dDF", "Report"
        )?;
        for (i, entry) in self.entries.iter().enumerate() {
            let report = match entry.report {
                Some(StepReport::FTest { f: stat, p_value }) => {
                    format!("F = {:.4}, p = {:.4}", stat, p_value)
                }
                Some(StepReport::ChiSquare { chi2, p_value }) => {
                    format!("chi2 = {:.4}, p = {:.4}", chi2, p_value)
                }
                Some(StepReport::Delta { delta }) => format!("delta = {:.4}", delta),
                None => String::new(),
            };
            writeln!(
                f,
                "{:<5} {:<7} {:<16} {:>6} {:>8.1}  {}",
                i, entry.action, entry.term, entry.n_coefficients, entry.df_change, report
            )?;
        }
        Ok(())
    }
}
