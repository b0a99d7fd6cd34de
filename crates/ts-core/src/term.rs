//! Terms and term sets
//!
//! A term is a monomial or interaction over a fixed list of variables,
//! stored as one non-negative integer exponent per variable. A term set is
//! an ordered collection of distinct terms sharing one variable list; it
//! describes the columns of a model's design matrix.

use ndarray::{Array1, Array2, ArrayView1};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::TermError;
use crate::Result;

mod hierarchy;
mod ordering;


pub use hierarchy::{candidates_to_add, candidates_to_remove};
pub use ordering::sort_terms;

// ==================== Term ====================

/// A single model term: one exponent per variable
///
/// An all-zero term is the intercept; a single exponent of 1 is a main
/// effect; multiple nonzero exponents denote an interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Term {
    exponents: Array1<u32>,
}

impl Term {
    /// Create a term from its exponent vector
    pub fn new(exponents: Array1<u32>) -> Self {
        Self { exponents }
    }

    /// Create a term from a slice of exponents
    pub fn from_slice(exponents: &[u32]) -> Self {
        Self {
            exponents: Array1::from_vec(exponents.to_vec()),
        }
    }

    /// The intercept term over `n_variables` variables
    pub fn intercept(n_variables: usize) -> Self {
        Self {
            exponents: Array1::zeros(n_variables),
        }
    }

    /// The main effect of a single variable
    pub fn linear(variable: usize, n_variables: usize) -> Self {
        let mut exponents = Array1::zeros(n_variables);
        exponents[variable] = 1;
        Self { exponents }
    }

    /// View of the exponent vector
    pub fn exponents(&self) -> ArrayView1<'_, u32> {
        self.exponents.view()
    }

    /// Number of variables this term is defined over
    pub fn n_variables(&self) -> usize {
        self.exponents.len()
    }

    /// Total order: the sum of all exponents
    pub fn order(&self) -> u32 {
        self.exponents.sum()
    }

    /// Degree: the largest single exponent
    pub fn degree(&self) -> u32 {
        self.exponents.iter().copied().max().unwrap_or(0)
    }

    /// Whether this is the intercept (all exponents zero)
    pub fn is_intercept(&self) -> bool {
        self.exponents.iter().all(|&e| e == 0)
    }

    /// Whether every exponent of `self` is at most the matching exponent of
    /// `other`
    pub fn is_subterm_of(&self, other: &Term) -> bool {
        self.n_variables() == other.n_variables()
            && self
                .exponents
                .iter()
                .zip(other.exponents.iter())
                .all(|(&a, &b)| a <= b)
    }

    /// Whether `self` is a subterm of `other` and differs from it
    pub fn is_proper_subterm_of(&self, other: &Term) -> bool {
        self != other && self.is_subterm_of(other)
    }

    /// Render this term using the given variable names
    ///
    /// Examples: `(Intercept)`, `x1`, `x1^2`, `x1:x2`, `x1^2:x3`.
    pub fn name(&self, variables: &[String]) -> String {
        if self.is_intercept() {
            return "(Intercept)".to_string();
        }

        let parts: Vec<String> = self
            .exponents
            .iter()
            .enumerate()
            .filter(|(_, &e)| e > 0)
            .map(|(v, &e)| {
                let var = variables
                    .get(v)
                    .cloned()
                    .unwrap_or_else(|| format!("x{}", v + 1));
                if e == 1 { var } else { format!("{}^{}", var, e) }
            })
            .collect();

        parts.join(":")
    }
}

// ==================== TermSet ====================

/// An ordered collection of distinct terms over a shared variable list
///
/// Rows of the exponent matrix are terms, columns are variables. After
/// canonicalization (see [`sort_terms`]) the rows are unique and sorted.
/// A set need not be coherent: it may contain a term without containing all
/// of that term's sub-terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TermSet {
    exponents: Array2<u32>,
    variables: Vec<String>,
}

impl TermSet {
    /// Create an empty term set over the given variables
    pub fn empty(variables: &[&str]) -> Self {
        Self {
            exponents: Array2::zeros((0, variables.len())),
            variables: variables.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Create a term set from exponent rows, canonicalizing the result
    pub fn from_rows(rows: &[Vec<u32>], variables: &[&str]) -> Result<Self> {
        let width = variables.len();
        for (i, row) in rows.iter().enumerate() {
            if row.len() != width {
                return Err(TermError::RaggedRows {
                    row: i,
                    expected: width,
                    actual: row.len(),
                });
            }
        }

        let mut exponents = Array2::zeros((rows.len(), width));
        for (i, row) in rows.iter().enumerate() {
            for (j, &e) in row.iter().enumerate() {
                exponents[(i, j)] = e;
            }
        }

        let raw = Self {
            exponents,
            variables: variables.iter().map(|s| s.to_string()).collect(),
        };
        let (sorted, _) = sort_terms(&raw);
        Ok(sorted)
    }

    /// Create a term set from terms, canonicalizing the result
    pub fn from_terms(terms: &[Term], variables: &[&str]) -> Result<Self> {
        let rows: Vec<Vec<u32>> = terms.iter().map(|t| t.exponents.to_vec()).collect();
        for (i, term) in terms.iter().enumerate() {
            if term.n_variables() != variables.len() {
                return Err(TermError::RaggedRows {
                    row: i,
                    expected: variables.len(),
                    actual: term.n_variables(),
                });
            }
        }
        Self::from_rows(&rows, variables)
    }

    /// Internal constructor from an already-consistent exponent matrix
    pub(crate) fn from_matrix(exponents: Array2<u32>, variables: Vec<String>) -> Self {
        Self {
            exponents,
            variables,
        }
    }

    /// Build a set without canonicalizing, for exercising `sort_terms`
    #[cfg(test)]
    pub(crate) fn from_rows_raw(rows: &[Vec<u32>], variables: &[&str]) -> Self {
        let width = variables.len();
        let mut exponents = Array2::zeros((rows.len(), width));
        for (i, row) in rows.iter().enumerate() {
            for (j, &e) in row.iter().enumerate() {
                exponents[(i, j)] = e;
            }
        }
        Self::from_matrix(exponents, variables.iter().map(|s| s.to_string()).collect())
    }

    /// Number of terms (rows)
    pub fn n_terms(&self) -> usize {
        self.exponents.nrows()
    }

    /// Whether the set contains no terms
    pub fn is_empty(&self) -> bool {
        self.n_terms() == 0
    }

    /// Number of variables (columns)
    pub fn n_variables(&self) -> usize {
        self.exponents.ncols()
    }

    /// Variable names, one per exponent column
    pub fn variables(&self) -> &[String] {
        &self.variables
    }

    /// The term at the given row
    pub fn term(&self, index: usize) -> Term {
        Term::new(self.exponents.row(index).to_owned())
    }

    /// Iterate over the terms in row order
    pub fn iter(&self) -> impl Iterator<Item = Term> + '_ {
        (0..self.n_terms()).map(|i| self.term(i))
    }

    /// Position of a term in this set, if present
    pub fn position(&self, term: &Term) -> Option<usize> {
        if term.n_variables() != self.n_variables() {
            return None;
        }
        (0..self.n_terms()).find(|&i| self.exponents.row(i) == term.exponents())
    }

    /// Whether this set contains the given term
    pub fn contains(&self, term: &Term) -> bool {
        self.position(term).is_some()
    }

    /// A new set with the given term inserted, plus the row index where the
    /// term landed after canonicalization
    ///
    /// Inserting a term that is already present returns an unchanged copy
    /// and the existing position.
    pub fn with_term(&self, term: &Term) -> Result<(TermSet, usize)> {
        if term.n_variables() != self.n_variables() {
            return Err(TermError::VariableMismatch {
                expected: self.n_variables(),
                actual: term.n_variables(),
            });
        }

        if let Some(position) = self.position(term) {
            return Ok((self.clone(), position));
        }

        let n = self.n_terms();
        let mut exponents = Array2::zeros((n + 1, self.n_variables()));
        for i in 0..n {
            exponents.row_mut(i).assign(&self.exponents.row(i));
        }
        exponents.row_mut(n).assign(&term.exponents());

        let appended = Self::from_matrix(exponents, self.variables.clone());
        let (sorted, permutation) = sort_terms(&appended);
        let position = permutation[n];
        Ok((sorted, position))
    }

    /// A new set with the term at the given row removed
    pub fn without_term(&self, index: usize) -> Result<TermSet> {
        if index >= self.n_terms() {
            return Err(TermError::IndexOutOfRange {
                index,
                len: self.n_terms(),
            });
        }

        let mut exponents = Array2::zeros((self.n_terms() - 1, self.n_variables()));
        let mut out = 0;
        for i in 0..self.n_terms() {
            if i == index {
                continue;
            }
            exponents.row_mut(out).assign(&self.exponents.row(i));
            out += 1;
        }

        Ok(Self::from_matrix(exponents, self.variables.clone()))
    }

    /// Render the term at the given row using this set's variable names
    pub fn term_name(&self, index: usize) -> String {
        self.term(index).name(&self.variables)
    }

    /// Check that another set is defined over the same number of variables
    pub fn check_width(&self, other: &TermSet) -> Result<()> {
        if self.n_variables() != other.n_variables() {
            return Err(TermError::VariableMismatch {
                expected: self.n_variables(),
                actual: other.n_variables(),
            });
        }
        Ok(())
    }
}

impl fmt::Display for TermSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "(none)");
        }
        for i in 0..self.n_terms() {
            if i > 0 {
                write!(f, " + ")?;
            }
            write!(f, "{}", self.term_name(i))?;
        }
        Ok(())
    }
}
