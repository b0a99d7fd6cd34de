//! Hierarchy-constrained candidate filters
//!
//! These filters decide which terms are legal to add to or remove from a
//! model under the hierarchy constraint: a higher-order term cannot be
//! offered for addition while a lower-order building block of it is itself
//! still waiting to be added, and a term cannot be offered for removal
//! while a superterm in the model depends on it. Both filters also exclude
//! the term toggled on the previous step, preventing add/remove cycles.
//!
//! Bounds discipline (lower ⊆ current ⊆ upper) is assumed by the stepwise
//! loop, not enforced here.

use indexmap::IndexSet;
use std::cmp::Reverse;

use crate::term::{Term, TermSet};
use crate::Result;

/// Terms of `upper` that may legally be added to `current`
///
/// Returns row indices into `upper`, in ascending row order. A term
/// qualifies when it is absent from `current`, is not the term removed on
/// the previous step, and (if its order exceeds 1) no other surviving
/// candidate is a proper subterm of it. The elimination runs to a fixed
/// point over candidates scanned by ascending order, so a chain like
/// `x1, x1^2, x1^3` is offered one rung at a time. Intercept and order-1
/// terms are always eligible.
pub fn candidates_to_add(
    current: &TermSet,
    upper: &TermSet,
    just_removed: Option<&Term>,
) -> Result<IndexSet<usize>> {
    current.check_width(upper)?;

    let candidates: Vec<usize> = (0..upper.n_terms())
        .filter(|&i| {
            let term = upper.term(i);
            !current.contains(&term) && just_removed != Some(&term)
        })
        .collect();

    // Scan positions by ascending term order; stable sort keeps row order
    // within equal orders.
    let mut scan: Vec<usize> = (0..candidates.len()).collect();
    scan.sort_by_key(|&p| upper.term(candidates[p]).order());

    let mut disqualified = vec![false; candidates.len()];
    loop {
        let mut changed = false;
        for &p in &scan {
            if disqualified[p] {
                continue;
            }
            let term = upper.term(candidates[p]);
            if term.order() <= 1 {
                continue;
            }
            let blocked = scan.iter().any(|&q| {
                if q == p || disqualified[q] {
                    return false;
                }
                let other = upper.term(candidates[q]);
                other.order() >= 1 && other.is_proper_subterm_of(&term)
            });
            if blocked {
                disqualified[p] = true;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }

    Ok(candidates
        .iter()
        .enumerate()
        .filter(|&(p, _)| !disqualified[p])
        .map(|(_, &i)| i)
        .collect())
}

/// Terms of `current` that may legally be removed
///
/// Returns row indices into `current`, in ascending row order. A term
/// qualifies when it is absent from `lower`, is not the term added on the
/// previous step, and is not a proper subterm of any other term still in
/// `current`. Elimination scans from the highest order downward.
pub fn candidates_to_remove(
    current: &TermSet,
    lower: &TermSet,
    just_added: Option<&Term>,
) -> Result<IndexSet<usize>> {
    current.check_width(lower)?;

    let candidates: Vec<usize> = (0..current.n_terms())
        .filter(|&i| {
            let term = current.term(i);
            !lower.contains(&term) && just_added != Some(&term)
        })
        .collect();

    let mut scan: Vec<usize> = (0..candidates.len()).collect();
    scan.sort_by_key(|&p| Reverse(current.term(candidates[p]).order()));

    let mut disqualified = vec![false; candidates.len()];
    for &p in &scan {
        let term = current.term(candidates[p]);
        let blocked = (0..current.n_terms())
            .any(|j| j != candidates[p] && term.is_proper_subterm_of(&current.term(j)));
        if blocked {
            disqualified[p] = true;
        }
    }

    Ok(candidates
        .iter()
        .enumerate()
        .filter(|&(p, _)| !disqualified[p])
        .map(|(_, &i)| i)
        .collect())
}
