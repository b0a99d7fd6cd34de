//! Canonical term ordering
//!
//! Terms sort by ascending total order, then ascending maximum exponent,
//! then lexicographic comparison of the exponent rows read from the last
//! variable backwards, which keeps `x1` ahead of `x2` and `x1:x2` ahead of
//! `x2:x3`. The order is total: no two distinct terms compare equal.

use ndarray::Array2;
use std::cmp::Ordering;

use crate::term::TermSet;

/// Compare two exponent rows under the canonical ordering
fn term_cmp(a: &[u32], b: &[u32]) -> Ordering {
    let order_a: u32 = a.iter().sum();
    let order_b: u32 = b.iter().sum();
    let degree_a = a.iter().copied().max().unwrap_or(0);
    let degree_b = b.iter().copied().max().unwrap_or(0);

    order_a
        .cmp(&order_b)
        .then(degree_a.cmp(&degree_b))
        .then_with(|| a.iter().rev().cmp(b.iter().rev()))
}

/// Deduplicate and canonically sort a term set
///
/// Returns the sorted set together with the permutation mapping each input
/// row index to the position of its (representative) row in the output, so
/// callers can locate where a newly inserted term landed. Duplicate input
/// rows map to the position of the single surviving row. Sorting an
/// already-sorted set yields the identity permutation.
pub fn sort_terms(terms: &TermSet) -> (TermSet, Vec<usize>) {
    let n = terms.n_terms();
    let rows: Vec<Vec<u32>> = (0..n).map(|i| terms.term(i).exponents().to_vec()).collect();

    // First occurrences, with each input row pointing at its representative.
    let mut unique: Vec<usize> = Vec::new();
    let mut representative: Vec<usize> = Vec::with_capacity(n);
    for (i, row) in rows.iter().enumerate() {
        match unique.iter().position(|&u| &rows[u] == row) {
            Some(pos) => representative.push(pos),
            None => {
                unique.push(i);
                representative.push(unique.len() - 1);
            }
        }
    }

    let mut order: Vec<usize> = (0..unique.len()).collect();
    order.sort_by(|&a, &b| term_cmp(&rows[unique[a]], &rows[unique[b]]));

    // new_position[u] = where the u-th unique row ends up after sorting
    let mut new_position = vec![0usize; unique.len()];
    for (position, &u) in order.iter().enumerate() {
        new_position[u] = position;
    }

    let permutation: Vec<usize> = representative.iter().map(|&r| new_position[r]).collect();

    let width = terms.n_variables();
    let mut exponents = Array2::zeros((unique.len(), width));
    for (position, &u) in order.iter().enumerate() {
        for (j, &e) in rows[unique[u]].iter().enumerate() {
            exponents[(position, j)] = e;
        }
    }

    let sorted = TermSet::from_matrix(exponents, terms.variables().to_vec());
    (sorted, permutation)
}
