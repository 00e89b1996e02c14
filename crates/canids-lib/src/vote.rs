//! Majority-vote aggregation over discrete labels
//!
//! Ties are broken in favour of the lowest label value, so the result
//! depends only on the multiset of labels and never on their order.

use crate::error::EmptyInputError;
use crate::models::Label;
use std::collections::BTreeMap;

/// Return the most frequent label, lowest value winning ties
pub fn majority_vote(labels: &[Label]) -> Result<Label, EmptyInputError> {
    let mut counts: BTreeMap<Label, usize> = BTreeMap::new();
    for &label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }

    // Ascending key order + strict comparison keeps the lowest label on ties
    let mut best: Option<(Label, usize)> = None;
    for (label, count) in counts {
        match best {
            Some((_, best_count)) if count <= best_count => {}
            _ => best = Some((label, count)),
        }
    }

    best.map(|(label, _)| label).ok_or(EmptyInputError)
}
