//! Cross-direction agreement and change-magnitude verification.
//!
//! Each backward candidate is checked against the forward set. An exact match
//! confirms the column. A forward hit two columns to the left confirms the
//! column in between, since the two scans can attribute one defect to
//! different members of a pair. A confirmed suspect is only promoted when its
//! correction would alter nearly every pixel of the column.
//!
//! Stripes on the first or last column of the scanned range are never
//! confirmed: the forward scan can't blame the first column and the backward
//! scan can't blame the last, so neither edge gets two votes.

use std::collections::BTreeMap;

use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

use crate::column_cache::ColumnCache;
use crate::regression::{self, Regression};
use crate::scanner::FaultCandidate;

/// Fraction of a column's pixels that must change for a suspect to be promoted.
pub const VERIFY_CHANGE_FRACTION: f64 = 0.99;

/// A column confirmed as defective, with the drift used to correct it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VerifiedFault {
    pub column: usize,
    pub gain: f64,
    pub bias: f64,
}

impl VerifiedFault {
    pub fn new(column: usize, gain: f64, bias: f64) -> Self {
        Self { column, gain, bias }
    }

    pub fn regression(&self) -> Regression {
        Regression {
            gain: self.gain,
            bias: self.bias,
        }
    }
}

/// Outcome of checking one suspect column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Faulty(usize),
    Correct(usize),
}

/// Merges both scans into the verified fault list, sorted by column.
pub fn resolve(
    forward: &[FaultCandidate],
    backward: &[FaultCandidate],
    cache: &ColumnCache,
) -> Vec<VerifiedFault> {
    resolve_with(forward, backward, cache, |_, _, _| {})
}

/// Like [`resolve`], calling `on_step(visited, total, decision)` once per
/// backward candidate. `decision` is `None` when the candidate had no
/// support from the forward scan.
pub fn resolve_with<F>(
    forward: &[FaultCandidate],
    backward: &[FaultCandidate],
    cache: &ColumnCache,
    mut on_step: F,
) -> Vec<VerifiedFault>
where
    F: FnMut(usize, usize, Option<Decision>),
{
    let forward_columns: HashSet<usize> = forward.iter().map(|c| c.column).collect();
    let mut verified: BTreeMap<usize, VerifiedFault> = BTreeMap::new();
    let total = backward.len();

    for (step, candidate) in backward.iter().enumerate() {
        let column = candidate.column;

        let decision = if forward_columns.contains(&column) {
            let reference = if column == 0 { 1 } else { column - 1 };
            Some(verify(
                cache,
                column,
                reference,
                Some(candidate.regression),
                &mut verified,
            ))
        } else if column >= 2 && forward_columns.contains(&(column - 2)) {
            Some(verify(cache, column - 1, column - 2, None, &mut verified))
        } else {
            tracing::trace!(column, "Backward candidate without forward support");
            None
        };

        on_step(step + 1, total, decision);
    }

    tracing::debug!(
        forward = forward.len(),
        backward = backward.len(),
        verified = verified.len(),
        "Consensus resolved"
    );

    verified.into_values().collect()
}

/// Refits `suspect` against `reference` and promotes it when the correction
/// would touch more than [`VERIFY_CHANGE_FRACTION`] of its pixels.
///
/// `carried` is the drift stored for the fault; the refit is used otherwise.
fn verify(
    cache: &ColumnCache,
    suspect: usize,
    reference: usize,
    carried: Option<Regression>,
    verified: &mut BTreeMap<usize, VerifiedFault>,
) -> Decision {
    let x = cache.column(suspect);
    let Some(refit) = regression::fit(x, cache.column(reference)) else {
        tracing::debug!(column = suspect, "Indeterminate refit, column kept");
        return Decision::Correct(suspect);
    };

    let changed = regression::changed_samples(x, &refit);
    if changed as f64 <= VERIFY_CHANGE_FRACTION * cache.rows() as f64 {
        tracing::debug!(
            column = suspect,
            changed,
            rows = cache.rows(),
            "Too few pixels would change, column kept"
        );
        return Decision::Correct(suspect);
    }

    let drift = carried.unwrap_or(refit);
    verified
        .entry(suspect)
        .or_insert_with(|| VerifiedFault::new(suspect, drift.gain, drift.bias));
    tracing::debug!(column = suspect, gain = drift.gain, bias = drift.bias, "Column marked as faulty");
    Decision::Faulty(suspect)
}
