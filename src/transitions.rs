//! Threshold transition bookkeeping

use std::ops::AddAssign;

use crate::threshold::Threshold;

/// 2x2 counter keyed by (threshold before relaxation, threshold after).
///
/// Diagonal cells also collect neighbours that were disturbed by a
/// relaxation without tipping over, since their threshold persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TransitionCounts {
    counts: [[u64; 2]; 2],
}

impl TransitionCounts {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, from: Threshold, to: Threshold) -> u64 {
        self.counts[from.index()][to.index()]
    }

    pub fn record(&mut self, from: Threshold, to: Threshold) {
        self.counts[from.index()][to.index()] += 1;
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().flatten().sum()
    }

    /// Cells in (1,1), (1,2), (2,1), (2,2) order.
    pub fn iter(&self) -> impl Iterator<Item = (Threshold, Threshold, u64)> + '_ {
        Threshold::ALL.into_iter().flat_map(move |from| {
            Threshold::ALL
                .into_iter()
                .map(move |to| (from, to, self.get(from, to)))
        })
    }

    /// Fraction of transitions out of `from` that land on `to`.
    ///
    /// Returns 0 when nothing left `from`.
    pub fn transition_probability(&self, from: Threshold, to: Threshold) -> f64 {
        let row = &self.counts[from.index()];
        let row_total: u64 = row.iter().sum();
        if row_total == 0 {
            return 0.0;
        }
        row[to.index()] as f64 / row_total as f64
    }
}

impl AddAssign for TransitionCounts {
    fn add_assign(&mut self, other: Self) {
        for (row, other_row) in self.counts.iter_mut().zip(other.counts.iter()) {
            for (cell, other_cell) in row.iter_mut().zip(other_row.iter()) {
                *cell += other_cell;
            }
        }
    }
}
