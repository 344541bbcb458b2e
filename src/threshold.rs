//! Critical slope thresholds and the random source that draws them

use std::fmt;

use rand::Rng;
use rand_distr::{Bernoulli, Distribution};

use crate::error::OsloError;

/// Critical slope of a site. A site topples once its gradient exceeds it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Threshold {
    One,
    Two,
}

impl Threshold {
    pub const ALL: [Threshold; 2] = [Threshold::One, Threshold::Two];

    pub fn value(self) -> u32 {
        match self {
            Threshold::One => 1,
            Threshold::Two => 2,
        }
    }

    pub(crate) fn index(self) -> usize {
        match self {
            Threshold::One => 0,
            Threshold::Two => 1,
        }
    }
}

impl fmt::Display for Threshold {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value())
    }
}

impl From<Threshold> for u32 {
    fn from(threshold: Threshold) -> Self {
        threshold.value()
    }
}

/// Seedable generator paired with the Bernoulli(p) rule mapping to {1, 2}.
///
/// A draw yields [`Threshold::Two`] with probability `p` and
/// [`Threshold::One`] otherwise.
#[derive(Debug, Clone)]
pub struct ThresholdSource<R> {
    rng: R,
    distribution: Bernoulli,
    p: f64,
}

impl<R: Rng> ThresholdSource<R> {
    pub fn new(p: f64, rng: R) -> Result<Self, OsloError> {
        let distribution = Bernoulli::new(p).map_err(|_| {
            OsloError::InvalidParameter(format!(
                "threshold probability must lie in [0, 1], got {p}"
            ))
        })?;
        Ok(Self {
            rng,
            distribution,
            p,
        })
    }

    pub fn draw(&mut self) -> Threshold {
        if self.distribution.sample(&mut self.rng) {
            Threshold::Two
        } else {
            Threshold::One
        }
    }

    pub fn probability(&self) -> f64 {
        self.p
    }
}
