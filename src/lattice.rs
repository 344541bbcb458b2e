//! Oslo lattice engine
//!
//! Owns the gradients and thresholds of a one-dimensional pile and
//! implements driving, toppling and full drive-relax cycles.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::OsloError;
use crate::threshold::{Threshold, ThresholdSource};
use crate::transitions::TransitionCounts;

/// Smallest lattice the toppling rule is defined for.
pub const MIN_LENGTH: usize = 3;

/// Probability that a freshly drawn threshold is 2.
pub const DEFAULT_THRESHOLD_PROBABILITY: f64 = 0.5;

/// Largest avalanche size `cycle_with_relax_count` will report.
pub const MAX_RELAX_COUNT: u64 = 2_000_000_000;

/// Lifecycle of a pile. `SteadyState` is entered once, when the first grain
/// leaves through the rightmost site, and never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Transient,
    SteadyState,
}

/// Oslo model lattice
#[derive(Debug, Clone)]
pub struct Lattice<R = StdRng> {
    /// Local slope at each site
    gradients: Vec<u32>,
    /// Critical slope at each site
    thresholds: Vec<Threshold>,
    /// Generator for redrawn thresholds
    source: ThresholdSource<R>,
    /// True until the first grain exits at the last site
    is_transient: bool,
}

impl Lattice<StdRng> {
    /// Create a lattice whose thresholds come from an entropy-seeded generator
    pub fn new(length: usize, p: f64) -> Result<Self, OsloError> {
        Self::with_rng(length, p, StdRng::from_entropy())
    }

    /// Create a reproducible lattice
    pub fn with_seed(length: usize, p: f64, seed: u64) -> Result<Self, OsloError> {
        Self::with_rng(length, p, StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Lattice<R> {
    /// Create a lattice drawing thresholds from `rng`.
    ///
    /// # Arguments
    /// * `length` - Number of sites, at least [`MIN_LENGTH`]
    /// * `p` - Probability that a threshold is 2 rather than 1
    /// * `rng` - Generator used for every threshold draw
    pub fn with_rng(length: usize, p: f64, rng: R) -> Result<Self, OsloError> {
        if length < MIN_LENGTH {
            return Err(OsloError::InvalidParameter(format!(
                "lattice length must be at least {MIN_LENGTH}, got {length}"
            )));
        }

        let mut source = ThresholdSource::new(p, rng)?;
        let thresholds = (0..length).map(|_| source.draw()).collect();

        Ok(Self {
            gradients: vec![0; length],
            thresholds,
            source,
            is_transient: true,
        })
    }

    pub fn length(&self) -> usize {
        self.gradients.len()
    }

    pub fn threshold_probability(&self) -> f64 {
        self.source.probability()
    }

    pub fn gradient(&self, i: usize) -> Result<u32, OsloError> {
        self.check_index(i)?;
        Ok(self.gradients[i])
    }

    pub fn gradients(&self) -> &[u32] {
        &self.gradients
    }

    pub fn threshold(&self, i: usize) -> Result<Threshold, OsloError> {
        self.check_index(i)?;
        Ok(self.thresholds[i])
    }

    pub fn thresholds(&self) -> &[Threshold] {
        &self.thresholds
    }

    /// Height at site `i`, the sum of gradients from `i` to the end.
    pub fn height(&self, i: usize) -> Result<u64, OsloError> {
        self.check_index(i)?;
        Ok(self.gradients[i..].iter().map(|&g| u64::from(g)).sum())
    }

    /// Heights at every site, computed in a single backward pass.
    pub fn all_heights(&self) -> Vec<u64> {
        let mut heights = vec![0; self.length()];
        let mut running = 0u64;
        for (height, &g) in heights.iter_mut().zip(self.gradients.iter()).rev() {
            running += u64::from(g);
            *height = running;
        }
        heights
    }

    pub fn pile_height(&self) -> u64 {
        self.gradients.iter().map(|&g| u64::from(g)).sum()
    }

    /// Number of grains resting on the lattice.
    pub fn total_grains(&self) -> u64 {
        self.gradients
            .iter()
            .enumerate()
            .map(|(i, &g)| (i as u64 + 1) * u64::from(g))
            .sum()
    }

    pub fn is_transient(&self) -> bool {
        self.is_transient
    }

    pub fn phase(&self) -> Phase {
        if self.is_transient {
            Phase::Transient
        } else {
            Phase::SteadyState
        }
    }

    pub fn is_supercritical(&self, i: usize) -> Result<bool, OsloError> {
        self.check_index(i)?;
        Ok(self.supercritical(i))
    }

    /// Add a single grain at the leftmost site
    pub fn drive(&mut self) {
        self.gradients[0] += 1;
    }

    /// Topple site `i`, which the caller expects to be supercritical.
    ///
    /// Slope moves to the neighbours, the site's gradient saturates at zero
    /// and a fresh threshold is drawn for it. Relaxing the last site releases
    /// a grain from the system and ends the transient phase.
    pub fn relax(&mut self, i: usize) -> Result<(), OsloError> {
        self.check_index(i)?;
        self.topple(i);
        Ok(())
    }

    /// Drive once and relax until every site is stable.
    ///
    /// The scan stops at the rightmost site that has toppled so far plus one,
    /// since nothing beyond it has been disturbed.
    pub fn cycle(&mut self) {
        self.drive();

        let length = self.length();
        let mut pointer = 0;
        let mut avalanche_limit = 0;

        while pointer < length && pointer <= avalanche_limit {
            if self.supercritical(pointer) {
                self.topple(pointer);
                avalanche_limit = avalanche_limit.max(pointer + 1);
                pointer = pointer.saturating_sub(1);
            } else {
                pointer += 1;
            }
        }
    }

    /// Drive once, relax until stable and return the avalanche size.
    pub fn cycle_with_relax_count(&mut self) -> Result<u64, OsloError> {
        self.drive();

        let length = self.length();
        let mut pointer = 0;
        let mut count = 0u64;

        while pointer < length {
            if self.supercritical(pointer) {
                self.topple(pointer);
                count += 1;
                pointer = pointer.saturating_sub(1);
            } else {
                pointer += 1;
            }
        }

        if count > MAX_RELAX_COUNT {
            return Err(OsloError::CounterOverflow { count });
        }
        Ok(count)
    }

    /// Drive once, relax until stable and count threshold transitions.
    ///
    /// Every relaxed site records (threshold before, threshold after). After
    /// an interior site relaxes, each neighbour left stable records its
    /// unchanged threshold on the diagonal, left neighbour first. Neighbours
    /// pushed over the edge are counted when they relax themselves.
    pub fn cycle_with_transition_counts(&mut self) -> TransitionCounts {
        let mut counts = TransitionCounts::new();
        self.drive();

        let length = self.length();
        let mut pointer = 0;

        while pointer < length {
            if self.supercritical(pointer) {
                let before = self.thresholds[pointer];
                self.topple(pointer);
                counts.record(before, self.thresholds[pointer]);

                if pointer > 0 && pointer < length - 1 {
                    for neighbour in [pointer - 1, pointer + 1] {
                        if !self.supercritical(neighbour) {
                            let persisted = self.thresholds[neighbour];
                            counts.record(persisted, persisted);
                        }
                    }
                }

                pointer = pointer.saturating_sub(1);
            } else {
                pointer += 1;
            }
        }

        counts
    }

    fn check_index(&self, i: usize) -> Result<(), OsloError> {
        if i < self.length() {
            Ok(())
        } else {
            Err(OsloError::IndexOutOfRange {
                index: i,
                length: self.length(),
            })
        }
    }

    fn supercritical(&self, i: usize) -> bool {
        self.gradients[i] > self.thresholds[i].value()
    }

    fn topple(&mut self, i: usize) {
        let last = self.length() - 1;
        if i == 0 {
            self.gradients[0] = self.gradients[0].saturating_sub(2);
            self.gradients[1] += 1;
        } else if i == last {
            self.is_transient = false;
            self.gradients[i] = self.gradients[i].saturating_sub(1);
            self.gradients[i - 1] += 1;
        } else {
            self.gradients[i] = self.gradients[i].saturating_sub(2);
            self.gradients[i - 1] += 1;
            self.gradients[i + 1] += 1;
        }
        self.thresholds[i] = self.source.draw();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use Threshold::{One, Two};

    fn btw(length: usize) -> Lattice {
        Lattice::with_seed(length, 0.0, 0).unwrap()
    }

    #[test]
    fn test_lattice_creation() {
        let lattice = Lattice::with_seed(4, 0.0, 1).unwrap();
        assert_eq!(lattice.length(), 4);
        assert_eq!(lattice.gradients(), &[0, 0, 0, 0]);
        assert_eq!(lattice.thresholds(), &[One; 4]);
        assert_eq!(lattice.all_heights(), vec![0, 0, 0, 0]);
        assert_eq!(lattice.pile_height(), 0);
        assert!(lattice.is_transient());
        assert_eq!(lattice.phase(), Phase::Transient);
    }

    #[test]
    fn test_minimum_length() {
        assert!(matches!(
            Lattice::new(2, DEFAULT_THRESHOLD_PROBABILITY),
            Err(OsloError::InvalidParameter(_))
        ));
        assert!(Lattice::new(3, DEFAULT_THRESHOLD_PROBABILITY).is_ok());
    }

    #[test]
    fn test_probability_one_gives_all_twos() {
        let lattice = Lattice::with_seed(1024, 1.0, 3).unwrap();
        assert!(lattice.thresholds().iter().all(|&t| t == Two));
    }

    #[test]
    fn test_index_out_of_range() {
        let lattice = btw(4);
        assert_eq!(lattice.gradient(3), Ok(0));
        assert_eq!(
            lattice.gradient(4),
            Err(OsloError::IndexOutOfRange {
                index: 4,
                length: 4
            })
        );
        assert!(lattice.gradient(usize::MAX).is_err());
        assert!(lattice.threshold(4).is_err());
        assert!(lattice.height(4).is_err());
        assert!(lattice.is_supercritical(4).is_err());
    }

    #[test]
    fn test_relax_out_of_range_leaves_state() {
        let mut lattice = btw(4);
        lattice.drive();
        let before = lattice.clone();
        assert!(lattice.relax(4).is_err());
        assert_eq!(lattice.gradients(), before.gradients());
        assert_eq!(lattice.thresholds(), before.thresholds());
        assert!(lattice.is_transient());
    }

    #[test]
    fn test_two_cycles() {
        let mut lattice = btw(4);

        lattice.cycle();
        assert_eq!(lattice.gradients(), &[1, 0, 0, 0]);
        assert_eq!(lattice.all_heights(), vec![1, 0, 0, 0]);
        assert_eq!(lattice.pile_height(), 1);
        assert!(lattice.is_transient());

        lattice.cycle();
        assert_eq!(lattice.gradients(), &[0, 1, 0, 0]);
        assert_eq!(lattice.gradient(0), Ok(0));
        assert_eq!(lattice.all_heights(), vec![1, 1, 0, 0]);
        assert_eq!(lattice.height(0), Ok(1));
        assert_eq!(lattice.pile_height(), 1);
        assert_eq!(lattice.thresholds(), &[One; 4]);
        assert!(lattice.is_transient());
    }

    #[test]
    fn test_relax_count_sequence() {
        let mut lattice = btw(8);
        let sizes: Vec<u64> = (0..5)
            .map(|_| lattice.cycle_with_relax_count().unwrap())
            .collect();
        assert_eq!(sizes, vec![0, 1, 0, 2, 1]);
    }

    #[test]
    fn test_transition_counts_sequence() {
        let mut lattice = btw(8);
        let first = lattice.cycle_with_transition_counts();
        let second = lattice.cycle_with_transition_counts();
        assert_eq!(first, TransitionCounts::new());
        assert_eq!(second.get(One, One), 1);
        assert_eq!(second.get(One, Two), 0);
        assert_eq!(second.get(Two, One), 0);
        assert_eq!(second.get(Two, Two), 0);
    }

    #[test]
    fn test_transition_counts_include_stable_neighbours() {
        // Two more cycles on top of the sequence above: the fourth drive
        // topples site 0 and then site 1, whose neighbours both stay stable.
        let mut lattice = btw(8);
        for _ in 0..3 {
            lattice.cycle();
        }
        let counts = lattice.cycle_with_transition_counts();
        assert_eq!(counts.get(One, One), 4);
        assert_eq!(counts.total(), 4);
    }

    #[test]
    fn test_boundary_relaxations() {
        let mut lattice = btw(3);
        lattice.drive();
        lattice.drive();
        lattice.relax(0).unwrap();
        assert_eq!(lattice.gradients(), &[0, 1, 0]);

        lattice.relax(1).unwrap();
        assert_eq!(lattice.gradients(), &[1, 0, 1]);
        assert!(lattice.is_transient());

        lattice.relax(2).unwrap();
        assert_eq!(lattice.gradients(), &[1, 1, 0]);
        assert!(!lattice.is_transient());
        assert_eq!(lattice.phase(), Phase::SteadyState);
    }

    #[test]
    fn test_relax_clamps_at_zero() {
        let mut lattice = btw(3);
        lattice.relax(1).unwrap();
        assert_eq!(lattice.gradients(), &[1, 0, 1]);
        lattice.relax(0).unwrap();
        assert_eq!(lattice.gradients(), &[0, 1, 1]);
    }

    #[test]
    fn test_btw_pile_reaches_steady_state() {
        let mut lattice = btw(4);
        let mut cycles = 0;
        while lattice.is_transient() {
            lattice.cycle();
            cycles += 1;
        }
        // With every threshold at 1 the pile fills to slope 1 everywhere
        // (4 + 3 + 2 + 1 grains) before the next grain leaves.
        assert_eq!(cycles, 11);
        assert_eq!(lattice.gradients(), &[1, 1, 1, 1]);
    }

    #[test]
    fn test_total_grains() {
        let mut lattice = btw(8);
        for _ in 0..5 {
            lattice.cycle();
        }
        assert_eq!(lattice.total_grains(), 5);
        assert_eq!(
            lattice.total_grains(),
            lattice.all_heights().iter().sum::<u64>()
        );
    }

    #[test]
    fn test_large_pile_reaches_steady_state() {
        let mut lattice = Lattice::with_seed(128, DEFAULT_THRESHOLD_PROBABILITY, 11).unwrap();
        while lattice.is_transient() {
            lattice.cycle();
        }
        assert!(lattice
            .gradients()
            .iter()
            .zip(lattice.thresholds())
            .all(|(&g, &t)| g <= t.value()));
    }
}
