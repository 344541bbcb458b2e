//! Simulation harness for the Oslo model
//!
//! Runs a single seeded lattice and records the observables used by
//! batch sampling: pile heights, avalanche sizes, gradient snapshots and
//! threshold transitions.

use crate::error::OsloError;
use crate::lattice::{Lattice, DEFAULT_THRESHOLD_PROBABILITY};
use crate::transitions::TransitionCounts;
use rand::Rng;

/// Simulation configuration
#[derive(Debug, Clone)]
pub struct SimConfig {
    pub length: usize,
    pub p: f64,
    pub seed: u64,
    /// Cycles recorded after warmup
    pub cycles: usize,
    /// Cycles discarded before recording. `None` means `length²`, the most
    /// grains a steady-state pile can hold.
    pub warmup: Option<usize>,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            length: 16,
            p: DEFAULT_THRESHOLD_PROBABILITY,
            seed: 42,
            cycles: 10_000,
            warmup: None,
        }
    }
}

impl SimConfig {
    pub fn warmup_cycles(&self) -> usize {
        self.warmup.unwrap_or(self.length * self.length)
    }

    pub fn build_lattice(&self) -> Result<Lattice, OsloError> {
        Lattice::with_seed(self.length, self.p, self.seed)
    }
}

/// Cycle until the first grain leaves the pile.
///
/// Returns the cross-over time: the number of grains the pile held just
/// before that first exit. A lattice already in steady state returns 0.
pub fn run_to_steady_state<R: Rng>(lattice: &mut Lattice<R>) -> u64 {
    let mut cycles = 0u64;
    while lattice.is_transient() {
        lattice.cycle();
        cycles += 1;
    }
    cycles.saturating_sub(1)
}

/// Pile height after each of `cycles` cycles, starting from an empty pile.
pub fn pile_height_series(config: &SimConfig) -> Result<Vec<u64>, OsloError> {
    let mut lattice = config.build_lattice()?;
    Ok(record_heights(&mut lattice, config.cycles))
}

/// Pile heights recorded after warmup.
pub fn steady_pile_heights(config: &SimConfig) -> Result<Vec<u64>, OsloError> {
    let mut lattice = config.build_lattice()?;
    warm_up(&mut lattice, config.warmup_cycles());
    Ok(record_heights(&mut lattice, config.cycles))
}

/// Avalanche sizes recorded after warmup.
pub fn avalanche_sizes(config: &SimConfig) -> Result<Vec<u64>, OsloError> {
    let mut lattice = config.build_lattice()?;
    warm_up(&mut lattice, config.warmup_cycles());

    let mut sizes = Vec::with_capacity(config.cycles);
    for _ in 0..config.cycles {
        sizes.push(lattice.cycle_with_relax_count()?);
    }
    Ok(sizes)
}

/// Gradient snapshot taken `warmup` cycles after the pile reached steady
/// state. Here `warmup` defaults to zero.
pub fn steady_gradients(config: &SimConfig) -> Result<Vec<u32>, OsloError> {
    let mut lattice = config.build_lattice()?;
    run_to_steady_state(&mut lattice);
    warm_up(&mut lattice, config.warmup.unwrap_or(0));
    Ok(lattice.gradients().to_vec())
}

/// Threshold transitions accumulated over `cycles` cycles after warmup.
pub fn transition_totals(config: &SimConfig) -> Result<TransitionCounts, OsloError> {
    let mut lattice = config.build_lattice()?;
    warm_up(&mut lattice, config.warmup_cycles());

    let mut totals = TransitionCounts::new();
    for _ in 0..config.cycles {
        totals += lattice.cycle_with_transition_counts();
    }
    Ok(totals)
}

fn warm_up<R: Rng>(lattice: &mut Lattice<R>, cycles: usize) {
    for _ in 0..cycles {
        lattice.cycle();
    }
}

fn record_heights<R: Rng>(lattice: &mut Lattice<R>, cycles: usize) -> Vec<u64> {
    let mut heights = Vec::with_capacity(cycles);
    for _ in 0..cycles {
        lattice.cycle();
        heights.push(lattice.pile_height());
    }
    heights
}
