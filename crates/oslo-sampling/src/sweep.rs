use oslo::sim::{self, run_to_steady_state, SimConfig};
use oslo::{Lattice, TransitionCounts};
use rayon::prelude::*;
use serde::Serialize;

use crate::analysis::{
    self, gradient_correlations, logbin, mean_with_standard_error, CorrelationPoint, LogBinned,
    MeanWithError,
};
use crate::config::SamplingConfig;
use crate::SamplingError;

// Salts keep the random streams of different observables apart.
const HEIGHTS_SALT: u64 = 1;
const AVALANCHES_SALT: u64 = 2;
const CROSS_OVER_SALT: u64 = 3;
const AVERAGE_HEIGHTS_SALT: u64 = 4;
const CORRELATIONS_SALT: u64 = 5;
const TRANSITIONS_SALT: u64 = 6;

#[derive(Debug, Clone, Serialize)]
pub struct HeightSummary {
    pub mean: f64,
    pub std_dev: f64,
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AvalancheSummary {
    pub samples: usize,
    pub largest: u64,
    /// `<s^k>` for k = 1..=max_moment
    pub moments: Vec<f64>,
    #[serde(skip)]
    pub logbinned: LogBinned,
}

/// Every observable gathered for one system size.
#[derive(Debug, Clone, Serialize)]
pub struct LengthSample {
    pub length: usize,
    pub heights: Option<HeightSummary>,
    #[serde(skip)]
    pub height_distribution: Vec<(u64, f64)>,
    pub avalanches: Option<AvalancheSummary>,
    pub cross_over_time: Option<MeanWithError>,
    #[serde(skip)]
    pub average_heights: Vec<f64>,
    #[serde(skip)]
    pub transitions: Option<TransitionCounts>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SamplingResult {
    pub samples: Vec<LengthSample>,
    /// Gradient correlations of the largest system size
    pub correlations: Option<Vec<CorrelationPoint>>,
}

pub fn run_sampling(config: &SamplingConfig) -> Result<SamplingResult, SamplingError> {
    config.validate()?;

    let samples = config
        .lengths
        .par_iter()
        .map(|&length| -> Result<LengthSample, SamplingError> {
            let sample = sample_length(config, length)?;
            tracing::info!(length, "length complete");
            Ok(sample)
        })
        .collect::<Result<Vec<_>, SamplingError>>()?;

    let correlations = if config.enable_correlations {
        let length = config.largest_length();
        let snapshots = collect_gradient_snapshots(config, length)?;
        tracing::info!(length, snapshots = snapshots.len(), "gradient snapshots complete");
        Some(gradient_correlations(&snapshots, config.max_separation))
    } else {
        None
    };

    Ok(SamplingResult {
        samples,
        correlations,
    })
}

fn sample_length(config: &SamplingConfig, length: usize) -> Result<LengthSample, SamplingError> {
    let mut sample = LengthSample {
        length,
        heights: None,
        height_distribution: Vec::new(),
        avalanches: None,
        cross_over_time: None,
        average_heights: Vec::new(),
        transitions: None,
    };

    if config.enable_heights {
        let heights = collect_steady_heights(config, length)?;
        sample.heights = Some(HeightSummary {
            mean: analysis::mean(&heights),
            std_dev: analysis::std_dev(&heights),
            min: heights.iter().copied().min().unwrap_or(0),
            max: heights.iter().copied().max().unwrap_or(0),
        });
        sample.height_distribution = analysis::probability_distribution(&heights);
    }

    if config.enable_avalanches {
        let sizes = collect_avalanches(config, length)?;
        sample.avalanches = Some(AvalancheSummary {
            samples: sizes.len(),
            largest: sizes.iter().copied().max().unwrap_or(0),
            moments: (1..=config.max_moment)
                .map(|k| analysis::moment(&sizes, k))
                .collect(),
            logbinned: logbin(&sizes, config.logbin_scale, false)?,
        });
    }

    if config.enable_cross_over {
        let times = collect_cross_over_times(config, length)?;
        sample.cross_over_time = Some(mean_with_standard_error(&times));
    }

    if config.enable_average_heights {
        sample.average_heights = collect_average_heights(config, length)?;
    }

    if config.enable_transitions {
        sample.transitions = Some(collect_transitions(config, length)?);
    }

    Ok(sample)
}

/// Steady-state pile heights from a single long run.
pub fn collect_steady_heights(
    config: &SamplingConfig,
    length: usize,
) -> Result<Vec<u64>, SamplingError> {
    let sim_config = SimConfig {
        length,
        p: config.p,
        seed: config.seed_for(length, 0, HEIGHTS_SALT),
        cycles: config.num_cycles,
        warmup: None,
    };
    Ok(sim::steady_pile_heights(&sim_config)?)
}

/// Steady-state avalanche sizes, concatenated over repetitions.
pub fn collect_avalanches(
    config: &SamplingConfig,
    length: usize,
) -> Result<Vec<u64>, SamplingError> {
    let runs = (0..config.repetitions)
        .into_par_iter()
        .map(|repetition| {
            let sim_config = SimConfig {
                length,
                p: config.p,
                seed: config.seed_for(length, repetition, AVALANCHES_SALT),
                cycles: config.num_cycles,
                warmup: None,
            };
            tracing::debug!(length, repetition, "sampling avalanches");
            sim::avalanche_sizes(&sim_config)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(runs.concat())
}

/// Grains held by the pile just before the first exit, one per repetition.
pub fn collect_cross_over_times(
    config: &SamplingConfig,
    length: usize,
) -> Result<Vec<u64>, SamplingError> {
    let times = (0..config.repetitions)
        .into_par_iter()
        .map(|repetition| -> Result<u64, SamplingError> {
            let seed = config.seed_for(length, repetition, CROSS_OVER_SALT);
            let mut lattice = Lattice::with_seed(length, config.p, seed)?;
            Ok(run_to_steady_state(&mut lattice))
        })
        .collect::<Result<Vec<_>, SamplingError>>()?;
    Ok(times)
}

/// Pile height against time from an empty pile, averaged over repetitions.
/// Each run lasts 1.5 L², past the expected cross-over time.
pub fn collect_average_heights(
    config: &SamplingConfig,
    length: usize,
) -> Result<Vec<f64>, SamplingError> {
    let cycles = length * length * 3 / 2;
    let series = (0..config.repetitions)
        .into_par_iter()
        .map(|repetition| {
            let sim_config = SimConfig {
                length,
                p: config.p,
                seed: config.seed_for(length, repetition, AVERAGE_HEIGHTS_SALT),
                cycles,
                warmup: Some(0),
            };
            sim::pile_height_series(&sim_config)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(analysis::average_different_lengths(&series))
}

/// Independent steady-state gradient snapshots.
pub fn collect_gradient_snapshots(
    config: &SamplingConfig,
    length: usize,
) -> Result<Vec<Vec<u32>>, SamplingError> {
    let snapshots = (0..config.correlation_repetitions)
        .into_par_iter()
        .map(|repetition| {
            let sim_config = SimConfig {
                length,
                p: config.p,
                seed: config.seed_for(length, repetition, CORRELATIONS_SALT),
                cycles: 0,
                warmup: Some(config.cycles_after_transient),
            };
            sim::steady_gradients(&sim_config)
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(snapshots)
}

/// Threshold transitions merged over repetitions.
pub fn collect_transitions(
    config: &SamplingConfig,
    length: usize,
) -> Result<TransitionCounts, SamplingError> {
    let totals = (0..config.repetitions)
        .into_par_iter()
        .map(|repetition| {
            let sim_config = SimConfig {
                length,
                p: config.p,
                seed: config.seed_for(length, repetition, TRANSITIONS_SALT),
                cycles: config.num_cycles,
                warmup: None,
            };
            sim::transition_totals(&sim_config)
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(totals
        .into_iter()
        .fold(TransitionCounts::new(), |mut acc, counts| {
            acc += counts;
            acc
        }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_config() -> SamplingConfig {
        SamplingConfig {
            lengths: vec![4, 8],
            num_cycles: 2_000,
            repetitions: 3,
            correlation_repetitions: 4,
            cycles_after_transient: 50,
            max_separation: 3,
            ..SamplingConfig::default()
        }
    }

    #[test]
    fn sampling_is_reproducible() {
        let config = small_config();
        let a = run_sampling(&config).unwrap();
        let b = run_sampling(&config).unwrap();
        for (x, y) in a.samples.iter().zip(&b.samples) {
            assert_eq!(x.length, y.length);
            assert_eq!(
                x.avalanches.as_ref().map(|s| s.moments.clone()),
                y.avalanches.as_ref().map(|s| s.moments.clone())
            );
            assert_eq!(x.transitions, y.transitions);
            assert_eq!(x.average_heights, y.average_heights);
        }
    }

    #[test]
    fn sampling_covers_every_length() {
        let config = small_config();
        let result = run_sampling(&config).unwrap();
        assert_eq!(result.samples.len(), 2);
        assert_eq!(result.samples[0].length, 4);
        assert_eq!(result.samples[1].length, 8);

        let sample = &result.samples[1];
        let heights = sample.heights.as_ref().unwrap();
        assert!(heights.min <= heights.max);
        let total: f64 = sample.height_distribution.iter().map(|&(_, p)| p).sum();
        assert!((total - 1.0).abs() < 1e-9);

        let avalanches = sample.avalanches.as_ref().unwrap();
        assert_eq!(avalanches.samples, 3 * 2_000);
        assert_eq!(avalanches.moments.len(), 4);
        assert_eq!(sample.average_heights.len(), 8 * 8 * 3 / 2);
        assert!(sample.transitions.unwrap().total() > 0);

        let correlations = result.correlations.unwrap();
        assert_eq!(correlations.len(), 3);
    }

    #[test]
    fn disabled_observables_are_skipped() {
        let config = SamplingConfig {
            enable_avalanches: false,
            enable_correlations: false,
            enable_transitions: false,
            ..small_config()
        };
        let result = run_sampling(&config).unwrap();
        assert!(result.correlations.is_none());
        assert!(result.samples.iter().all(|s| s.avalanches.is_none()));
        assert!(result.samples.iter().all(|s| s.transitions.is_none()));
        assert!(result.samples.iter().all(|s| s.heights.is_some()));
    }

    #[test]
    fn btw_cross_over_time_is_deterministic() {
        let config = SamplingConfig {
            p: 0.0,
            repetitions: 4,
            ..small_config()
        };
        let times = collect_cross_over_times(&config, 4).unwrap();
        assert_eq!(times, vec![10; 4]);
    }
}
