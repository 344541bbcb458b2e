use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;
use csv::Writer;
use serde::Serialize;

use crate::config::SamplingConfig;
use crate::sweep::{LengthSample, SamplingResult};
use crate::SamplingError;

#[derive(Debug, Clone, Serialize)]
pub struct PileHeightRow {
    pub length: usize,
    pub mean: f64,
    pub std_dev: f64,
    pub min: u64,
    pub max: u64,
}

#[derive(Debug, Clone, Serialize)]
pub struct DistributionRow {
    pub length: usize,
    pub height: u64,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct MomentRow {
    pub length: usize,
    pub k: u32,
    pub moment: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogBinRow {
    pub length: usize,
    pub s: f64,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct CrossOverRow {
    pub length: usize,
    pub mean: f64,
    pub std_error: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct AverageHeightRow {
    pub length: usize,
    pub t: usize,
    pub mean_height: f64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransitionRow {
    pub length: usize,
    pub from: u32,
    pub to: u32,
    pub count: u64,
    pub probability: f64,
}

#[derive(Debug, Clone, Serialize)]
struct Summary<'a> {
    generated_at: String,
    config: &'a SamplingConfig,
    result: &'a SamplingResult,
}

pub fn create_timestamped_output_dir(output_root: &Path) -> Result<PathBuf, SamplingError> {
    fs::create_dir_all(output_root)?;

    let timestamp = Utc::now().format("%Y-%m-%dT%H-%M-%SZ").to_string();
    let mut output_dir = output_root.join(&timestamp);
    let mut counter = 1_u32;

    while output_dir.exists() {
        output_dir = output_root.join(format!("{timestamp}-{counter:02}"));
        counter += 1;
    }

    fs::create_dir_all(&output_dir)?;
    Ok(output_dir)
}

fn write_rows<T: Serialize>(path: &Path, rows: &[T]) -> Result<(), SamplingError> {
    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// Flatten a per-length observable into rows, skipping lengths that lack it.
fn rows_for<T>(samples: &[LengthSample], rows: impl Fn(&LengthSample) -> Vec<T>) -> Vec<T> {
    samples.iter().flat_map(rows).collect()
}

/// Write one CSV per enabled observable plus `summary.json`.
pub fn write_sampling_outputs(
    config: &SamplingConfig,
    result: &SamplingResult,
    output_dir: &Path,
) -> Result<(), SamplingError> {
    fs::create_dir_all(output_dir)?;
    let samples = &result.samples;

    if config.enable_heights {
        let rows = rows_for(samples, |sample| {
            sample
                .heights
                .iter()
                .map(|h| PileHeightRow {
                    length: sample.length,
                    mean: h.mean,
                    std_dev: h.std_dev,
                    min: h.min,
                    max: h.max,
                })
                .collect()
        });
        write_rows(&output_dir.join("pile_heights.csv"), &rows)?;

        let rows = rows_for(samples, |sample| {
            sample
                .height_distribution
                .iter()
                .map(|&(height, probability)| DistributionRow {
                    length: sample.length,
                    height,
                    probability,
                })
                .collect()
        });
        write_rows(&output_dir.join("height_distribution.csv"), &rows)?;
    }

    if config.enable_avalanches {
        let rows = rows_for(samples, |sample| {
            sample
                .avalanches
                .iter()
                .flat_map(|a| a.moments.iter().enumerate())
                .map(|(idx, &moment)| MomentRow {
                    length: sample.length,
                    k: idx as u32 + 1,
                    moment,
                })
                .collect()
        });
        write_rows(&output_dir.join("avalanche_moments.csv"), &rows)?;

        let rows = rows_for(samples, |sample| {
            sample
                .avalanches
                .iter()
                .flat_map(|a| a.logbinned.s.iter().zip(&a.logbinned.probability))
                .map(|(&s, &probability)| LogBinRow {
                    length: sample.length,
                    s,
                    probability,
                })
                .collect()
        });
        write_rows(&output_dir.join("avalanche_logbin.csv"), &rows)?;
    }

    if config.enable_cross_over {
        let rows = rows_for(samples, |sample| {
            sample
                .cross_over_time
                .iter()
                .map(|t| CrossOverRow {
                    length: sample.length,
                    mean: t.mean,
                    std_error: t.std_error,
                })
                .collect()
        });
        write_rows(&output_dir.join("cross_over_times.csv"), &rows)?;
    }

    if config.enable_average_heights {
        let rows = rows_for(samples, |sample| {
            sample
                .average_heights
                .iter()
                .enumerate()
                .map(|(t, &mean_height)| AverageHeightRow {
                    length: sample.length,
                    t: t + 1,
                    mean_height,
                })
                .collect()
        });
        write_rows(&output_dir.join("average_heights.csv"), &rows)?;
    }

    if let Some(correlations) = &result.correlations {
        write_rows(&output_dir.join("gradient_correlations.csv"), correlations)?;
    }

    if config.enable_transitions {
        let rows = rows_for(samples, |sample| {
            sample
                .transitions
                .iter()
                .flat_map(|counts| {
                    counts.iter().map(move |(from, to, count)| TransitionRow {
                        length: sample.length,
                        from: from.value(),
                        to: to.value(),
                        count,
                        probability: counts.transition_probability(from, to),
                    })
                })
                .collect()
        });
        write_rows(&output_dir.join("transition_counts.csv"), &rows)?;
    }

    let summary = Summary {
        generated_at: Utc::now().to_rfc3339(),
        config,
        result,
    };
    fs::write(
        output_dir.join("summary.json"),
        serde_json::to_string_pretty(&summary)?,
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sweep::run_sampling;

    #[test]
    fn writes_every_enabled_table() {
        let config = SamplingConfig {
            lengths: vec![4, 8],
            num_cycles: 500,
            repetitions: 2,
            correlation_repetitions: 2,
            cycles_after_transient: 10,
            max_separation: 2,
            ..SamplingConfig::default()
        };
        let result = run_sampling(&config).unwrap();
        let dir = tempfile::tempdir().unwrap();
        write_sampling_outputs(&config, &result, dir.path()).unwrap();

        for name in [
            "pile_heights.csv",
            "height_distribution.csv",
            "avalanche_moments.csv",
            "avalanche_logbin.csv",
            "cross_over_times.csv",
            "average_heights.csv",
            "gradient_correlations.csv",
            "transition_counts.csv",
            "summary.json",
        ] {
            assert!(dir.path().join(name).exists(), "missing {name}");
        }

        let heights = fs::read_to_string(dir.path().join("pile_heights.csv")).unwrap();
        let mut lines = heights.lines();
        assert_eq!(lines.next(), Some("length,mean,std_dev,min,max"));
        assert_eq!(lines.count(), 2);

        let transitions = fs::read_to_string(dir.path().join("transition_counts.csv")).unwrap();
        assert_eq!(transitions.lines().count(), 1 + 2 * 4);

        let summary: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("summary.json")).unwrap())
                .unwrap();
        assert_eq!(summary["config"]["num_cycles"], 500);
        assert_eq!(summary["result"]["samples"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn timestamped_dirs_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let a = create_timestamped_output_dir(root.path()).unwrap();
        let b = create_timestamped_output_dir(root.path()).unwrap();
        assert_ne!(a, b);
        assert!(a.is_dir() && b.is_dir());
    }
}
