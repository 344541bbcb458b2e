//! Reductions of raw simulation output to summary statistics.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::SamplingError;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct MeanWithError {
    pub mean: f64,
    pub std_error: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LogBinned {
    /// Geometric bin centres
    pub s: Vec<f64>,
    /// Probability density per unit size
    pub probability: Vec<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CorrelationPoint {
    pub separation: usize,
    pub mean: f64,
    pub std_dev: f64,
}

pub fn mean(values: &[u64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().map(|&v| v as f64).sum::<f64>() / values.len() as f64
}

/// Population standard deviation.
pub fn std_dev(values: &[u64]) -> f64 {
    let floats: Vec<f64> = values.iter().map(|&v| v as f64).collect();
    std_dev_f64(&floats)
}

fn mean_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn std_dev_f64(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean_f64(values);
    let variance = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Mean and standard error (population std over sqrt(n)).
pub fn mean_with_standard_error(values: &[u64]) -> MeanWithError {
    let std_error = if values.is_empty() {
        0.0
    } else {
        std_dev(values) / (values.len() as f64).sqrt()
    };
    MeanWithError {
        mean: mean(values),
        std_error,
    }
}

/// k-th raw moment `<s^k>`.
pub fn moment(values: &[u64], k: u32) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let exponent = k as i32;
    values.iter().map(|&v| (v as f64).powi(exponent)).sum::<f64>() / values.len() as f64
}

/// Normalised histogram with unit-width bins, sorted by value.
pub fn probability_distribution(values: &[u64]) -> Vec<(u64, f64)> {
    let mut counts: BTreeMap<u64, u64> = BTreeMap::new();
    for &value in values {
        *counts.entry(value).or_insert(0) += 1;
    }
    let total = values.len() as f64;
    counts
        .into_iter()
        .map(|(value, count)| (value, count as f64 / total))
        .collect()
}

/// Log-binned probability of integer data.
///
/// Bin edges are `floor(scale^j)`; with `zeros` the first edge is 0 and
/// sizes of zero get their own bin, otherwise binning starts at
/// `floor(scale)`. Every bin holds its counts divided by its width and by
/// the total number of samples. Empty bins are dropped. A scale of exactly
/// 1 returns the plain distribution.
pub fn logbin(data: &[u64], scale: f64, zeros: bool) -> Result<LogBinned, SamplingError> {
    if !scale.is_finite() || scale < 1.0 {
        return Err(SamplingError::InvalidConfig(format!(
            "logbin scale must be finite and at least 1, got {scale}"
        )));
    }

    let Some(&smax) = data.iter().max() else {
        return Ok(LogBinned::default());
    };

    let mut counts = vec![0u64; smax as usize + 1];
    for &value in data {
        counts[value as usize] += 1;
    }
    let total = data.len() as f64;

    let mut binned = LogBinned::default();

    if scale > 1.0 {
        let jmax = if smax == 0 {
            0
        } else {
            ((smax as f64).ln() / scale.ln()).ceil() as i32
        };
        let first = if zeros { 0 } else { 1 };
        let mut edges: Vec<u64> = (first..=jmax).map(|j| scale.powi(j) as u64).collect();
        if zeros {
            if let Some(edge) = edges.first_mut() {
                *edge = 0;
            }
        }
        edges.dedup();

        for window in edges.windows(2) {
            let (lo, hi) = (window[0], window[1]);
            let upper = (hi as usize).min(counts.len());
            let in_bin: u64 = counts
                .get(lo as usize..upper)
                .map(|slice| slice.iter().sum())
                .unwrap_or(0);
            binned.s.push(((lo * (hi - 1)) as f64).sqrt());
            binned
                .probability
                .push(in_bin as f64 / (hi - lo) as f64 / total);
        }
    } else {
        for (size, &count) in counts.iter().enumerate() {
            if size == 0 && !zeros {
                continue;
            }
            binned.s.push(size as f64);
            binned.probability.push(count as f64 / total);
        }
    }

    let (s, probability): (Vec<f64>, Vec<f64>) = binned
        .s
        .into_iter()
        .zip(binned.probability)
        .filter(|&(_, p)| p != 0.0)
        .unzip();
    Ok(LogBinned { s, probability })
}

/// Element-wise mean of series truncated to the shortest one.
pub fn average_different_lengths(series: &[Vec<u64>]) -> Vec<f64> {
    let Some(shortest) = series.iter().map(Vec::len).min() else {
        return Vec::new();
    };
    (0..shortest)
        .map(|t| series.iter().map(|s| s[t] as f64).sum::<f64>() / series.len() as f64)
        .collect()
}

/// Pearson correlation coefficient, `None` when either side is constant.
pub fn pearson(x: &[f64], y: &[f64]) -> Option<f64> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    let mx = mean_f64(x);
    let my = mean_f64(y);
    let mut sxy = 0.0;
    let mut sxx = 0.0;
    let mut syy = 0.0;
    for (&a, &b) in x.iter().zip(y) {
        sxy += (a - mx) * (b - my);
        sxx += (a - mx) * (a - mx);
        syy += (b - my) * (b - my);
    }
    if sxx == 0.0 || syy == 0.0 {
        return None;
    }
    Some(sxy / (sxx * syy).sqrt())
}

/// Correlation between gradients `s` sites apart, for `s` in 1..=max_separation,
/// averaged over independent steady-state snapshots.
pub fn gradient_correlations(
    snapshots: &[Vec<u32>],
    max_separation: usize,
) -> Vec<CorrelationPoint> {
    (1..=max_separation)
        .map(|separation| {
            let values: Vec<f64> = snapshots
                .iter()
                .filter(|gradients| gradients.len() >= separation + 2)
                .filter_map(|gradients| {
                    let n = gradients.len();
                    pearson(
                        &as_f64(&gradients[separation..]),
                        &as_f64(&gradients[..n - separation]),
                    )
                })
                .collect();
            CorrelationPoint {
                separation,
                mean: mean_f64(&values),
                std_dev: std_dev_f64(&values),
            }
        })
        .collect()
}

fn as_f64(gradients: &[u32]) -> Vec<f64> {
    gradients.iter().map(|&g| f64::from(g)).collect()
}
