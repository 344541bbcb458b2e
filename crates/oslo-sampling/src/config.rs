use oslo::{DEFAULT_THRESHOLD_PROBABILITY, MIN_LENGTH};
use serde::{Deserialize, Serialize};
use serde_with::{serde_as, DefaultOnNull};

use crate::SamplingError;

#[serde_as]
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SamplingConfig {
    #[serde(default)]
    pub lengths: Vec<usize>,
    #[serde_as(as = "DefaultOnNull")]
    pub p: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub num_cycles: usize,
    #[serde_as(as = "DefaultOnNull")]
    pub repetitions: usize,
    #[serde_as(as = "DefaultOnNull")]
    pub correlation_repetitions: usize,
    #[serde_as(as = "DefaultOnNull")]
    pub cycles_after_transient: usize,
    #[serde_as(as = "DefaultOnNull")]
    pub max_separation: usize,
    #[serde_as(as = "DefaultOnNull")]
    pub logbin_scale: f64,
    #[serde_as(as = "DefaultOnNull")]
    pub max_moment: u32,
    #[serde_as(as = "DefaultOnNull")]
    pub random_seed: u64,
    #[serde_as(as = "DefaultOnNull")]
    pub enable_heights: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub enable_avalanches: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub enable_cross_over: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub enable_average_heights: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub enable_correlations: bool,
    #[serde_as(as = "DefaultOnNull")]
    pub enable_transitions: bool,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        Self {
            lengths: vec![4, 8, 16, 32, 64, 128],
            p: DEFAULT_THRESHOLD_PROBABILITY,
            num_cycles: 100_000,
            repetitions: 10,
            correlation_repetitions: 20,
            cycles_after_transient: 1_000,
            max_separation: 20,
            logbin_scale: 1.2,
            max_moment: 4,
            random_seed: 0x05_1000_2026_u64,
            enable_heights: true,
            enable_avalanches: true,
            enable_cross_over: true,
            enable_average_heights: true,
            enable_correlations: true,
            enable_transitions: true,
        }
    }
}

impl SamplingConfig {
    pub fn validate(&self) -> Result<(), SamplingError> {
        if self.lengths.is_empty() {
            return Err(SamplingError::InvalidConfig(
                "lengths must contain at least one system size".to_string(),
            ));
        }

        if let Some(&length) = self.lengths.iter().find(|&&length| length < MIN_LENGTH) {
            return Err(SamplingError::InvalidConfig(format!(
                "every length must be at least {MIN_LENGTH}, got {length}"
            )));
        }

        if !(0.0..=1.0).contains(&self.p) {
            return Err(SamplingError::InvalidConfig(format!(
                "p must lie in [0, 1], got {}",
                self.p
            )));
        }

        if self.num_cycles == 0 {
            return Err(SamplingError::InvalidConfig(
                "num_cycles must be greater than zero".to_string(),
            ));
        }

        if self.repetitions == 0 {
            return Err(SamplingError::InvalidConfig(
                "repetitions must be greater than zero".to_string(),
            ));
        }

        if self.enable_correlations {
            if self.correlation_repetitions == 0 {
                return Err(SamplingError::InvalidConfig(
                    "correlation_repetitions must be greater than zero".to_string(),
                ));
            }
            let largest = self.largest_length();
            if self.max_separation == 0 || self.max_separation + 2 > largest {
                return Err(SamplingError::InvalidConfig(format!(
                    "max_separation must lie in [1, {}] for the largest length {largest}",
                    largest.saturating_sub(2)
                )));
            }
        }

        if !self.logbin_scale.is_finite() || self.logbin_scale < 1.0 {
            return Err(SamplingError::InvalidConfig(
                "logbin_scale must be finite and at least 1".to_string(),
            ));
        }

        if self.max_moment == 0 {
            return Err(SamplingError::InvalidConfig(
                "max_moment must be greater than zero".to_string(),
            ));
        }

        if !(self.enable_heights
            || self.enable_avalanches
            || self.enable_cross_over
            || self.enable_average_heights
            || self.enable_correlations
            || self.enable_transitions)
        {
            return Err(SamplingError::InvalidConfig(
                "at least one observable must be enabled".to_string(),
            ));
        }

        Ok(())
    }

    pub fn largest_length(&self) -> usize {
        self.lengths.iter().copied().max().unwrap_or(0)
    }

    /// Seed for one (length, repetition) job. Jobs never share a stream, so
    /// results do not depend on the order rayon schedules them in.
    pub fn seed_for(&self, length: usize, repetition: usize, salt: u64) -> u64 {
        let mut z = self
            .random_seed
            .wrapping_add((length as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15))
            .wrapping_add((repetition as u64).wrapping_mul(0xD1B5_4A32_D192_ED03))
            .wrapping_add(salt.wrapping_mul(0xA076_1D64_78BD_642F));
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }
}

#[cfg(test)]
mod tests {
    use super::SamplingConfig;

    #[test]
    fn default_config_is_valid() {
        assert!(SamplingConfig::default().validate().is_ok());
    }

    #[test]
    fn rejects_short_lattices() {
        let config = SamplingConfig {
            lengths: vec![2, 8],
            ..SamplingConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn rejects_separation_beyond_largest_length() {
        let config = SamplingConfig {
            lengths: vec![8],
            max_separation: 20,
            ..SamplingConfig::default()
        };
        assert!(config.validate().is_err());

        let config = SamplingConfig {
            enable_correlations: false,
            ..config
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn job_seeds_are_distinct() {
        let config = SamplingConfig::default();
        let a = config.seed_for(16, 0, 0);
        assert_eq!(a, config.seed_for(16, 0, 0));
        assert_ne!(a, config.seed_for(16, 1, 0));
        assert_ne!(a, config.seed_for(32, 0, 0));
        assert_ne!(a, config.seed_for(16, 0, 1));
    }

    #[test]
    fn partial_json_keeps_defaults() {
        let config: SamplingConfig =
            serde_json::from_str(r#"{"lengths": [8, 16], "num_cycles": 500}"#).unwrap();
        assert_eq!(config.lengths, vec![8, 16]);
        assert_eq!(config.num_cycles, 500);
        assert_eq!(config.repetitions, 10);
        assert!(config.enable_avalanches);
    }
}
