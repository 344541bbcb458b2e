//! Batch sampling of Oslo model observables.
//!
//! This crate drives many independent `oslo` lattices, one per system size
//! and repetition, reduces their output to summary statistics and writes the
//! results as CSV tables plus a JSON summary.

pub mod analysis;
pub mod config;
pub mod output;
pub mod sweep;

use oslo::OsloError;
use thiserror::Error;

pub use analysis::{CorrelationPoint, LogBinned, MeanWithError};
pub use config::SamplingConfig;
pub use output::{create_timestamped_output_dir, write_sampling_outputs};
pub use sweep::{run_sampling, LengthSample, SamplingResult};

#[derive(Debug, Error)]
pub enum SamplingError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("lattice error: {0}")]
    Lattice(#[from] OsloError),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Run every enabled observable and write the tables into `output_dir`.
pub fn run_sampling_into_dir(
    config: &SamplingConfig,
    output_dir: &std::path::Path,
) -> Result<SamplingResult, SamplingError> {
    let result = run_sampling(config)?;
    write_sampling_outputs(config, &result, output_dir)?;
    Ok(result)
}
