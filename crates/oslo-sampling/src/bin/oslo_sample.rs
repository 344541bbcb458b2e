use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use oslo_sampling::{create_timestamped_output_dir, run_sampling_into_dir, SamplingConfig};

const DEFAULT_CONFIG_FILE: &str = "oslo_sampling.json";

#[derive(Debug, Parser)]
#[command(name = "oslo-sample")]
#[command(about = "Sample pile heights, avalanches and cross-over times of the Oslo model")]
struct Cli {
    /// JSON configuration; falls back to ./oslo_sampling.json, then built-in defaults
    #[arg(long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "output-oslo-sampling")]
    outdir: PathBuf,

    #[arg(long)]
    seed: Option<u64>,

    /// Comma-separated system sizes, e.g. 4,8,16
    #[arg(long, value_delimiter = ',')]
    lengths: Option<Vec<usize>>,

    #[arg(long)]
    cycles: Option<usize>,

    #[arg(long)]
    repetitions: Option<usize>,

    /// Probability that a threshold is 2
    #[arg(short = 'p', long = "probability")]
    p: Option<f64>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("oslo_sampling=info,oslo_sample=info")),
        )
        .init();

    if let Err(error) = try_main() {
        eprintln!("oslo-sample failed: {error:#}");
        std::process::exit(1);
    }
}

fn try_main() -> Result<()> {
    let cli = Cli::parse();
    let config = apply_overrides(load_config(cli.config.as_deref())?, &cli);
    config.validate()?;

    tracing::info!(
        lengths = ?config.lengths,
        p = config.p,
        cycles = config.num_cycles,
        repetitions = config.repetitions,
        seed = config.random_seed,
        "starting sampling run"
    );

    let output_dir = create_timestamped_output_dir(&cli.outdir)?;
    run_sampling_into_dir(&config, &output_dir)?;

    println!("Output directory: {}", output_dir.display());
    Ok(())
}

fn load_config(path: Option<&Path>) -> Result<SamplingConfig> {
    if let Some(path) = path {
        return load_config_file(path);
    }

    let cwd_config = PathBuf::from(DEFAULT_CONFIG_FILE);
    if cwd_config.exists() {
        return load_config_file(&cwd_config);
    }

    Ok(SamplingConfig::default())
}

fn load_config_file(path: &Path) -> Result<SamplingConfig> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("failed to read config {}", path.display()))?;
    let config = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse config {}", path.display()))?;
    tracing::info!(path = %path.display(), "loaded configuration");
    Ok(config)
}

fn apply_overrides(mut config: SamplingConfig, cli: &Cli) -> SamplingConfig {
    if let Some(seed) = cli.seed {
        config.random_seed = seed;
    }
    if let Some(lengths) = &cli.lengths {
        config.lengths = lengths.clone();
    }
    if let Some(cycles) = cli.cycles {
        config.num_cycles = cycles;
    }
    if let Some(repetitions) = cli.repetitions {
        config.repetitions = repetitions;
    }
    if let Some(p) = cli.p {
        config.p = p;
    }
    config
}
