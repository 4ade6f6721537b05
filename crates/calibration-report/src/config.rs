use anyhow::{bail, Context, Result};
use std::env;
use std::path::PathBuf;

use calibration_engine::DEFAULT_SAMPLE_COUNT;

/// Fewer completed records than this and the report falls back to sample data
pub const DEFAULT_MIN_RECORDS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            other => bail!("Unknown output format '{}' (expected text or json)", other),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReportConfig {
    /// JSON export of stored predictions
    pub input: Option<PathBuf>,
    pub format: OutputFormat,
    /// Records generated when falling back to sample data
    pub sample_count: usize,
    /// Sample data seed; random when unset
    pub seed: Option<u64>,
    pub min_records: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            input: None,
            format: OutputFormat::Text,
            sample_count: DEFAULT_SAMPLE_COUNT,
            seed: None,
            min_records: DEFAULT_MIN_RECORDS,
        }
    }
}

impl ReportConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from any key/value source (the process environment
    /// in production).
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let format = match lookup("CALIBRATION_FORMAT") {
            Some(v) => v.parse()?,
            None => defaults.format,
        };

        let sample_count = match lookup("CALIBRATION_SAMPLE_COUNT") {
            Some(v) => v
                .parse()
                .context("CALIBRATION_SAMPLE_COUNT must be a non-negative integer")?,
            None => defaults.sample_count,
        };

        let seed = lookup("CALIBRATION_SEED")
            .map(|v| v.parse::<u64>().context("CALIBRATION_SEED must be an unsigned integer"))
            .transpose()?;

        let min_records = match lookup("CALIBRATION_MIN_RECORDS") {
            Some(v) => v
                .parse()
                .context("CALIBRATION_MIN_RECORDS must be a non-negative integer")?,
            None => defaults.min_records,
        };

        Ok(Self {
            input: lookup("CALIBRATION_INPUT")
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            format,
            sample_count,
            seed,
            min_records,
        })
    }

    /// Command-line flags override the environment
    pub fn apply_args(mut self, args: &[String]) -> Result<Self> {
        let value_of = |flag: &str| {
            args.iter()
                .position(|a| a == flag)
                .and_then(|i| args.get(i + 1))
                .map(|s| s.as_str())
        };

        if let Some(path) = value_of("--input") {
            self.input = Some(PathBuf::from(path));
        }
        if args.iter().any(|a| a == "--json") {
            self.format = OutputFormat::Json;
        }
        if let Some(count) = value_of("--count") {
            self.sample_count = count
                .parse()
                .with_context(|| format!("Invalid --count value '{}'", count))?;
        }
        if let Some(seed) = value_of("--seed") {
            self.seed = Some(
                seed.parse()
                    .with_context(|| format!("Invalid --seed value '{}'", seed))?,
            );
        }
        if let Some(min) = value_of("--min-records") {
            self.min_records = min
                .parse()
                .with_context(|| format!("Invalid --min-records value '{}'", min))?;
        }

        Ok(self)
    }
}
