//! calibration-report: Analyze completed time predictions and print a
//! calibration report.
//!
//! Reads a JSON export of stored predictions when one is given. With too few
//! completed predictions (or no input at all) it analyzes seeded sample data
//! instead.
//!
//! Usage:
//!   cargo run -p calibration-report
//!   cargo run -p calibration-report -- --input predictions.json
//!   cargo run -p calibration-report -- --seed 42 --count 40 --json

mod config;
mod render;

use anyhow::{Context, Result};
use chrono::Utc;
use std::path::Path;

use calibration_engine::{generate_sample_data_seeded, CalibrationAnalyzer, PredictionFields};
use config::{OutputFormat, ReportConfig};

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "calibration_report=info,calibration_engine=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().collect();
    let config = ReportConfig::from_env()?.apply_args(&args)?;
    tracing::debug!(?config, "Loaded configuration");

    let records = load_predictions(&config)?;

    let mut analyzer = CalibrationAnalyzer::new();
    let ingested = analyzer.ingest_completed(records);
    tracing::info!("Analyzing {} completed predictions", ingested);

    let output = match analyzer.generate_calibration_report() {
        Ok(report) => match config.format {
            OutputFormat::Json => serde_json::to_string_pretty(&report)?,
            OutputFormat::Text => {
                render::render_text(&report, analyzer.calculate_estimation_overview().as_ref())
            }
        },
        Err(e) => {
            tracing::warn!("{}", e);
            match config.format {
                OutputFormat::Json => {
                    serde_json::to_string_pretty(&serde_json::json!({ "error": e.to_string() }))?
                }
                OutputFormat::Text => e.to_string(),
            }
        }
    };

    println!("{}", output);
    Ok(())
}

/// Stored predictions from the configured export, or sample data when the
/// export is missing or holds too few completed predictions.
fn load_predictions(config: &ReportConfig) -> Result<Vec<PredictionFields>> {
    if let Some(path) = &config.input {
        let stored = read_export(path)?;
        let completed = stored
            .iter()
            .filter(|p| p.completed_actual_time().is_some())
            .count();

        if completed >= config.min_records {
            tracing::info!(
                "Loaded {} predictions ({} completed) from {}",
                stored.len(),
                completed,
                path.display()
            );
            return Ok(stored);
        }

        tracing::warn!(
            "Only {} completed predictions in {} (need {}), using sample data",
            completed,
            path.display(),
            config.min_records
        );
    }

    let seed = config.seed.unwrap_or_else(rand::random);
    tracing::info!("Generating {} sample predictions (seed {})", config.sample_count, seed);
    Ok(generate_sample_data_seeded(seed, config.sample_count, Utc::now()))
}

fn read_export(path: &Path) -> Result<Vec<PredictionFields>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read predictions from {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse predictions in {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_temp(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(format!(
            "calibration-report-{}-{}.json",
            name,
            std::process::id()
        ));
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const EXPORT: &str = r#"[
        {"taskName": "a", "confidence75Min": 20, "confidence75Max": 40, "confidence95Min": 10, "confidence95Max": 60, "actualTime": 30, "isCompleted": true},
        {"taskName": "b", "confidence75Min": 20, "confidence75Max": 40, "confidence95Min": 10, "confidence95Max": 60, "actualTime": 45, "isCompleted": true},
        {"taskName": "c", "confidence75Min": 20, "confidence75Max": 40, "confidence95Min": 10, "confidence95Max": 60, "actualTime": 70, "isCompleted": true},
        {"taskName": "d", "confidence75Min": 20, "confidence75Max": 40, "confidence95Min": 10, "confidence95Max": 60, "isCompleted": false}
    ]"#;

    #[test]
    fn test_loads_export_with_enough_records() {
        let path = write_temp("enough", EXPORT);
        let config = ReportConfig {
            input: Some(path.clone()),
            ..ReportConfig::default()
        };

        let records = load_predictions(&config).unwrap();
        assert_eq!(records.len(), 4);
        assert_eq!(records[0].task_name, "a");

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_falls_back_to_sample_data() {
        let path = write_temp("sparse", EXPORT);
        let config = ReportConfig {
            input: Some(path.clone()),
            min_records: 10,
            sample_count: 7,
            seed: Some(1),
            ..ReportConfig::default()
        };

        let records = load_predictions(&config).unwrap();
        assert_eq!(records.len(), 7);
        assert!(records.iter().all(|r| r.id.as_deref().unwrap_or("").starts_with("sample-")));

        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_malformed_export_is_an_error() {
        let path = write_temp("broken", "{not json");
        let err = read_export(&path).unwrap_err();
        assert!(err.to_string().contains("Failed to parse predictions"));
        std::fs::remove_file(path).ok();
    }
}
