//! Calibration Engine
//!
//! Measures how well-calibrated a person's 75%/95% task-duration intervals
//! are. Implements the Brier score, Murphy's decomposition, calibration
//! curves, overconfidence and planning-fallacy detection and interval
//! scoring, and assembles them into a report with recommendations.

pub mod analyzer;
pub mod error;
pub mod insights;
pub mod record;
pub mod report;
pub mod sample;

pub use analyzer::{CalibrationAnalyzer, MIN_DECOMPOSITION_SAMPLES};
pub use error::CalibrationError;
pub use insights::{ActionableInsight, BiasPoint, EstimateTendency, EstimationOverview, InsightKind};
pub use record::{ConfidenceLevel, PredictionFields, PredictionRecord};
pub use report::{
    BiasDirection, CalibrationCurve, CalibrationQuality, CalibrationReport, CurvePoint,
    EstimationError, IntervalScores, MurphyDecomposition, OverconfidenceInterpretation,
    OverconfidenceMetrics, PrimaryIssue, Priority, Recommendation, TimeEstimationBias,
};
pub use sample::{
    generate_sample_data, generate_sample_data_at, generate_sample_data_seeded, OutcomeScenario,
    ScenarioDistribution, DEFAULT_SAMPLE_COUNT,
};
