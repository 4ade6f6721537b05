//! Calibration Analysis
//!
//! Scores how well stated 75%/95% duration intervals match what actually
//! happened. Every metric is a pure function of the records ingested so far.
//!
//! References:
//! - Brier (1950): quadratic scoring rule
//! - Murphy (1973): reliability / resolution / uncertainty decomposition
//! - Gneiting & Raftery (2007): interval score

use chrono::Utc;
use tracing::{debug, warn};

use crate::error::{CalibrationError, Result};
use crate::insights::{BiasPoint, EstimationOverview};
use crate::record::{ConfidenceLevel, PredictionFields, PredictionRecord};
use crate::report::{
    BiasDirection, CalibrationCurve, CalibrationReport, CurvePoint, EstimationError,
    IntervalScores, MurphyDecomposition, OverconfidenceMetrics, ReportInputs,
    TimeEstimationBias, PLANNING_FALLACY_RATE,
};

/// Minimum records before Murphy's decomposition is meaningful
pub const MIN_DECOMPOSITION_SAMPLES: usize = 5;

const INTERVAL_SCORE_NOTE: &str = "Lower scores indicate better interval forecasts";

/// Accumulates completed predictions and computes calibration metrics
#[derive(Debug, Clone, Default)]
pub struct CalibrationAnalyzer {
    predictions: Vec<PredictionRecord>,
}

impl CalibrationAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a completed prediction. No validation: malformed numbers flow
    /// through as NaN. Use [`try_add_prediction`](Self::try_add_prediction)
    /// to reject them instead.
    pub fn add_prediction(&mut self, prediction: PredictionFields, actual_time: f64) {
        debug!(
            task = %prediction.task_name,
            actual_time,
            "Adding completed prediction"
        );
        self.predictions
            .push(PredictionRecord::new(prediction, actual_time, Utc::now()));
    }

    /// Record a completed prediction after checking its numeric fields
    pub fn try_add_prediction(&mut self, prediction: PredictionFields, actual_time: f64) -> Result<()> {
        if let Err(e) = prediction.validate(actual_time) {
            warn!(task = %prediction.task_name, error = %e, "Rejecting prediction");
            return Err(e);
        }
        self.add_prediction(prediction, actual_time);
        Ok(())
    }

    /// Add every exported record that is completed and has an actual time.
    /// Returns how many were ingested.
    pub fn ingest_completed<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = PredictionFields>,
    {
        let mut ingested = 0;
        for record in records {
            if let Some(actual_time) = record.completed_actual_time() {
                self.add_prediction(record, actual_time);
                ingested += 1;
            }
        }
        debug!(ingested, total = self.predictions.len(), "Ingested completed predictions");
        ingested
    }

    pub fn predictions(&self) -> &[PredictionRecord] {
        &self.predictions
    }

    pub fn len(&self) -> usize {
        self.predictions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.predictions.is_empty()
    }

    fn hits(&self, level: ConfidenceLevel) -> usize {
        self.predictions.iter().filter(|p| p.within(level)).count()
    }

    /// Fraction of records inside the interval; 0 when empty
    fn hit_frequency(&self, level: ConfidenceLevel) -> f64 {
        if self.predictions.is_empty() {
            0.0
        } else {
            self.hits(level) as f64 / self.predictions.len() as f64
        }
    }

    /// Mean over both levels of (nominal - hit)^2, averaged across records.
    /// Lower is better.
    pub fn calculate_brier_score(&self) -> Option<f64> {
        if self.predictions.is_empty() {
            return None;
        }

        let total: f64 = self
            .predictions
            .iter()
            .map(|p| {
                ConfidenceLevel::ALL
                    .iter()
                    .map(|&level| {
                        let outcome = if p.within(level) { 1.0 } else { 0.0 };
                        (level.nominal() - outcome).powi(2)
                    })
                    .sum::<f64>()
                    / ConfidenceLevel::ALL.len() as f64
            })
            .sum();

        Some(total / self.predictions.len() as f64)
    }

    /// Splits calibration into reliability, resolution and uncertainty.
    ///
    /// Every record contributes one outcome per level, so each level's weight
    /// is always one half.
    pub fn calculate_murphy_decomposition(&self) -> Option<MurphyDecomposition> {
        if self.predictions.len() < MIN_DECOMPOSITION_SAMPLES {
            return None;
        }

        let n = self.predictions.len() as f64;
        let total_outcomes = n * ConfidenceLevel::ALL.len() as f64;
        let total_hits: usize = ConfidenceLevel::ALL.iter().map(|&l| self.hits(l)).sum();

        let base_rate = total_hits as f64 / total_outcomes;
        let uncertainty = base_rate * (1.0 - base_rate);

        let mut reliability = 0.0;
        let mut resolution = 0.0;

        for level in ConfidenceLevel::ALL {
            let frequency = self.hit_frequency(level);
            let weight = n / total_outcomes;

            reliability += weight * (level.nominal() - frequency).powi(2);
            resolution += weight * (frequency - base_rate).powi(2);
        }

        Some(MurphyDecomposition {
            reliability,
            resolution,
            uncertainty,
            skill: resolution - reliability,
        })
    }

    /// Observed hit frequency against stated confidence, over all records
    pub fn calculate_calibration_curve(&self) -> CalibrationCurve {
        let count = self.predictions.len();
        let point = |level: ConfidenceLevel| {
            CurvePoint::new(level.nominal(), self.hit_frequency(level), count)
        };

        CalibrationCurve {
            seventy_five: point(ConfidenceLevel::SeventyFive),
            ninety_five: point(ConfidenceLevel::NinetyFive),
        }
    }

    /// Positive score = intervals too narrow, negative = too wide
    pub fn calculate_overconfidence_metrics(&self) -> OverconfidenceMetrics {
        let curve = self.calculate_calibration_curve();

        let gaps: Vec<f64> = curve
            .points()
            .filter(|(_, point)| point.count > 0)
            .map(|(_, point)| point.predicted - point.observed)
            .collect();

        let score = if gaps.is_empty() {
            0.0
        } else {
            gaps.iter().sum::<f64>() / gaps.len() as f64
        };

        OverconfidenceMetrics::from_score(score)
    }

    /// Compares the 75% midpoint against the actual time for every record
    pub fn calculate_time_estimation_bias(&self) -> Option<TimeEstimationBias> {
        if self.predictions.is_empty() {
            return None;
        }

        let raw_biases: Vec<EstimationError> = self
            .predictions
            .iter()
            .map(|p| EstimationError::new(p.point_estimate(), p.actual_time))
            .collect();

        let n = raw_biases.len() as f64;
        let mean = |f: fn(&EstimationError) -> f64| raw_biases.iter().map(f).sum::<f64>() / n;

        let mean_absolute_error = mean(|b| b.absolute_error);
        let mean_relative_error = mean(|b| b.relative_error);
        let mean_percentage_error = mean(|b| b.percentage_error);
        let underestimation_rate = raw_biases.iter().filter(|b| b.underestimated).count() as f64 / n;

        Some(TimeEstimationBias {
            mean_absolute_error,
            mean_relative_error,
            mean_percentage_error,
            underestimation_rate,
            planning_fallacy_present: underestimation_rate > PLANNING_FALLACY_RATE,
            bias: BiasDirection::from_percentage_error(mean_percentage_error),
            raw_biases,
        })
    }

    /// Width plus (2/alpha) times the miss distance, averaged per level
    pub fn calculate_interval_score(&self) -> Option<IntervalScores> {
        if self.predictions.is_empty() {
            return None;
        }

        let n = self.predictions.len() as f64;
        let mean_score = |level: ConfidenceLevel| {
            self.predictions
                .iter()
                .map(|p| {
                    let (lower, upper) = p.prediction.bounds(level);
                    interval_score(lower, upper, p.actual_time, level.alpha())
                })
                .sum::<f64>()
                / n
        };

        Some(IntervalScores {
            interval75_score: mean_score(ConfidenceLevel::SeventyFive),
            interval95_score: mean_score(ConfidenceLevel::NinetyFive),
            interpretation: INTERVAL_SCORE_NOTE.to_string(),
        })
    }

    /// Percentage bias per task in completion order
    pub fn calculate_bias_timeline(&self) -> Vec<BiasPoint> {
        crate::insights::bias_timeline(&self.predictions)
    }

    /// Headline dashboard numbers
    pub fn calculate_estimation_overview(&self) -> Option<EstimationOverview> {
        crate::insights::estimation_overview(&self.predictions)
    }

    /// Runs every metric and assembles the full report
    pub fn generate_calibration_report(&self) -> Result<CalibrationReport> {
        if self.predictions.is_empty() {
            return Err(CalibrationError::NoPredictions);
        }

        debug!(predictions = self.predictions.len(), "Generating calibration report");

        let report = CalibrationReport::assemble(ReportInputs {
            total_predictions: self.predictions.len(),
            brier_score: self.calculate_brier_score(),
            murphy_decomposition: self.calculate_murphy_decomposition(),
            curve: self.calculate_calibration_curve(),
            overconfidence: self.calculate_overconfidence_metrics(),
            time_bias: self.calculate_time_estimation_bias(),
            interval_scores: self.calculate_interval_score(),
        });

        debug!(
            quality = report.summary.calibration_quality.as_str(),
            primary_issue = report.summary.primary_issue.as_str(),
            recommendations = report.recommendations.len(),
            "Calibration report ready"
        );

        Ok(report)
    }
}

fn interval_score(lower: f64, upper: f64, actual: f64, alpha: f64) -> f64 {
    let width = upper - lower;
    if actual < lower {
        width + (2.0 / alpha) * (lower - actual)
    } else if actual > upper {
        width + (2.0 / alpha) * (actual - upper)
    } else {
        width
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{OverconfidenceInterpretation, Priority};

    const EPS: f64 = 1e-9;

    fn fields(min75: f64, max75: f64, min95: f64, max95: f64) -> PredictionFields {
        PredictionFields::new(min75, max75, min95, max95)
    }

    /// 10 records: 6 inside both intervals, 3 inside only the 95%, 1 outside both
    fn mixed_analyzer() -> CalibrationAnalyzer {
        let mut analyzer = CalibrationAnalyzer::new();
        for _ in 0..6 {
            analyzer.add_prediction(fields(40.0, 60.0, 30.0, 80.0), 50.0);
        }
        for _ in 0..3 {
            analyzer.add_prediction(fields(40.0, 60.0, 30.0, 80.0), 70.0);
        }
        analyzer.add_prediction(fields(40.0, 60.0, 30.0, 80.0), 100.0);
        analyzer
    }

    #[test]
    fn test_perfect_hit_brier_contribution() {
        let mut analyzer = CalibrationAnalyzer::new();
        analyzer.add_prediction(fields(40.0, 60.0, 30.0, 80.0), 50.0);

        let brier = analyzer.calculate_brier_score().unwrap();
        assert!((brier - 0.0325).abs() < EPS);
    }

    #[test]
    fn test_outside_75_inside_95() {
        let mut analyzer = CalibrationAnalyzer::new();
        analyzer.add_prediction(fields(45.0, 75.0, 30.0, 120.0), 85.0);

        let record = &analyzer.predictions()[0];
        assert!(!record.within(ConfidenceLevel::SeventyFive));
        assert!(record.within(ConfidenceLevel::NinetyFive));

        let brier = analyzer.calculate_brier_score().unwrap();
        assert!((brier - 0.2825).abs() < EPS);
    }

    #[test]
    fn test_empty_analyzer() {
        let analyzer = CalibrationAnalyzer::new();

        assert!(analyzer.is_empty());
        assert_eq!(analyzer.calculate_brier_score(), None);
        assert_eq!(analyzer.calculate_murphy_decomposition(), None);
        assert_eq!(analyzer.calculate_time_estimation_bias(), None);
        assert_eq!(analyzer.calculate_interval_score(), None);
        assert_eq!(analyzer.calculate_estimation_overview(), None);

        let curve = analyzer.calculate_calibration_curve();
        assert_eq!(curve.seventy_five.observed, 0.0);
        assert_eq!(curve.ninety_five.observed, 0.0);
        assert_eq!(curve.seventy_five.count, 0);

        let overconfidence = analyzer.calculate_overconfidence_metrics();
        assert_eq!(overconfidence.overconfidence_score, 0.0);
        assert_eq!(overconfidence.interpretation, OverconfidenceInterpretation::WellCalibrated);
    }

    #[test]
    fn test_empty_report_error() {
        let analyzer = CalibrationAnalyzer::new();
        let err = analyzer.generate_calibration_report().unwrap_err();

        assert_eq!(err, CalibrationError::NoPredictions);
        assert_eq!(err.to_string(), "No predictions available for analysis");
    }

    #[test]
    fn test_mixed_accuracy_scenario() {
        let analyzer = mixed_analyzer();

        let curve = analyzer.calculate_calibration_curve();
        assert!((curve.seventy_five.observed - 0.6).abs() < EPS);
        assert!((curve.ninety_five.observed - 0.9).abs() < EPS);
        assert!((curve.seventy_five.calibration_error - 0.15).abs() < EPS);
        assert_eq!(curve.ninety_five.count, 10);

        let overconfidence = analyzer.calculate_overconfidence_metrics();
        assert!((overconfidence.overconfidence_score - 0.10).abs() < EPS);
        assert!(overconfidence.is_overconfident);
        assert!(!overconfidence.is_underconfident);
        assert_eq!(
            overconfidence.interpretation,
            OverconfidenceInterpretation::ModeratelyOverconfident
        );

        let report = analyzer.generate_calibration_report().unwrap();
        assert_eq!(report.summary.total_predictions, 10);
        assert!((report.summary.accuracy75 - 60.0).abs() < 1e-6);
        assert!((report.summary.accuracy95 - 90.0).abs() < 1e-6);
    }

    #[test]
    fn test_murphy_requires_five_records() {
        let mut analyzer = CalibrationAnalyzer::new();
        for _ in 0..4 {
            analyzer.add_prediction(fields(40.0, 60.0, 30.0, 80.0), 50.0);
        }
        assert!(analyzer.calculate_murphy_decomposition().is_none());

        analyzer.add_prediction(fields(40.0, 60.0, 30.0, 80.0), 50.0);
        assert!(analyzer.calculate_murphy_decomposition().is_some());
    }

    #[test]
    fn test_murphy_decomposition_values() {
        let analyzer = mixed_analyzer();
        let murphy = analyzer.calculate_murphy_decomposition().unwrap();

        // 15 hits out of 20 outcomes
        let base_rate = 0.75;
        assert!((murphy.uncertainty - base_rate * (1.0 - base_rate)).abs() < EPS);

        let reliability = 0.5 * (0.75_f64 - 0.6).powi(2) + 0.5 * (0.95_f64 - 0.9).powi(2);
        let resolution = 0.5 * (0.6_f64 - base_rate).powi(2) + 0.5 * (0.9_f64 - base_rate).powi(2);
        assert!((murphy.reliability - reliability).abs() < EPS);
        assert!((murphy.resolution - resolution).abs() < EPS);
        assert!((murphy.skill - (resolution - reliability)).abs() < EPS);
    }

    #[test]
    fn test_underestimation_counting() {
        let mut analyzer = CalibrationAnalyzer::new();
        analyzer.add_prediction(fields(20.0, 40.0, 10.0, 60.0), 50.0);
        analyzer.add_prediction(fields(20.0, 40.0, 10.0, 60.0), 25.0);

        let bias = analyzer.calculate_time_estimation_bias().unwrap();
        assert!(bias.raw_biases[0].underestimated);
        assert_eq!(bias.raw_biases[0].estimate, 30.0);
        assert!(!bias.raw_biases[1].underestimated);
        assert!((bias.underestimation_rate - 0.5).abs() < EPS);
        assert!(!bias.planning_fallacy_present);

        // (30-50)/50 = -40%, (30-25)/25 = +20%
        assert!((bias.mean_percentage_error - (-10.0)).abs() < EPS);
        assert!((bias.mean_absolute_error - 12.5).abs() < EPS);
        assert_eq!(bias.bias, BiasDirection::Balanced);
    }

    #[test]
    fn test_planning_fallacy_detected() {
        let mut analyzer = CalibrationAnalyzer::new();
        for _ in 0..7 {
            analyzer.add_prediction(fields(20.0, 40.0, 10.0, 60.0), 45.0);
        }
        for _ in 0..3 {
            analyzer.add_prediction(fields(20.0, 40.0, 10.0, 60.0), 30.0);
        }

        let bias = analyzer.calculate_time_estimation_bias().unwrap();
        assert!((bias.underestimation_rate - 0.7).abs() < EPS);
        assert!(bias.planning_fallacy_present);
    }

    #[test]
    fn test_interval_score_inside_bounds_is_width() {
        let mut analyzer = CalibrationAnalyzer::new();
        analyzer.add_prediction(fields(40.0, 60.0, 30.0, 80.0), 50.0);

        let scores = analyzer.calculate_interval_score().unwrap();
        assert_eq!(scores.interval75_score, 20.0);
        assert_eq!(scores.interval95_score, 50.0);
        assert_eq!(scores.interpretation, "Lower scores indicate better interval forecasts");
    }

    #[test]
    fn test_interval_score_penalties() {
        // Over by 10 on the 75% interval: 30 + 8*10; inside the 95% interval
        assert_eq!(interval_score(45.0, 75.0, 85.0, 0.25), 110.0);
        // Under by 5 on the 95% interval: 90 + 40*5
        assert_eq!(interval_score(30.0, 120.0, 25.0, 0.05), 290.0);
    }

    #[test]
    fn test_idempotent_calculations() {
        let analyzer = mixed_analyzer();

        assert_eq!(analyzer.calculate_brier_score(), analyzer.calculate_brier_score());
        assert_eq!(
            analyzer.calculate_murphy_decomposition(),
            analyzer.calculate_murphy_decomposition()
        );
        assert_eq!(
            analyzer.calculate_calibration_curve(),
            analyzer.calculate_calibration_curve()
        );
        assert_eq!(
            analyzer.calculate_overconfidence_metrics(),
            analyzer.calculate_overconfidence_metrics()
        );
        assert_eq!(
            analyzer.calculate_time_estimation_bias(),
            analyzer.calculate_time_estimation_bias()
        );
        assert_eq!(
            analyzer.calculate_interval_score(),
            analyzer.calculate_interval_score()
        );
        assert_eq!(
            analyzer.calculate_bias_timeline(),
            analyzer.calculate_bias_timeline()
        );
        assert_eq!(
            analyzer.calculate_estimation_overview(),
            analyzer.calculate_estimation_overview()
        );
        assert_eq!(
            analyzer.generate_calibration_report().unwrap(),
            analyzer.generate_calibration_report().unwrap()
        );
    }

    #[test]
    fn test_report_assembly() {
        let analyzer = mixed_analyzer();
        let report = analyzer.generate_calibration_report().unwrap();

        assert!(report.calibration.murphy_decomposition.is_some());
        assert!(report.time_estimation.is_some());
        assert_eq!(report.scores.brier_score.as_deref().map(|s| s.len()), Some(6));

        let issues: Vec<&str> = report.recommendations.iter().map(|r| r.issue.as_str()).collect();
        assert_eq!(issues, vec!["Overconfidence", "Poor 75% Calibration"]);
        assert_eq!(report.recommendations[0].priority, Priority::High);
    }

    #[test]
    fn test_report_json_shape() {
        let analyzer = mixed_analyzer();
        let report = analyzer.generate_calibration_report().unwrap();
        let json = serde_json::to_value(&report).unwrap();

        assert_eq!(json["summary"]["totalPredictions"], 10);
        assert_eq!(json["summary"]["primaryIssue"], "Well calibrated");
        assert_eq!(json["calibration"]["curve"]["75%"]["predicted"], 0.75);
        assert_eq!(
            json["calibration"]["overconfidence"]["interpretation"],
            "Moderately overconfident"
        );
        assert!(json["timeEstimation"]["rawBiases"].is_array());
        assert!(json["scores"]["intervalScore95"].is_string());
    }

    #[test]
    fn test_nan_propagates_without_panic() {
        let mut analyzer = CalibrationAnalyzer::new();
        analyzer.add_prediction(fields(f64::NAN, 60.0, 30.0, 80.0), 50.0);

        let bias = analyzer.calculate_time_estimation_bias().unwrap();
        assert!(bias.mean_percentage_error.is_nan());
        assert!(analyzer.calculate_interval_score().unwrap().interval75_score.is_nan());
        assert!(analyzer.generate_calibration_report().is_ok());
    }

    #[test]
    fn test_try_add_prediction_rejects_malformed() {
        let mut analyzer = CalibrationAnalyzer::new();

        assert!(analyzer.try_add_prediction(fields(20.0, 40.0, 10.0, 60.0), 30.0).is_ok());
        assert!(analyzer.try_add_prediction(fields(f64::NAN, 40.0, 10.0, 60.0), 30.0).is_err());
        assert!(analyzer.try_add_prediction(fields(20.0, 40.0, 10.0, 60.0), -1.0).is_err());
        assert_eq!(analyzer.len(), 1);
    }

    #[test]
    fn test_ingest_completed_skips_pending() {
        let mut done = fields(20.0, 40.0, 10.0, 60.0);
        done.is_completed = true;
        done.actual_time = Some(35.0);

        let mut pending = fields(20.0, 40.0, 10.0, 60.0);
        pending.actual_time = Some(35.0);

        let mut missing_time = fields(20.0, 40.0, 10.0, 60.0);
        missing_time.is_completed = true;

        let mut analyzer = CalibrationAnalyzer::new();
        let ingested = analyzer.ingest_completed(vec![done, pending, missing_time]);

        assert_eq!(ingested, 1);
        assert_eq!(analyzer.len(), 1);
        assert_eq!(analyzer.predictions()[0].actual_time, 35.0);
    }
}
