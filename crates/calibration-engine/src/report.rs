//! Calibration Report
//!
//! Result types for each metric plus the assembled report handed to the
//! presentation layer.

use serde::{Deserialize, Serialize};

use crate::record::ConfidenceLevel;

/// Overconfidence beyond this (in either direction) is flagged
pub const OVERCONFIDENCE_THRESHOLD: f64 = 0.05;
/// Overconfidence severity at which it becomes the primary issue
pub const SEVERE_OVERCONFIDENCE: f64 = 0.15;
/// Underestimation rate above which the planning fallacy is reported
pub const PLANNING_FALLACY_RATE: f64 = 0.6;

/// One point of the reliability diagram
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurvePoint {
    /// Stated confidence level
    pub predicted: f64,
    /// Fraction of records whose actual time landed inside the interval
    pub observed: f64,
    pub calibration_error: f64,
    pub count: usize,
}

impl CurvePoint {
    pub fn new(predicted: f64, observed: f64, count: usize) -> Self {
        Self {
            predicted,
            observed,
            calibration_error: (predicted - observed).abs(),
            count,
        }
    }
}

/// Predicted vs observed frequency for both confidence levels
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CalibrationCurve {
    #[serde(rename = "75%")]
    pub seventy_five: CurvePoint,
    #[serde(rename = "95%")]
    pub ninety_five: CurvePoint,
}

impl CalibrationCurve {
    pub fn get(&self, level: ConfidenceLevel) -> &CurvePoint {
        match level {
            ConfidenceLevel::SeventyFive => &self.seventy_five,
            ConfidenceLevel::NinetyFive => &self.ninety_five,
        }
    }

    pub fn points(&self) -> impl Iterator<Item = (ConfidenceLevel, &CurvePoint)> {
        ConfidenceLevel::ALL.into_iter().map(move |level| (level, self.get(level)))
    }
}

/// Murphy's decomposition of the Brier score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MurphyDecomposition {
    /// How far stated levels sit from observed frequencies (lower is better)
    pub reliability: f64,
    /// Spread of observed frequencies around the base rate (higher is better)
    pub resolution: f64,
    /// Base-rate variance, independent of the forecaster
    pub uncertainty: f64,
    /// resolution - reliability
    pub skill: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OverconfidenceInterpretation {
    #[serde(rename = "Well calibrated")]
    WellCalibrated,
    #[serde(rename = "Moderately overconfident")]
    ModeratelyOverconfident,
    #[serde(rename = "Severely overconfident")]
    SeverelyOverconfident,
    #[serde(rename = "Moderately underconfident")]
    ModeratelyUnderconfident,
    #[serde(rename = "Severely underconfident")]
    SeverelyUnderconfident,
}

impl OverconfidenceInterpretation {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s.abs() < OVERCONFIDENCE_THRESHOLD => Self::WellCalibrated,
            s if s > SEVERE_OVERCONFIDENCE => Self::SeverelyOverconfident,
            s if s > OVERCONFIDENCE_THRESHOLD => Self::ModeratelyOverconfident,
            s if s < -SEVERE_OVERCONFIDENCE => Self::SeverelyUnderconfident,
            s if s < -OVERCONFIDENCE_THRESHOLD => Self::ModeratelyUnderconfident,
            _ => Self::WellCalibrated,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::WellCalibrated => "Well calibrated",
            Self::ModeratelyOverconfident => "Moderately overconfident",
            Self::SeverelyOverconfident => "Severely overconfident",
            Self::ModeratelyUnderconfident => "Moderately underconfident",
            Self::SeverelyUnderconfident => "Severely underconfident",
        }
    }
}

impl std::fmt::Display for OverconfidenceInterpretation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Systematic gap between stated confidence and accuracy
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverconfidenceMetrics {
    /// Mean of (predicted - observed); positive means intervals are too narrow
    pub overconfidence_score: f64,
    pub is_overconfident: bool,
    pub is_underconfident: bool,
    pub severity: f64,
    pub interpretation: OverconfidenceInterpretation,
}

impl OverconfidenceMetrics {
    pub fn from_score(score: f64) -> Self {
        Self {
            overconfidence_score: score,
            is_overconfident: score > OVERCONFIDENCE_THRESHOLD,
            is_underconfident: score < -OVERCONFIDENCE_THRESHOLD,
            severity: score.abs(),
            interpretation: OverconfidenceInterpretation::from_score(score),
        }
    }
}

/// Per-record point-estimate error
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationError {
    pub absolute_error: f64,
    pub relative_error: f64,
    pub percentage_error: f64,
    pub underestimated: bool,
    pub estimate: f64,
    pub actual: f64,
}

impl EstimationError {
    pub fn new(estimate: f64, actual: f64) -> Self {
        let relative_error = (estimate - actual) / actual;
        Self {
            absolute_error: (estimate - actual).abs(),
            relative_error,
            percentage_error: relative_error * 100.0,
            underestimated: estimate < actual,
            estimate,
            actual,
        }
    }
}

/// Direction of the average time-estimation error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BiasDirection {
    /// Estimates run low, tasks take longer
    Optimistic,
    /// Estimates run high
    Pessimistic,
    Balanced,
}

impl BiasDirection {
    pub fn from_percentage_error(mean_percentage_error: f64) -> Self {
        if mean_percentage_error > 10.0 {
            BiasDirection::Optimistic
        } else if mean_percentage_error < -10.0 {
            BiasDirection::Pessimistic
        } else {
            BiasDirection::Balanced
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            BiasDirection::Optimistic => "Optimistic",
            BiasDirection::Pessimistic => "Pessimistic",
            BiasDirection::Balanced => "Balanced",
        }
    }
}

/// Planning-fallacy oriented view of the point estimates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimeEstimationBias {
    pub mean_absolute_error: f64,
    pub mean_relative_error: f64,
    pub mean_percentage_error: f64,
    pub underestimation_rate: f64,
    pub planning_fallacy_present: bool,
    pub bias: BiasDirection,
    pub raw_biases: Vec<EstimationError>,
}

/// Mean interval scores (Gneiting & Raftery), lower is better
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalScores {
    pub interval75_score: f64,
    pub interval95_score: f64,
    pub interpretation: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CalibrationQuality {
    Excellent,
    Good,
    Fair,
    Poor,
    #[serde(rename = "Insufficient data")]
    InsufficientData,
}

impl CalibrationQuality {
    /// Grades a Brier score. Zero and NaN are treated as missing.
    pub fn from_brier_score(brier_score: Option<f64>) -> Self {
        match brier_score {
            Some(b) if b > 0.0 => match b {
                b if b < 0.1 => CalibrationQuality::Excellent,
                b if b < 0.2 => CalibrationQuality::Good,
                b if b < 0.3 => CalibrationQuality::Fair,
                _ => CalibrationQuality::Poor,
            },
            _ => CalibrationQuality::InsufficientData,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CalibrationQuality::Excellent => "Excellent",
            CalibrationQuality::Good => "Good",
            CalibrationQuality::Fair => "Fair",
            CalibrationQuality::Poor => "Poor",
            CalibrationQuality::InsufficientData => "Insufficient data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PrimaryIssue {
    Overconfidence,
    #[serde(rename = "Planning Fallacy")]
    PlanningFallacy,
    #[serde(rename = "Time Estimation Bias")]
    TimeEstimationBias,
    #[serde(rename = "Well calibrated")]
    WellCalibrated,
    #[serde(rename = "Insufficient data")]
    InsufficientData,
}

impl PrimaryIssue {
    /// Picks the most pressing problem, checked in priority order.
    pub fn identify(
        overconfidence: &OverconfidenceMetrics,
        time_bias: Option<&TimeEstimationBias>,
    ) -> Self {
        let Some(time_bias) = time_bias else {
            return PrimaryIssue::InsufficientData;
        };

        if overconfidence.severity > SEVERE_OVERCONFIDENCE {
            PrimaryIssue::Overconfidence
        } else if time_bias.planning_fallacy_present {
            PrimaryIssue::PlanningFallacy
        } else if time_bias.mean_percentage_error.abs() > 20.0 {
            PrimaryIssue::TimeEstimationBias
        } else {
            PrimaryIssue::WellCalibrated
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PrimaryIssue::Overconfidence => "Overconfidence",
            PrimaryIssue::PlanningFallacy => "Planning Fallacy",
            PrimaryIssue::TimeEstimationBias => "Time Estimation Bias",
            PrimaryIssue::WellCalibrated => "Well calibrated",
            PrimaryIssue::InsufficientData => "Insufficient data",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Priority {
    High,
    Medium,
    Low,
}

impl Priority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Priority::High => "High",
            Priority::Medium => "Medium",
            Priority::Low => "Low",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recommendation {
    pub issue: String,
    pub recommendation: String,
    pub priority: Priority,
}

impl Recommendation {
    fn new(issue: &str, recommendation: &str, priority: Priority) -> Self {
        Self {
            issue: issue.to_string(),
            recommendation: recommendation.to_string(),
            priority,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportSummary {
    pub total_predictions: usize,
    /// Percent of actual times inside the 75% interval
    pub accuracy75: f64,
    /// Percent of actual times inside the 95% interval
    pub accuracy95: f64,
    pub calibration_quality: CalibrationQuality,
    pub primary_issue: PrimaryIssue,
}

/// Display-ready score strings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportScores {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brier_score: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_score75: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interval_score95: Option<String>,
}

impl ReportScores {
    pub fn new(brier_score: Option<f64>, interval_scores: Option<&IntervalScores>) -> Self {
        Self {
            brier_score: brier_score.map(|b| format!("{:.4}", b)),
            interval_score75: interval_scores.map(|s| format!("{:.2}", s.interval75_score)),
            interval_score95: interval_scores.map(|s| format!("{:.2}", s.interval95_score)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationSection {
    pub curve: CalibrationCurve,
    pub overconfidence: OverconfidenceMetrics,
    pub murphy_decomposition: Option<MurphyDecomposition>,
}

/// Everything the presentation layer needs to render an analysis
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalibrationReport {
    pub summary: ReportSummary,
    pub scores: ReportScores,
    pub calibration: CalibrationSection,
    pub time_estimation: Option<TimeEstimationBias>,
    pub recommendations: Vec<Recommendation>,
}

/// Intermediate results the analyzer hands over for assembly
pub struct ReportInputs {
    pub total_predictions: usize,
    pub brier_score: Option<f64>,
    pub murphy_decomposition: Option<MurphyDecomposition>,
    pub curve: CalibrationCurve,
    pub overconfidence: OverconfidenceMetrics,
    pub time_bias: Option<TimeEstimationBias>,
    pub interval_scores: Option<IntervalScores>,
}

impl CalibrationReport {
    pub fn assemble(inputs: ReportInputs) -> Self {
        let accuracy75 = inputs.curve.seventy_five.observed * 100.0;
        let accuracy95 = inputs.curve.ninety_five.observed * 100.0;

        let summary = ReportSummary {
            total_predictions: inputs.total_predictions,
            accuracy75,
            accuracy95,
            calibration_quality: CalibrationQuality::from_brier_score(inputs.brier_score),
            primary_issue: PrimaryIssue::identify(&inputs.overconfidence, inputs.time_bias.as_ref()),
        };

        let recommendations = generate_recommendations(
            &inputs.overconfidence,
            inputs.time_bias.as_ref(),
            accuracy75,
            accuracy95,
        );

        CalibrationReport {
            summary,
            scores: ReportScores::new(inputs.brier_score, inputs.interval_scores.as_ref()),
            calibration: CalibrationSection {
                curve: inputs.curve,
                overconfidence: inputs.overconfidence,
                murphy_decomposition: inputs.murphy_decomposition,
            },
            time_estimation: inputs.time_bias,
            recommendations,
        }
    }
}

/// Builds the prioritized advice list. Rules fire in a fixed order.
pub fn generate_recommendations(
    overconfidence: &OverconfidenceMetrics,
    time_bias: Option<&TimeEstimationBias>,
    accuracy75: f64,
    accuracy95: f64,
) -> Vec<Recommendation> {
    let mut recs = Vec::new();

    if overconfidence.is_overconfident {
        recs.push(Recommendation::new(
            "Overconfidence",
            "Your confidence intervals are too narrow. Try widening your estimates and considering more potential obstacles.",
            Priority::High,
        ));
    }

    if time_bias.map(|b| b.planning_fallacy_present).unwrap_or(false) {
        recs.push(Recommendation::new(
            "Planning Fallacy",
            "You consistently underestimate time. Use reference class forecasting: look at similar past tasks.",
            Priority::High,
        ));
    }

    if accuracy75 < 65.0 {
        recs.push(Recommendation::new(
            "Poor 75% Calibration",
            "Your 75% confidence intervals should contain the actual time about 75% of the time. Adjust your uncertainty assessment.",
            Priority::Medium,
        ));
    }

    if accuracy95 < 85.0 {
        recs.push(Recommendation::new(
            "Poor 95% Calibration",
            "Your 95% intervals are too narrow. Consider more extreme scenarios and edge cases.",
            Priority::Medium,
        ));
    }

    if recs.is_empty() {
        recs.push(Recommendation::new(
            "Well Calibrated",
            "Great job! Your time estimation skills are well calibrated. Continue tracking to maintain this level.",
            Priority::Low,
        ));
    }

    recs
}
