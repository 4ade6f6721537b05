//! Dashboard Insights
//!
//! Secondary views over the records and the report: actionable insight
//! cards, the bias-over-time series and headline statistics.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::record::PredictionRecord;
use crate::report::CalibrationReport;

/// At most this many insight cards are produced
pub const MAX_INSIGHTS: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InsightKind {
    Critical,
    Warning,
    Success,
}

impl InsightKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            InsightKind::Critical => "critical",
            InsightKind::Warning => "warning",
            InsightKind::Success => "success",
        }
    }

    pub fn color(&self) -> &'static str {
        match self {
            InsightKind::Critical => "#ff4444",
            InsightKind::Warning => "#ff8800",
            InsightKind::Success => "#00cc88",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionableInsight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: String,
    /// Current value of the metric, in percent
    pub percentage: f64,
    /// Value the user should aim for, in percent
    pub target: f64,
    pub description: String,
    pub action: String,
}

impl ActionableInsight {
    fn new(
        kind: InsightKind,
        title: impl Into<String>,
        percentage: f64,
        target: f64,
        description: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            kind,
            title: title.into(),
            percentage,
            target,
            description: description.into(),
            action: action.into(),
        }
    }
}

impl CalibrationReport {
    /// Insight cards for the dashboard, most severe rules first
    pub fn actionable_insights(&self) -> Vec<ActionableInsight> {
        let mut insights = Vec::new();
        let accuracy75 = self.summary.accuracy75;
        let accuracy95 = self.summary.accuracy95;

        if accuracy75 < 60.0 {
            insights.push(ActionableInsight::new(
                InsightKind::Critical,
                "Poor 75% Calibration",
                accuracy75,
                75.0,
                "Your 75% confidence intervals are missing the mark",
                "Widen your 75% estimates and consider more obstacles",
            ));
        } else if accuracy75 > 85.0 {
            insights.push(ActionableInsight::new(
                InsightKind::Warning,
                "Overconfident at 75%",
                accuracy75,
                75.0,
                "You might be too conservative with your estimates",
                "Try narrowing your confidence ranges slightly",
            ));
        }

        if accuracy95 < 85.0 {
            insights.push(ActionableInsight::new(
                InsightKind::Critical,
                "Poor 95% Calibration",
                accuracy95,
                95.0,
                "Your 95% confidence intervals are too narrow",
                "Consider more extreme scenarios and edge cases",
            ));
        }

        let overconfidence = &self.calibration.overconfidence;
        if overconfidence.is_overconfident {
            insights.push(ActionableInsight::new(
                InsightKind::Warning,
                "Overconfidence Detected",
                (1.0 - overconfidence.overconfidence_score) * 100.0,
                80.0,
                "You consistently underestimate uncertainty",
                "Practice reference class forecasting and consider past similar tasks",
            ));
        }

        if let Some(time_bias) = &self.time_estimation {
            if time_bias.planning_fallacy_present {
                let rate = time_bias.underestimation_rate * 100.0;
                insights.push(ActionableInsight::new(
                    InsightKind::Critical,
                    "Planning Fallacy",
                    rate,
                    40.0,
                    format!("You underestimate {:.0}% of the time", rate),
                    "Add buffer time and break tasks into smaller components",
                ));
            }

            let bias = time_bias.mean_percentage_error;
            if bias.abs() > 15.0 {
                let (label, direction, action) = if bias > 0.0 {
                    ("Optimistic", "under", "Add more buffer time to estimates")
                } else {
                    ("Pessimistic", "over", "Challenge pessimistic assumptions")
                };
                insights.push(ActionableInsight::new(
                    InsightKind::Warning,
                    format!("{} Bias", label),
                    bias.abs(),
                    10.0,
                    format!("You {}estimate by {:.0}% on average", direction, bias.abs()),
                    action,
                ));
            }
        }

        if insights.is_empty() {
            insights.push(ActionableInsight::new(
                InsightKind::Success,
                "Well Calibrated!",
                85.0,
                80.0,
                "Your time estimation skills are excellent",
                "Keep tracking to maintain this calibration level",
            ));
        }

        insights.truncate(MAX_INSIGHTS);
        insights
    }
}

/// One task on the bias-over-time chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BiasPoint {
    /// 1-based position in completion order
    pub index: usize,
    pub task_name: String,
    pub completed_at: DateTime<Utc>,
    pub estimate: f64,
    pub actual: f64,
    /// Positive = overestimated, negative = underestimated
    pub percentage_bias: f64,
}

pub(crate) fn bias_timeline(records: &[PredictionRecord]) -> Vec<BiasPoint> {
    let mut ordered: Vec<&PredictionRecord> = records.iter().collect();
    ordered.sort_by_key(|r| r.completed_at);

    ordered
        .into_iter()
        .enumerate()
        .map(|(i, r)| {
            let estimate = r.point_estimate();
            BiasPoint {
                index: i + 1,
                task_name: r.prediction.task_name.clone(),
                completed_at: r.completed_at,
                estimate,
                actual: r.actual_time,
                percentage_bias: (estimate - r.actual_time) / r.actual_time * 100.0,
            }
        })
        .collect()
}

/// Which way the user's misses usually go
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EstimateTendency {
    Overestimation,
    Underestimation,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EstimationOverview {
    pub total_predictions: usize,
    /// Mean closeness of the 75% midpoint to the actual time, 0-100
    pub average_accuracy: f64,
    /// Sum of actual times, in minutes
    pub total_time_spent: f64,
    pub most_common_bias: EstimateTendency,
}

pub(crate) fn estimation_overview(records: &[PredictionRecord]) -> Option<EstimationOverview> {
    if records.is_empty() {
        return None;
    }

    let n = records.len() as f64;

    let average_accuracy = records
        .iter()
        .map(|r| {
            let midpoint = r.point_estimate();
            let miss = (r.actual_time - midpoint).abs() / midpoint;
            1.0 - miss.min(1.0)
        })
        .sum::<f64>()
        / n;

    let overestimations = records
        .iter()
        .filter(|r| r.actual_time < r.point_estimate())
        .count();

    let most_common_bias = if overestimations as f64 > n / 2.0 {
        EstimateTendency::Overestimation
    } else {
        EstimateTendency::Underestimation
    };

    Some(EstimationOverview {
        total_predictions: records.len(),
        average_accuracy: (average_accuracy * 100.0).round(),
        total_time_spent: records.iter().map(|r| r.actual_time).sum(),
        most_common_bias,
    })
}
