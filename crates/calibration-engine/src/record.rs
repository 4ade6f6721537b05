//! Prediction Records
//!
//! The input side of the engine: what a caller predicted for a task and the
//! record the analyzer keeps once the actual duration is known.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CalibrationError, Result};

/// Nominal confidence level of a predicted interval
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ConfidenceLevel {
    /// 75% interval
    #[serde(rename = "75%")]
    SeventyFive,
    /// 95% interval
    #[serde(rename = "95%")]
    NinetyFive,
}

impl ConfidenceLevel {
    pub const ALL: [ConfidenceLevel; 2] = [ConfidenceLevel::SeventyFive, ConfidenceLevel::NinetyFive];

    /// Stated probability that the interval contains the actual time
    pub fn nominal(&self) -> f64 {
        match self {
            ConfidenceLevel::SeventyFive => 0.75,
            ConfidenceLevel::NinetyFive => 0.95,
        }
    }

    /// Miscoverage rate used by the interval score
    pub fn alpha(&self) -> f64 {
        match self {
            ConfidenceLevel::SeventyFive => 0.25,
            ConfidenceLevel::NinetyFive => 0.05,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLevel::SeventyFive => "75%",
            ConfidenceLevel::NinetyFive => "95%",
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A task prediction as exported by the persistence layer.
///
/// Only the four interval bounds feed the math. Everything else is carried
/// through untouched so records survive a load/analyze/export cycle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub task_name: String,
    #[serde(default)]
    pub is_project: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub success_criteria: Option<String>,
    pub confidence75_min: f64,
    pub confidence75_max: f64,
    pub confidence95_min: f64,
    pub confidence95_max: f64,
    /// Self-reported confidence slider (0-100)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intensity: Option<f64>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    /// Actual time in minutes, present once the task is completed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actual_time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reflection: Option<String>,
    #[serde(default)]
    pub is_completed: bool,
}

impl PredictionFields {
    /// Bare prediction with just the two intervals
    pub fn new(
        confidence75_min: f64,
        confidence75_max: f64,
        confidence95_min: f64,
        confidence95_max: f64,
    ) -> Self {
        Self {
            confidence75_min,
            confidence75_max,
            confidence95_min,
            confidence95_max,
            ..Default::default()
        }
    }

    pub fn with_task_name(mut self, task_name: impl Into<String>) -> Self {
        self.task_name = task_name.into();
        self
    }

    /// `(lower, upper)` bounds for a confidence level
    pub fn bounds(&self, level: ConfidenceLevel) -> (f64, f64) {
        match level {
            ConfidenceLevel::SeventyFive => (self.confidence75_min, self.confidence75_max),
            ConfidenceLevel::NinetyFive => (self.confidence95_min, self.confidence95_max),
        }
    }

    /// Midpoint of the 75% interval, used as the point estimate
    pub fn point_estimate(&self) -> f64 {
        (self.confidence75_min + self.confidence75_max) / 2.0
    }

    /// Stored actual time if this record has been completed
    pub fn completed_actual_time(&self) -> Option<f64> {
        if self.is_completed {
            self.actual_time
        } else {
            None
        }
    }

    /// Checks the numeric fields the analyzer depends on.
    pub fn validate(&self, actual_time: f64) -> Result<()> {
        for level in ConfidenceLevel::ALL {
            let (lower, upper) = self.bounds(level);
            if !lower.is_finite() || !upper.is_finite() {
                return Err(CalibrationError::InvalidPrediction(format!(
                    "{} interval bounds must be finite numbers",
                    level
                )));
            }
            if lower > upper {
                return Err(CalibrationError::InvalidPrediction(format!(
                    "{} interval is inverted ({} > {})",
                    level, lower, upper
                )));
            }
        }

        if !actual_time.is_finite() || actual_time <= 0.0 {
            return Err(CalibrationError::InvalidPrediction(format!(
                "actual time must be a positive number, got {}",
                actual_time
            )));
        }

        Ok(())
    }
}

/// A completed prediction held by the analyzer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PredictionRecord {
    pub prediction: PredictionFields,
    /// Actual time taken, in minutes
    pub actual_time: f64,
    /// When the analyzer ingested the outcome
    pub completed_at: DateTime<Utc>,
}

impl PredictionRecord {
    pub fn new(prediction: PredictionFields, actual_time: f64, completed_at: DateTime<Utc>) -> Self {
        Self {
            prediction,
            actual_time,
            completed_at,
        }
    }

    /// Whether the actual time falls inside the interval (bounds inclusive).
    /// NaN anywhere compares false, so malformed records never count as hits.
    pub fn within(&self, level: ConfidenceLevel) -> bool {
        let (lower, upper) = self.prediction.bounds(level);
        self.actual_time >= lower && self.actual_time <= upper
    }

    pub fn point_estimate(&self) -> f64 {
        self.prediction.point_estimate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(min75: f64, max75: f64, min95: f64, max95: f64, actual: f64) -> PredictionRecord {
        PredictionRecord::new(PredictionFields::new(min75, max75, min95, max95), actual, Utc::now())
    }

    #[test]
    fn test_within_is_inclusive() {
        let r = record(45.0, 75.0, 30.0, 120.0, 75.0);
        assert!(r.within(ConfidenceLevel::SeventyFive));
        assert!(r.within(ConfidenceLevel::NinetyFive));

        let r = record(45.0, 75.0, 30.0, 120.0, 85.0);
        assert!(!r.within(ConfidenceLevel::SeventyFive));
        assert!(r.within(ConfidenceLevel::NinetyFive));
    }

    #[test]
    fn test_nan_never_hits() {
        let r = record(f64::NAN, 75.0, 30.0, 120.0, 50.0);
        assert!(!r.within(ConfidenceLevel::SeventyFive));
        assert!(r.within(ConfidenceLevel::NinetyFive));
    }

    #[test]
    fn test_validate() {
        let fields = PredictionFields::new(20.0, 40.0, 10.0, 60.0);
        assert!(fields.validate(30.0).is_ok());
        assert!(fields.validate(0.0).is_err());
        assert!(fields.validate(f64::NAN).is_err());

        let inverted = PredictionFields::new(40.0, 20.0, 10.0, 60.0);
        assert!(matches!(
            inverted.validate(30.0),
            Err(CalibrationError::InvalidPrediction(_))
        ));

        let infinite = PredictionFields::new(20.0, 40.0, 10.0, f64::INFINITY);
        assert!(infinite.validate(30.0).is_err());
    }

    #[test]
    fn test_deserialize_exported_prediction() {
        let json = r##"{
            "id": "1718000000000",
            "taskName": "Write unit tests",
            "isProject": false,
            "successCriteria": "All green",
            "confidence75Min": 30,
            "confidence75Max": 45,
            "confidence95Min": 20,
            "confidence95Max": 60,
            "confidenceLevel": 80,
            "intensity": 5,
            "tags": ["#testing"],
            "createdAt": "2024-06-10T09:00:00Z",
            "completedAt": "2024-06-10T10:00:00Z",
            "actualTime": 50,
            "isCompleted": true
        }"##;

        let fields: PredictionFields = serde_json::from_str(json).unwrap();
        assert_eq!(fields.task_name, "Write unit tests");
        assert_eq!(fields.bounds(ConfidenceLevel::NinetyFive), (20.0, 60.0));
        assert_eq!(fields.completed_actual_time(), Some(50.0));
        assert_eq!(fields.point_estimate(), 37.5);
    }

    #[test]
    fn test_pending_prediction_has_no_actual_time() {
        let json = r#"{
            "taskName": "Plan sprint",
            "confidence75Min": 30,
            "confidence75Max": 45,
            "confidence95Min": 20,
            "confidence95Max": 60,
            "isCompleted": false
        }"#;

        let fields: PredictionFields = serde_json::from_str(json).unwrap();
        assert_eq!(fields.completed_actual_time(), None);
        assert!(fields.tags.is_empty());
    }
}
