use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CalibrationError {
    #[error("No predictions available for analysis")]
    NoPredictions,

    #[error("Invalid prediction: {0}")]
    InvalidPrediction(String),
}

pub type Result<T> = std::result::Result<T, CalibrationError>;
