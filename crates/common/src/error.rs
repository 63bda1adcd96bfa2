//! Unified error type for aloft.

use chrono::NaiveDate;
use thiserror::Error;

use crate::types::Property;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Environment has no data yet, fetch before querying")]
    NotInitialized,

    #[error("{0:?} is not a valid property (valid: temp, humidity, windSpeed, windDirection)")]
    InvalidProperty(String),

    #[error("{0} is valid, but was not requested in the last fetch")]
    PropertyNotFetched(Property),

    #[error("Height {height} m out of bounds (0..={max} m)")]
    HeightOutOfRange { height: f64, max: f64 },

    #[error("Hour {hour} out of bounds (grid holds {hours} hours)")]
    HourOutOfRange { hour: usize, hours: usize },

    #[error("Height step {step} out of bounds (table has {steps} steps)")]
    StepOutOfRange { step: usize, steps: usize },

    #[error("{0} is not a valid forecast range, days must be 1, 3, 7, 14, or 16")]
    InvalidDays(u32),

    #[error("Invalid date range: {start} is after {end}")]
    InvalidDateRange { start: NaiveDate, end: NaiveDate },

    #[error("At least one property must be requested")]
    NoProperties,

    #[error("Grid shape mismatch: {0}")]
    GridShape(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("Open-Meteo API error: {0}")]
    OpenMeteo(String),

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    Config(String),
}
