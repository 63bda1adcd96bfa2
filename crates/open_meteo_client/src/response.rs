//! Open-Meteo response types and conversion into an [`AtmosphereGrid`].

use std::collections::HashMap;

use chrono::NaiveDateTime;
use common::{AtmosphereGrid, Error, Property, Result, HEIGHT_STEP_COUNT};
use serde::{Deserialize, Serialize};

const TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Body of a successful `/v1/forecast` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub latitude: f64,
    #[serde(default)]
    pub longitude: f64,
    #[serde(default)]
    pub elevation: Option<f64>,
    pub hourly: HourlyBlock,
}

/// Hourly time axis plus one array per requested variable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourlyBlock {
    pub time: Vec<String>,
    #[serde(flatten)]
    pub variables: HashMap<String, Vec<Option<f64>>>,
}

/// Body returned alongside a 4xx.
#[derive(Debug, Deserialize)]
pub struct ErrorResponse {
    #[serde(default)]
    pub error: bool,
    #[serde(default)]
    pub reason: String,
}

/// Pull the human-readable reason out of an error body, if it has one.
pub fn error_reason(body: &str) -> Option<String> {
    let parsed: ErrorResponse = serde_json::from_str(body).ok()?;
    (parsed.error && !parsed.reason.is_empty()).then_some(parsed.reason)
}

impl ForecastResponse {
    /// Build a grid of `expected_hours` rows for `properties`.
    ///
    /// Column `j` of each property is the variable for pressure level `j`.
    /// Missing samples become NaN.
    pub fn to_grid(&self, properties: &[Property], expected_hours: usize) -> Result<AtmosphereGrid> {
        let times = self.parse_times()?;
        if times.len() != expected_hours {
            return Err(Error::OpenMeteo(format!(
                "expected {} hourly rows, got {}",
                expected_hours,
                times.len()
            )));
        }

        let mut grid = AtmosphereGrid::with_times(times);
        for &property in properties {
            let mut values = vec![f64::NAN; expected_hours * HEIGHT_STEP_COUNT];
            for (step, name) in property.api_variables().iter().enumerate() {
                let column = self.hourly.variables.get(name).ok_or_else(|| {
                    Error::OpenMeteo(format!("response is missing variable {name}"))
                })?;
                if column.len() != expected_hours {
                    return Err(Error::OpenMeteo(format!(
                        "{name} has {} values, expected {}",
                        column.len(),
                        expected_hours
                    )));
                }
                for (hour, sample) in column.iter().enumerate() {
                    values[hour * HEIGHT_STEP_COUNT + step] = sample.unwrap_or(f64::NAN);
                }
            }
            grid.insert(property, values)?;
        }
        Ok(grid)
    }

    fn parse_times(&self) -> Result<Vec<NaiveDateTime>> {
        self.hourly
            .time
            .iter()
            .map(|raw| {
                NaiveDateTime::parse_from_str(raw, TIME_FORMAT)
                    .map_err(|e| Error::OpenMeteo(format!("bad timestamp {raw:?}: {e}")))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Map, Value};

    fn sample_response(hours: usize, properties: &[Property]) -> ForecastResponse {
        let mut hourly = Map::new();
        let times: Vec<String> = (0..hours)
            .map(|h| format!("2024-01-01T{:02}:00", h))
            .collect();
        hourly.insert("time".into(), json!(times));
        for property in properties {
            for (step, name) in property.api_variables().into_iter().enumerate() {
                let column: Vec<Value> = (0..hours)
                    .map(|h| {
                        if h == 1 && step == 0 {
                            Value::Null
                        } else {
                            json!((h * 100 + step) as f64)
                        }
                    })
                    .collect();
                hourly.insert(name, Value::Array(column));
            }
        }
        let body = json!({
            "latitude": 31.05,
            "longitude": -103.55,
            "generationtime_ms": 0.5,
            "utc_offset_seconds": 0,
            "timezone": "GMT",
            "elevation": 780.0,
            "hourly_units": {"time": "iso8601", "temperature_1000hPa": "°F"},
            "hourly": hourly,
        });
        serde_json::from_value(body).expect("response should deserialize")
    }

    #[test]
    fn test_to_grid_orders_columns_by_level() {
        let resp = sample_response(3, &[Property::Temperature]);
        let grid = resp.to_grid(&[Property::Temperature], 3).unwrap();

        assert_eq!(grid.hour_count(), 3);
        assert_eq!(grid.times().len(), 3);
        let row = grid.row(Property::Temperature, 2).unwrap();
        assert_eq!(row[0], 200.0);
        assert_eq!(row[11], 211.0);
    }

    #[test]
    fn test_null_samples_become_nan() {
        let resp = sample_response(2, &[Property::WindSpeed]);
        let grid = resp.to_grid(&[Property::WindSpeed], 2).unwrap();
        assert!(grid.row(Property::WindSpeed, 1).unwrap()[0].is_nan());
        assert_eq!(grid.row(Property::WindSpeed, 1).unwrap()[1], 101.0);
    }

    #[test]
    fn test_hour_count_mismatch_is_an_error() {
        let resp = sample_response(2, &[Property::Humidity]);
        assert!(matches!(
            resp.to_grid(&[Property::Humidity], 24),
            Err(Error::OpenMeteo(_))
        ));
    }

    #[test]
    fn test_missing_variable_is_an_error() {
        let resp = sample_response(2, &[Property::Humidity]);
        let err = resp
            .to_grid(&[Property::Humidity, Property::WindDirection], 2)
            .unwrap_err();
        assert!(err.to_string().contains("wind_direction_1000hPa"));
    }

    #[test]
    fn test_error_reason_extracted() {
        let body = r#"{"error":true,"reason":"Cannot initialize WeatherVariable from invalid String value tempp"}"#;
        assert_eq!(
            error_reason(body).as_deref(),
            Some("Cannot initialize WeatherVariable from invalid String value tempp")
        );
        assert_eq!(error_reason("<html>bad gateway</html>"), None);
    }
}
