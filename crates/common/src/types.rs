//! Domain types shared across aloft.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

// ── Height steps ──────────────────────────────────────────────────────

/// Number of sampled altitude bands.
pub const HEIGHT_STEP_COUNT: usize = 12;

/// Altitude of each sampled band in meters, strictly increasing.
pub const HEIGHT_STEPS_M: [f64; HEIGHT_STEP_COUNT] = [
    110.0, 320.0, 500.0, 800.0, 1000.0, 1500.0, 1900.0, 3000.0, 4200.0, 5600.0, 7200.0, 9600.0,
];

/// Isobaric level (hPa) requested for each entry of [`HEIGHT_STEPS_M`].
pub const PRESSURE_LEVELS_HPA: [u16; HEIGHT_STEP_COUNT] =
    [1000, 975, 950, 925, 900, 850, 800, 700, 600, 500, 400, 300];

/// Forecast lengths the provider accepts.
pub const VALID_FORECAST_DAYS: [u32; 5] = [1, 3, 7, 14, 16];

/// Highest sampled altitude in meters.
pub fn max_height_m() -> f64 {
    HEIGHT_STEPS_M[HEIGHT_STEP_COUNT - 1]
}

// ── Properties ────────────────────────────────────────────────────────

/// An atmospheric quantity sampled at every height step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Property {
    #[serde(rename = "temp")]
    Temperature,
    #[serde(rename = "humidity")]
    Humidity,
    #[serde(rename = "windSpeed")]
    WindSpeed,
    #[serde(rename = "windDirection")]
    WindDirection,
}

impl Property {
    pub const ALL: [Property; 4] = [
        Property::Temperature,
        Property::Humidity,
        Property::WindSpeed,
        Property::WindDirection,
    ];

    /// Name used on the command line and in exported file names.
    pub fn wire_name(self) -> &'static str {
        match self {
            Property::Temperature => "temp",
            Property::Humidity => "humidity",
            Property::WindSpeed => "windSpeed",
            Property::WindDirection => "windDirection",
        }
    }

    /// Open-Meteo hourly variable prefix.
    pub fn api_prefix(self) -> &'static str {
        match self {
            Property::Temperature => "temperature",
            Property::Humidity => "relative_humidity",
            Property::WindSpeed => "wind_speed",
            Property::WindDirection => "wind_direction",
        }
    }

    /// Open-Meteo variable names for this property, one per height step.
    pub fn api_variables(self) -> Vec<String> {
        PRESSURE_LEVELS_HPA
            .iter()
            .map(|level| format!("{}_{}hPa", self.api_prefix(), level))
            .collect()
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.wire_name())
    }
}

impl FromStr for Property {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Property::ALL
            .into_iter()
            .find(|p| p.wire_name() == s)
            .ok_or_else(|| Error::InvalidProperty(s.to_string()))
    }
}

/// Parse property names, dropping duplicates while keeping first-seen order.
pub fn parse_properties<S: AsRef<str>>(names: &[S]) -> Result<Vec<Property>> {
    let mut out: Vec<Property> = Vec::with_capacity(names.len());
    for name in names {
        let property: Property = name.as_ref().trim().parse()?;
        if !out.contains(&property) {
            out.push(property);
        }
    }
    Ok(out)
}

// ── Fetch requests ────────────────────────────────────────────────────

/// Which provider window to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchMode {
    /// The next `days` days, starting today.
    Forecast { days: u32 },
    /// Archived forecasts between two inclusive dates.
    Historical { start: NaiveDate, end: NaiveDate },
}

impl FetchMode {
    pub fn validate(&self) -> Result<()> {
        match *self {
            FetchMode::Forecast { days } => {
                if !VALID_FORECAST_DAYS.contains(&days) {
                    return Err(Error::InvalidDays(days));
                }
            }
            FetchMode::Historical { start, end } => {
                if start > end {
                    return Err(Error::InvalidDateRange { start, end });
                }
            }
        }
        Ok(())
    }

    /// Number of hourly rows the provider returns for this window.
    pub fn hour_count(&self) -> usize {
        match *self {
            FetchMode::Forecast { days } => days as usize * 24,
            FetchMode::Historical { start, end } => {
                let days = (end - start).num_days().max(-1) + 1;
                days as usize * 24
            }
        }
    }

    pub fn is_historical(&self) -> bool {
        matches!(self, FetchMode::Historical { .. })
    }
}

/// Everything a source needs to produce an [`AtmosphereGrid`].
#[derive(Debug, Clone, PartialEq)]
pub struct FetchRequest {
    pub lat: f64,
    pub lon: f64,
    pub properties: Vec<Property>,
    pub mode: FetchMode,
}

impl FetchRequest {
    /// Build a validated request. Duplicate properties are dropped.
    pub fn new(lat: f64, lon: f64, properties: &[Property], mode: FetchMode) -> Result<Self> {
        let mut deduped: Vec<Property> = Vec::with_capacity(properties.len());
        for p in properties {
            if !deduped.contains(p) {
                deduped.push(*p);
            }
        }
        let request = Self {
            lat,
            lon,
            properties: deduped,
            mode,
        };
        request.validate()?;
        Ok(request)
    }

    pub fn validate(&self) -> Result<()> {
        if self.properties.is_empty() {
            return Err(Error::NoProperties);
        }
        self.mode.validate()
    }
}

// ── Atmosphere grid ───────────────────────────────────────────────────

/// Per-property samples shaped (hours × height steps).
///
/// Each series is stored row-major: row `h` is hour `h`, column `j` is
/// [`HEIGHT_STEPS_M`]`[j]`. Every series in a grid has the same number of
/// hours.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AtmosphereGrid {
    hours: usize,
    times: Vec<NaiveDateTime>,
    series: BTreeMap<Property, Vec<f64>>,
}

impl AtmosphereGrid {
    pub fn new(hours: usize) -> Self {
        Self {
            hours,
            times: Vec::new(),
            series: BTreeMap::new(),
        }
    }

    /// A grid whose hour rows are labelled with UTC timestamps.
    pub fn with_times(times: Vec<NaiveDateTime>) -> Self {
        Self {
            hours: times.len(),
            times,
            series: BTreeMap::new(),
        }
    }

    /// Insert a row-major series of `hours × HEIGHT_STEP_COUNT` values,
    /// replacing any existing series for `property`.
    pub fn insert(&mut self, property: Property, values: Vec<f64>) -> Result<()> {
        let expected = self.hours * HEIGHT_STEP_COUNT;
        if values.len() != expected {
            return Err(Error::GridShape(format!(
                "{property} has {} values, expected {} hours × {} steps = {}",
                values.len(),
                self.hours,
                HEIGHT_STEP_COUNT,
                expected
            )));
        }
        self.series.insert(property, values);
        Ok(())
    }

    /// Insert a series given as one row per hour.
    pub fn insert_rows(&mut self, property: Property, rows: Vec<Vec<f64>>) -> Result<()> {
        if rows.len() != self.hours {
            return Err(Error::GridShape(format!(
                "{property} has {} rows, expected {}",
                rows.len(),
                self.hours
            )));
        }
        let mut values = Vec::with_capacity(self.hours * HEIGHT_STEP_COUNT);
        for (hour, row) in rows.into_iter().enumerate() {
            if row.len() != HEIGHT_STEP_COUNT {
                return Err(Error::GridShape(format!(
                    "{property} hour {hour} has {} columns, expected {}",
                    row.len(),
                    HEIGHT_STEP_COUNT
                )));
            }
            values.extend(row);
        }
        self.insert(property, values)
    }

    /// True when no property has been populated.
    pub fn is_empty(&self) -> bool {
        self.series.is_empty()
    }

    pub fn hour_count(&self) -> usize {
        self.hours
    }

    /// Timestamps of each hour row; empty when the source had none.
    pub fn times(&self) -> &[NaiveDateTime] {
        &self.times
    }

    pub fn contains(&self, property: Property) -> bool {
        self.series.contains_key(&property)
    }

    pub fn properties(&self) -> impl Iterator<Item = Property> + '_ {
        self.series.keys().copied()
    }

    /// The height-step values of `property` at `hour`.
    pub fn row(&self, property: Property, hour: usize) -> Option<&[f64]> {
        if hour >= self.hours {
            return None;
        }
        let values = self.series.get(&property)?;
        let start = hour * HEIGHT_STEP_COUNT;
        values.get(start..start + HEIGHT_STEP_COUNT)
    }

    /// All hour rows of `property`, in order.
    pub fn rows(&self, property: Property) -> Option<impl Iterator<Item = &[f64]> + '_> {
        self.series
            .get(&property)
            .map(|values| values.chunks_exact(HEIGHT_STEP_COUNT))
    }

    /// Values of `property` at height step `step` across every hour.
    pub fn column(&self, property: Property, step: usize) -> Option<Vec<f64>> {
        if step >= HEIGHT_STEP_COUNT {
            return None;
        }
        Some(self.rows(property)?.map(|row| row[step]).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_steps_strictly_increasing() {
        assert!(HEIGHT_STEPS_M.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(max_height_m(), 9600.0);
    }

    #[test]
    fn test_property_round_trips_wire_name() {
        for p in Property::ALL {
            assert_eq!(p.wire_name().parse::<Property>().unwrap(), p);
        }
        assert!(matches!(
            "temperature".parse::<Property>(),
            Err(Error::InvalidProperty(name)) if name == "temperature"
        ));
        assert!("Temp".parse::<Property>().is_err());
    }

    #[test]
    fn test_api_variables_follow_pressure_levels() {
        let vars = Property::WindSpeed.api_variables();
        assert_eq!(vars.len(), HEIGHT_STEP_COUNT);
        assert_eq!(vars[0], "wind_speed_1000hPa");
        assert_eq!(vars[11], "wind_speed_300hPa");
        assert_eq!(
            Property::Humidity.api_variables()[5],
            "relative_humidity_850hPa"
        );
    }

    #[test]
    fn test_parse_properties_dedupes() {
        let parsed = parse_properties(&["windSpeed", "temp", "windSpeed"]).unwrap();
        assert_eq!(parsed, vec![Property::WindSpeed, Property::Temperature]);
        assert!(parse_properties(&["temp", "pressure"]).is_err());
    }

    #[test]
    fn test_forecast_days_validation() {
        for days in VALID_FORECAST_DAYS {
            assert!(FetchMode::Forecast { days }.validate().is_ok());
        }
        for days in [0, 2, 5, 15, 17] {
            assert!(matches!(
                FetchMode::Forecast { days }.validate(),
                Err(Error::InvalidDays(d)) if d == days
            ));
        }
    }

    #[test]
    fn test_hour_counts() {
        assert_eq!(FetchMode::Forecast { days: 3 }.hour_count(), 72);
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 1, 3).unwrap();
        let mode = FetchMode::Historical { start, end };
        assert_eq!(mode.hour_count(), 72);
        assert!(mode.validate().is_ok());
        assert!(FetchMode::Historical { start: end, end: start }
            .validate()
            .is_err());
    }

    #[test]
    fn test_fetch_request_rejects_empty_properties() {
        let mode = FetchMode::Forecast { days: 1 };
        assert!(matches!(
            FetchRequest::new(0.0, 0.0, &[], mode),
            Err(Error::NoProperties)
        ));
        let req = FetchRequest::new(
            1.0,
            2.0,
            &[Property::Temperature, Property::Temperature],
            mode,
        )
        .unwrap();
        assert_eq!(req.properties, vec![Property::Temperature]);
    }

    #[test]
    fn test_grid_rejects_wrong_shape() {
        let mut grid = AtmosphereGrid::new(2);
        assert!(grid.insert(Property::Temperature, vec![0.0; 23]).is_err());
        assert!(grid.is_empty());

        let bad_rows = vec![vec![0.0; HEIGHT_STEP_COUNT], vec![0.0; 3]];
        assert!(grid.insert_rows(Property::Temperature, bad_rows).is_err());
    }

    #[test]
    fn test_grid_rows_and_columns() {
        let mut grid = AtmosphereGrid::new(2);
        let values: Vec<f64> = (0..2 * HEIGHT_STEP_COUNT).map(|v| v as f64).collect();
        grid.insert(Property::Humidity, values).unwrap();

        assert_eq!(grid.hour_count(), 2);
        assert_eq!(grid.row(Property::Humidity, 1).unwrap()[0], 12.0);
        assert!(grid.row(Property::Humidity, 2).is_none());
        assert!(grid.row(Property::Temperature, 0).is_none());
        assert_eq!(grid.column(Property::Humidity, 3).unwrap(), vec![3.0, 15.0]);
        assert!(grid.column(Property::Humidity, HEIGHT_STEP_COUNT).is_none());
    }
}
