//! Weather data for one latitude/longitude.

use common::config::LocationPreset;
use common::{
    max_height_m, AtmosphereGrid, Error, FetchMode, FetchRequest, Property, Result,
    HEIGHT_STEPS_M, HEIGHT_STEP_COUNT,
};
use tracing::info;

use crate::interp::interp;
use crate::source::AtmosphereSource;

/// Atmosphere samples for a fixed location.
///
/// Starts empty. Each fetch replaces the whole grid; a failed fetch leaves
/// the previous grid in place.
#[derive(Debug, Clone)]
pub struct Environment {
    lat: f64,
    lon: f64,
    atmosphere: AtmosphereGrid,
}

impl Environment {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self {
            lat,
            lon,
            atmosphere: AtmosphereGrid::default(),
        }
    }

    pub fn at(preset: &LocationPreset) -> Self {
        Self::new(preset.lat, preset.lon)
    }

    pub fn lat(&self) -> f64 {
        self.lat
    }

    pub fn lon(&self) -> f64 {
        self.lon
    }

    pub fn atmosphere(&self) -> &AtmosphereGrid {
        &self.atmosphere
    }

    pub fn is_populated(&self) -> bool {
        !self.atmosphere.is_empty()
    }

    /// Fetch `properties` for `mode` from `source` and replace the grid.
    pub async fn fetch<S: AtmosphereSource>(
        &mut self,
        source: &S,
        properties: &[Property],
        mode: FetchMode,
    ) -> Result<&AtmosphereGrid> {
        let request = FetchRequest::new(self.lat, self.lon, properties, mode)?;
        let grid = source.fetch(&request).await?;
        Ok(self.populate(grid))
    }

    /// Replace the grid with one produced elsewhere (e.g. a CSV archive).
    pub fn populate(&mut self, grid: AtmosphereGrid) -> &AtmosphereGrid {
        info!(
            "({}, {}): loaded {} hours of {:?}",
            self.lat,
            self.lon,
            grid.hour_count(),
            grid.properties().map(|p| p.wire_name()).collect::<Vec<_>>()
        );
        self.atmosphere = grid;
        &self.atmosphere
    }

    /// Interpolated value of the property named `property` at `height`
    /// meters and hour index `hour`.
    ///
    /// Below the lowest height step the value at that step is returned.
    pub fn get_at_height(&self, property: &str, height: f64, hour: usize) -> Result<f64> {
        if self.atmosphere.is_empty() {
            return Err(Error::NotInitialized);
        }
        let property: Property = property.parse()?;
        self.value_at(property, height, hour)
    }

    /// Typed form of [`Environment::get_at_height`].
    pub fn value_at(&self, property: Property, height: f64, hour: usize) -> Result<f64> {
        let row = self.checked_row(property, hour, Some(height))?;
        Ok(interp(height, &HEIGHT_STEPS_M, row))
    }

    /// `(height, value)` pairs for every height step at `hour`.
    pub fn profile(&self, property: Property, hour: usize) -> Result<Vec<(f64, f64)>> {
        let row = self.checked_row(property, hour, None)?;
        Ok(HEIGHT_STEPS_M.iter().copied().zip(row.iter().copied()).collect())
    }

    /// Values at height step `step` for every hour.
    pub fn series(&self, property: Property, step: usize) -> Result<Vec<f64>> {
        self.ensure_fetched(property)?;
        self.atmosphere
            .column(property, step)
            .ok_or(Error::StepOutOfRange {
                step,
                steps: HEIGHT_STEP_COUNT,
            })
    }

    fn ensure_fetched(&self, property: Property) -> Result<()> {
        if self.atmosphere.is_empty() {
            return Err(Error::NotInitialized);
        }
        if !self.atmosphere.contains(property) {
            return Err(Error::PropertyNotFetched(property));
        }
        Ok(())
    }

    fn checked_row(&self, property: Property, hour: usize, height: Option<f64>) -> Result<&[f64]> {
        self.ensure_fetched(property)?;

        if let Some(height) = height {
            let max = max_height_m();
            if !(0.0..=max).contains(&height) {
                return Err(Error::HeightOutOfRange { height, max });
            }
        }

        let hours = self.atmosphere.hour_count();
        if hour >= hours {
            return Err(Error::HourOutOfRange { hour, hours });
        }

        self.atmosphere.row(property, hour).ok_or_else(|| {
            Error::GridShape(format!("{property} is missing row {hour} of {hours}"))
        })
    }
}
