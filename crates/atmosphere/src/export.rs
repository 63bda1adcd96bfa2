//! CSV export of fetched grids and reloading them later.
//!
//! One headerless file per property, one row per hour, one column per
//! height step, five decimal places.

use std::fs::create_dir_all;
use std::path::{Path, PathBuf};

use common::{AtmosphereGrid, Error, FetchMode, Property, Result, HEIGHT_STEP_COUNT};
use tracing::{debug, info};

const HISTORICAL_SUBDIR: &str = "historical";

/// Directory a grid fetched with `mode` is exported to.
pub fn export_dir(data_dir: &Path, mode: &FetchMode) -> PathBuf {
    if mode.is_historical() {
        data_dir.join(HISTORICAL_SUBDIR)
    } else {
        data_dir.to_path_buf()
    }
}

/// File holding `property` inside `dir`.
pub fn csv_path(dir: &Path, property: Property) -> PathBuf {
    dir.join(format!("{}_data.csv", property.wire_name()))
}

/// Write every property of `grid` into `dir`, creating it if needed.
/// Returns the paths written.
pub fn export_grid(grid: &AtmosphereGrid, dir: &Path) -> Result<Vec<PathBuf>> {
    create_dir_all(dir)?;
    let mut written = Vec::new();

    for property in grid.properties() {
        let path = csv_path(dir, property);
        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&path)?;

        if let Some(rows) = grid.rows(property) {
            for row in rows {
                writer.write_record(row.iter().map(|v| format!("{v:.5}")))?;
            }
        }
        writer.flush()?;

        info!("Exported {}", path.display());
        written.push(path);
    }

    Ok(written)
}

/// Previously exported grids on disk.
#[derive(Debug, Clone)]
pub struct CsvArchive {
    dir: PathBuf,
}

impl CsvArchive {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Properties with a file present in the archive.
    pub fn available(&self) -> Vec<Property> {
        Property::ALL
            .into_iter()
            .filter(|p| csv_path(&self.dir, *p).is_file())
            .collect()
    }

    /// Read `properties` back into a grid. Timestamps are not stored, so
    /// the grid has none.
    pub fn load(&self, properties: &[Property]) -> Result<AtmosphereGrid> {
        if properties.is_empty() {
            return Err(Error::NoProperties);
        }

        let mut grid: Option<AtmosphereGrid> = None;
        for &property in properties {
            let rows = read_rows(&csv_path(&self.dir, property))?;
            let grid = grid.get_or_insert_with(|| AtmosphereGrid::new(rows.len()));
            grid.insert_rows(property, rows)?;
        }

        grid.ok_or(Error::NoProperties)
    }
}

fn read_rows(path: &Path) -> Result<Vec<Vec<f64>>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(path)?;

    let mut rows = Vec::new();
    for (line, record) in reader.records().enumerate() {
        let record = record?;
        if record.len() != HEIGHT_STEP_COUNT {
            return Err(Error::GridShape(format!(
                "{} row {} has {} columns, expected {}",
                path.display(),
                line + 1,
                record.len(),
                HEIGHT_STEP_COUNT
            )));
        }
        let row = record
            .iter()
            .map(|field| {
                field.trim().parse::<f64>().map_err(|_| {
                    Error::GridShape(format!(
                        "{} row {}: {field:?} is not a number",
                        path.display(),
                        line + 1
                    ))
                })
            })
            .collect::<Result<Vec<f64>>>()?;
        rows.push(row);
    }

    debug!("Read {} rows from {}", rows.len(), path.display());
    Ok(rows)
}
