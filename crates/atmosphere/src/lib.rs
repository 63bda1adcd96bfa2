//! Atmosphere profiles for a single location.
//!
//! Holds fetched pressure-level data and answers interpolated point
//! queries by height and hour.

pub mod environment;
pub mod export;
pub mod interp;
pub mod source;

pub use environment::Environment;
pub use export::{csv_path, export_dir, export_grid, CsvArchive};
pub use interp::interp;
pub use source::AtmosphereSource;
