//! aloft: pressure-level atmosphere profiles for launch sites.
//!
//! Single-binary Tokio application that:
//! 1. Resolves a location from a preset or explicit coordinates
//! 2. Fetches hourly pressure-level data from Open-Meteo (or reloads an export)
//! 3. Exports each property grid to CSV
//! 4. Prints interpolated values at the requested heights

mod config;

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use tracing::{error, info};

use atmosphere::{export_dir, export_grid, CsvArchive, Environment};
use common::config::AppConfig;
use common::{parse_properties, Error, FetchMode, Property, Result, HEIGHT_STEPS_M};
use open_meteo_client::OpenMeteoClient;

/// Atmosphere profiles by height
#[derive(Parser)]
#[command(name = "aloft", about = "Pressure-level atmosphere profiles from Open-Meteo")]
struct Cli {
    /// Named location preset (see `aloft locations`).
    #[arg(long, global = true)]
    location: Option<String>,

    /// Latitude in degrees. Overrides --location together with --lon.
    #[arg(long, global = true, allow_negative_numbers = true)]
    lat: Option<f64>,

    /// Longitude in degrees. Overrides --location together with --lat.
    #[arg(long, global = true, allow_negative_numbers = true)]
    lon: Option<f64>,

    /// Comma-separated properties: temp, humidity, windSpeed, windDirection.
    #[arg(long, global = true, value_delimiter = ',')]
    properties: Vec<String>,

    /// Hour index to query.
    #[arg(long, global = true, default_value_t = 0)]
    hour: usize,

    /// Comma-separated heights in meters.
    #[arg(long, global = true, value_delimiter = ',', allow_negative_numbers = true)]
    heights: Vec<f64>,

    /// Skip writing CSV files.
    #[arg(long, global = true)]
    no_export: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch a forecast starting today.
    Forecast {
        /// One of 1, 3, 7, 14, 16.
        #[arg(long, default_value_t = 1)]
        days: u32,
    },
    /// Fetch archived forecasts for an inclusive date range.
    Historical {
        #[arg(long)]
        start: NaiveDate,
        #[arg(long)]
        end: NaiveDate,
    },
    /// Load grids exported by an earlier run.
    Archive {
        /// Directory holding the CSV files (default: data_dir).
        #[arg(long)]
        dir: Option<PathBuf>,
    },
    /// Print one height step of one property over every fetched hour.
    Series {
        #[arg(long)]
        property: String,
        /// Height-step index, 0 is the lowest.
        #[arg(long)]
        step: usize,
        /// Forecast length, used when no date range is given.
        #[arg(long, default_value_t = 1)]
        days: u32,
        /// First day of a historical range.
        #[arg(long, requires = "end")]
        start: Option<NaiveDate>,
        /// Last day of a historical range.
        #[arg(long, requires = "start")]
        end: Option<NaiveDate>,
    },
    /// List the configured location presets.
    Locations,
}

/// Response cache location inside `data_dir`.
const CACHE_SUBDIR: &str = ".cache";

/// Default query heights: 0 to 900 m every 100 m.
fn default_heights() -> Vec<f64> {
    (0..10).map(|i| f64::from(i) * 100.0).collect()
}

/// Pick coordinates: explicit --lat/--lon, then --location, then the first preset.
fn resolve_location(cli: &Cli, cfg: &AppConfig) -> Result<(String, Environment)> {
    match (cli.lat, cli.lon) {
        (Some(lat), Some(lon)) => {
            return Ok((format!("{lat}, {lon}"), Environment::new(lat, lon)))
        }
        (Some(_), None) | (None, Some(_)) => {
            return Err(Error::Config("--lat and --lon must be given together".into()))
        }
        (None, None) => {}
    }

    let preset = match &cli.location {
        Some(name) => cfg
            .location(name)
            .ok_or_else(|| Error::Config(format!("Unknown location {name:?}")))?,
        None => cfg
            .locations
            .first()
            .ok_or_else(|| Error::Config("No location presets configured".into()))?,
    };
    Ok((preset.name.clone(), Environment::at(preset)))
}

fn selected_properties(cli: &Cli) -> Result<Vec<Property>> {
    if cli.properties.is_empty() {
        Ok(Property::ALL.to_vec())
    } else {
        parse_properties(&cli.properties)
    }
}

async fn fetch_into(
    env: &mut Environment,
    client: &OpenMeteoClient,
    cfg: &AppConfig,
    properties: &[Property],
    mode: FetchMode,
    export: bool,
) -> Result<()> {
    let grid = env.fetch(client, properties, mode).await?;
    if export {
        let dir = export_dir(&cfg.data_dir, &mode);
        let written = export_grid(grid, &dir)?;
        info!("Wrote {} files to {}", written.len(), dir.display());
    }
    Ok(())
}

fn print_heights(env: &Environment, properties: &[Property], heights: &[f64], hour: usize) -> Result<()> {
    match env.atmosphere().times().get(hour) {
        Some(time) => println!("hour {hour} ({time} UTC)"),
        None => println!("hour {hour}"),
    }
    for &property in properties {
        for &height in heights {
            let value = env.get_at_height(property.wire_name(), height, hour)?;
            println!("{:<14} {:>8.1} m {:>12.3}", property.wire_name(), height, value);
        }
    }
    Ok(())
}

fn print_series(env: &Environment, property: Property, step: usize) -> Result<()> {
    let values = env.series(property, step)?;
    let height = HEIGHT_STEPS_M.get(step).copied().unwrap_or(f64::NAN);
    println!("{} at {} m", property.wire_name(), height);
    let times = env.atmosphere().times();
    for (hour, value) in values.iter().enumerate() {
        match times.get(hour) {
            Some(time) => println!("{time} {value:>12.3}"),
            None => println!("{hour:>4} {value:>12.3}"),
        }
    }
    Ok(())
}

fn print_locations(cfg: &AppConfig) {
    for loc in &cfg.locations {
        println!("{:<20} {:>11.6} {:>12.6}", loc.name, loc.lat, loc.lon);
    }
}

async fn run(cli: Cli, cfg: AppConfig) -> Result<()> {
    if let Command::Locations = cli.command {
        print_locations(&cfg);
        return Ok(());
    }

    let (label, mut env) = resolve_location(&cli, &cfg)?;
    info!("Location: {} ({}, {})", label, env.lat(), env.lon());

    let export = cfg.export && !cli.no_export;
    let client = OpenMeteoClient::new(cfg.open_meteo.clone())?
        .with_cache_dir(cfg.data_dir.join(CACHE_SUBDIR));

    let properties = match &cli.command {
        Command::Forecast { days } => {
            let properties = selected_properties(&cli)?;
            let mode = FetchMode::Forecast { days: *days };
            fetch_into(&mut env, &client, &cfg, &properties, mode, export).await?;
            properties
        }
        Command::Historical { start, end } => {
            let properties = selected_properties(&cli)?;
            let mode = FetchMode::Historical {
                start: *start,
                end: *end,
            };
            fetch_into(&mut env, &client, &cfg, &properties, mode, export).await?;
            properties
        }
        Command::Archive { dir } => {
            let properties = selected_properties(&cli)?;
            let archive = CsvArchive::new(dir.clone().unwrap_or_else(|| cfg.data_dir.clone()));
            info!("Loading archive from {}", archive.dir().display());
            let grid = archive.load(&properties)?;
            env.populate(grid);
            properties
        }
        Command::Series {
            property,
            step,
            days,
            start,
            end,
        } => {
            let property: Property = property.parse()?;
            let mode = match (start, end) {
                (Some(start), Some(end)) => FetchMode::Historical {
                    start: *start,
                    end: *end,
                },
                _ => FetchMode::Forecast { days: *days },
            };
            fetch_into(&mut env, &client, &cfg, &[property], mode, export).await?;
            return print_series(&env, property, *step);
        }
        Command::Locations => return Ok(()),
    };

    let heights = if cli.heights.is_empty() {
        default_heights()
    } else {
        cli.heights.clone()
    };
    print_heights(&env, &properties, &heights, cli.hour)
}

#[tokio::main]
async fn main() {
    // Initialize logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "aloft=info,atmosphere=info,open_meteo_client=info".into()
            }),
        )
        .with_target(true)
        .init();

    let cli = Cli::parse();

    // Load configuration.
    let cfg = match config::load_config() {
        Ok(c) => c,
        Err(e) => {
            error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = run(cli, cfg).await {
        error!("{}", e);
        std::process::exit(1);
    }
}
