//! Application configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Directory exported CSV files are written to and read back from.
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Export every fetched grid to `data_dir`.
    #[serde(default = "default_true")]
    pub export: bool,

    /// Open-Meteo client settings.
    #[serde(default)]
    pub open_meteo: OpenMeteoConfig,

    /// Named launch sites selectable with `--location`.
    #[serde(default = "default_locations")]
    pub locations: Vec<LocationPreset>,
}

/// A named coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LocationPreset {
    /// Human-readable name.
    pub name: String,
    /// Latitude.
    pub lat: f64,
    /// Longitude.
    pub lon: f64,
}

/// Temperature unit requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TemperatureUnit {
    Fahrenheit,
    Celsius,
}

impl TemperatureUnit {
    pub fn as_param(self) -> &'static str {
        match self {
            TemperatureUnit::Fahrenheit => "fahrenheit",
            TemperatureUnit::Celsius => "celsius",
        }
    }
}

/// Wind speed unit requested from the provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WindSpeedUnit {
    Ms,
    Kmh,
    Mph,
    Kn,
}

impl WindSpeedUnit {
    pub fn as_param(self) -> &'static str {
        match self {
            WindSpeedUnit::Ms => "ms",
            WindSpeedUnit::Kmh => "kmh",
            WindSpeedUnit::Mph => "mph",
            WindSpeedUnit::Kn => "kn",
        }
    }
}

/// Open-Meteo endpoints, units, and transport policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenMeteoConfig {
    /// Forecast endpoint.
    #[serde(default = "default_forecast_url")]
    pub forecast_url: String,

    /// Historical-forecast endpoint.
    #[serde(default = "default_historical_url")]
    pub historical_url: String,

    #[serde(default = "default_temperature_unit")]
    pub temperature_unit: TemperatureUnit,

    #[serde(default = "default_wind_speed_unit")]
    pub wind_speed_unit: WindSpeedUnit,

    /// Per-request timeout.
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Retries after the first attempt for transport errors, 429, and 5xx.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Retry delay is `backoff_factor * 2^attempt` seconds.
    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    /// How long a cached response stays fresh.
    #[serde(default = "default_cache_ttl")]
    pub cache_ttl_secs: u64,

    /// Outbound request budget.
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,
}

// ── Defaults ──────────────────────────────────────────────────────────

fn default_true() -> bool {
    true
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_forecast_url() -> String {
    "https://api.open-meteo.com/v1/forecast".into()
}
fn default_historical_url() -> String {
    "https://historical-forecast-api.open-meteo.com/v1/forecast".into()
}
fn default_temperature_unit() -> TemperatureUnit {
    TemperatureUnit::Fahrenheit
}
fn default_wind_speed_unit() -> WindSpeedUnit {
    WindSpeedUnit::Ms
}
fn default_timeout() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    5
}
fn default_backoff_factor() -> f64 {
    0.2
}
fn default_cache_ttl() -> u64 {
    3600
}
fn default_requests_per_minute() -> u32 {
    600
}

fn default_locations() -> Vec<LocationPreset> {
    vec![
        LocationPreset {
            name: "Spaceport America".into(),
            lat: 32.938358,
            lon: -106.912406,
        },
        LocationPreset {
            name: "Utah1".into(),
            lat: 37.931728,
            lon: -113.053677,
        },
        LocationPreset {
            name: "Utah2".into(),
            lat: 37.945524,
            lon: -113.033278,
        },
        LocationPreset {
            name: "Texas".into(),
            lat: 31.049802,
            lon: -103.547313,
        },
        LocationPreset {
            name: "UB".into(),
            lat: 43.000139,
            lon: -78.790739,
        },
    ]
}

impl Default for OpenMeteoConfig {
    fn default() -> Self {
        Self {
            forecast_url: default_forecast_url(),
            historical_url: default_historical_url(),
            temperature_unit: default_temperature_unit(),
            wind_speed_unit: default_wind_speed_unit(),
            timeout_secs: default_timeout(),
            max_retries: default_max_retries(),
            backoff_factor: default_backoff_factor(),
            cache_ttl_secs: default_cache_ttl(),
            requests_per_minute: default_requests_per_minute(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            export: default_true(),
            open_meteo: OpenMeteoConfig::default(),
            locations: default_locations(),
        }
    }
}

impl AppConfig {
    /// Look up a preset by name, ignoring ASCII case.
    pub fn location(&self, name: &str) -> Option<&LocationPreset> {
        self.locations
            .iter()
            .find(|loc| loc.name.eq_ignore_ascii_case(name.trim()))
    }
}
