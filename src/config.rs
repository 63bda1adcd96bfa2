//! Configuration loader. Merges env vars, the .env file, and aloft.toml.

use common::config::AppConfig;
use common::Error;
use std::path::{Path, PathBuf};

const DEFAULT_CONFIG_PATH: &str = "aloft.toml";
const MAX_RETRIES_LIMIT: u32 = 20;

fn parse_u64(raw: &str, env_name: &str) -> Result<u64, Error> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_u32(raw: &str, env_name: &str) -> Result<u32, Error> {
    raw.trim()
        .parse::<u32>()
        .map_err(|_| Error::Config(format!("{env_name} must be an integer >= 0")))
}

fn parse_non_negative_f64(raw: &str, env_name: &str) -> Result<f64, Error> {
    let parsed = raw
        .trim()
        .parse::<f64>()
        .map_err(|_| Error::Config(format!("{env_name} must be a number >= 0")))?;
    if parsed < 0.0 {
        return Err(Error::Config(format!("{env_name} must be a number >= 0")));
    }
    Ok(parsed)
}

fn parse_bool(raw: &str) -> bool {
    let lowered = raw.trim().to_ascii_lowercase();
    lowered != "0" && lowered != "false" && lowered != "no" && lowered != "off"
}

pub fn validate_config(config: &AppConfig) -> Result<(), Error> {
    let mut issues: Vec<String> = Vec::new();
    let om = &config.open_meteo;

    if config.data_dir.as_os_str().is_empty() {
        issues.push("data_dir must not be empty".into());
    }
    if om.forecast_url.trim().is_empty() {
        issues.push("open_meteo.forecast_url must not be empty".into());
    }
    if om.historical_url.trim().is_empty() {
        issues.push("open_meteo.historical_url must not be empty".into());
    }
    if om.timeout_secs == 0 {
        issues.push("open_meteo.timeout_secs must be > 0".into());
    }
    if om.max_retries > MAX_RETRIES_LIMIT {
        issues.push(format!(
            "open_meteo.max_retries must be <= {MAX_RETRIES_LIMIT}"
        ));
    }
    if !om.backoff_factor.is_finite() || om.backoff_factor < 0.0 {
        issues.push("open_meteo.backoff_factor must be >= 0".into());
    }
    if om.requests_per_minute == 0 {
        issues.push("open_meteo.requests_per_minute must be > 0".into());
    }

    for loc in &config.locations {
        if loc.name.trim().is_empty() {
            issues.push("locations entries must have a name".into());
        }
        if !loc.lat.is_finite() || !loc.lon.is_finite() {
            issues.push(format!("location {:?} has non-finite coordinates", loc.name));
        }
    }
    for (i, loc) in config.locations.iter().enumerate() {
        let duplicate = config.locations[..i]
            .iter()
            .any(|other| other.name.eq_ignore_ascii_case(&loc.name));
        if duplicate {
            issues.push(format!("location {:?} is defined more than once", loc.name));
        }
    }

    if issues.is_empty() {
        Ok(())
    } else {
        Err(Error::Config(format!(
            "Invalid config:\n - {}",
            issues.join("\n - ")
        )))
    }
}

/// Apply environment overrides on top of `config`.
fn apply_env_overrides(config: &mut AppConfig) -> Result<(), Error> {
    if let Ok(dir) = std::env::var("ALOFT_DATA_DIR") {
        config.data_dir = PathBuf::from(dir.trim());
    }
    if let Ok(raw) = std::env::var("ALOFT_EXPORT") {
        config.export = parse_bool(&raw);
    }
    if let Ok(url) = std::env::var("OPEN_METEO_FORECAST_URL") {
        config.open_meteo.forecast_url = url.trim().to_string();
    }
    if let Ok(url) = std::env::var("OPEN_METEO_HISTORICAL_URL") {
        config.open_meteo.historical_url = url.trim().to_string();
    }
    if let Ok(raw) = std::env::var("OPEN_METEO_TIMEOUT_SECS") {
        config.open_meteo.timeout_secs = parse_u64(&raw, "OPEN_METEO_TIMEOUT_SECS")?;
    }
    if let Ok(raw) = std::env::var("OPEN_METEO_MAX_RETRIES") {
        config.open_meteo.max_retries = parse_u32(&raw, "OPEN_METEO_MAX_RETRIES")?;
    }
    if let Ok(raw) = std::env::var("OPEN_METEO_BACKOFF_FACTOR") {
        config.open_meteo.backoff_factor =
            parse_non_negative_f64(&raw, "OPEN_METEO_BACKOFF_FACTOR")?;
    }
    if let Ok(raw) = std::env::var("OPEN_METEO_CACHE_TTL_SECS") {
        config.open_meteo.cache_ttl_secs = parse_u64(&raw, "OPEN_METEO_CACHE_TTL_SECS")?;
    }
    if let Ok(raw) = std::env::var("OPEN_METEO_REQUESTS_PER_MINUTE") {
        config.open_meteo.requests_per_minute =
            parse_u32(&raw, "OPEN_METEO_REQUESTS_PER_MINUTE")?;
    }
    Ok(())
}

/// Parse a TOML config file.
pub fn read_config_file(path: &Path) -> Result<AppConfig, Error> {
    let contents = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Failed to read {}: {}", path.display(), e)))?;
    toml::from_str(&contents)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))
}

/// Load configuration from environment and optional config file.
pub fn load_config() -> Result<AppConfig, Error> {
    // 1. Load .env file from the working directory or its parents.
    if let Err(e) = dotenvy::dotenv() {
        tracing::debug!("No .env file loaded: {}", e);
    }

    // 2. Start with defaults.
    let mut config = AppConfig::default();

    // 3. Read the config file if it exists. An explicit path must exist.
    let explicit = std::env::var("ALOFT_CONFIG").ok().map(PathBuf::from);
    let config_path = explicit
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH));
    if config_path.exists() {
        config = read_config_file(&config_path)?;
        tracing::debug!("Loaded {}", config_path.display());
    } else if explicit.is_some() {
        return Err(Error::Config(format!(
            "ALOFT_CONFIG points to {}, which does not exist",
            config_path.display()
        )));
    }

    // 4. Override with environment variables (highest priority).
    apply_env_overrides(&mut config)?;

    validate_config(&config)?;

    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::config::{LocationPreset, TemperatureUnit};

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&AppConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_issue() {
        let mut cfg = AppConfig::default();
        cfg.open_meteo.timeout_secs = 0;
        cfg.open_meteo.backoff_factor = -0.5;
        cfg.open_meteo.requests_per_minute = 0;

        let msg = validate_config(&cfg).unwrap_err().to_string();
        assert!(msg.contains("timeout_secs"));
        assert!(msg.contains("backoff_factor"));
        assert!(msg.contains("requests_per_minute"));
    }

    #[test]
    fn test_retry_count_is_bounded() {
        let mut cfg = AppConfig::default();
        cfg.open_meteo.max_retries = MAX_RETRIES_LIMIT;
        assert!(validate_config(&cfg).is_ok());

        cfg.open_meteo.max_retries = 70;
        let msg = validate_config(&cfg).unwrap_err().to_string();
        assert!(msg.contains("max_retries"));
    }

    #[test]
    fn test_duplicate_locations_rejected() {
        let mut cfg = AppConfig::default();
        cfg.locations.push(LocationPreset {
            name: "texas".into(),
            lat: 0.0,
            lon: 0.0,
        });
        let msg = validate_config(&cfg).unwrap_err().to_string();
        assert!(msg.contains("more than once"));
    }

    #[test]
    fn test_toml_file_overrides_defaults() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("aloft.toml");
        std::fs::write(
            &path,
            r#"
data_dir = "runs"
export = false

[open_meteo]
temperature_unit = "celsius"
max_retries = 2

[[locations]]
name = "Launch Pad"
lat = 28.5
lon = -80.6
"#,
        )
        .unwrap();

        let cfg = read_config_file(&path).unwrap();
        assert_eq!(cfg.data_dir, PathBuf::from("runs"));
        assert!(!cfg.export);
        assert_eq!(cfg.open_meteo.temperature_unit, TemperatureUnit::Celsius);
        assert_eq!(cfg.open_meteo.max_retries, 2);
        assert_eq!(cfg.open_meteo.timeout_secs, 30);
        assert_eq!(cfg.locations.len(), 1);
        assert!(cfg.location("launch pad").is_some());
    }

    #[test]
    fn test_parse_helpers() {
        assert!(parse_bool("yes"));
        assert!(!parse_bool(" OFF "));
        assert_eq!(parse_u64(" 12 ", "X").unwrap(), 12);
        assert!(parse_u32("-1", "X").is_err());
        assert!(parse_non_negative_f64("-0.1", "X").is_err());
    }
}
