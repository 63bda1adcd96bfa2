//! Open-Meteo API client.
//!
//! Fetches pressure-level hourly data from the forecast and
//! historical-forecast endpoints and converts it into an
//! [`AtmosphereGrid`]. Responses are cached per URL, transient failures are
//! retried with exponential backoff, and outbound calls share one rate
//! limit.

pub mod cache;
pub mod rate_limit;
pub mod response;

use std::path::PathBuf;
use std::time::Duration;

use common::config::OpenMeteoConfig;
use common::{AtmosphereGrid, Error, FetchMode, FetchRequest, Result};
use reqwest::Url;
use tokio::time::sleep;
use tracing::{debug, warn};

pub use cache::ResponseCache;
pub use rate_limit::RateLimiter;
pub use response::ForecastResponse;

use response::error_reason;

const USER_AGENT: &str = "aloft/0.1 (atmosphere profiles)";
const DATE_FORMAT: &str = "%Y-%m-%d";
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Longest wait between two attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(120);

/// Open-Meteo client with connection pooling, caching, and retry.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    client: reqwest::Client,
    config: OpenMeteoConfig,
    cache: ResponseCache,
    limiter: RateLimiter,
}

/// A failed attempt and whether it is worth repeating.
#[derive(Debug)]
struct Failure {
    error: Error,
    retryable: bool,
}

impl Failure {
    fn retry(error: Error) -> Self {
        Self {
            error,
            retryable: true,
        }
    }

    fn fatal(error: Error) -> Self {
        Self {
            error,
            retryable: false,
        }
    }
}

impl OpenMeteoClient {
    pub fn new(config: OpenMeteoConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .pool_max_idle_per_host(4)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::Http(format!("failed to build Open-Meteo HTTP client: {e}")))?;

        Ok(Self::from_client(config, client))
    }

    fn from_client(config: OpenMeteoConfig, client: reqwest::Client) -> Self {
        Self {
            client,
            cache: ResponseCache::new(Duration::from_secs(config.cache_ttl_secs)),
            limiter: RateLimiter::per_minute(config.requests_per_minute),
            config,
        }
    }

    /// Persist cached responses under `dir` so later runs reuse them.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache = self.cache.with_dir(dir);
        self
    }

    pub fn config(&self) -> &OpenMeteoConfig {
        &self.config
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Full request URL for `request`, including every query parameter.
    pub fn request_url(&self, request: &FetchRequest) -> Result<Url> {
        let base = match request.mode {
            FetchMode::Forecast { .. } => &self.config.forecast_url,
            FetchMode::Historical { .. } => &self.config.historical_url,
        };
        Url::parse_with_params(base, query_params(&self.config, request))
            .map_err(|e| Error::Config(format!("invalid Open-Meteo URL {base:?}: {e}")))
    }

    /// Fetch the requested properties and shape them into a grid.
    pub async fn fetch_grid(&self, request: &FetchRequest) -> Result<AtmosphereGrid> {
        request.validate()?;
        let url = self.request_url(request)?;

        let response = match self.cache.get(url.as_str()) {
            Some(cached) => {
                debug!("Open-Meteo cache hit: {}", url);
                cached
            }
            None => {
                let fresh = self.fetch_with_retry(&url).await?;
                self.cache.insert(url.to_string(), fresh.clone());
                fresh
            }
        };

        let grid = response.to_grid(&request.properties, request.mode.hour_count())?;
        debug!(
            "Got {} hours × {} properties for ({}, {}), grid cell ({}, {}) at {:?} m",
            grid.hour_count(),
            request.properties.len(),
            request.lat,
            request.lon,
            response.latitude,
            response.longitude,
            response.elevation
        );
        Ok(grid)
    }

    async fn fetch_with_retry(&self, url: &Url) -> Result<ForecastResponse> {
        let mut attempt: u32 = 0;
        loop {
            if !self.limiter.try_acquire() {
                debug!("Open-Meteo request budget exhausted, waiting");
                self.limiter.wait().await;
            }
            debug!("Fetching Open-Meteo hourly data: {}", url);

            match self.send_once(url).await {
                Ok(response) => return Ok(response),
                Err(failure) if failure.retryable && attempt < self.config.max_retries => {
                    let delay = backoff_delay(self.config.backoff_factor, attempt);
                    attempt += 1;
                    warn!(
                        "Open-Meteo request failed ({}), retry {}/{} in {:?}",
                        failure.error, attempt, self.config.max_retries, delay
                    );
                    sleep(delay).await;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }

    async fn send_once(&self, url: &Url) -> std::result::Result<ForecastResponse, Failure> {
        let resp = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(|e| Failure::retry(Error::Http(format!("HTTP error for {url}: {e}"))))?;

        let status = resp.status().as_u16();
        if !resp.status().is_success() {
            let body = resp.text().await.unwrap_or_default();
            let detail = error_reason(&body)
                .unwrap_or_else(|| body.chars().take(MAX_ERROR_BODY_CHARS).collect());
            let error = Error::OpenMeteo(format!("Open-Meteo returned {status}: {detail}"));
            return Err(if is_retryable_status(status) {
                Failure::retry(error)
            } else {
                Failure::fatal(error)
            });
        }

        resp.json::<ForecastResponse>()
            .await
            .map_err(|e| Failure::fatal(Error::OpenMeteo(format!("JSON parse error: {e}"))))
    }
}

/// Query parameters for `request`, in a stable order.
pub fn query_params(config: &OpenMeteoConfig, request: &FetchRequest) -> Vec<(&'static str, String)> {
    let hourly = request
        .properties
        .iter()
        .flat_map(|p| p.api_variables())
        .collect::<Vec<_>>()
        .join(",");

    let mut params = vec![
        ("latitude", request.lat.to_string()),
        ("longitude", request.lon.to_string()),
        ("hourly", hourly),
        ("temperature_unit", config.temperature_unit.as_param().to_string()),
        ("wind_speed_unit", config.wind_speed_unit.as_param().to_string()),
        ("timezone", "GMT".to_string()),
    ];

    match request.mode {
        FetchMode::Forecast { days } => params.push(("forecast_days", days.to_string())),
        FetchMode::Historical { start, end } => {
            params.push(("start_date", start.format(DATE_FORMAT).to_string()));
            params.push(("end_date", end.format(DATE_FORMAT).to_string()));
        }
    }
    params
}

/// Delay before retry number `attempt + 1`, capped at [`MAX_BACKOFF`].
pub fn backoff_delay(factor: f64, attempt: u32) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let secs = factor * 2f64.powi(exponent);
    if secs.is_nan() || secs <= 0.0 {
        return Duration::ZERO;
    }
    Duration::try_from_secs_f64(secs)
        .map_or(MAX_BACKOFF, |delay| delay.min(MAX_BACKOFF))
}

/// Rate limiting and server-side failures are worth repeating.
pub fn is_retryable_status(status: u16) -> bool {
    status == 429 || (500..600).contains(&status)
}
