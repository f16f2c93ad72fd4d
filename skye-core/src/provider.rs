use async_trait::async_trait;
use chrono::NaiveDate;
use serde::Deserialize;
use std::{fmt::Debug, time::Duration};

use crate::error::WeatherError;

pub mod open_meteo;

pub use open_meteo::OpenMeteoClient;

/// Hourly variables requested from the forecast provider, in record order.
pub const HOURLY_VARIABLES: [&str; 7] = [
    "temperature_2m",
    "relative_humidity_2m",
    "cloud_cover",
    "wind_speed_10m",
    "precipitation",
    "snowfall",
    "precipitation_probability",
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct HourlyForecastRequest {
    pub coordinates: Coordinates,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub timezone: String,
}

/// Layout of the provider's local `time` entries.
pub const LOCAL_TIME_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// Index-aligned hourly arrays as returned by the provider.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HourlySeries {
    /// Wall-clock times in the requested timezone. A fall-back hour
    /// shows up twice.
    pub time: Vec<String>,
    pub temperature_2m: Vec<Option<f64>>,
    pub relative_humidity_2m: Vec<Option<f64>>,
    pub cloud_cover: Vec<Option<f64>>,
    pub wind_speed_10m: Vec<Option<f64>>,
    pub precipitation: Vec<Option<f64>>,
    pub snowfall: Vec<Option<f64>>,
    pub precipitation_probability: Vec<Option<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct HourlyForecast {
    pub hourly: HourlySeries,
}

#[async_trait]
pub trait Geocoder: Send + Sync + Debug {
    /// Resolves a place name to its first matching coordinates.
    async fn coordinates(&self, location: &str) -> Result<Coordinates, WeatherError>;
}

#[async_trait]
pub trait ForecastProvider: Send + Sync + Debug {
    async fn hourly_forecast(
        &self,
        request: &HourlyForecastRequest,
    ) -> Result<HourlyForecast, WeatherError>;
}

/// Longest single wait between retries.
pub const MAX_RETRY_DELAY: Duration = Duration::from_secs(60);

/// Bounded retry with exponential backoff for transient HTTP failures.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    /// Seconds; the n-th retry waits `backoff_factor * 2^(n-1)`.
    pub backoff_factor: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self { max_retries: 5, backoff_factor: 0.2 }
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self { max_retries: 0, backoff_factor: 0.0 }
    }

    /// Backoff before the given 1-based retry, capped at [`MAX_RETRY_DELAY`].
    pub fn delay(&self, retry: u32) -> Duration {
        let exp = retry.saturating_sub(1).min(16);
        let secs = self.backoff_factor.max(0.0) * f64::from(1u32 << exp);
        Duration::try_from_secs_f64(secs).map_or(MAX_RETRY_DELAY, |d| d.min(MAX_RETRY_DELAY))
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_per_retry() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay(1), Duration::from_millis(200));
        assert_eq!(policy.delay(2), Duration::from_millis(400));
        assert_eq!(policy.delay(3), Duration::from_millis(800));
    }

    #[test]
    fn huge_or_infinite_backoff_is_capped() {
        for backoff_factor in [f64::INFINITY, 1e300, 120.0] {
            let policy = RetryPolicy { max_retries: 5, backoff_factor };
            assert_eq!(policy.delay(5), MAX_RETRY_DELAY, "{backoff_factor}");
        }
        let nan = RetryPolicy { max_retries: 1, backoff_factor: f64::NAN };
        assert_eq!(nan.delay(1), Duration::ZERO);
    }

    #[test]
    fn no_retry_policy_has_zero_delay() {
        assert_eq!(RetryPolicy::none().delay(3), Duration::ZERO);
    }

    #[test]
    fn truncate_keeps_short_bodies() {
        assert_eq!(truncate_body("oops"), "oops");
        let long = "x".repeat(250);
        let cut = truncate_body(&long);
        assert_eq!(cut.len(), 203);
        assert!(cut.ends_with("..."));
    }

    #[test]
    fn forecast_payload_accepts_nulls() {
        let json = r#"{
            "utc_offset_seconds": -14400,
            "hourly": {
                "time": ["2023-11-14T17:00"],
                "temperature_2m": [null],
                "relative_humidity_2m": [60.0],
                "cloud_cover": [10.0],
                "wind_speed_10m": [5.5],
                "precipitation": [0.0],
                "snowfall": [0.0],
                "precipitation_probability": [null]
            }
        }"#;

        let parsed: HourlyForecast = serde_json::from_str(json).unwrap();
        assert_eq!(parsed.hourly.time, vec!["2023-11-14T17:00"]);
        assert_eq!(parsed.hourly.temperature_2m, vec![None]);
        assert_eq!(parsed.hourly.wind_speed_10m, vec![Some(5.5)]);
    }
}
