use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::{
    config::WeatherSettings,
    error::WeatherError,
    provider::{
        Coordinates, ForecastProvider, Geocoder, HOURLY_VARIABLES, HourlyForecast,
        HourlyForecastRequest, RetryPolicy, truncate_body,
    },
};

pub const GEOCODING_URL: &str = "https://geocoding-api.open-meteo.com/v1/search";
pub const FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

/// Geocoding and hourly forecasts from the free Open-Meteo APIs.
#[derive(Debug, Clone)]
pub struct OpenMeteoClient {
    http: Client,
    geocoding_url: String,
    forecast_url: String,
    retry: RetryPolicy,
}

impl OpenMeteoClient {
    pub fn new(timeout: Duration, retry: RetryPolicy) -> anyhow::Result<Self> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            geocoding_url: GEOCODING_URL.to_string(),
            forecast_url: FORECAST_URL.to_string(),
            retry,
        })
    }

    pub fn from_settings(settings: &WeatherSettings) -> anyhow::Result<Self> {
        let client = Self::new(settings.timeout(), settings.retry_policy())?;
        Ok(client
            .with_geocoding_url(settings.geocoding_url.clone())
            .with_forecast_url(settings.forecast_url.clone()))
    }

    pub fn with_geocoding_url(mut self, url: impl Into<String>) -> Self {
        self.geocoding_url = url.into();
        self
    }

    pub fn with_forecast_url(mut self, url: impl Into<String>) -> Self {
        self.forecast_url = url.into();
        self
    }

    /// GET with retries on connect/timeout errors, 429 and 5xx.
    async fn get_with_retry(
        &self,
        url: &str,
        query: &[(&str, String)],
    ) -> Result<Response, WeatherError> {
        let mut retry = 0;
        loop {
            let outcome = self.http.get(url).query(query).send().await;

            let transient = match &outcome {
                Ok(res) => is_transient_status(res.status()),
                Err(e) => e.is_timeout() || e.is_connect(),
            };

            if !transient || retry >= self.retry.max_retries {
                return outcome.map_err(|e| WeatherError::ProviderUnavailable(e.to_string()));
            }

            retry += 1;
            let delay = self.retry.delay(retry);
            match &outcome {
                Ok(res) => warn!(url, status = %res.status(), retry, ?delay, "retrying request"),
                Err(e) => warn!(url, error = %e, retry, ?delay, "retrying request"),
            }
            tokio::time::sleep(delay).await;
        }
    }
}

fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

async fn read_body(res: Response, what: &str) -> Result<String, WeatherError> {
    let status = res.status();
    let body = res
        .text()
        .await
        .map_err(|e| WeatherError::ProviderUnavailable(format!("Failed to read {what} body: {e}")))?;

    if !status.is_success() {
        return Err(WeatherError::ProviderUnavailable(format!(
            "{what} request failed with status {status}: {}",
            truncate_body(&body),
        )));
    }

    Ok(body)
}

#[derive(Debug, Deserialize)]
struct GeoResult {
    latitude: f64,
    longitude: f64,
}

#[derive(Debug, Deserialize)]
struct GeoResponse {
    #[serde(default)]
    results: Vec<GeoResult>,
}

#[async_trait]
impl Geocoder for OpenMeteoClient {
    async fn coordinates(&self, location: &str) -> Result<Coordinates, WeatherError> {
        debug!(location, "geocoding");
        let query = [
            ("name", location.to_string()),
            ("count", "1".to_string()),
            ("language", "en".to_string()),
            ("format", "json".to_string()),
        ];

        let res = self.get_with_retry(&self.geocoding_url, &query).await?;
        let body = read_body(res, "Geocoding").await?;

        let parsed: GeoResponse = serde_json::from_str(&body).map_err(|e| {
            WeatherError::MalformedResponse(format!("Failed to parse geocoding JSON: {e}"))
        })?;

        parsed
            .results
            .first()
            .map(|r| Coordinates { latitude: r.latitude, longitude: r.longitude })
            .ok_or_else(|| WeatherError::LocationNotFound { location: location.to_string() })
    }
}

#[async_trait]
impl ForecastProvider for OpenMeteoClient {
    async fn hourly_forecast(
        &self,
        request: &HourlyForecastRequest,
    ) -> Result<HourlyForecast, WeatherError> {
        debug!(?request, "requesting hourly forecast");
        let query = [
            ("latitude", request.coordinates.latitude.to_string()),
            ("longitude", request.coordinates.longitude.to_string()),
            ("hourly", HOURLY_VARIABLES.join(",")),
            ("start_date", request.start_date.format("%Y-%m-%d").to_string()),
            ("end_date", request.end_date.format("%Y-%m-%d").to_string()),
            ("timezone", request.timezone.clone()),
            ("timeformat", "iso8601".to_string()),
        ];

        let res = self.get_with_retry(&self.forecast_url, &query).await?;
        let body = read_body(res, "Forecast").await?;

        serde_json::from_str(&body).map_err(|e| {
            WeatherError::MalformedResponse(format!("Failed to parse forecast JSON: {e}"))
        })
    }
}
