use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::{
    cache::WeatherCache,
    clock::{Clock, SystemClock},
    config::WeatherSettings,
    error::WeatherError,
    model::{DailyForecast, ForecastRequest, ForecastResult, HourlyRecord},
    provider::{
        ForecastProvider, Geocoder, HourlyForecast, HourlyForecastRequest, LOCAL_TIME_FORMAT,
        OpenMeteoClient,
    },
};

/// Days after today still inside the forecast window.
pub const FORECAST_DAYS_AHEAD: i64 = 6;

pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Validates forecast requests, resolves them through the providers and
/// caches successful results per location.
#[derive(Debug, Clone)]
pub struct WeatherFetcher {
    geocoder: Arc<dyn Geocoder>,
    forecasts: Arc<dyn ForecastProvider>,
    cache: Arc<WeatherCache>,
    clock: Arc<dyn Clock>,
    timezone: String,
}

impl WeatherFetcher {
    pub fn new(
        geocoder: Arc<dyn Geocoder>,
        forecasts: Arc<dyn ForecastProvider>,
        cache: Arc<WeatherCache>,
    ) -> Self {
        Self {
            geocoder,
            forecasts,
            cache,
            clock: Arc::new(SystemClock),
            timezone: WeatherSettings::default().timezone,
        }
    }

    /// Open-Meteo backed fetcher with its own cache.
    pub fn from_settings(settings: &WeatherSettings) -> anyhow::Result<Self> {
        let client = Arc::new(OpenMeteoClient::from_settings(settings)?);
        let cache = Arc::new(WeatherCache::new(settings.cache_ttl()));
        Ok(Self::new(client.clone(), client, cache).with_timezone(settings.timezone.clone()))
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    pub fn cache(&self) -> &WeatherCache {
        &self.cache
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Fetches the hourly forecast covering `date` for `location`.
    ///
    /// Never fails: validation and provider errors are reported through
    /// [`ForecastResult::error`] with `data` left empty.
    pub async fn fetch(&self, location: &str, date: &str) -> ForecastResult {
        let request = ForecastRequest { location: location.to_string(), date: date.to_string() };
        let today = self.clock.today();

        if let Err(e) = parse_event_date(date, today) {
            debug!(location, date, error = %e, "rejected forecast request");
            return ForecastResult::failure(&request, e);
        }

        // An entry stored before midnight can still be fresh but end a day early.
        match self.cache.get(location, self.clock.now()) {
            Some(mut cached) if cached.day(date).is_some() => {
                debug!(location, "forecast cache hit");
                cached.location = request.location;
                cached.date = request.date;
                return cached;
            }
            Some(_) => debug!(location, date, "cached forecast does not cover date"),
            None => {}
        }

        match self.fetch_remote(location, today).await {
            Ok(data) => {
                let result = ForecastResult::success(&request, data);
                self.cache.insert(location, result.clone(), self.clock.now());
                result
            }
            Err(e) => {
                warn!(location, error = %e, "forecast fetch failed");
                ForecastResult::failure(&request, e)
            }
        }
    }

    async fn fetch_remote(
        &self,
        location: &str,
        today: NaiveDate,
    ) -> Result<DailyForecast, WeatherError> {
        let coordinates = self.geocoder.coordinates(location).await?;

        let request = HourlyForecastRequest {
            coordinates,
            start_date: today,
            end_date: today + Duration::days(FORECAST_DAYS_AHEAD),
            timezone: self.timezone.clone(),
        };
        let forecast = self.forecasts.hourly_forecast(&request).await?;

        group_by_day(&forecast)
    }
}

/// Parses `YYYY-MM-DD` and checks it lies in `today..=today+6`.
pub fn parse_event_date(input: &str, today: NaiveDate) -> Result<NaiveDate, WeatherError> {
    let date = NaiveDate::parse_from_str(input, DATE_FORMAT).map_err(|e| {
        WeatherError::InvalidDateFormat { input: input.to_string(), reason: e.to_string() }
    })?;

    if date < today || date > today + Duration::days(FORECAST_DAYS_AHEAD) {
        return Err(WeatherError::DateOutOfRange { input: input.to_string() });
    }

    Ok(date)
}

/// Buckets the index-aligned hourly arrays by local calendar day.
///
/// Days and hours come straight from the provider's wall-clock times, so a
/// daylight-saving change inside the window yields a 23 or 25 hour day.
/// Arrays of unequal length are zipped up to the shortest one.
pub fn group_by_day(forecast: &HourlyForecast) -> Result<DailyForecast, WeatherError> {
    let h = &forecast.hourly;
    let len = [
        h.time.len(),
        h.temperature_2m.len(),
        h.relative_humidity_2m.len(),
        h.cloud_cover.len(),
        h.wind_speed_10m.len(),
        h.precipitation.len(),
        h.snowfall.len(),
        h.precipitation_probability.len(),
    ]
    .into_iter()
    .min()
    .unwrap_or(0);

    let value = |v: Option<f64>| v.unwrap_or(f64::NAN);
    let mut days = DailyForecast::new();

    for i in 0..len {
        let at = NaiveDateTime::parse_from_str(&h.time[i], LOCAL_TIME_FORMAT).map_err(|e| {
            WeatherError::MalformedResponse(format!("bad forecast time {:?}: {e}", h.time[i]))
        })?;

        let record = HourlyRecord {
            hour: at.format("%H:%M:%S").to_string(),
            temperature: value(h.temperature_2m[i]),
            humidity: value(h.relative_humidity_2m[i]),
            cloud_cover: value(h.cloud_cover[i]),
            wind_speed: value(h.wind_speed_10m[i]),
            precipitation: value(h.precipitation[i]),
            snowfall: value(h.snowfall[i]),
            precipitation_probability: value(h.precipitation_probability[i]),
        };

        days.entry(at.format(DATE_FORMAT).to_string()).or_default().push(record);
    }

    Ok(days)
}
