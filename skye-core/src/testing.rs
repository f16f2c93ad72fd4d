//! Stub providers and models shared by unit tests.

use async_trait::async_trait;
use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use std::{
    collections::VecDeque,
    sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    },
};

use crate::{
    error::{ModelError, WeatherError},
    llm::{Content, FunctionDeclaration, GenerativeModel, ModelResponse},
    provider::{
        Coordinates, ForecastProvider, Geocoder, HourlyForecast, HourlyForecastRequest,
        HourlySeries, LOCAL_TIME_FORMAT,
    },
};

pub fn local_midnight(year: i32, month: u32, day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .expect("valid date")
}

/// Forecast with constant values at the given local `YYYY-MM-DDTHH:MM` times.
pub fn forecast_at(times: Vec<String>) -> HourlyForecast {
    let series = |v: f64| vec![Some(v); times.len()];
    HourlyForecast {
        hourly: HourlySeries {
            temperature_2m: series(20.5),
            relative_humidity_2m: series(65.0),
            cloud_cover: series(30.0),
            wind_speed_10m: series(10.5),
            precipitation: series(0.0),
            snowfall: series(0.0),
            precipitation_probability: series(20.0),
            time: times,
        },
    }
}

/// `hours` samples an hour apart starting at `start`.
pub fn hourly_forecast(start: NaiveDateTime, hours: usize) -> HourlyForecast {
    forecast_at(
        (0..hours as i64)
            .map(|i| (start + Duration::hours(i)).format(LOCAL_TIME_FORMAT).to_string())
            .collect(),
    )
}

#[derive(Debug)]
pub struct StubGeocoder {
    answer: Option<Coordinates>,
    calls: AtomicUsize,
}

impl StubGeocoder {
    pub fn found(latitude: f64, longitude: f64) -> Self {
        Self { answer: Some(Coordinates { latitude, longitude }), calls: AtomicUsize::new(0) }
    }

    pub fn not_found() -> Self {
        Self { answer: None, calls: AtomicUsize::new(0) }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Geocoder for StubGeocoder {
    async fn coordinates(&self, location: &str) -> Result<Coordinates, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.answer
            .ok_or_else(|| WeatherError::LocationNotFound { location: location.to_string() })
    }
}

#[derive(Debug)]
enum ForecastAnswer {
    Fixed(Result<HourlyForecast, WeatherError>),
    /// Every hour of the requested date range.
    Window,
}

#[derive(Debug)]
pub struct StubForecast {
    answer: ForecastAnswer,
    calls: AtomicUsize,
    last: Mutex<Option<HourlyForecastRequest>>,
}

impl StubForecast {
    fn with(answer: ForecastAnswer) -> Self {
        Self { answer, calls: AtomicUsize::new(0), last: Mutex::new(None) }
    }

    pub fn ok(forecast: HourlyForecast) -> Self {
        Self::with(ForecastAnswer::Fixed(Ok(forecast)))
    }

    pub fn window() -> Self {
        Self::with(ForecastAnswer::Window)
    }

    pub fn failing(cause: &str) -> Self {
        Self::with(ForecastAnswer::Fixed(Err(WeatherError::ProviderUnavailable(
            cause.to_string(),
        ))))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<HourlyForecastRequest> {
        self.last.lock().unwrap().clone()
    }
}

#[async_trait]
impl ForecastProvider for StubForecast {
    async fn hourly_forecast(
        &self,
        request: &HourlyForecastRequest,
    ) -> Result<HourlyForecast, WeatherError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        *self.last.lock().unwrap() = Some(request.clone());
        match &self.answer {
            ForecastAnswer::Fixed(answer) => answer.clone(),
            ForecastAnswer::Window => {
                let days = (request.end_date - request.start_date).num_days() + 1;
                let start = request.start_date.and_time(NaiveTime::MIN);
                Ok(hourly_forecast(start, days as usize * 24))
            }
        }
    }
}

/// What a [`ScriptedModel`] saw on one call.
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub history: Vec<Content>,
    pub tool_names: Vec<String>,
    pub system_instruction: Option<String>,
}

/// Model that replays canned responses in order and records its inputs.
/// Once the script runs out it repeats the last response.
#[derive(Debug)]
pub struct ScriptedModel {
    script: Mutex<VecDeque<ModelResponse>>,
    last: Mutex<Option<ModelResponse>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedModel {
    pub fn new(responses: impl IntoIterator<Item = ModelResponse>) -> Self {
        Self {
            script: Mutex::new(responses.into_iter().collect()),
            last: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl GenerativeModel for ScriptedModel {
    async fn generate(
        &self,
        history: &[Content],
        tools: &[FunctionDeclaration],
        system_instruction: Option<&str>,
    ) -> Result<ModelResponse, ModelError> {
        self.calls.lock().unwrap().push(RecordedCall {
            history: history.to_vec(),
            tool_names: tools.iter().map(|t| t.name.clone()).collect(),
            system_instruction: system_instruction.map(str::to_string),
        });

        let next = self.script.lock().unwrap().pop_front();
        let mut last = self.last.lock().unwrap();
        if let Some(response) = next {
            *last = Some(response);
        }
        last.clone().ok_or_else(|| ModelError::Decode("script is empty".into()))
    }
}
