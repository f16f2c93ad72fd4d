use serde::{Serialize, Serializer};
use std::collections::BTreeMap;

use crate::error::WeatherError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForecastRequest {
    pub location: String,
    /// Calendar date, `YYYY-MM-DD`.
    pub date: String,
}

/// One hour of forecast data. Missing provider values are NaN.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HourlyRecord {
    /// `HH:MM:SS` in the forecast timezone.
    pub hour: String,
    pub temperature: f64,
    pub humidity: f64,
    pub cloud_cover: f64,
    pub wind_speed: f64,
    pub precipitation: f64,
    pub snowfall: f64,
    pub precipitation_probability: f64,
}

/// Hourly records grouped by `YYYY-MM-DD`, each day in chronological order.
pub type DailyForecast = BTreeMap<String, Vec<HourlyRecord>>;

/// Outcome of a fetch. Always well-formed: failures live in `error`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastResult {
    #[serde(serialize_with = "error_message")]
    pub error: Option<WeatherError>,
    pub data: Option<DailyForecast>,
    pub location: String,
    pub date: String,
    pub from_cache: bool,
}

impl ForecastResult {
    pub fn success(request: &ForecastRequest, data: DailyForecast) -> Self {
        Self {
            error: None,
            data: Some(data),
            location: request.location.clone(),
            date: request.date.clone(),
            from_cache: false,
        }
    }

    pub fn failure(request: &ForecastRequest, error: WeatherError) -> Self {
        Self {
            error: Some(error),
            data: None,
            location: request.location.clone(),
            date: request.date.clone(),
            from_cache: false,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// Hours forecast for `date`, if the result covers it.
    pub fn day(&self, date: &str) -> Option<&[HourlyRecord]> {
        self.data.as_ref()?.get(date).map(Vec::as_slice)
    }
}

fn error_message<S: Serializer>(error: &Option<WeatherError>, s: S) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => s.serialize_str(&e.to_string()),
        None => s.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ForecastRequest {
        ForecastRequest { location: "Atlanta".into(), date: "2030-01-01".into() }
    }

    #[test]
    fn failure_serializes_error_as_message() {
        let result = ForecastResult::failure(
            &request(),
            WeatherError::DateOutOfRange { input: "2030-01-01".into() },
        );

        let json = serde_json::to_value(&result).unwrap();
        assert!(json["error"].as_str().unwrap().contains("within the next 7 days"));
        assert!(json["data"].is_null());
        assert_eq!(json["location"], "Atlanta");
        assert_eq!(json["from_cache"], false);
    }

    #[test]
    fn missing_values_serialize_as_null() {
        let record = HourlyRecord {
            hour: "00:00:00".into(),
            temperature: f64::NAN,
            humidity: 50.0,
            cloud_cover: 0.0,
            wind_speed: 3.0,
            precipitation: 0.0,
            snowfall: 0.0,
            precipitation_probability: 10.0,
        };
        let mut data = DailyForecast::new();
        data.insert("2030-01-01".into(), vec![record]);

        let result = ForecastResult::success(&request(), data);
        let json = serde_json::to_value(&result).unwrap();

        assert!(json["error"].is_null());
        assert!(json["data"]["2030-01-01"][0]["temperature"].is_null());
        assert_eq!(json["data"]["2030-01-01"][0]["humidity"], 50.0);
        assert_eq!(result.day("2030-01-01").map(<[_]>::len), Some(1));
        assert!(result.day("2030-01-02").is_none());
    }
}
