use async_trait::async_trait;
use serde_json::{Map, Value, json};
use std::sync::Arc;

use crate::{
    fetcher::WeatherFetcher,
    tools::{ParamType, Tool, ToolHandler, ToolParam},
};

pub const WEATHER_TOOL_NAME: &str = "get_weather_info";

#[derive(Debug)]
struct WeatherInfo {
    fetcher: WeatherFetcher,
}

#[async_trait]
impl ToolHandler for WeatherInfo {
    async fn call(&self, args: &Map<String, Value>) -> Value {
        let location = args.get("location").and_then(Value::as_str).unwrap_or_default();
        let event_date = args.get("event_date").and_then(Value::as_str).unwrap_or_default();

        let result = self.fetcher.fetch(location, event_date).await;
        serde_json::to_value(&result).unwrap_or_else(|e| json!({ "error": e.to_string() }))
    }
}

/// `get_weather_info(location, event_date)` backed by `fetcher`.
pub fn weather_tool(fetcher: WeatherFetcher) -> Tool {
    Tool::new(
        WEATHER_TOOL_NAME,
        "Fetches the hourly weather forecast (temperature, humidity, cloud cover, wind speed, \
         precipitation, snowfall and precipitation probability) for a city. Returns an object \
         with `error`, `data` (hours grouped by YYYY-MM-DD date), `location`, `date` and \
         `from_cache`.",
        Arc::new(WeatherInfo { fetcher }),
    )
    .param(ToolParam::required(
        "location",
        ParamType::String,
        "City name, e.g. \"Atlanta\" or \"San Diego\"",
    ))
    .param(ToolParam::required(
        "event_date",
        ParamType::String,
        "Date of the event in YYYY-MM-DD format",
    ))
    .constraints(
        "event_date must be YYYY-MM-DD and fall between today and 6 days from today (inclusive). \
         The response covers the whole 7-day window; read the hours under the event date.",
    )
    .usage_example("The user asks about the weather for an event on a specific date")
    .usage_example("The user wants to pick the best day this week for an outdoor activity")
    .usage_example("The user needs a backup plan depending on rain or wind")
}
