//! Core library for the `skye` event planner.
//!
//! This crate defines:
//! - Forecast fetching with validation and a per-location cache
//! - A tool registry and the `get_weather_info` tool
//! - A generative model abstraction with a Gemini backend
//! - The tool-calling conversation loop and chat sessions
//! - Configuration & credentials handling
//!
//! It is used by `skye-cli`, but can also be reused by other binaries or services.

pub mod cache;
pub mod clock;
pub mod config;
pub mod conversation;
pub mod error;
pub mod fetcher;
pub mod llm;
pub mod model;
pub mod prompt;
pub mod provider;
pub mod session;
pub mod tools;

#[cfg(test)]
mod testing;

pub use cache::WeatherCache;
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::Config;
pub use conversation::{ConversationLoop, invoke_data_processor};
pub use error::{ConversationError, ModelError, ToolError, WeatherError};
pub use fetcher::WeatherFetcher;
pub use llm::{Content, GeminiModel, GenerativeModel, ModelResponse, Part, Role};
pub use model::{ForecastRequest, ForecastResult, HourlyRecord};
pub use provider::{ForecastProvider, Geocoder, OpenMeteoClient};
pub use session::ChatSession;
pub use tools::{Tool, ToolRegistry, weather_tool};
