use thiserror::Error;

/// Failures of a forecast fetch. These never escape [`crate::WeatherFetcher::fetch`];
/// they are folded into [`crate::ForecastResult::error`].
#[derive(Debug, Clone, Error, PartialEq)]
pub enum WeatherError {
    #[error("Invalid date format. Expected YYYY-MM-DD: {reason}")]
    InvalidDateFormat { input: String, reason: String },

    #[error("Event date must be within the next 7 days (today through 6 days from now)")]
    DateOutOfRange { input: String },

    #[error("Unable to fetch weather information: City not found ({location})")]
    LocationNotFound { location: String },

    #[error("Unable to fetch weather information: {0}")]
    ProviderUnavailable(String),

    #[error("Unable to fetch weather information: {0}")]
    MalformedResponse(String),
}

/// Errors raised while building a [`crate::ToolRegistry`].
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("Tool '{0}' already registered")]
    DuplicateName(String),
}

/// Errors from a [`crate::GenerativeModel`] backend.
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("No API key configured for the generative model")]
    MissingApiKey,

    #[error("Network error talking to the model: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Model API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Failed to decode model response: {0}")]
    Decode(String),
}

/// Errors that end a conversation turn without a final answer.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("The model requested more than {limit} tool calls without answering")]
    ToolLoopExceeded { limit: usize },

    #[error("The model returned an empty response")]
    EmptyResponse,

    #[error("The model returned an unexpected part: {0}")]
    UnexpectedPart(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}
