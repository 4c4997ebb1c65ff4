use thiserror::Error;

use crate::provider::ProviderId;

/// Failures of place resolution and location updates.
#[derive(Debug, Error)]
pub enum LocateError {
    /// NaN, infinite or missing coordinates, or an unusable query.
    #[error("Invalid input: {0}")]
    InputInvalid(String),

    /// Network error, timeout, non-2xx status or unparsable body.
    #[error("{provider} is unavailable: {message}")]
    ProviderUnavailable { provider: ProviderId, message: String },

    /// Every provider was tried and none returned a place.
    #[error("No locations found for '{0}'")]
    NoResults(String),

    /// Superseded by a newer request.
    #[error("Request was superseded by a newer one")]
    Cancelled,
}

impl LocateError {
    pub fn unavailable(provider: ProviderId, message: impl Into<String>) -> Self {
        Self::ProviderUnavailable { provider, message: message.into() }
    }

    /// Whether the resolver should move on to the next provider.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::ProviderUnavailable { .. } | Self::NoResults(_))
    }
}

/// Failures of the weather backend.
#[derive(Debug, Error)]
pub enum WeatherError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Weather request timed out")]
    Timeout,

    #[error("Weather server returned status {status}: {body}")]
    Server { status: u16, body: String },

    #[error("Failed to parse weather response: {0}")]
    Parse(String),

    #[error("Invalid weather request: {0}")]
    InputInvalid(String),
}

impl WeatherError {
    /// Text shown to the user when a refresh fails.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            WeatherError::Network(_) => {
                "Unable to reach the weather service. Please check your internet connection."
                    .to_string()
            }
            WeatherError::Timeout => {
                "The weather service took too long to respond. Please try again.".to_string()
            }
            WeatherError::Server { status, .. } if *status >= 500 => {
                format!(
                    "The weather service is having problems (error {status}). Please try again later."
                )
            }
            WeatherError::Server { status, .. } => {
                format!("The weather service rejected the request (error {status}).")
            }
            WeatherError::Parse(_) => {
                "The weather service sent data that could not be read.".to_string()
            }
            WeatherError::InputInvalid(message) => format!("Invalid location: {message}"),
        }
    }
}

impl From<reqwest::Error> for WeatherError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WeatherError::Timeout
        } else if err.is_decode() {
            WeatherError::Parse(err.to_string())
        } else {
            WeatherError::Network(err.to_string())
        }
    }
}

pub(crate) fn truncate_body(body: &str) -> String {
    const MAX: usize = 200;
    match body.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
