//! Error types for the predict flow and for startup configuration.

/// Everything that can stop a prediction from producing a label.
///
/// None of these are fatal: the handler renders the message into the
/// prediction slot and the widget accepts the next attempt.
#[derive(Debug, thiserror::Error)]
pub enum PredictionError {
    #[error("Please select an image first")]
    NotReady,

    #[error("Backend URL not configured")]
    Configuration,

    #[error("HTTP {status}")]
    Http { status: u16 },

    #[error("malformed response: {reason}")]
    MalformedResponse { reason: String },

    #[error("Unrecognized response format")]
    UnrecognizedShape,

    #[error("network error: {reason}")]
    Network { reason: String },
}

/// Configuration loading errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    #[error("failed to parse config {path}: {message}")]
    ParseError { path: String, message: String },

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },
}

impl From<ConfigError> for std::io::Error {
    fn from(e: ConfigError) -> Self {
        std::io::Error::new(std::io::ErrorKind::InvalidInput, e)
    }
}
