use thiserror::Error;

// Main Application Error Type

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration Error: {0}")]
    Config(#[from] config::ConfigError),
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("Gateway Error: {0}")]
    Gateway(#[from] GatewayError),
    #[error("Malformed scan event: {0}")]
    MalformedEvent(String),
    #[error("Camera Error: {0}")]
    Camera(String),
}

// Persistence gateway error type, never crosses into the frame path.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    #[error("gateway unavailable: {0}")]
    Unavailable(String),
    #[error("gateway timed out")]
    Timeout,
    #[error("gateway rejected the write: {0}")]
    Rejected(String),
    #[error("failed to decode gateway response: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for GatewayError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            GatewayError::Timeout
        } else if err.is_decode() {
            GatewayError::Decode(err.to_string())
        } else {
            GatewayError::Unavailable(err.to_string())
        }
    }
}
