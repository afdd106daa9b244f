//! DigitalOcean provider error types

use stackform_cloud::ProviderError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DigitalOceanError {
    #[error("DigitalOcean API token not set. Export DIGITALOCEAN_TOKEN")]
    MissingToken,

    #[error("Invalid base URL: {0}")]
    InvalidBaseUrl(String),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("Unexpected response: {0}")]
    InvalidResponse(String),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<DigitalOceanError> for ProviderError {
    fn from(error: DigitalOceanError) -> Self {
        match error {
            DigitalOceanError::AuthenticationFailed(message) => {
                ProviderError::AuthenticationFailed(message)
            }
            DigitalOceanError::Api { status, message } => ProviderError::Api { status, message },
            DigitalOceanError::InvalidResponse(message) => {
                ProviderError::MalformedResponse(message)
            }
            DigitalOceanError::JsonError(e) => ProviderError::MalformedResponse(e.to_string()),
            DigitalOceanError::Http(e) if e.is_decode() => {
                ProviderError::MalformedResponse(e.to_string())
            }
            other => ProviderError::Transport(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, DigitalOceanError>;
