//! Error types for the HubSpot client.

use thiserror::Error;

/// Result type for HubSpot client operations.
pub type Result<T> = std::result::Result<T, HubSpotError>;

/// HubSpot client errors.
#[derive(Debug, Error)]
pub enum HubSpotError {
    /// Transport failure (connection refused, TLS, timeout)
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-2xx response from the API
    #[error("HubSpot API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("Parse error: {0}")]
    Parse(String),
}
