//! Vendor gateway error types.

use thiserror::Error;

/// Errors from vendor API calls.
#[derive(Debug, Error)]
pub enum VendorError {
    /// HTTP transport error after retries were exhausted.
    #[error("HTTP error calling {endpoint}: {source}")]
    Http {
        /// Endpoint path that failed.
        endpoint: String,
        /// Underlying transport error.
        source: reqwest::Error,
    },

    /// Vendor returned a non-2xx status.
    #[error("vendor {endpoint} returned {status}: {body}")]
    Api {
        /// Endpoint path that failed.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Response body text, for diagnostics.
        body: String,
    },

    /// Vendor identify endpoint does not know this holder (404).
    #[error("vendor does not recognize the holder")]
    UserNotFound,

    /// Response deserialization failed.
    #[error("failed to deserialize response from {endpoint}: {source}")]
    Deserialization {
        /// Endpoint path that failed.
        endpoint: String,
        /// Underlying error.
        source: reqwest::Error,
    },

    /// Gateway misconfiguration (bad base URL or endpoint join).
    #[error("vendor gateway configuration error: {0}")]
    Config(String),
}
