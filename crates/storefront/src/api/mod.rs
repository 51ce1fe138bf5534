//! REST client for the commerce backend API.
//!
//! # Architecture
//!
//! - The backend is the source of truth; every call goes straight to it
//! - Plain JSON over REST via `reqwest`
//! - In-memory caching via `moka` for catalog responses (5 minute TTL)
//! - Authenticated endpoints send the session's bearer token
//!
//! # Example
//!
//! ```rust,ignore
//! use roastline_storefront::api::ApiClient;
//!
//! let api = ApiClient::new(&config.backend_api_url);
//!
//! // Browse the catalog
//! let page = api.get_products(&ProductFilters::default()).await?;
//!
//! // Add an item to a remote cart
//! let accepted = api.add_cart_line(user_id, &line, token).await?;
//! ```

mod cache;
mod client;
pub mod types;

pub use client::ApiClient;
pub use types::*;

use axum::http::StatusCode;
use thiserror::Error;

/// Errors that can occur when interacting with the backend API.
///
/// Transport failures (DNS, refused connection, timeout) and HTTP error
/// responses are distinct cases: a [`Self::Server`] error carries the status
/// code and the backend's own message so views can surface it verbatim.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The request never produced an HTTP response.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The backend answered with a non-success status.
    ///
    /// `message` is the `message` field of the JSON error body when present,
    /// otherwise a truncated copy of the raw body.
    #[error("{message}")]
    Server {
        /// HTTP status code of the response.
        status: StatusCode,
        /// Human-readable message taken from the response body.
        message: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_server_error_displays_backend_message_verbatim() {
        let err = ApiError::Server {
            status: StatusCode::CONFLICT,
            message: "out of stock".to_string(),
        };
        assert_eq!(err.to_string(), "out of stock");
    }

    #[test]
    fn test_not_found_display() {
        let err = ApiError::NotFound("product p-404".to_string());
        assert_eq!(err.to_string(), "Not found: product p-404");
    }
}
