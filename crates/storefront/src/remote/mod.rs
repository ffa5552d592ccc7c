//! Remote REST service client.
//!
//! # Architecture
//!
//! - The remote service is the source of truth for the cart - there is no
//!   local persistence, only an in-memory view owned by the cart store
//! - [`CartApi`] is the seam between the cart store and the transport, so the
//!   store can run against any implementation
//! - [`RestClient`] implements it over HTTP with `reqwest`, with a `moka`
//!   read-through cache for the catalog and the cart. Every cart mutation
//!   invalidates the cached cart.
//!
//! # Endpoints
//!
//! - `GET /products` - catalog
//! - `GET /cart` - current cart lines
//! - `POST /cart/add` - add one or more lines
//! - `POST /cart/quantity` - set a line's absolute quantity
//! - `DELETE /cart/{productId}` - remove a line
//!
//! # Example
//!
//! ```rust,ignore
//! use shopfront_storefront::remote::RestClient;
//!
//! let client = RestClient::new(&config.api, config.currency)?;
//!
//! let catalog = client.get_products().await?;
//! client
//!     .add_to_cart(&[CartLine::new(ProductId::new("p1"), Quantity::ONE)])
//!     .await?;
//! ```

mod cache;
mod client;
mod conversions;
pub mod wire;

use std::future::Future;
use std::sync::Arc;

pub use client::RestClient;

use shopfront_core::{Catalog, CartLine, ProductId};
use thiserror::Error;

/// Errors that can occur when talking to the remote service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, body read).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The service answered with a non-success status.
    #[error("Unexpected status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Leading part of the response body.
        body: String,
    },

    /// JSON parsing failed.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// An endpoint URL could not be built.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the service reported the resource as missing.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

/// Remote cart and catalog operations used by the cart store and catalog view.
///
/// Mutations carry absolute quantities; the remote cart is authoritative.
pub trait CartApi: Send + Sync {
    /// Fetch the product catalog.
    fn fetch_products(&self) -> impl Future<Output = Result<Catalog, ApiError>> + Send;

    /// Fetch the current cart lines.
    fn fetch_cart(&self) -> impl Future<Output = Result<Vec<CartLine>, ApiError>> + Send;

    /// Add lines that are not yet in the remote cart.
    fn add_lines(&self, lines: &[CartLine]) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Set a line's absolute quantity.
    fn set_quantity(&self, line: &CartLine) -> impl Future<Output = Result<(), ApiError>> + Send;

    /// Remove a line.
    fn remove_line(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;
}

impl<T: CartApi> CartApi for Arc<T> {
    fn fetch_products(&self) -> impl Future<Output = Result<Catalog, ApiError>> + Send {
        (**self).fetch_products()
    }

    fn fetch_cart(&self) -> impl Future<Output = Result<Vec<CartLine>, ApiError>> + Send {
        (**self).fetch_cart()
    }

    fn add_lines(&self, lines: &[CartLine]) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).add_lines(lines)
    }

    fn set_quantity(&self, line: &CartLine) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).set_quantity(line)
    }

    fn remove_line(
        &self,
        product_id: &ProductId,
    ) -> impl Future<Output = Result<(), ApiError>> + Send {
        (**self).remove_line(product_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = ApiError::NotFound("cart/p1".to_string());
        assert_eq!(err.to_string(), "Not found: cart/p1");
        assert!(err.is_not_found());
    }

    #[test]
    fn test_status_error_display() {
        let err = ApiError::Status {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert_eq!(err.to_string(), "Unexpected status 503: maintenance");
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_rate_limited_error() {
        let err = ApiError::RateLimited(60);
        assert_eq!(err.to_string(), "Rate limited, retry after 60 seconds");
    }
}
