//! Unified error handling with Sentry integration.
//!
//! Provides a unified `AppError` type for front ends. Call
//! [`AppError::report`] before showing an error to the user so that
//! server-side failures reach Sentry.

use shopfront_core::QuantityError;
use thiserror::Error;

use crate::config::ConfigError;
use crate::remote::ApiError;

/// Application-level error type for the storefront.
#[derive(Debug, Error)]
pub enum AppError {
    /// Remote service call failed.
    #[error("Remote error: {0}")]
    Api(#[from] ApiError),

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Invalid quantity input.
    #[error("Invalid quantity: {0}")]
    Quantity(#[from] QuantityError),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),
}

impl AppError {
    /// Whether the error comes from outside the user's control.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Api(_) | Self::Config(_))
    }

    /// Log the error, capturing server errors to Sentry.
    pub fn report(&self) {
        if self.is_server_error() {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Storefront error"
            );
        } else {
            tracing::warn!(error = %self, "Rejected request");
        }
    }

    /// Process exit code for command-line front ends.
    #[must_use]
    pub const fn exit_code(&self) -> i32 {
        match self {
            Self::Api(_) => 3,
            Self::Config(_) => 78,
            Self::Quantity(_) | Self::NotFound(_) => 2,
        }
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Add a breadcrumb for user actions.
///
/// Breadcrumbs appear in Sentry error reports to show the trail of user actions
/// leading up to an error.
///
/// # Example
///
/// ```rust,ignore
/// add_breadcrumb("cart", "Added to cart", Some(&[("product_id", "p1")]));
/// ```
pub fn add_breadcrumb(category: &str, message: &str, data: Option<&[(&str, &str)]>) {
    let mut breadcrumb = sentry::Breadcrumb {
        category: Some(category.to_string()),
        message: Some(message.to_string()),
        level: sentry::Level::Info,
        ..Default::default()
    };

    if let Some(pairs) = data {
        for (key, value) in pairs {
            breadcrumb.data.insert(
                (*key).to_string(),
                serde_json::Value::String((*value).to_string()),
            );
        }
    }

    sentry::add_breadcrumb(breadcrumb);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_error_display() {
        let err = AppError::NotFound("p1".to_string());
        assert_eq!(err.to_string(), "Not found: p1");

        let err = AppError::from(QuantityError::Zero);
        assert!(err.to_string().starts_with("Invalid quantity: "));
    }

    #[test]
    fn test_server_error_classification() {
        assert!(AppError::from(ApiError::RateLimited(1)).is_server_error());
        assert!(
            AppError::from(ConfigError::InvalidEnvVar("X".to_string(), "bad".to_string()))
                .is_server_error()
        );
        assert!(!AppError::NotFound("p1".to_string()).is_server_error());
        assert!(!AppError::from(QuantityError::Zero).is_server_error());
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(AppError::NotFound("p1".to_string()).exit_code(), 2);
        assert_eq!(AppError::from(ApiError::RateLimited(1)).exit_code(), 3);
        assert_eq!(
            AppError::from(ConfigError::InvalidEnvVar("X".to_string(), "bad".to_string()))
                .exit_code(),
            78
        );
    }

    #[test]
    fn test_report_without_sentry_client() {
        // No client bound: capture is a no-op.
        AppError::from(ApiError::RateLimited(1)).report();
        AppError::NotFound("p1".to_string()).report();
    }
}
