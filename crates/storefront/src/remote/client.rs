//! REST client for the remote catalog and cart service.
//!
//! Uses `reqwest` for HTTP. Caches the catalog and the cart using `moka`;
//! the cached cart is dropped after every mutation.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use moka::future::Cache;
use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shopfront_core::{Catalog, CartLine, CurrencyCode, ProductId};
use tracing::{Instrument, debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use super::cache::{CacheKey, CacheValue};
use super::conversions::{convert_cart_lines, convert_catalog};
use super::wire::{CartLineRecord, ListResponse, ProductRecord};
use super::{ApiError, CartApi};
use crate::config::ApiConfig;

/// Header carrying the per-request correlation ID.
const REQUEST_ID_HEADER: &str = "X-Request-Id";

/// Maximum number of body characters logged for failed requests.
const LOGGED_BODY_CHARS: usize = 500;

/// Maximum number of body characters kept in [`ApiError::Status`].
const ERROR_BODY_CHARS: usize = 200;

// =============================================================================
// RestClient
// =============================================================================

/// Client for the remote catalog and cart REST API.
///
/// Cheaply cloneable; clones share the HTTP connection pool and the cache.
#[derive(Clone)]
pub struct RestClient {
    inner: Arc<RestClientInner>,
}

struct RestClientInner {
    client: reqwest::Client,
    base_url: Url,
    currency: CurrencyCode,
    cache: Cache<CacheKey, CacheValue>,
    /// Bumped by every cart invalidation. A fetch that overlapped one must
    /// not populate the cache.
    cart_epoch: AtomicU64,
}

impl std::fmt::Debug for RestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RestClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("currency", &self.inner.currency)
            .finish_non_exhaustive()
    }
}

impl RestClient {
    /// Create a new REST client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built (e.g. TLS backend
    /// initialization fails).
    pub fn new(config: &ApiConfig, currency: CurrencyCode) -> Result<Self, ApiError> {
        let cache = Cache::builder()
            .max_capacity(config.cache_capacity)
            .time_to_live(config.cache_ttl)
            .build();

        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            inner: Arc::new(RestClientInner {
                client: builder.build()?,
                base_url: config.base_url.clone(),
                currency,
                cache,
                cart_epoch: AtomicU64::new(0),
            }),
        })
    }

    /// The base URL endpoint paths are resolved against.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    /// Resolve an endpoint from path segments under the base URL.
    ///
    /// Segments are percent-encoded, so product IDs are safe to pass as-is.
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.inner.base_url.clone();
        {
            let mut path = url
                .path_segments_mut()
                .map_err(|()| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?;
            path.pop_if_empty().extend(segments);
        }
        Ok(url)
    }

    /// Send a request and return the response body.
    ///
    /// Every request gets a fresh `X-Request-Id`, recorded on the span.
    async fn execute<B>(
        &self,
        method: Method,
        url: Url,
        body: Option<&B>,
    ) -> Result<String, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let path = url.path().to_owned();
        let request_id = Uuid::new_v4();
        let span = tracing::debug_span!("remote_request", %method, %path, %request_id);

        async move {
            let mut request = self
                .inner
                .client
                .request(method, url)
                .header(REQUEST_ID_HEADER, request_id.to_string());
            if let Some(body) = body {
                request = request.json(body);
            }

            let response = request.send().await?;
            let status = response.status();

            // Check for rate limiting
            if status == StatusCode::TOO_MANY_REQUESTS {
                let retry_after = response
                    .headers()
                    .get(reqwest::header::RETRY_AFTER)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|s| s.trim().parse::<u64>().ok())
                    .unwrap_or(1);
                return Err(ApiError::RateLimited(retry_after));
            }

            if status == StatusCode::NOT_FOUND {
                debug!("Remote resource not found");
                return Err(ApiError::NotFound(path));
            }

            // Get response body as text first for better error diagnostics
            let response_text = response.text().await?;

            if !status.is_success() {
                tracing::error!(
                    status = %status,
                    body = %response_text.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                    "Remote service returned non-success status"
                );
                return Err(ApiError::Status {
                    status: status.as_u16(),
                    body: response_text.chars().take(ERROR_BODY_CHARS).collect(),
                });
            }

            debug!(status = %status, bytes = response_text.len(), "Remote request succeeded");
            Ok(response_text)
        }
        .instrument(span)
        .await
    }

    /// Parse a list response body.
    ///
    /// Only a malformed list fails; entries that do not match `T` are dropped
    /// with a warning.
    fn parse_list<T: DeserializeOwned>(body: &str) -> Result<Vec<T>, ApiError> {
        match serde_json::from_str::<ListResponse<serde_json::Value>>(body) {
            Ok(list) => Ok(list
                .into_items()
                .into_iter()
                .filter_map(|item| match serde_json::from_value::<T>(item) {
                    Ok(record) => Some(record),
                    Err(e) => {
                        warn!(error = %e, "Dropping malformed list entry");
                        None
                    }
                })
                .collect()),
            Err(e) => {
                tracing::error!(
                    error = %e,
                    body = %body.chars().take(LOGGED_BODY_CHARS).collect::<String>(),
                    "Failed to parse remote list response"
                );
                Err(ApiError::Parse(e))
            }
        }
    }

    // =========================================================================
    // Catalog Methods
    // =========================================================================

    /// Get the product catalog.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the body cannot be parsed.
    #[instrument(skip(self))]
    pub async fn get_products(&self) -> Result<Catalog, ApiError> {
        if let Some(CacheValue::Products(catalog)) = self.inner.cache.get(&CacheKey::Products).await
        {
            debug!("Cache hit for products");
            return Ok(catalog);
        }

        let url = self.endpoint(&["products"])?;
        let body = self.execute::<()>(Method::GET, url, None).await?;
        let records = Self::parse_list::<ProductRecord>(&body)?;
        let catalog = convert_catalog(records, self.inner.currency);

        self.inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(catalog.clone()))
            .await;

        Ok(catalog)
    }

    // =========================================================================
    // Cart Methods (cached read, every write invalidates)
    // =========================================================================

    /// Get the current cart lines.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails or the body cannot be parsed.
    #[instrument(skip(self))]
    pub async fn get_cart(&self) -> Result<Vec<CartLine>, ApiError> {
        if let Some(CacheValue::Cart(lines)) = self.inner.cache.get(&CacheKey::Cart).await {
            debug!("Cache hit for cart");
            return Ok(lines);
        }

        let epoch = self.inner.cart_epoch.load(Ordering::Acquire);
        let url = self.endpoint(&["cart"])?;
        let body = self.execute::<()>(Method::GET, url, None).await?;
        let records = Self::parse_list::<CartLineRecord>(&body)?;
        let lines = convert_cart_lines(records);

        self.cache_cart(epoch, &lines).await;
        Ok(lines)
    }

    /// Cache fetched lines unless the cart was invalidated since `epoch`.
    async fn cache_cart(&self, epoch: u64, lines: &[CartLine]) {
        let epoch_now = || self.inner.cart_epoch.load(Ordering::Acquire);
        if epoch_now() != epoch {
            debug!("Cart changed during fetch, not caching");
            return;
        }
        self.inner
            .cache
            .insert(CacheKey::Cart, CacheValue::Cart(lines.to_vec()))
            .await;
        // An invalidation may have landed between the check and the insert.
        if epoch_now() != epoch {
            self.inner.cache.invalidate(&CacheKey::Cart).await;
        }
    }

    /// Add lines to the cart.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, lines), fields(lines = lines.len()))]
    pub async fn add_to_cart(&self, lines: &[CartLine]) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart", "add"])?;
        let result = self.execute(Method::POST, url, Some(lines)).await;
        self.invalidate_cart().await;
        result.map(drop)
    }

    /// Set the absolute quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns an error if the API request fails.
    #[instrument(skip(self, line), fields(product_id = %line.product_id, quantity = %line.quantity))]
    pub async fn update_quantity(&self, line: &CartLine) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart", "quantity"])?;
        let result = self.execute(Method::POST, url, Some(line)).await;
        self.invalidate_cart().await;
        result.map(drop)
    }

    /// Remove a line from the cart.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::NotFound`] if the remote cart has no such line, or
    /// another error if the API request fails.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_from_cart(&self, product_id: &ProductId) -> Result<(), ApiError> {
        let url = self.endpoint(&["cart", product_id.as_str()])?;
        let result = self.execute::<()>(Method::DELETE, url, None).await;
        self.invalidate_cart().await;
        result.map(drop)
    }

    // =========================================================================
    // Cache Management
    // =========================================================================

    /// Invalidate the cached cart.
    pub async fn invalidate_cart(&self) {
        self.inner.cart_epoch.fetch_add(1, Ordering::AcqRel);
        self.inner.cache.invalidate(&CacheKey::Cart).await;
    }

    /// Invalidate the cached catalog.
    pub async fn invalidate_products(&self) {
        self.inner.cache.invalidate(&CacheKey::Products).await;
    }

    /// Invalidate all cached data.
    pub async fn invalidate_all(&self) {
        self.inner.cart_epoch.fetch_add(1, Ordering::AcqRel);
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }
}

impl CartApi for RestClient {
    async fn fetch_products(&self) -> Result<Catalog, ApiError> {
        self.get_products().await
    }

    async fn fetch_cart(&self) -> Result<Vec<CartLine>, ApiError> {
        self.get_cart().await
    }

    async fn add_lines(&self, lines: &[CartLine]) -> Result<(), ApiError> {
        self.add_to_cart(lines).await
    }

    async fn set_quantity(&self, line: &CartLine) -> Result<(), ApiError> {
        self.update_quantity(line).await
    }

    async fn remove_line(&self, product_id: &ProductId) -> Result<(), ApiError> {
        self.remove_from_cart(product_id).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::config::parse_base_url;

    fn client(base: &str) -> RestClient {
        let config = ApiConfig {
            base_url: parse_base_url(base).unwrap(),
            timeout: Some(Duration::from_secs(1)),
            cache_ttl: Duration::from_secs(60),
            cache_capacity: 10,
        };
        RestClient::new(&config, CurrencyCode::USD).unwrap()
    }

    #[test]
    fn test_parse_list_reports_parse_errors() {
        let err = RestClient::parse_list::<CartLineRecord>("{not json").unwrap_err();
        assert!(matches!(err, ApiError::Parse(_)));
    }

    #[test]
    fn test_parse_list_drops_malformed_entries() {
        let body = r#"[
            {"productId":"p1","quantity":2},
            {"productId":"p2","quantity":"lots"},
            {"quantity":1},
            {"productId":"p4","quantity":1.5},
            {"productId":"p5","quantity":"3"}
        ]"#;

        let records = RestClient::parse_list::<CartLineRecord>(body).unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.product_id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p5"]);
        assert_eq!(records[1].quantity, 3);
    }

    #[test]
    fn test_parse_list_drops_product_without_name() {
        let body = r#"{"products":[
            {"_id":"p1","name":"Mug","price":10},
            {"_id":"p2","price":5}
        ]}"#;

        let records = RestClient::parse_list::<ProductRecord>(body).unwrap();

        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "p1");
    }

    #[test]
    fn test_endpoint_encodes_segments() {
        let client = client("http://127.0.0.1:9/api");
        assert_eq!(
            client.endpoint(&["cart", "quantity"]).unwrap().as_str(),
            "http://127.0.0.1:9/api/cart/quantity"
        );
        assert_eq!(
            client.endpoint(&["cart", "a/b c"]).unwrap().as_str(),
            "http://127.0.0.1:9/api/cart/a%2Fb%20c"
        );
    }

    #[test]
    fn test_debug_shows_base_url() {
        let client = client("http://127.0.0.1:9/api");
        let debug = format!("{client:?}");
        assert!(debug.contains("http://127.0.0.1:9/api/"));
    }

    #[tokio::test]
    async fn test_cached_catalog_served_without_request() {
        // Port 9 (discard) is never listening; a request would fail.
        let client = client("http://127.0.0.1:9/api");
        client
            .inner
            .cache
            .insert(CacheKey::Products, CacheValue::Products(Catalog::default()))
            .await;

        let catalog = client.get_products().await.unwrap();
        assert!(catalog.is_empty());
    }

    #[tokio::test]
    async fn test_invalidate_cart_drops_cached_lines() {
        let client = client("http://127.0.0.1:9/api");
        client
            .inner
            .cache
            .insert(CacheKey::Cart, CacheValue::Cart(Vec::new()))
            .await;
        assert!(client.get_cart().await.is_ok());

        client.invalidate_cart().await;
        assert!(client.get_cart().await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_overlapping_invalidation_is_not_cached() {
        let client = client("http://127.0.0.1:9/api");
        let epoch = client.inner.cart_epoch.load(Ordering::Acquire);

        // A mutation finishes while the fetch is in flight.
        client.invalidate_cart().await;
        client.cache_cart(epoch, &[]).await;

        assert!(client.inner.cache.get(&CacheKey::Cart).await.is_none());
        assert!(client.get_cart().await.is_err());
    }

    #[tokio::test]
    async fn test_fetch_without_invalidation_is_cached() {
        let client = client("http://127.0.0.1:9/api");
        let epoch = client.inner.cart_epoch.load(Ordering::Acquire);

        client.cache_cart(epoch, &[]).await;

        assert!(client.get_cart().await.is_ok());
    }
}
