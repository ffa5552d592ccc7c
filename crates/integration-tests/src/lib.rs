//! Integration test support for Shopfront.
//!
//! Provides [`FakeRemote`], an in-process `axum` server that speaks the remote
//! cart service's REST API on `127.0.0.1`. Tests point a real
//! [`RestClient`](shopfront_storefront::remote::RestClient) at it and inject
//! failures per route.
//!
//! # Example
//!
//! ```rust,ignore
//! let remote = FakeRemote::start().await?;
//! remote.add_product("p1", "Mug", json!(10));
//! remote.set_failing(Route::Add, true);
//!
//! let session = ShopSession::start(remote.config()).await?;
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use shopfront_storefront::config::{ApiConfig, StorefrontConfig};
use tokio::net::TcpListener;
use url::Url;

/// Remote endpoints, for failure injection and hit counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    /// `GET /products`
    Products,
    /// `GET /cart`
    Cart,
    /// `POST /cart/add`
    Add,
    /// `POST /cart/quantity`
    Quantity,
    /// `DELETE /cart/{productId}`
    Remove,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LineBody {
    product_id: String,
    quantity: i64,
}

#[derive(Debug, Default)]
struct RemoteState {
    products: Vec<Value>,
    /// Raw lines in insertion order; may hold duplicates or zero quantities.
    cart: Vec<LineBody>,
    failing: HashSet<Route>,
    rate_limited: HashMap<Route, u64>,
    hits: HashMap<Route, usize>,
    delays: HashMap<Route, Duration>,
    envelope: bool,
}

impl RemoteState {
    /// Count the hit and return the injected failure, if any.
    fn intercept(&mut self, route: Route) -> Option<Response> {
        *self.hits.entry(route).or_insert(0) += 1;

        if let Some(secs) = self.rate_limited.get(&route) {
            return Some(
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(header::RETRY_AFTER, secs.to_string())],
                    "slow down",
                )
                    .into_response(),
            );
        }
        if self.failing.contains(&route) {
            return Some((StatusCode::SERVICE_UNAVAILABLE, "unavailable").into_response());
        }
        None
    }

    fn list<T: Serialize>(&self, items: &[T]) -> Response {
        if self.envelope {
            Json(json!({ "products": items })).into_response()
        } else {
            Json(items).into_response()
        }
    }

    fn line_mut(&mut self, product_id: &str) -> Option<&mut LineBody> {
        self.cart.iter_mut().find(|l| l.product_id == product_id)
    }
}

type Shared = Arc<Mutex<RemoteState>>;

fn lock(state: &Shared) -> MutexGuard<'_, RemoteState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process fake of the remote catalog and cart service.
#[derive(Debug, Clone)]
pub struct FakeRemote {
    state: Shared,
    base_url: Url,
}

impl FakeRemote {
    /// Bind an ephemeral port and serve the API under `/api/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Shared::default();

        let api = Router::new()
            .route("/products", get(list_products))
            .route("/cart", get(list_cart))
            .route("/cart/add", post(add_lines))
            .route("/cart/quantity", post(set_quantity))
            .route("/cart/{product_id}", delete(remove_line))
            .with_state(Arc::clone(&state));
        let app = Router::new().nest("/api", api);

        tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        let base_url = Url::parse(&format!("http://{addr}/api/"))
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e))?;
        Ok(Self { state, base_url })
    }

    /// Base URL of the fake API.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Default configuration pointed at this server.
    #[must_use]
    pub fn config(&self) -> StorefrontConfig {
        let defaults = StorefrontConfig::default();
        StorefrontConfig {
            api: ApiConfig {
                base_url: self.base_url.clone(),
                timeout: Some(Duration::from_secs(5)),
                ..defaults.api
            },
            ..defaults
        }
    }

    /// List a product. `price` is sent as given (number or string).
    pub fn add_product(&self, id: &str, name: &str, price: Value) {
        lock(&self.state).products.push(json!({
            "_id": id,
            "name": name,
            "description": format!("{name} description"),
            "price": price,
            "image": format!("{id}.jpg"),
        }));
    }

    /// Append a raw cart line, bypassing the API.
    pub fn put_cart_line(&self, product_id: &str, quantity: i64) {
        lock(&self.state).cart.push(LineBody {
            product_id: product_id.to_string(),
            quantity,
        });
    }

    /// Total quantity the remote cart holds for a product.
    #[must_use]
    pub fn cart_quantity(&self, product_id: &str) -> Option<i64> {
        let state = lock(&self.state);
        let mut lines = state
            .cart
            .iter()
            .filter(|l| l.product_id == product_id)
            .peekable();
        lines.peek()?;
        Some(lines.map(|l| l.quantity).sum())
    }

    /// Number of raw lines in the remote cart.
    #[must_use]
    pub fn cart_len(&self) -> usize {
        lock(&self.state).cart.len()
    }

    /// Make a route answer `503 Service Unavailable`.
    pub fn set_failing(&self, route: Route, failing: bool) {
        let mut state = lock(&self.state);
        if failing {
            state.failing.insert(route);
        } else {
            state.failing.remove(&route);
        }
    }

    /// Make a route answer `429 Too Many Requests` with `Retry-After`.
    pub fn rate_limit(&self, route: Route, retry_after_secs: u64) {
        lock(&self.state)
            .rate_limited
            .insert(route, retry_after_secs);
    }

    /// Hold a route's responses for `delay` after the request is handled.
    ///
    /// The response reflects the state at arrival time, so later changes
    /// race with it.
    pub fn set_delay(&self, route: Route, delay: Option<Duration>) {
        let mut state = lock(&self.state);
        match delay {
            Some(delay) => state.delays.insert(route, delay),
            None => state.delays.remove(&route),
        };
    }

    /// Wrap list responses in `{"products": [...]}`.
    pub fn use_envelope(&self, envelope: bool) {
        lock(&self.state).envelope = envelope;
    }

    /// Requests received on a route, failures included.
    #[must_use]
    pub fn hits(&self, route: Route) -> usize {
        lock(&self.state).hits.get(&route).copied().unwrap_or(0)
    }
}

// =============================================================================
// Handlers
// =============================================================================

/// Run a handler under the lock, then apply the route's delay.
async fn respond(
    state: &Shared,
    route: Route,
    handle: impl FnOnce(&mut RemoteState) -> Response,
) -> Response {
    let (response, delay) = {
        let mut state = lock(state);
        let delay = state.delays.get(&route).copied();
        let response = match state.intercept(route) {
            Some(response) => response,
            None => handle(&mut *state),
        };
        (response, delay)
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    response
}

async fn list_products(State(state): State<Shared>) -> Response {
    respond(&state, Route::Products, |state| state.list(&state.products)).await
}

async fn list_cart(State(state): State<Shared>) -> Response {
    respond(&state, Route::Cart, |state| state.list(&state.cart)).await
}

async fn add_lines(State(state): State<Shared>, Json(lines): Json<Vec<LineBody>>) -> Response {
    respond(&state, Route::Add, |state| {
        for line in lines {
            match state.line_mut(&line.product_id) {
                Some(existing) => existing.quantity += line.quantity,
                None => state.cart.push(line),
            }
        }
        StatusCode::CREATED.into_response()
    })
    .await
}

async fn set_quantity(State(state): State<Shared>, Json(line): Json<LineBody>) -> Response {
    respond(&state, Route::Quantity, |state| {
        match state.line_mut(&line.product_id) {
            Some(existing) => existing.quantity = line.quantity,
            None => state.cart.push(line),
        }
        Json(json!({ "ok": true })).into_response()
    })
    .await
}

async fn remove_line(State(state): State<Shared>, Path(product_id): Path<String>) -> Response {
    respond(&state, Route::Remove, |state| {
        let before = state.cart.len();
        state.cart.retain(|l| l.product_id != product_id);
        if state.cart.len() == before {
            (StatusCode::NOT_FOUND, "no such line").into_response()
        } else {
            StatusCode::NO_CONTENT.into_response()
        }
    })
    .await
}
