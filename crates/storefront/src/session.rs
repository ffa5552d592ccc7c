//! Shop session: everything one user session needs, passed explicitly.

use std::sync::Arc;

use shopfront_core::{ProductId, Quantity};
use tracing::{info, instrument, warn};

use crate::cart::{CartStore, SyncOutcome, SyncReport};
use crate::catalog::CatalogView;
use crate::config::StorefrontConfig;
use crate::error::{AppError, Result, add_breadcrumb};
use crate::remote::RestClient;
use crate::view::{CartView, ProductCardView};

/// One user's storefront session.
///
/// This struct is cheaply cloneable via `Arc` and owns the configuration, the
/// remote client, the cart store and the catalog view.
#[derive(Clone)]
pub struct ShopSession {
    inner: Arc<ShopSessionInner>,
}

struct ShopSessionInner {
    config: StorefrontConfig,
    client: RestClient,
    cart: CartStore<RestClient>,
    catalog: CatalogView<RestClient>,
}

impl ShopSession {
    /// Build a session without touching the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: StorefrontConfig) -> Result<Self> {
        let client = RestClient::new(&config.api, config.currency)?;
        let cart = CartStore::new(client.clone(), &config);
        let catalog = CatalogView::new(client.clone(), config.notice_ttl);

        Ok(Self {
            inner: Arc::new(ShopSessionInner {
                config,
                client,
                cart,
                catalog,
            }),
        })
    }

    /// Build a session and load the catalog and the cart.
    ///
    /// A failed cart load leaves an empty cart with an error flag.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be built or the catalog cannot
    /// be fetched.
    #[instrument(skip(config), fields(base_url = %config.api.base_url))]
    pub async fn start(config: StorefrontConfig) -> Result<Self> {
        let session = Self::new(config)?;

        let (catalog, snapshot) =
            tokio::join!(session.inner.catalog.refresh(), session.inner.cart.load());
        let catalog = catalog?;

        info!(
            products = catalog.len(),
            cart_lines = snapshot.cart.len(),
            cart_loaded = snapshot.load_error.is_none(),
            "Session started"
        );
        Ok(session)
    }

    /// Flush pending cart writes and close the session.
    #[instrument(skip(self))]
    pub async fn end(self) -> SyncReport {
        let report = if self.inner.cart.pending_count() > 0 {
            self.inner.cart.sync_pending().await
        } else {
            SyncReport::default()
        };

        if report.is_clean() {
            info!(synced = report.synced.len(), "Session ended");
        } else {
            warn!(
                still_pending = report.still_pending.len(),
                rolled_back = report.rolled_back.len(),
                "Session ended with unsynced cart lines"
            );
        }
        report
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the remote client.
    #[must_use]
    pub fn client(&self) -> &RestClient {
        &self.inner.client
    }

    /// Get a reference to the cart store.
    #[must_use]
    pub fn cart(&self) -> &CartStore<RestClient> {
        &self.inner.cart
    }

    /// Get a reference to the catalog view.
    #[must_use]
    pub fn catalog(&self) -> &CatalogView<RestClient> {
        &self.inner.catalog
    }

    /// Add a catalog product to the cart.
    ///
    /// # Errors
    ///
    /// Returns `AppError::NotFound` if the product is not in the catalog.
    pub async fn add_product(&self, product_id: ProductId, quantity: Quantity) -> Result<SyncOutcome> {
        if !self.inner.catalog.catalog().contains(&product_id) {
            return Err(AppError::NotFound(format!("product {product_id}")));
        }
        add_breadcrumb("cart", "Added to cart", Some(&[("product_id", product_id.as_str())]));

        Ok(self
            .inner
            .catalog
            .add_to_cart(&self.inner.cart, product_id, quantity)
            .await)
    }

    /// Current cart as display data.
    #[must_use]
    pub fn cart_view(&self) -> CartView {
        CartView::from_snapshot(
            &self.inner.cart.snapshot(),
            &self.inner.catalog.catalog(),
            self.inner.config.currency,
            self.inner.cart.notice(),
        )
    }

    /// Product grid as display data.
    #[must_use]
    pub fn product_cards(&self) -> Vec<ProductCardView> {
        self.inner.catalog.product_cards()
    }
}

impl std::fmt::Debug for ShopSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShopSession")
            .field("client", &self.inner.client)
            .field("cart_lines", &self.inner.cart.cart().len())
            .finish_non_exhaustive()
    }
}
