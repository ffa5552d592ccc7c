//! Catalog view: the product list and "add to cart" intents.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use shopfront_core::{Catalog, ProductId, Quantity};
use tracing::{info, instrument, warn};

use crate::cart::{CartStore, SyncOutcome};
use crate::notice::{Expiring, take_live};
use crate::remote::{ApiError, CartApi};
use crate::view::ProductCardView;

/// Fetched catalog plus the transient "last added" indicator.
pub struct CatalogView<A> {
    api: A,
    state: Mutex<CatalogState>,
    notice_ttl: Duration,
}

#[derive(Debug, Default)]
struct CatalogState {
    catalog: Arc<Catalog>,
    last_added: Option<Expiring<ProductId>>,
}

impl<A: CartApi> CatalogView<A> {
    /// Create an empty view. Call [`Self::refresh`] to populate it.
    #[must_use]
    pub fn new(api: A, notice_ttl: Duration) -> Self {
        Self {
            api,
            state: Mutex::new(CatalogState::default()),
            notice_ttl,
        }
    }

    fn lock(&self) -> MutexGuard<'_, CatalogState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Fetch the catalog from the remote service.
    ///
    /// # Errors
    ///
    /// Returns the fetch error. The previously fetched catalog is kept.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<Arc<Catalog>, ApiError> {
        match self.api.fetch_products().await {
            Ok(catalog) => {
                info!(products = catalog.len(), "Catalog loaded");
                let catalog = Arc::new(catalog);
                self.lock().catalog = Arc::clone(&catalog);
                Ok(catalog)
            }
            Err(e) => {
                warn!(error = %e, "Failed to load catalog");
                Err(e)
            }
        }
    }

    /// The last successfully fetched catalog (empty before the first refresh).
    #[must_use]
    pub fn catalog(&self) -> Arc<Catalog> {
        Arc::clone(&self.lock().catalog)
    }

    /// Add units of a product to the cart and mark it as last added.
    ///
    /// The indicator is set whatever the remote outcome.
    #[instrument(skip(self, store), fields(product_id = %product_id, quantity = %quantity))]
    pub async fn add_to_cart<S: CartApi>(
        &self,
        store: &CartStore<S>,
        product_id: ProductId,
        quantity: Quantity,
    ) -> SyncOutcome {
        let outcome = store.add_item(product_id.clone(), quantity).await;
        self.lock().last_added = Some(Expiring::new(product_id, self.notice_ttl));
        outcome
    }

    /// The product added most recently, until the indicator expires.
    #[must_use]
    pub fn last_added(&self) -> Option<ProductId> {
        take_live(&mut self.lock().last_added)
    }

    #[must_use]
    pub fn is_recently_added(&self, product_id: &ProductId) -> bool {
        self.last_added().as_ref() == Some(product_id)
    }

    /// Product cards in listing order.
    #[must_use]
    pub fn product_cards(&self) -> Vec<ProductCardView> {
        let last_added = self.last_added();
        self.catalog()
            .iter()
            .map(|p| ProductCardView::new(p, last_added.as_ref()))
            .collect()
    }
}
