//! Sync bookkeeping types exposed by the cart store.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use shopfront_core::{Cart, Catalog, CurrencyCode, Price, ProductId};

/// Result of a cart intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote service acknowledged the change.
    Synced,
    /// The remote call failed; the local change is kept and queued for retry.
    Pending,
    /// The result arrived after a newer intent or reload and was discarded.
    Superseded,
    /// Nothing to do (line absent, quantity unchanged, or increment rejected).
    Unchanged,
    /// The remote call failed and local state was left untouched.
    Failed,
}

/// Sync status of one cart line.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SyncStatus {
    /// Local quantity matches the last remote acknowledgement.
    #[default]
    Synced,
    /// Last write failed; waiting for [`super::CartStore::sync_pending`].
    Pending {
        /// Failed attempts so far.
        attempts: u32,
        /// Error from the most recent attempt.
        last_error: String,
        /// When the line first failed to sync.
        since: DateTime<Utc>,
    },
}

impl SyncStatus {
    /// Whether the line is waiting for a retry.
    #[must_use]
    pub const fn is_pending(&self) -> bool {
        matches!(self, Self::Pending { .. })
    }
}

/// Outcome of one [`super::CartStore::sync_pending`] pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Lines the remote service accepted.
    pub synced: Vec<ProductId>,
    /// Lines that failed again and stay queued.
    pub still_pending: Vec<ProductId>,
    /// Lines that ran out of attempts and were reverted to the confirmed cart.
    pub rolled_back: Vec<ProductId>,
}

impl SyncReport {
    /// Whether the pass left nothing queued.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.still_pending.is_empty()
    }
}

/// Point-in-time copy of the store state.
#[derive(Debug, Clone, Default)]
pub struct CartSnapshot {
    /// The local (optimistic) cart.
    pub cart: Cart,
    /// Sync status of lines that are not synced.
    pub pending: BTreeMap<ProductId, SyncStatus>,
    /// Set when the last full load failed; the cart is then empty.
    pub load_error: Option<String>,
    /// Time of the last successful full load.
    pub loaded_at: Option<DateTime<Utc>>,
    /// Store generation; bumped by every full load.
    pub generation: u64,
}

impl CartSnapshot {
    /// Sync status of a line.
    #[must_use]
    pub fn status(&self, product_id: &ProductId) -> SyncStatus {
        self.pending.get(product_id).cloned().unwrap_or_default()
    }

    /// Whether every line is synced.
    #[must_use]
    pub fn is_synced(&self) -> bool {
        self.pending.is_empty()
    }

    /// Cart total against the catalog.
    #[must_use]
    pub fn total_price(&self, catalog: &Catalog, currency: CurrencyCode) -> Price {
        self.cart.total_price(catalog, currency)
    }
}
