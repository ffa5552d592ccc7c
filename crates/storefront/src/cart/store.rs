//! Cart store implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use shopfront_core::{Cart, CartLine, Catalog, CurrencyCode, Price, ProductId, Quantity};
use tracing::{debug, info, instrument, warn};

use super::sync::{CartSnapshot, SyncOutcome, SyncReport, SyncStatus};
use crate::config::StorefrontConfig;
use crate::notice::{Expiring, REMOVED_MESSAGE, take_live};
use crate::remote::{ApiError, CartApi};

/// The user's cart, kept consistent with the remote service.
///
/// Cheaply cloneable via `Arc`; clones share state. The state lock is never
/// held across a remote call.
pub struct CartStore<A> {
    inner: Arc<CartStoreInner<A>>,
}

impl<A> Clone for CartStore<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct CartStoreInner<A> {
    api: A,
    state: Mutex<CartState>,
    max_sync_attempts: u32,
    notice_ttl: Duration,
    currency: CurrencyCode,
}

/// A line whose last write did not reach the remote service.
#[derive(Debug, Clone)]
struct PendingSync {
    attempts: u32,
    last_error: String,
    since: DateTime<Utc>,
}

/// Captured before a remote call, checked when it returns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Ticket {
    generation: u64,
    revision: Option<u64>,
}

#[derive(Debug, Default)]
struct CartState {
    cart: Cart,
    confirmed: Cart,
    pending: BTreeMap<ProductId, PendingSync>,
    revisions: HashMap<ProductId, u64>,
    /// Revision of the write that produced each line's confirmed value.
    confirmed_revisions: HashMap<ProductId, u64>,
    next_revision: u64,
    generation: u64,
    load_error: Option<String>,
    loaded_at: Option<DateTime<Utc>>,
    notice: Option<Expiring<String>>,
}

impl CartState {
    /// Record a new local intent for a line and return its ticket.
    fn bump(&mut self, product_id: &ProductId) -> Ticket {
        self.next_revision += 1;
        self.revisions
            .insert(product_id.clone(), self.next_revision);
        Ticket {
            generation: self.generation,
            revision: Some(self.next_revision),
        }
    }

    /// Ticket for the line's current revision, without a new intent.
    fn ticket(&self, product_id: &ProductId) -> Ticket {
        Ticket {
            generation: self.generation,
            revision: self.revisions.get(product_id).copied(),
        }
    }

    fn is_current(&self, product_id: &ProductId, ticket: Ticket) -> bool {
        self.ticket(product_id) == ticket
    }

    fn mark_pending(&mut self, product_id: &ProductId, error: &ApiError) -> u32 {
        let entry = self
            .pending
            .entry(product_id.clone())
            .or_insert_with(|| PendingSync {
                attempts: 0,
                last_error: String::new(),
                since: Utc::now(),
            });
        entry.attempts += 1;
        entry.last_error = error.to_string();
        entry.attempts
    }

    /// Record what the remote acknowledged, unless a newer write already
    /// confirmed the line.
    fn confirm(&mut self, product_id: &ProductId, quantity: Option<Quantity>, revision: u64) {
        if self
            .confirmed_revisions
            .get(product_id)
            .is_some_and(|&confirmed| confirmed > revision)
        {
            debug!(product_id = %product_id, revision, "Ignoring older acknowledgement");
            return;
        }
        set_or_remove(&mut self.confirmed, product_id, quantity);
        self.confirmed_revisions
            .insert(product_id.clone(), revision);
    }

    /// Revert a line to its confirmed quantity, or drop it if the remote
    /// never had it.
    fn roll_back(&mut self, product_id: &ProductId) {
        let confirmed = self.confirmed.get(product_id);
        set_or_remove(&mut self.cart, product_id, confirmed);
        self.pending.remove(product_id);
        self.bump(product_id);
    }

    /// Replace local state with a fetched cart.
    ///
    /// Lines touched by intents issued after `high_water` postdate the fetch:
    /// they keep their local quantity, confirmation and pending entry.
    fn apply_load(&mut self, fetched: Cart, high_water: u64, load_error: Option<String>) {
        let touched: Vec<ProductId> = self
            .revisions
            .iter()
            .filter(|&(_, &revision)| revision > high_water)
            .map(|(id, _)| id.clone())
            .collect();

        let mut cart = fetched.clone();
        let mut confirmed = fetched;
        let mut pending = BTreeMap::new();
        for id in &touched {
            set_or_remove(&mut cart, id, self.cart.get(id));
            if self
                .confirmed_revisions
                .get(id)
                .is_some_and(|&revision| revision > high_water)
            {
                set_or_remove(&mut confirmed, id, self.confirmed.get(id));
            }
            if let Some(entry) = self.pending.remove(id) {
                pending.insert(id.clone(), entry);
            }
        }

        if !self.pending.is_empty() {
            warn!(
                pending = self.pending.len(),
                "Dropping unsynced cart lines, remote cart wins"
            );
        }
        self.cart = cart;
        self.confirmed = confirmed;
        self.pending = pending;
        self.revisions.retain(|_, revision| *revision > high_water);
        self.confirmed_revisions
            .retain(|_, revision| *revision > high_water);
        self.load_error = load_error;
    }

    fn snapshot(&self) -> CartSnapshot {
        CartSnapshot {
            cart: self.cart.clone(),
            pending: self
                .pending
                .iter()
                .map(|(id, p)| {
                    (
                        id.clone(),
                        SyncStatus::Pending {
                            attempts: p.attempts,
                            last_error: p.last_error.clone(),
                            since: p.since,
                        },
                    )
                })
                .collect(),
            load_error: self.load_error.clone(),
            loaded_at: self.loaded_at,
            generation: self.generation,
        }
    }
}

fn set_or_remove(cart: &mut Cart, product_id: &ProductId, quantity: Option<Quantity>) {
    match quantity {
        Some(quantity) => {
            cart.set(product_id.clone(), quantity);
        }
        None => {
            cart.remove(product_id);
        }
    }
}

impl<A: CartApi> CartStore<A> {
    /// Create an empty store on top of a remote API.
    ///
    /// The store starts empty; call [`Self::load`] to populate it.
    #[must_use]
    pub fn new(api: A, config: &StorefrontConfig) -> Self {
        Self {
            inner: Arc::new(CartStoreInner {
                api,
                state: Mutex::new(CartState::default()),
                max_sync_attempts: config.sync.max_attempts.max(1),
                notice_ttl: config.notice_ttl,
                currency: config.currency,
            }),
        }
    }

    /// The remote API the store writes through.
    #[must_use]
    pub fn api(&self) -> &A {
        &self.inner.api
    }

    fn lock(&self) -> MutexGuard<'_, CartState> {
        self.inner
            .state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    // =========================================================================
    // Full Load
    // =========================================================================

    /// Replace local state with the remote cart.
    ///
    /// Never fails: on error the cart is emptied and the snapshot carries the
    /// error message. A response that arrives after a newer load started is
    /// discarded. Intents issued while the fetch was in flight are kept on
    /// top of the fetched cart.
    #[instrument(skip(self))]
    pub async fn load(&self) -> CartSnapshot {
        // Writes issued before this point carry an older generation and are
        // superseded by the load.
        let (generation, high_water) = {
            let mut state = self.lock();
            state.generation += 1;
            (state.generation, state.next_revision)
        };

        let result = self.inner.api.fetch_cart().await;

        let mut state = self.lock();
        if state.generation != generation {
            debug!(generation, current = state.generation, "Discarding stale cart load");
            return state.snapshot();
        }

        match result {
            Ok(lines) => {
                let cart = Cart::from_lines(lines);
                info!(lines = cart.len(), items = cart.item_count(), "Cart loaded");
                state.apply_load(cart, high_water, None);
                state.loaded_at = Some(Utc::now());
            }
            Err(e) => {
                warn!(error = %e, "Failed to load cart");
                state.apply_load(Cart::new(), high_water, Some(e.to_string()));
            }
        }
        state.snapshot()
    }

    // =========================================================================
    // Intents
    // =========================================================================

    /// Add units of a product, inserting the line if absent.
    ///
    /// The local cart changes immediately. The remote service receives the
    /// line's full new quantity. On failure the line is queued for
    /// [`Self::sync_pending`].
    #[instrument(skip(self), fields(product_id = %product_id, quantity = %quantity))]
    pub async fn add_item(&self, product_id: ProductId, quantity: Quantity) -> SyncOutcome {
        let (line, ticket, remote_has_line) = {
            let mut state = self.lock();
            let new_quantity = match state.cart.add(product_id.clone(), quantity) {
                Ok(q) => q,
                Err(e) => {
                    warn!(error = %e, "Rejected cart increment");
                    return SyncOutcome::Unchanged;
                }
            };
            let ticket = state.bump(&product_id);
            let remote_has_line = state.confirmed.contains(&product_id);
            (CartLine::new(product_id, new_quantity), ticket, remote_has_line)
        };

        let result = self.push_line(&line, remote_has_line).await;
        self.settle(&line, ticket, result)
    }

    /// Set a line's absolute quantity.
    ///
    /// Callers clamp raw input with [`Quantity::clamped`]. Updating a product
    /// that is not in the cart does nothing.
    #[instrument(skip(self), fields(product_id = %product_id, quantity = %quantity))]
    pub async fn update_quantity(&self, product_id: ProductId, quantity: Quantity) -> SyncOutcome {
        let (line, ticket, remote_has_line) = {
            let mut state = self.lock();
            let Some(current) = state.cart.get(&product_id) else {
                debug!("Ignoring quantity update for product not in cart");
                return SyncOutcome::Unchanged;
            };
            if current == quantity && !state.pending.contains_key(&product_id) {
                return SyncOutcome::Unchanged;
            }
            state.cart.set(product_id.clone(), quantity);
            let ticket = state.bump(&product_id);
            let remote_has_line = state.confirmed.contains(&product_id);
            (CartLine::new(product_id, quantity), ticket, remote_has_line)
        };

        let result = self.push_line(&line, remote_has_line).await;
        self.settle(&line, ticket, result)
    }

    /// Increase a line's quantity by one.
    pub async fn increment(&self, product_id: ProductId) -> SyncOutcome {
        let Some(current) = self.quantity(&product_id) else {
            return SyncOutcome::Unchanged;
        };
        self.update_quantity(product_id, Quantity::clamped(i64::from(current.get()) + 1))
            .await
    }

    /// Decrease a line's quantity by one, never below one.
    pub async fn decrement(&self, product_id: ProductId) -> SyncOutcome {
        let Some(current) = self.quantity(&product_id) else {
            return SyncOutcome::Unchanged;
        };
        self.update_quantity(product_id, Quantity::clamped(i64::from(current.get()) - 1))
            .await
    }

    /// Remove a line.
    ///
    /// The remote deletion happens first; the local line is dropped only once
    /// it succeeds (a remote "not found" counts as success). On failure local
    /// state is unchanged. Removing an absent line is a no-op.
    #[instrument(skip(self), fields(product_id = %product_id))]
    pub async fn remove_item(&self, product_id: &ProductId) -> SyncOutcome {
        let ticket = {
            let mut state = self.lock();
            if !state.cart.contains(product_id) && !state.pending.contains_key(product_id) {
                debug!("Ignoring removal of product not in cart");
                return SyncOutcome::Unchanged;
            }
            state.bump(product_id)
        };

        let result = match self.inner.api.remove_line(product_id).await {
            Err(e) if e.is_not_found() => {
                debug!("Remote cart had no such line");
                Ok(())
            }
            other => other,
        };

        let mut state = self.lock();
        if let Err(e) = result {
            warn!(error = %e, "Failed to remove from cart");
            return SyncOutcome::Failed;
        }
        if state.generation != ticket.generation {
            debug!("Discarding removal result after reload");
            return SyncOutcome::Superseded;
        }

        state.confirm(product_id, None, ticket.revision.unwrap_or_default());
        if state.is_current(product_id, ticket) {
            state.cart.remove(product_id);
            state.pending.remove(product_id);
            state.notice = Some(Expiring::new(
                REMOVED_MESSAGE.to_string(),
                self.inner.notice_ttl,
            ));
            return SyncOutcome::Synced;
        }

        // A newer intent re-added the line while the deletion was in flight;
        // the remote may or may not have it now, so push it again.
        if state.cart.contains(product_id) {
            state.pending.entry(product_id.clone()).or_insert_with(|| PendingSync {
                attempts: 0,
                last_error: "re-added during removal".to_string(),
                since: Utc::now(),
            });
        }
        SyncOutcome::Superseded
    }

    /// Retry every pending line.
    ///
    /// Lines that fail `max_sync_attempts` times in total are rolled back to
    /// their confirmed quantity (or dropped if never confirmed).
    #[instrument(skip(self))]
    pub async fn sync_pending(&self) -> SyncReport {
        let work: Vec<(CartLine, Ticket, bool)> = {
            let mut state = self.lock();
            let ids: Vec<ProductId> = state.pending.keys().cloned().collect();
            let mut work = Vec::with_capacity(ids.len());
            for id in ids {
                match state.cart.get(&id) {
                    Some(quantity) => {
                        let ticket = state.ticket(&id);
                        let remote_has_line = state.confirmed.contains(&id);
                        work.push((CartLine::new(id, quantity), ticket, remote_has_line));
                    }
                    None => {
                        state.pending.remove(&id);
                    }
                }
            }
            work
        };

        let mut report = SyncReport::default();
        for (line, ticket, remote_has_line) in work {
            let result = self.push_line(&line, remote_has_line).await;
            match self.settle(&line, ticket, result) {
                SyncOutcome::Synced => report.synced.push(line.product_id),
                SyncOutcome::Pending => {
                    if self.roll_back_if_exhausted(&line.product_id) {
                        report.rolled_back.push(line.product_id);
                    } else {
                        report.still_pending.push(line.product_id);
                    }
                }
                SyncOutcome::Superseded | SyncOutcome::Unchanged | SyncOutcome::Failed => {}
            }
        }

        if !report.rolled_back.is_empty() {
            warn!(lines = ?report.rolled_back, "Rolled back cart lines that never synced");
        }
        debug!(
            synced = report.synced.len(),
            pending = report.still_pending.len(),
            "Sync pass finished"
        );
        report
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Copy of the current state.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.lock().snapshot()
    }

    /// Copy of the local cart.
    #[must_use]
    pub fn cart(&self) -> Cart {
        self.lock().cart.clone()
    }

    /// Local quantity of a product.
    #[must_use]
    pub fn quantity(&self, product_id: &ProductId) -> Option<Quantity> {
        self.lock().cart.get(product_id)
    }

    /// Number of lines waiting for a retry.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.lock().pending.len()
    }

    /// Local cart total against the catalog.
    #[must_use]
    pub fn total_price(&self, catalog: &Catalog) -> Price {
        self.lock().cart.total_price(catalog, self.inner.currency)
    }

    /// The active notice, if it has not expired.
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        take_live(&mut self.lock().notice)
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Send a line's full quantity. Lines the remote has never acknowledged
    /// are added; known lines get their absolute quantity set.
    async fn push_line(&self, line: &CartLine, remote_has_line: bool) -> Result<(), ApiError> {
        if remote_has_line {
            self.inner.api.set_quantity(line).await
        } else {
            self.inner.api.add_lines(std::slice::from_ref(line)).await
        }
    }

    /// Apply a write result if its ticket is still current.
    fn settle(&self, line: &CartLine, ticket: Ticket, result: Result<(), ApiError>) -> SyncOutcome {
        let mut state = self.lock();

        if state.generation == ticket.generation && result.is_ok() {
            // The remote holds what we sent, even if a newer intent follows.
            state.confirm(
                &line.product_id,
                Some(line.quantity),
                ticket.revision.unwrap_or_default(),
            );
        }

        if !state.is_current(&line.product_id, ticket) {
            debug!(product_id = %line.product_id, "Discarding superseded cart write");
            return SyncOutcome::Superseded;
        }

        match result {
            Ok(()) => {
                state.pending.remove(&line.product_id);
                SyncOutcome::Synced
            }
            Err(e) => {
                let attempts = state.mark_pending(&line.product_id, &e);
                warn!(
                    product_id = %line.product_id,
                    attempts,
                    error = %e,
                    "Cart write failed, line queued for sync"
                );
                SyncOutcome::Pending
            }
        }
    }

    fn roll_back_if_exhausted(&self, product_id: &ProductId) -> bool {
        let mut state = self.lock();
        let exhausted = state
            .pending
            .get(product_id)
            .is_some_and(|p| p.attempts >= self.inner.max_sync_attempts);
        if exhausted {
            state.roll_back(product_id);
        }
        exhausted
    }
}
