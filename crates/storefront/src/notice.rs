//! Short-lived values for user feedback.
//!
//! Uses `tokio::time::Instant` so expiry follows the runtime clock (and can be
//! driven with `tokio::time::pause` in tests).

use std::time::Duration;

use tokio::time::Instant;

/// Shown after a line is removed from the cart.
pub const REMOVED_MESSAGE: &str = "Product removed from cart!";

/// Shown on the product card that was last added to the cart.
pub const ADDED_MESSAGE: &str = "Product added to cart!";

/// Expiry used when `now + ttl` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(30 * 365 * 24 * 3600);

/// A value that disappears after a fixed delay.
#[derive(Debug, Clone)]
pub struct Expiring<T> {
    value: T,
    expires_at: Instant,
}

impl<T> Expiring<T> {
    /// Wrap `value`, visible for `ttl` from now.
    ///
    /// A `ttl` too large to represent is capped at roughly thirty years.
    #[must_use]
    pub fn new(value: T, ttl: Duration) -> Self {
        let now = Instant::now();
        let expires_at = now
            .checked_add(ttl)
            .or_else(|| now.checked_add(FAR_FUTURE))
            .unwrap_or(now);
        Self { value, expires_at }
    }

    /// The value, or `None` once the delay has passed.
    #[must_use]
    pub fn get(&self) -> Option<&T> {
        (!self.is_expired()).then_some(&self.value)
    }

    /// Whether the delay has passed.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }
}

/// Read an optional expiring slot, clearing it once expired.
pub fn take_live<T: Clone>(slot: &mut Option<Expiring<T>>) -> Option<T> {
    match slot {
        Some(entry) if !entry.is_expired() => Some(entry.value.clone()),
        Some(_) => {
            *slot = None;
            None
        }
        None => None,
    }
}
