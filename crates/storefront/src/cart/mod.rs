//! Cart store: the local view of the remote cart.
//!
//! # Consistency model
//!
//! The remote cart is the source of truth. The store keeps three things:
//!
//! - the **confirmed** cart: what the remote service last acknowledged
//! - the **local** cart: confirmed plus optimistic edits
//! - the **pending** queue: lines whose last write failed and must be retried
//!
//! A full [`CartStore::load`] replaces all three with the remote state, except
//! for lines changed by intents issued while the fetch was in flight.
//!
//! Every write captures a ticket (store generation + line revision) before the
//! remote call. The result is applied only if the ticket still matches when the
//! call returns; otherwise a newer intent or reload has superseded it.

mod store;
mod sync;

pub use store::CartStore;
pub use sync::{CartSnapshot, SyncOutcome, SyncReport, SyncStatus};
