//! Cache types for remote service responses.

use shopfront_core::{Catalog, CartLine};

/// Cache key for catalog and cart reads.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Products,
    Cart,
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Products(Catalog),
    Cart(Vec<CartLine>),
}
