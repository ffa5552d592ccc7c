//! Products and the catalog lookup table.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::types::{Price, ProductId};

/// A purchasable product, authored by the remote service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    /// Product ID.
    pub id: ProductId,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Unit price.
    pub price: Price,
    /// Image URL or path, if the product has one.
    pub image: Option<String>,
}

/// The full set of purchasable products, in remote listing order.
///
/// Lookups by ID are constant time. Duplicate IDs keep the first occurrence.
#[derive(Debug, Clone, Default)]
pub struct Catalog {
    products: Vec<Product>,
    index: HashMap<ProductId, usize>,
}

impl Catalog {
    /// Build a catalog from a product listing.
    #[must_use]
    pub fn new(products: impl IntoIterator<Item = Product>) -> Self {
        let mut catalog = Self::default();
        for product in products {
            if catalog.index.contains_key(&product.id) {
                warn!(product_id = %product.id, "Duplicate product in catalog, keeping first");
                continue;
            }
            catalog
                .index
                .insert(product.id.clone(), catalog.products.len());
            catalog.products.push(product);
        }
        catalog
    }

    /// Look up a product by ID.
    #[must_use]
    pub fn get(&self, id: &ProductId) -> Option<&Product> {
        self.index.get(id).and_then(|&i| self.products.get(i))
    }

    /// Whether the catalog has a product with this ID.
    #[must_use]
    pub fn contains(&self, id: &ProductId) -> bool {
        self.index.contains_key(id)
    }

    /// Products in listing order.
    pub fn iter(&self) -> impl Iterator<Item = &Product> {
        self.products.iter()
    }

    /// Number of products.
    #[must_use]
    pub fn len(&self) -> usize {
        self.products.len()
    }

    /// Whether the catalog has no products.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.products.is_empty()
    }
}

impl FromIterator<Product> for Catalog {
    fn from_iter<I: IntoIterator<Item = Product>>(iter: I) -> Self {
        Self::new(iter)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;
    use crate::types::CurrencyCode;

    fn product(id: &str, name: &str) -> Product {
        Product {
            id: ProductId::from(id),
            name: name.to_string(),
            description: String::new(),
            price: Price::new(Decimal::ONE, CurrencyCode::USD).unwrap(),
            image: None,
        }
    }

    #[test]
    fn test_catalog_keeps_listing_order() {
        let catalog = Catalog::new([product("b", "Bee"), product("a", "Ant")]);
        let names: Vec<_> = catalog.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Bee", "Ant"]);
    }

    #[test]
    fn test_catalog_duplicate_keeps_first() {
        let catalog = Catalog::new([product("a", "First"), product("a", "Second")]);
        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get(&ProductId::from("a")).unwrap().name, "First");
    }

    #[test]
    fn test_catalog_missing_lookup() {
        let catalog = Catalog::new([product("a", "Ant")]);
        assert!(catalog.get(&ProductId::from("zzz")).is_none());
        assert!(!catalog.contains(&ProductId::from("zzz")));
    }
}
