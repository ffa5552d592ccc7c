//! Cart lines, merging and totals.
//!
//! A [`Cart`] is a set of lines keyed by product ID. It knows nothing about
//! where its contents came from; reconciling it with the remote service is the
//! storefront's cart store's job.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::product::{Catalog, Product};
use crate::types::{CurrencyCode, Price, ProductId, Quantity, QuantityError};

/// One product-quantity pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLine {
    /// Product the line refers to.
    pub product_id: ProductId,
    /// Number of units.
    pub quantity: Quantity,
}

impl CartLine {
    /// Create a cart line.
    #[must_use]
    pub const fn new(product_id: ProductId, quantity: Quantity) -> Self {
        Self {
            product_id,
            quantity,
        }
    }
}

/// A cart line joined against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PricedLine<'a> {
    /// Product the line refers to.
    pub product_id: &'a ProductId,
    /// Number of units.
    pub quantity: Quantity,
    /// The catalog product, or `None` if the ID is unknown to the catalog.
    pub product: Option<&'a Product>,
    /// Unit price × quantity, or zero for an unresolved line.
    pub line_total: Price,
}

impl PricedLine<'_> {
    /// Whether the line's product was found in the catalog.
    #[must_use]
    pub const fn is_resolved(&self) -> bool {
        self.product.is_some()
    }
}

/// A user's cart.
///
/// Lines are unique per product ID and iterate in ID order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Cart {
    lines: BTreeMap<ProductId, Quantity>,
}

impl Cart {
    /// An empty cart.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a cart from a line listing, merging repeated product IDs by
    /// summing their quantities.
    #[must_use]
    pub fn from_lines(lines: impl IntoIterator<Item = CartLine>) -> Self {
        let mut cart = Self::new();
        for line in lines {
            if let Err(e) = cart.add(line.product_id.clone(), line.quantity) {
                warn!(product_id = %line.product_id, error = %e, "Saturating merged cart line");
                cart.lines
                    .insert(line.product_id, Quantity::clamped(i64::from(u32::MAX)));
            }
        }
        cart
    }

    /// Add `quantity` units of a product, inserting the line if absent.
    ///
    /// Returns the line's new quantity.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Overflow`] if the line would exceed the maximum
    /// quantity; the cart is left unchanged.
    pub fn add(
        &mut self,
        product_id: ProductId,
        quantity: Quantity,
    ) -> Result<Quantity, QuantityError> {
        let new_quantity = match self.lines.get(&product_id) {
            Some(current) => current.checked_add(quantity)?,
            None => quantity,
        };
        self.lines.insert(product_id, new_quantity);
        Ok(new_quantity)
    }

    /// Set a line to an absolute quantity, inserting it if absent.
    ///
    /// Returns the previous quantity.
    pub fn set(&mut self, product_id: ProductId, quantity: Quantity) -> Option<Quantity> {
        self.lines.insert(product_id, quantity)
    }

    /// Remove a line. Removing an absent line is a no-op.
    ///
    /// Returns the removed quantity.
    pub fn remove(&mut self, product_id: &ProductId) -> Option<Quantity> {
        self.lines.remove(product_id)
    }

    /// Quantity of a product, if it is in the cart.
    #[must_use]
    pub fn get(&self, product_id: &ProductId) -> Option<Quantity> {
        self.lines.get(product_id).copied()
    }

    /// Whether the cart holds a line for this product.
    #[must_use]
    pub fn contains(&self, product_id: &ProductId) -> bool {
        self.lines.contains_key(product_id)
    }

    /// Lines in product ID order.
    pub fn lines(&self) -> impl Iterator<Item = CartLine> + '_ {
        self.lines
            .iter()
            .map(|(id, &quantity)| CartLine::new(id.clone(), quantity))
    }

    /// Number of distinct lines.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Total number of units across all lines.
    #[must_use]
    pub fn item_count(&self) -> u64 {
        self.lines.values().map(|q| u64::from(q.get())).sum()
    }

    /// Join every line against the catalog.
    ///
    /// Lines whose product is missing from the catalog are kept, priced at
    /// zero and marked unresolved.
    #[must_use]
    pub fn priced_lines<'a>(
        &'a self,
        catalog: &'a Catalog,
        currency: CurrencyCode,
    ) -> Vec<PricedLine<'a>> {
        self.lines
            .iter()
            .map(|(id, &quantity)| {
                let product = catalog.get(id);
                let line_total = product.map_or_else(
                    || Price::zero(currency),
                    |p| p.price.times(quantity),
                );
                PricedLine {
                    product_id: id,
                    quantity,
                    product,
                    line_total,
                }
            })
            .collect()
    }

    /// Sum of catalog price × quantity over all lines.
    ///
    /// Unresolved lines contribute zero.
    #[must_use]
    pub fn total_price(&self, catalog: &Catalog, currency: CurrencyCode) -> Price {
        self.priced_lines(catalog, currency)
            .into_iter()
            .fold(Price::zero(currency), |total, line| total.plus(line.line_total))
    }

    /// IDs of lines whose product is missing from the catalog.
    #[must_use]
    pub fn unresolved<'a>(&'a self, catalog: &Catalog) -> Vec<&'a ProductId> {
        self.lines
            .keys()
            .filter(|id| !catalog.contains(id))
            .collect()
    }
}

impl FromIterator<CartLine> for Cart {
    fn from_iter<I: IntoIterator<Item = CartLine>>(iter: I) -> Self {
        Self::from_lines(iter)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn qty(n: u32) -> Quantity {
        Quantity::new(n).unwrap()
    }

    fn product(id: &str, cents: i64) -> Product {
        Product {
            id: ProductId::from(id),
            name: id.to_uppercase(),
            description: String::new(),
            price: Price::new(Decimal::new(cents, 2), CurrencyCode::USD).unwrap(),
            image: None,
        }
    }

    fn usd(cents: i64) -> Price {
        Price::new(Decimal::new(cents, 2), CurrencyCode::USD).unwrap()
    }

    #[test]
    fn test_add_twice_merges_into_one_line() {
        let mut cart = Cart::new();
        cart.add(ProductId::from("p1"), Quantity::ONE).unwrap();
        let q = cart.add(ProductId::from("p1"), Quantity::ONE).unwrap();

        assert_eq!(q, qty(2));
        assert_eq!(cart.len(), 1);
        assert_eq!(cart.get(&ProductId::from("p1")), Some(qty(2)));
    }

    #[test]
    fn test_add_overflow_leaves_cart_unchanged() {
        let mut cart = Cart::new();
        cart.set(ProductId::from("p1"), qty(u32::MAX));
        assert!(cart.add(ProductId::from("p1"), Quantity::ONE).is_err());
        assert_eq!(cart.get(&ProductId::from("p1")), Some(qty(u32::MAX)));
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut cart = Cart::from_lines([CartLine::new(ProductId::from("p1"), qty(2))]);
        let before = cart.clone();
        assert_eq!(cart.remove(&ProductId::from("p3")), None);
        assert_eq!(cart, before);
    }

    #[test]
    fn test_from_lines_sums_duplicates() {
        let cart = Cart::from_lines([
            CartLine::new(ProductId::from("p1"), qty(2)),
            CartLine::new(ProductId::from("p2"), qty(1)),
            CartLine::new(ProductId::from("p1"), qty(3)),
        ]);
        assert_eq!(cart.get(&ProductId::from("p1")), Some(qty(5)));
        assert_eq!(cart.item_count(), 6);
    }

    #[test]
    fn test_total_single_line() {
        let catalog = Catalog::new([product("p1", 1000)]);
        let cart = Cart::from_lines([CartLine::new(ProductId::from("p1"), qty(2))]);

        let total = cart.total_price(&catalog, CurrencyCode::USD);
        assert_eq!(total, usd(2000));
        assert_eq!(total.display(), "$20.00");
    }

    #[test]
    fn test_total_skips_unresolved_lines() {
        let catalog = Catalog::new([product("p1", 1250)]);
        let cart = Cart::from_lines([
            CartLine::new(ProductId::from("p1"), qty(1)),
            CartLine::new(ProductId::from("p2"), qty(3)),
        ]);

        assert_eq!(cart.total_price(&catalog, CurrencyCode::USD), usd(1250));
        assert_eq!(cart.unresolved(&catalog), vec![&ProductId::from("p2")]);

        let lines = cart.priced_lines(&catalog, CurrencyCode::USD);
        let p2 = lines
            .iter()
            .find(|l| l.product_id.as_str() == "p2")
            .unwrap();
        assert!(!p2.is_resolved());
        assert_eq!(p2.line_total, Price::zero(CurrencyCode::USD));
    }

    #[test]
    fn test_total_matches_sum_over_lines() {
        let catalog = Catalog::new([product("a", 199), product("b", 1), product("c", 0)]);
        let cart = Cart::from_lines([
            CartLine::new(ProductId::from("a"), qty(3)),
            CartLine::new(ProductId::from("b"), qty(7)),
            CartLine::new(ProductId::from("c"), qty(9)),
            CartLine::new(ProductId::from("gone"), qty(4)),
        ]);

        let expected: Decimal = cart
            .lines()
            .map(|line| {
                catalog
                    .get(&line.product_id)
                    .map_or(Decimal::ZERO, |p| p.price.amount())
                    * Decimal::from(line.quantity.get())
            })
            .sum();
        assert_eq!(cart.total_price(&catalog, CurrencyCode::USD).amount(), expected);
        assert_eq!(expected, Decimal::new(604, 2));
    }

    #[test]
    fn test_empty_cart_total_is_zero() {
        let cart = Cart::new();
        assert_eq!(
            cart.total_price(&Catalog::default(), CurrencyCode::EUR).display(),
            "€0.00"
        );
    }

    #[test]
    fn test_cart_line_wire_shape() {
        let line = CartLine::new(ProductId::from("p1"), qty(2));
        assert_eq!(
            serde_json::to_string(&line).unwrap(),
            r#"{"productId":"p1","quantity":2}"#
        );
    }
}
