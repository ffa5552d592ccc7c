//! Display-ready view models for the cart and the product grid.

use shopfront_core::{Catalog, CurrencyCode, Product, ProductId};

use crate::cart::CartSnapshot;
use crate::notice::ADDED_MESSAGE;

/// Title shown for a cart line whose product is missing from the catalog.
pub const PRODUCT_NOT_FOUND: &str = "Product Not Found";

/// Image shown when a product has none.
pub const PLACEHOLDER_IMAGE: &str = "placeholder.jpg";

/// Cart line display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartItemView {
    pub product_id: String,
    pub title: String,
    pub image: String,
    pub quantity: u32,
    pub price: String,
    pub line_price: String,
    /// Whether the product was found in the catalog.
    pub resolved: bool,
    /// Whether the line's last write is waiting to be retried.
    pub pending: bool,
}

/// Cart display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartView {
    pub items: Vec<CartItemView>,
    pub subtotal: String,
    pub item_count: u64,
    /// Set when the cart could not be loaded.
    pub load_error: Option<String>,
    pub notice: Option<String>,
}

impl CartView {
    /// Create an empty cart.
    #[must_use]
    pub fn empty(currency: CurrencyCode) -> Self {
        Self {
            items: Vec::new(),
            subtotal: format!("{}0.00", currency.symbol()),
            item_count: 0,
            load_error: None,
            notice: None,
        }
    }

    /// Build the cart view from a store snapshot.
    #[must_use]
    pub fn from_snapshot(
        snapshot: &CartSnapshot,
        catalog: &Catalog,
        currency: CurrencyCode,
        notice: Option<String>,
    ) -> Self {
        let items = snapshot
            .cart
            .priced_lines(catalog, currency)
            .into_iter()
            .map(|line| {
                let (title, image, price) = line.product.map_or_else(
                    || {
                        (
                            PRODUCT_NOT_FOUND.to_string(),
                            PLACEHOLDER_IMAGE.to_string(),
                            line.line_total.display(),
                        )
                    },
                    |p| (p.name.clone(), image_or_placeholder(p), p.price.display()),
                );
                CartItemView {
                    product_id: line.product_id.to_string(),
                    title,
                    image,
                    quantity: line.quantity.get(),
                    price,
                    line_price: line.line_total.display(),
                    resolved: line.is_resolved(),
                    pending: snapshot.status(line.product_id).is_pending(),
                }
            })
            .collect();

        Self {
            items,
            subtotal: snapshot.total_price(catalog, currency).display(),
            item_count: snapshot.cart.item_count(),
            load_error: snapshot.load_error.clone(),
            notice,
        }
    }

    /// Whether the cart has no lines.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Product card display data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCardView {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: String,
    pub image: String,
    /// Confirmation shown on the card that was just added to the cart.
    pub added_message: Option<&'static str>,
}

impl ProductCardView {
    #[must_use]
    pub fn new(product: &Product, last_added: Option<&ProductId>) -> Self {
        Self {
            id: product.id.to_string(),
            name: product.name.clone(),
            description: product.description.clone(),
            price: product.price.display(),
            image: image_or_placeholder(product),
            added_message: (last_added == Some(&product.id)).then_some(ADDED_MESSAGE),
        }
    }
}

fn image_or_placeholder(product: &Product) -> String {
    product
        .image
        .clone()
        .unwrap_or_else(|| PLACEHOLDER_IMAGE.to_string())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shopfront_core::{Cart, CartLine, Price, Quantity};

    use super::*;

    fn product(id: &str, cents: i64, image: Option<&str>) -> Product {
        Product {
            id: ProductId::from(id),
            name: format!("Product {id}"),
            description: "desc".to_string(),
            price: Price::new(Decimal::new(cents, 2), CurrencyCode::USD).unwrap(),
            image: image.map(ToString::to_string),
        }
    }

    fn snapshot(lines: &[(&str, u32)]) -> CartSnapshot {
        CartSnapshot {
            cart: Cart::from_lines(
                lines
                    .iter()
                    .map(|(id, q)| CartLine::new(ProductId::from(*id), Quantity::new(*q).unwrap())),
            ),
            ..CartSnapshot::default()
        }
    }

    #[test]
    fn test_empty_cart_view() {
        let view = CartView::empty(CurrencyCode::USD);
        assert!(view.is_empty());
        assert_eq!(view.subtotal, "$0.00");
    }

    #[test]
    fn test_cart_view_with_missing_product() {
        let catalog = Catalog::new([product("p1", 500, Some("p1.jpg"))]);
        let view = CartView::from_snapshot(
            &snapshot(&[("p1", 1), ("p2", 3)]),
            &catalog,
            CurrencyCode::USD,
            None,
        );

        assert_eq!(view.items.len(), 2);
        assert_eq!(view.items[0].title, "Product p1");
        assert_eq!(view.items[0].image, "p1.jpg");
        assert_eq!(view.items[0].line_price, "$5.00");

        let missing = &view.items[1];
        assert_eq!(missing.title, PRODUCT_NOT_FOUND);
        assert_eq!(missing.image, PLACEHOLDER_IMAGE);
        assert_eq!(missing.line_price, "$0.00");
        assert!(!missing.resolved);

        assert_eq!(view.subtotal, "$5.00");
        assert_eq!(view.item_count, 4);
    }

    #[test]
    fn test_cart_view_carries_load_error_and_notice() {
        let snap = CartSnapshot {
            load_error: Some("offline".to_string()),
            ..CartSnapshot::default()
        };
        let view = CartView::from_snapshot(
            &snap,
            &Catalog::default(),
            CurrencyCode::USD,
            Some("Product removed from cart!".to_string()),
        );

        assert!(view.is_empty());
        assert_eq!(view.load_error.as_deref(), Some("offline"));
        assert_eq!(view.notice.as_deref(), Some("Product removed from cart!"));
    }

    #[test]
    fn test_product_card_added_message() {
        let p1 = product("p1", 1000, None);
        let added = ProductId::from("p1");
        let other = ProductId::from("p2");

        let card = ProductCardView::new(&p1, Some(&added));
        assert_eq!(card.price, "$10.00");
        assert_eq!(card.image, PLACEHOLDER_IMAGE);
        assert_eq!(card.added_message, Some(ADDED_MESSAGE));

        assert!(ProductCardView::new(&p1, Some(&other)).added_message.is_none());
        assert!(ProductCardView::new(&p1, None).added_message.is_none());
    }
}
