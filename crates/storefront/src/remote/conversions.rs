//! Wire record to domain type conversions.
//!
//! Entries that cannot be represented in the domain (unpriceable products,
//! zero or negative quantities) are dropped with a warning.

use std::str::FromStr;

use rust_decimal::Decimal;
use shopfront_core::{Catalog, CartLine, CurrencyCode, Price, Product, ProductId, Quantity};
use tracing::warn;

use super::wire::{CartLineRecord, ProductRecord};

/// Parse a JSON price (number or decimal string).
fn parse_price(value: &serde_json::Value) -> Option<Decimal> {
    match value {
        serde_json::Value::Number(n) => Decimal::from_str(&n.to_string())
            .or_else(|_| Decimal::from_scientific(&n.to_string()))
            .ok(),
        serde_json::Value::String(s) => Decimal::from_str(s.trim()).ok(),
        _ => None,
    }
}

pub fn convert_product(record: ProductRecord, currency: CurrencyCode) -> Option<Product> {
    let Some(amount) = parse_price(&record.price) else {
        warn!(product_id = %record.id, price = %record.price, "Dropping product with unparsable price");
        return None;
    };

    let price = match Price::new(amount, currency) {
        Ok(price) => price,
        Err(e) => {
            warn!(product_id = %record.id, error = %e, "Dropping product with invalid price");
            return None;
        }
    };

    Some(Product {
        id: ProductId::new(record.id),
        name: record.name,
        description: record.description,
        price,
        image: record.image.filter(|i| !i.trim().is_empty()),
    })
}

pub fn convert_catalog(records: Vec<ProductRecord>, currency: CurrencyCode) -> Catalog {
    records
        .into_iter()
        .filter_map(|r| convert_product(r, currency))
        .collect()
}

pub fn convert_cart_line(record: CartLineRecord) -> Option<CartLine> {
    let quantity = u32::try_from(record.quantity)
        .ok()
        .and_then(|q| Quantity::new(q).ok());

    let Some(quantity) = quantity else {
        warn!(
            product_id = %record.product_id,
            quantity = record.quantity,
            "Dropping cart line with non-positive quantity"
        );
        return None;
    };

    Some(CartLine::new(ProductId::new(record.product_id), quantity))
}

pub fn convert_cart_lines(records: Vec<CartLineRecord>) -> Vec<CartLine> {
    records.into_iter().filter_map(convert_cart_line).collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn record(id: &str, price: serde_json::Value) -> ProductRecord {
        ProductRecord {
            id: id.to_string(),
            name: format!("Product {id}"),
            description: String::new(),
            price,
            image: None,
        }
    }

    #[test]
    fn test_parse_price_number_and_string() {
        assert_eq!(parse_price(&json!(10)), Some(Decimal::new(10, 0)));
        assert_eq!(parse_price(&json!(19.99)), Some(Decimal::new(1999, 2)));
        assert_eq!(parse_price(&json!("4.50")), Some(Decimal::new(450, 2)));
        assert_eq!(parse_price(&json!(null)), None);
        assert_eq!(parse_price(&json!("free")), None);
    }

    #[test]
    fn test_negative_price_dropped() {
        assert!(convert_product(record("p1", json!(-1)), CurrencyCode::USD).is_none());
    }

    #[test]
    fn test_catalog_keeps_valid_products() {
        let catalog = convert_catalog(
            vec![
                record("p1", json!(10)),
                record("bad", json!("n/a")),
                record("p2", json!("2.25")),
            ],
            CurrencyCode::USD,
        );
        assert_eq!(catalog.len(), 2);
        assert_eq!(
            catalog.get(&ProductId::from("p2")).unwrap().price.display(),
            "$2.25"
        );
    }

    #[test]
    fn test_blank_image_is_none() {
        let mut r = record("p1", json!(1));
        r.image = Some("  ".to_string());
        assert!(convert_product(r, CurrencyCode::USD).unwrap().image.is_none());
    }

    #[test]
    fn test_cart_line_quantity_filtering() {
        let lines = convert_cart_lines(vec![
            CartLineRecord {
                product_id: "p1".to_string(),
                quantity: 2,
            },
            CartLineRecord {
                product_id: "p2".to_string(),
                quantity: 0,
            },
            CartLineRecord {
                product_id: "p3".to_string(),
                quantity: -4,
            },
        ]);
        assert_eq!(lines, vec![CartLine::new(ProductId::from("p1"), Quantity::new(2).unwrap())]);
    }
}
