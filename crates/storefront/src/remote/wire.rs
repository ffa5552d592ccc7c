//! Wire records exchanged with the remote service.
//!
//! Records are deliberately loose (string IDs, raw JSON prices, signed
//! quantities) so that one bad entry can be dropped during conversion instead
//! of failing the whole response. Entries that do not even match a record
//! are dropped while the list is parsed.

use serde::{Deserialize, Deserializer, de};

/// A list response: either a bare JSON array or `{"products": [...]}`.
///
/// The service wraps both the catalog and the cart lines in a `products`
/// envelope.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ListResponse<T> {
    Bare(Vec<T>),
    Envelope { products: Vec<T> },
}

impl<T> ListResponse<T> {
    /// Unwrap the listed items.
    pub fn into_items(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Envelope { products: items } => items,
        }
    }
}

/// A product as listed by `GET /products`.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductRecord {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// JSON number or decimal string.
    pub price: serde_json::Value,
    #[serde(default)]
    pub image: Option<String>,
}

/// A cart line as listed by `GET /cart`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineRecord {
    pub product_id: String,
    #[serde(deserialize_with = "whole_number")]
    pub quantity: i64,
}

/// Accept an integer, an integral float (`2.0`) or an integer string (`"2"`).
#[allow(clippy::float_cmp, clippy::cast_possible_truncation)]
fn whole_number<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::Number(n) => n
            .as_i64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.fract() == 0.0 && f.abs() < 9.0e15)
                    .map(|f| f as i64)
            })
            .ok_or_else(|| de::Error::custom(format!("quantity {n} is not a whole number"))),
        serde_json::Value::String(s) => s
            .trim()
            .parse::<i64>()
            .map_err(|e| de::Error::custom(format!("quantity {s:?}: {e}"))),
        other => Err(de::Error::custom(format!("quantity {other} is not a number"))),
    }
}
