//! Newtype IDs for type-safe entity references.
//!
//! The remote service hands out opaque string identifiers (`_id` on the wire).
//! Wrapping them keeps product IDs from being mixed up with any other string.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Identifier of a product in the remote catalog.
///
/// Cart lines reference products by this ID; it is also the cart's key.
///
/// # Example
///
/// ```rust
/// use shopfront_core::ProductId;
///
/// let id = ProductId::new("p1");
/// assert_eq!(id.as_str(), "p1");
/// assert_eq!(id.to_string(), "p1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProductId(String);

impl ProductId {
    /// Create a new ID from any string-like value.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the underlying string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the ID and return its inner string.
    #[must_use]
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for ProductId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProductId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for ProductId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl AsRef<str> for ProductId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_product_id_serializes_transparently() {
        let id = ProductId::new("64f1c0ffee");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"64f1c0ffee\"");

        let parsed: ProductId = serde_json::from_str("\"64f1c0ffee\"").unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn test_product_id_ordering_is_lexical() {
        let mut ids = vec![ProductId::from("b"), ProductId::from("a")];
        ids.sort();
        assert_eq!(ids, vec![ProductId::from("a"), ProductId::from("b")]);
    }
}
