//! Cart line quantity.

use core::fmt;
use core::num::NonZeroU32;

use serde::{Deserialize, Serialize};

/// Errors that can occur when building a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// A cart line cannot hold zero units; remove it instead.
    #[error("quantity must be at least 1")]
    Zero,
    /// Incrementing would exceed the representable maximum.
    #[error("quantity overflow: {current} + {added}")]
    Overflow {
        /// Quantity before the increment.
        current: u32,
        /// Amount that was being added.
        added: u32,
    },
}

/// A positive number of units of one product.
///
/// A line that would reach zero is removed from the cart rather than kept at
/// zero, so zero is unrepresentable here.
///
/// ```
/// use shopfront_core::Quantity;
///
/// assert!(Quantity::new(0).is_err());
/// assert_eq!(Quantity::clamped(0).get(), 1);
/// assert_eq!(Quantity::clamped(-3).get(), 1);
/// assert_eq!(Quantity::clamped(7).get(), 7);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(NonZeroU32);

impl Quantity {
    /// One unit.
    pub const ONE: Self = Self(NonZeroU32::MIN);

    /// Create a quantity, rejecting zero.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Zero`] for `0`.
    pub const fn new(n: u32) -> Result<Self, QuantityError> {
        match NonZeroU32::new(n) {
            Some(n) => Ok(Self(n)),
            None => Err(QuantityError::Zero),
        }
    }

    /// Create a quantity from raw user input, flooring at 1.
    ///
    /// Values above `u32::MAX` saturate.
    #[must_use]
    pub fn clamped(n: i64) -> Self {
        let n = u32::try_from(n.max(1)).unwrap_or(u32::MAX);
        NonZeroU32::new(n).map_or(Self::ONE, Self)
    }

    /// The number of units.
    #[must_use]
    pub const fn get(self) -> u32 {
        self.0.get()
    }

    /// Add `other` units.
    ///
    /// # Errors
    ///
    /// Returns [`QuantityError::Overflow`] if the sum does not fit in a `u32`.
    pub fn checked_add(self, other: Self) -> Result<Self, QuantityError> {
        self.0
            .checked_add(other.get())
            .map(Self)
            .ok_or(QuantityError::Overflow {
                current: self.get(),
                added: other.get(),
            })
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u32> for Quantity {
    type Error = QuantityError;

    fn try_from(n: u32) -> Result<Self, Self::Error> {
        Self::new(n)
    }
}

impl From<Quantity> for u32 {
    fn from(q: Quantity) -> Self {
        q.get()
    }
}
