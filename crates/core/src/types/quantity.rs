//! Validated cart line quantity.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// The input string is empty.
    #[error("Please enter a quantity")]
    Empty,
    /// The input is not a whole number.
    #[error("Quantity must be a whole number")]
    NotANumber,
    /// The quantity is zero.
    #[error("Quantity must be at least 1")]
    Zero,
    /// The quantity exceeds the per-line cap.
    #[error("Quantity must be at most {max}")]
    TooLarge {
        /// Maximum allowed quantity per cart line.
        max: u32,
    },
}

/// A cart line quantity.
///
/// Quantities are validated before any remote cart call is made, so an
/// out-of-range value never reaches the backend.
///
/// ## Constraints
///
/// - At least 1
/// - At most [`Quantity::MAX`] (50) units per cart line
///
/// ## Examples
///
/// ```
/// use roastline_core::Quantity;
///
/// assert!(Quantity::new(3).is_ok());
/// assert!(Quantity::new(0).is_err());
/// assert!(Quantity::new(51).is_err());
/// assert!(Quantity::parse("3").is_ok());
/// assert!(Quantity::parse("").is_err());
/// assert!(Quantity::parse("lots").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(u32);

impl Quantity {
    /// Maximum units of one cart line.
    pub const MAX: u32 = 50;

    /// Create a `Quantity` from a number.
    ///
    /// # Errors
    ///
    /// Returns an error if the value is zero or greater than [`Self::MAX`].
    pub const fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 {
            return Err(QuantityError::Zero);
        }
        if value > Self::MAX {
            return Err(QuantityError::TooLarge { max: Self::MAX });
        }
        Ok(Self(value))
    }

    /// Parse a `Quantity` from raw form input.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, not a whole number, zero, or
    /// greater than [`Self::MAX`].
    pub fn parse(s: &str) -> Result<Self, QuantityError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(QuantityError::Empty);
        }
        let value: u32 = trimmed.parse().map_err(|_| QuantityError::NotANumber)?;
        Self::new(value)
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Saturating addition, capped at [`Self::MAX`].
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        let sum = self.0.saturating_add(other.0);
        if sum > Self::MAX {
            Self(Self::MAX)
        } else {
            Self(sum)
        }
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for Quantity {
    type Err = QuantityError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_new_valid_range() {
        assert_eq!(Quantity::new(1).unwrap().get(), 1);
        assert_eq!(Quantity::new(50).unwrap().get(), 50);
    }

    #[test]
    fn test_new_zero() {
        assert_eq!(Quantity::new(0), Err(QuantityError::Zero));
    }

    #[test]
    fn test_new_too_large() {
        assert_eq!(
            Quantity::new(51),
            Err(QuantityError::TooLarge { max: 50 })
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Quantity::parse(""), Err(QuantityError::Empty));
        assert_eq!(Quantity::parse("   "), Err(QuantityError::Empty));
    }

    #[test]
    fn test_parse_not_a_number() {
        assert_eq!(Quantity::parse("lots"), Err(QuantityError::NotANumber));
        assert_eq!(Quantity::parse("-3"), Err(QuantityError::NotANumber));
        assert_eq!(Quantity::parse("1.5"), Err(QuantityError::NotANumber));
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(Quantity::parse(" 3 ").unwrap().get(), 3);
    }

    #[test]
    fn test_saturating_add_caps_at_max() {
        let a = Quantity::new(30).unwrap();
        let b = Quantity::new(30).unwrap();
        assert_eq!(a.saturating_add(b).get(), 50);
    }

    #[test]
    fn test_saturating_add_below_max() {
        let a = Quantity::new(2).unwrap();
        let b = Quantity::new(3).unwrap();
        assert_eq!(a.saturating_add(b).get(), 5);
    }

    #[test]
    fn test_error_messages_are_display_strings() {
        assert_eq!(
            QuantityError::Empty.to_string(),
            "Please enter a quantity"
        );
        assert_eq!(
            QuantityError::TooLarge { max: 50 }.to_string(),
            "Quantity must be at most 50"
        );
    }
}
