//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In binary floating point:                                              │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Splitting a discount across items and summing the shares back up      │
//! │  drifts by fractions of a cent every time.                              │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every Money value is a whole number of cents (i64).                  │
//! │    Sums are exact, so "items add up to the sale" is a hard invariant.  │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use orderly_core::money::Money;
//!
//! // Parse from a wire number (validated)
//! let price = Money::parse(10.34).unwrap();
//! assert_eq!(price.cents(), 1034);
//!
//! // Parse from text
//! let discount: Money = "3.00".parse().unwrap();
//! assert_eq!(discount.cents(), 300);
//!
//! // Too many fraction digits is rejected, never silently rounded
//! assert!(Money::parse(10.345).is_err());
//! ```

use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign};
use std::str::FromStr;
use thiserror::Error;

/// Largest representable amount in cents.
///
/// Above 2^53 an `f64` can no longer hold every cent exactly, so the wire
/// representation would silently lose precision.
pub const MAX_CENTS: i64 = 1 << 53;

// =============================================================================
// Money Error
// =============================================================================

/// Reasons a raw value cannot become `Money`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoneyError {
    /// NaN or infinity.
    #[error("money value must be a finite number")]
    NotFinite,

    /// Below zero.
    #[error("money value must be 0 or greater")]
    Negative,

    /// More than two fraction digits.
    #[error("money value must have at most two decimal places")]
    TooPrecise,

    /// Larger than [`MAX_CENTS`].
    #[error("money value is too large")]
    OutOfRange,

    /// Text that is not a decimal number.
    #[error("money value is malformed: {0:?}")]
    Malformed(String),
}

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value with exactly two fraction digits, held as integer cents.
///
/// ## Design Decisions
/// - **i64 cents**: exact sums, no rounding drift across items
/// - **Non-negative**: prices, amounts and sale discounts are never below
///   zero. The one signed value is an item's discount share, which can
///   dip below zero when the first item absorbs a rounding remainder
///   ([`Money::try_from_signed_cents`], [`deserialize_signed`])
/// - **Validated construction**: [`Money::parse`], [`FromStr`] or
///   [`Money::try_from_cents`]; there is no unchecked public constructor
/// - **Wire form**: serialized as a decimal number (`10.34`), deserialized
///   through [`Money::parse`]
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │                                                                         │
/// │  Product.price ──► NewSaleItem.price ──► SaleItem.unit_price            │
/// │                                              │                          │
/// │                          quantity × unit_price ──► SaleItem.amount      │
/// │                                                                         │
/// │  NewSale.discount ──► Allocation Engine ──► SaleItem.discount           │
/// │                                                                         │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "f64", into = "f64")]
pub struct Money(i64);

impl Money {
    /// Parses a wire number into Money.
    ///
    /// ## Rules
    /// - NaN and infinities are rejected
    /// - Negative values are rejected
    /// - More than two fraction digits are rejected (not rounded)
    ///
    /// ## Example
    /// ```rust
    /// use orderly_core::money::{Money, MoneyError};
    ///
    /// assert_eq!(Money::parse(5.0).unwrap().cents(), 500);
    /// assert_eq!(Money::parse(-1.0), Err(MoneyError::Negative));
    /// assert_eq!(Money::parse(f64::NAN), Err(MoneyError::NotFinite));
    /// ```
    pub fn parse(raw: f64) -> Result<Money, MoneyError> {
        if !raw.is_finite() {
            return Err(MoneyError::NotFinite);
        }

        if raw < 0.0 {
            return Err(MoneyError::Negative);
        }

        // 10.34 * 100.0 = 1033.9999999999999, so compare against the nearest
        // whole cent with a tolerance that scales with the magnitude.
        let scaled = raw * 100.0;
        let rounded = scaled.round();
        let tolerance = 1e-6_f64.max(rounded.abs() * f64::EPSILON * 4.0);
        if (scaled - rounded).abs() > tolerance {
            return Err(MoneyError::TooPrecise);
        }

        if rounded > MAX_CENTS as f64 {
            return Err(MoneyError::OutOfRange);
        }

        Ok(Money(rounded as i64))
    }

    /// Parses a value, panicking on failure.
    ///
    /// Reserved for test fixtures. Request paths use [`Money::parse`].
    pub fn must_parse(raw: f64) -> Money {
        match Money::parse(raw) {
            Ok(money) => money,
            Err(err) => panic!("invalid money {raw}: {err}"),
        }
    }

    /// Creates Money from a whole number of cents, e.g. a stored column.
    pub fn try_from_cents(cents: i64) -> Result<Money, MoneyError> {
        if cents < 0 {
            return Err(MoneyError::Negative);
        }
        if cents > MAX_CENTS {
            return Err(MoneyError::OutOfRange);
        }
        Ok(Money(cents))
    }

    /// Creates a discount share from cents, allowing values below zero.
    ///
    /// ## Example
    /// ```rust
    /// use orderly_core::money::Money;
    ///
    /// let share = Money::try_from_signed_cents(-1).unwrap();
    /// assert!(share.is_negative());
    /// assert_eq!(share.to_string(), "-0.01");
    /// ```
    pub fn try_from_signed_cents(cents: i64) -> Result<Money, MoneyError> {
        if !(-MAX_CENTS..=MAX_CENTS).contains(&cents) {
            return Err(MoneyError::OutOfRange);
        }
        Ok(Money(cents))
    }

    /// Parses a wire number for a signed discount share.
    ///
    /// Same rules as [`Money::parse`] except that values below zero pass.
    pub fn parse_signed(raw: f64) -> Result<Money, MoneyError> {
        if raw < 0.0 {
            Money::parse(-raw).map(|m| Money(-m.0))
        } else {
            Money::parse(raw)
        }
    }

    /// Creates Money from major and minor units (e.g. 10 and 34 for 10.34).
    ///
    /// Fixture helper; `minor` must be 0-99 and the result must be in range.
    pub fn from_major_minor(major: i64, minor: i64) -> Result<Money, MoneyError> {
        if !(0..100).contains(&minor) {
            return Err(MoneyError::TooPrecise);
        }
        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or(MoneyError::OutOfRange)?;
        Money::try_from_cents(cents)
    }

    /// Internal constructor for values already proven in range.
    #[inline]
    pub(crate) const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the decimal value for display and serialization.
    ///
    /// ## Example
    /// ```rust
    /// use orderly_core::money::Money;
    ///
    /// assert_eq!(Money::parse(10.34).unwrap().value(), 10.34);
    /// ```
    #[inline]
    pub fn value(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Returns the major unit portion, without sign.
    #[inline]
    pub const fn major(&self) -> i64 {
        (self.0 / 100).abs()
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn minor(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Below zero. Only possible for discount shares.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Adds two values, returning `None` past [`MAX_CENTS`].
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0
            .checked_add(other.0)
            .filter(|cents| *cents <= MAX_CENTS)
            .map(Money)
    }

    /// Subtracts, returning `None` if the result would be negative.
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).filter(|c| *c >= 0).map(Money)
    }

    /// Multiplies a unit price by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use orderly_core::money::Money;
    ///
    /// let unit_price = Money::parse(5.00).unwrap();
    /// let amount = unit_price.checked_mul_quantity(2).unwrap();
    /// assert_eq!(amount.cents(), 1000);
    /// ```
    pub fn checked_mul_quantity(self, qty: i64) -> Option<Money> {
        if qty < 0 {
            return None;
        }
        self.0
            .checked_mul(qty)
            .filter(|cents| *cents <= MAX_CENTS)
            .map(Money)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Shows the plain decimal form, e.g. `10.34`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.is_negative() { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.major(), self.minor())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
    }
}

/// Addition of two Money values.
///
/// Use [`Money::checked_add`] when either side comes from user input.
impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), Add::add)
    }
}

impl TryFrom<f64> for Money {
    type Error = MoneyError;

    fn try_from(raw: f64) -> Result<Self, Self::Error> {
        Money::parse(raw)
    }
}

impl From<Money> for f64 {
    fn from(money: Money) -> f64 {
        money.value()
    }
}

/// Parses the textual wire form: `D+` or `D+.D` or `D+.DD`.
impl FromStr for Money {
    type Err = MoneyError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        let text = raw.trim();
        if text.starts_with('-') {
            return Err(MoneyError::Negative);
        }

        let (whole, fraction) = match text.split_once('.') {
            Some((whole, fraction)) => (whole, fraction),
            None => (text, ""),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if whole.is_empty() || !all_digits(whole) || !all_digits(fraction) {
            return Err(MoneyError::Malformed(raw.to_string()));
        }
        if text.contains('.') && fraction.is_empty() {
            return Err(MoneyError::Malformed(raw.to_string()));
        }
        if fraction.len() > 2 {
            return Err(MoneyError::TooPrecise);
        }

        let major: i64 = whole.parse().map_err(|_| MoneyError::OutOfRange)?;
        let minor: i64 = match fraction.len() {
            0 => 0,
            1 => fraction.parse::<i64>().map_err(|_| MoneyError::Malformed(raw.to_string()))? * 10,
            _ => fraction.parse().map_err(|_| MoneyError::Malformed(raw.to_string()))?,
        };

        let cents = major
            .checked_mul(100)
            .and_then(|c| c.checked_add(minor))
            .ok_or(MoneyError::OutOfRange)?;

        Money::try_from_cents(cents)
    }
}

/// Serde `deserialize_with` for discount shares, which may be negative.
///
/// ```rust,ignore
/// #[serde(deserialize_with = "orderly_core::money::deserialize_signed")]
/// pub discount: Money,
/// ```
pub fn deserialize_signed<'de, D>(deserializer: D) -> Result<Money, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = f64::deserialize(deserializer)?;
    Money::parse_signed(raw).map_err(serde::de::Error::custom)
}

// =============================================================================
// Unit Tests
// =============================================================================
