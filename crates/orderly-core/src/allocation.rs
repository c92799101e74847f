//! # Discount Allocation
//!
//! Splits a sale-level discount across its line items in proportion to
//! each item's amount.
//!
//! ## Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  1. item.amount  = quantity × unit_price             (exact cents)      │
//! │  2. sale.amount  = Σ item.amount                                        │
//! │  3. reject: sale.amount == 0, discount > sale.amount                    │
//! │  4. share_i      = round(discount × item.amount / sale.amount)          │
//! │                    half away from zero, to the cent                     │
//! │  5. remainder    = discount − Σ share_i          (may be negative)      │
//! │  6. items[0].discount += remainder                                      │
//! │                                                                         │
//! │  Result: Σ item.amount == sale.amount                                   │
//! │          Σ item.discount == discount          (always, exactly)         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The correction always lands on the first item in input order, so the same
//! items in a different order can produce a different split. When rounding
//! over-allocates by more than the first item's own share, its discount goes
//! below zero; that share is the only signed Money in a sale.
//!
//! ## Example
//! ```rust
//! use orderly_core::allocation::{allocate, AllocationInput};
//! use orderly_core::Money;
//!
//! let items = [
//!     AllocationInput { quantity: 1, unit_price: Money::must_parse(10.34) },
//!     AllocationInput { quantity: 2, unit_price: Money::must_parse(5.00) },
//! ];
//! let split = allocate(&items, Money::must_parse(3.00)).unwrap();
//!
//! assert_eq!(split.amount.cents(), 2034);
//! assert_eq!(split.items[0].discount.cents(), 153);
//! assert_eq!(split.items[1].discount.cents(), 147);
//! ```

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use serde::{Deserialize, Serialize};

/// One line going into the allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationInput {
    pub quantity: i64,
    pub unit_price: Money,
}

/// Amount and discount share of one line, in input order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemValue {
    pub amount: Money,
    /// Negative only on the first item, after absorbing the remainder.
    #[serde(deserialize_with = "crate::money::deserialize_signed")]
    pub discount: Money,
}

/// Output of [`allocate`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    /// Σ item amounts.
    pub amount: Money,
    /// The aggregate discount, unchanged.
    pub discount: Money,
    pub items: Vec<ItemValue>,
}

/// Computes item amounts and splits `discount` across them.
///
/// ## Errors
/// - [`CoreError::Validation`] if a quantity is below 1
/// - [`CoreError::AmountOverflow`] if an amount leaves the Money range
/// - [`CoreError::ZeroSaleAmount`] for an empty or all-zero sale
/// - [`CoreError::DiscountExceedsAmount`] if `discount > amount`
pub fn allocate(items: &[AllocationInput], discount: Money) -> CoreResult<Allocation> {
    let mut amounts = Vec::with_capacity(items.len());
    let mut total = Money::zero();

    for item in items {
        if item.quantity < 1 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }

        let amount = item
            .unit_price
            .checked_mul_quantity(item.quantity)
            .ok_or(CoreError::AmountOverflow)?;
        total = total.checked_add(amount).ok_or(CoreError::AmountOverflow)?;
        amounts.push(amount);
    }

    if total.is_zero() {
        return Err(CoreError::ZeroSaleAmount);
    }

    if discount > total {
        return Err(CoreError::DiscountExceedsAmount {
            discount,
            amount: total,
        });
    }

    if discount.is_zero() {
        return Ok(Allocation {
            amount: total,
            discount,
            items: amounts
                .into_iter()
                .map(|amount| ItemValue {
                    amount,
                    discount: Money::zero(),
                })
                .collect(),
        });
    }

    let mut shares: Vec<i64> = amounts
        .iter()
        .map(|amount| proportional_share(discount.cents(), amount.cents(), total.cents()))
        .collect();

    // Each share is at most `discount`, so the sum fits easily in i128.
    let distributed: i128 = shares.iter().map(|s| *s as i128).sum();
    let remainder = discount.cents() as i128 - distributed;

    // |remainder| is at most half a cent per item, well inside i64.
    shares[0] = (shares[0] as i128 + remainder) as i64;

    Ok(Allocation {
        amount: total,
        discount,
        items: amounts
            .into_iter()
            .zip(shares)
            .map(|(amount, share)| ItemValue {
                amount,
                discount: Money::from_cents(share),
            })
            .collect(),
    })
}

/// `round(discount × amount / total)` half away from zero, all in cents.
///
/// Inputs are non-negative with `amount <= total` and `discount <= total`,
/// so `floor((2·d·a + t) / 2t)` is the rounded quotient and never exceeds `d`.
fn proportional_share(discount: i64, amount: i64, total: i64) -> i64 {
    let d = discount as i128;
    let a = amount as i128;
    let t = total as i128;
    ((2 * d * a + t) / (2 * t)) as i64
}

// =============================================================================
// Unit Tests
// =============================================================================
