//! # Error Types
//!
//! Domain-specific error types for orderly-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  orderly-core errors (this file)                                       │
//! │  ├── CoreError        - Allocation / sale arithmetic failures          │
//! │  ├── ValidationError  - Input validation failures                      │
//! │  ├── QueryError       - Bad page / order-by input                      │
//! │  └── FieldErrors      - Per-field filter parse failures                │
//! │                                                                         │
//! │  orderly-business errors (separate crate)                              │
//! │  ├── StoreError       - What a Storer reports                          │
//! │  └── BusError         - What a Domain Service reports                  │
//! │                                                                         │
//! │  orderly-db errors (separate crate)                                    │
//! │  └── DbError          - sqlx failures, mapped into StoreError          │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → BusError ← StoreError ← DbError   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include context in error messages (field, value, limit)
//! 3. Errors are enum variants, never String

use crate::money::{Money, MoneyError};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Sale arithmetic and allocation errors.
///
/// Every variant is a business-rule violation: the request can be fixed by
/// the caller, nothing is persisted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The items of a sale add up to zero.
    ///
    /// ## When This Occurs
    /// - The sale has no items
    /// - Every item has a zero unit price
    ///
    /// Proportional shares are undefined without a positive total.
    #[error("sale amount is zero, discount cannot be allocated")]
    ZeroSaleAmount,

    /// The aggregate discount is larger than the sale amount.
    #[error("discount[{discount}] is greater than total sale amount[{amount}]")]
    DiscountExceedsAmount { discount: Money, amount: Money },

    /// quantity × unit price or the running total left the Money range.
    #[error("sale amount overflows the money range")]
    AmountOverflow,

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Sale has more lines than allowed.
    #[error("Sale cannot have more than {max} items")]
    TooManyItems { max: usize },

    /// A monetary value failed to parse.
    #[error("Invalid money: {0}")]
    Money(#[from] MoneyError),

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These errors occur when user input doesn't meet requirements.
/// Used for early validation before business logic runs.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too short.
    #[error("{field} must be at least {min} characters")]
    TooShort { field: String, min: usize },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Invalid format (e.g., invalid UUID, invalid date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value (e.g., an email already registered).
    #[error("{field} '{value}' already exists")]
    Duplicate { field: String, value: String },
}

// =============================================================================
// Query Error
// =============================================================================

/// Failures parsing paging and ordering input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("page value {0:?} is not a number")]
    InvalidPage(String),

    #[error("page value too small, must be larger than 0")]
    PageOutOfRange,

    #[error("rows value {0:?} is not a number")]
    InvalidRows(String),

    #[error("rows value {rows} must be between 1 and {max}")]
    RowsOutOfRange { rows: i64, max: u32 },

    #[error("unknown order field {0:?}")]
    UnknownOrderField(String),

    #[error("unknown direction {0:?}")]
    InvalidDirection(String),

    #[error("order by {0:?} must be <field> or <field>,<direction>")]
    MalformedOrder(String),
}

// =============================================================================
// Field Errors
// =============================================================================

/// One failed field: `{"field": "product_id", "error": "..."}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub error: String,
}

/// A set of field failures, reported together.
///
/// ## Example
/// ```rust
/// use orderly_core::error::FieldErrors;
///
/// let errs = FieldErrors::single("user_id", "invalid UUID length: 3");
/// assert_eq!(
///     errs.to_json(),
///     r#"[{"field":"user_id","error":"invalid UUID length: 3"}]"#
/// );
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldErrors(Vec<FieldError>);

impl FieldErrors {
    pub fn new() -> Self {
        FieldErrors(Vec::new())
    }

    /// Shorthand for a one-field failure.
    pub fn single(field: impl Into<String>, error: impl fmt::Display) -> Self {
        let mut errs = FieldErrors::new();
        errs.add(field, error);
        errs
    }

    pub fn add(&mut self, field: impl Into<String>, error: impl fmt::Display) {
        self.0.push(FieldError {
            field: field.into(),
            error: error.to_string(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.0.iter()
    }

    /// Returns `Ok(())` when nothing was recorded.
    pub fn into_result(self) -> Result<(), FieldErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    /// Renders the JSON array form.
    pub fn to_json(&self) -> String {
        // Only String fields, so encoding cannot fail.
        serde_json::to_string(&self.0).unwrap_or_default()
    }

    /// Finds the message recorded for a field.
    pub fn get(&self, field: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|e| e.field == field)
            .map(|e| e.error.as_str())
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_json())
    }
}

impl std::error::Error for FieldErrors {}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
