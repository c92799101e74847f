//! # Validation Module
//!
//! Input validation utilities for Orderly.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: Request parsing (filter / page / order)                      │
//! │  ├── Raw strings → typed values                                        │
//! │  └── FieldErrors tagged with the public field name                     │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Domain Services (Rust)                                       │
//! │  └── THIS MODULE: Business rule validation                             │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database (SQLite)                                            │
//! │  ├── NOT NULL / CHECK constraints                                      │
//! │  ├── UNIQUE constraints (user email)                                   │
//! │  └── Foreign key constraints                                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use orderly_core::validation::{validate_name, validate_quantity};
//!
//! validate_name("name", "Widget").unwrap();
//! validate_quantity(5).unwrap();
//! ```

use crate::error::ValidationError;
use crate::{MAX_ITEM_QUANTITY, MAX_SALE_ITEMS};
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Shortest accepted name, in characters.
pub const NAME_MIN_CHARS: usize = 3;

/// Longest accepted name, in characters.
pub const NAME_MAX_CHARS: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a product or user name.
///
/// ## Rules
/// - Surrounding whitespace is trimmed
/// - Between 3 and 100 characters after trimming
///
/// ## Returns
/// The trimmed name.
///
/// ## Example
/// ```rust
/// use orderly_core::validation::validate_name;
///
/// assert_eq!(validate_name("name", "  Widget ").unwrap(), "Widget");
/// assert!(validate_name("name", "ab").is_err());
/// ```
pub fn validate_name(field: &str, name: &str) -> ValidationResult<String> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    let chars = name.chars().count();
    if chars < NAME_MIN_CHARS {
        return Err(ValidationError::TooShort {
            field: field.to_string(),
            min: NAME_MIN_CHARS,
        });
    }

    if chars > NAME_MAX_CHARS {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max: NAME_MAX_CHARS,
        });
    }

    Ok(name.to_string())
}

/// Validates an email address.
///
/// ## Rules
/// - Exactly one `@`, something on both sides
/// - The domain contains a dot that is neither first nor last
/// - No whitespace, at most 254 characters
pub fn validate_email(email: &str) -> ValidationResult<String> {
    let email = email.trim();

    if email.is_empty() {
        return Err(ValidationError::Required {
            field: "email".to_string(),
        });
    }

    if email.len() > 254 {
        return Err(ValidationError::TooLong {
            field: "email".to_string(),
            max: 254,
        });
    }

    let invalid = |reason: &str| ValidationError::InvalidFormat {
        field: "email".to_string(),
        reason: reason.to_string(),
    };

    if email.chars().any(char::is_whitespace) {
        return Err(invalid("must not contain whitespace"));
    }

    let (local, domain) = email
        .split_once('@')
        .ok_or_else(|| invalid("missing @"))?;

    if local.is_empty() || domain.contains('@') {
        return Err(invalid("must look like name@domain.tld"));
    }

    if !domain.contains('.') || domain.starts_with('.') || domain.ends_with('.') {
        return Err(invalid("domain must look like domain.tld"));
    }

    Ok(email.to_string())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a sale item quantity.
///
/// ## Rules
/// - Must be positive (> 0)
/// - Must not exceed MAX_ITEM_QUANTITY (100)
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive {
            field: "quantity".to_string(),
        });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity".to_string(),
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

// =============================================================================
// Collection Validators
// =============================================================================

/// Validates the number of lines in a sale.
///
/// ## Rules
/// - At least one item
/// - Must not exceed MAX_SALE_ITEMS (100)
pub fn validate_sale_size(items: usize) -> ValidationResult<()> {
    if items == 0 {
        return Err(ValidationError::Required {
            field: "items".to_string(),
        });
    }

    if items > MAX_SALE_ITEMS {
        return Err(ValidationError::OutOfRange {
            field: "items".to_string(),
            min: 1,
            max: MAX_SALE_ITEMS as i64,
        });
    }

    Ok(())
}

// =============================================================================
// Identifier / Date Parsers
// =============================================================================

/// Parses a UUID, tagging failures with `field`.
///
/// ## Example
/// ```rust
/// use orderly_core::validation::parse_uuid;
///
/// assert!(parse_uuid("product_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
/// assert!(parse_uuid("product_id", "not-a-uuid").is_err());
/// ```
pub fn parse_uuid(field: &str, raw: &str) -> ValidationResult<Uuid> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(ValidationError::Required {
            field: field.to_string(),
        });
    }

    Uuid::parse_str(raw).map_err(|e| ValidationError::InvalidFormat {
        field: field.to_string(),
        reason: e.to_string(),
    })
}

/// Parses an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(field: &str, raw: &str) -> ValidationResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw.trim())
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| ValidationError::InvalidFormat {
            field: field.to_string(),
            reason: e.to_string(),
        })
}

// =============================================================================
// Unit Tests
// =============================================================================
