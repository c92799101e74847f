//! # orderly-core: Pure Business Logic for Orderly
//!
//! This crate is the **heart** of Orderly. It contains the money type, the
//! discount allocation engine and the query model as pure functions with
//! zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Orderly Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │               Request layer (HTTP, CLI, seed binary)            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  orderly-business                               │   │
//! │  │    SaleWorkflow, UnitOfWork, Domain Services, Storer traits     │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ orderly-core (THIS CRATE) ★                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   money   │  │allocation │  │page/order │  │   │
//! │  │   │  Product  │  │   Money   │  │ discount  │  │  filter   │  │   │
//! │  │   │   Sale    │  │  (cents)  │  │   split   │  │validation │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    orderly-db (Database Layer)                  │   │
//! │  │              SQLite stores implementing the Storer traits       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, User, Sale, SaleItem)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`allocation`] - Proportional discount split
//! - [`page`], [`order`], [`filter`] - Query model
//! - [`error`] - Domain error types
//! - [`validation`] - Business rule validation
//!
//! ## Example Usage
//!
//! ```rust
//! use orderly_core::allocation::{allocate, AllocationInput};
//! use orderly_core::Money;
//!
//! let items = [AllocationInput { quantity: 3, unit_price: Money::must_parse(1.00) }];
//! let split = allocate(&items, Money::must_parse(0.50)).unwrap();
//!
//! assert_eq!(split.amount.cents(), 300);
//! assert_eq!(split.items[0].discount.cents(), 50);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod allocation;
pub mod error;
pub mod filter;
pub mod money;
pub mod order;
pub mod page;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use orderly_core::Money` instead of
// `use orderly_core::money::Money`

pub use error::{CoreError, FieldError, FieldErrors, QueryError, ValidationError};
pub use money::{Money, MoneyError};
pub use order::{Direction, OrderBy, OrderField, OrderFields};
pub use page::{Page, PageLimits, QueryResult};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity of a single sale item.
pub const MAX_ITEM_QUANTITY: i64 = 100;

/// Maximum lines in a single sale.
///
/// Matches the largest page, so every product of a sale loads in one query.
pub const MAX_SALE_ITEMS: usize = 100;
