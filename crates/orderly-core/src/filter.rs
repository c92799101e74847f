//! # Query Filters
//!
//! Each entity has a raw `XxxQueryParams` (strings as they arrive from a
//! request) and a typed `XxxFilter`. `parse_filter` converts one into the
//! other, collecting every bad field into [`FieldErrors`] under its public
//! name.
//!
//! ```text
//!   ProductQueryParams { product_ids: "a,b", price: "x" }
//!        │
//!        ▼ parse_filter
//!   Err([{"field":"product_ids","error":"..."},
//!        {"field":"price","error":"..."}])
//! ```
//!
//! All filter fields are optional and combine with AND. A filter is built
//! once and passed by value.

use crate::error::FieldErrors;
use crate::money::Money;
use crate::types::{Email, Name};
use crate::validation::{parse_timestamp, parse_uuid};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Treats absent and blank values alike.
fn present(raw: &Option<String>) -> Option<&str> {
    raw.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

// =============================================================================
// Sale
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleFilter {
    pub id: Option<Uuid>,
    pub user_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleQueryParams {
    pub page: Option<String>,
    pub rows: Option<String>,
    pub order_by: Option<String>,
    pub sale_id: Option<String>,
    pub user_id: Option<String>,
}

impl SaleQueryParams {
    pub fn parse_filter(&self) -> Result<SaleFilter, FieldErrors> {
        let mut errs = FieldErrors::new();
        let mut filter = SaleFilter::default();

        if let Some(raw) = present(&self.sale_id) {
            match parse_uuid("sale_id", raw) {
                Ok(id) => filter.id = Some(id),
                Err(e) => errs.add("sale_id", e),
            }
        }

        if let Some(raw) = present(&self.user_id) {
            match parse_uuid("user_id", raw) {
                Ok(id) => filter.user_id = Some(id),
                Err(e) => errs.add("user_id", e),
            }
        }

        errs.into_result().map(|_| filter)
    }
}

// =============================================================================
// Product
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    pub id: Option<Uuid>,
    /// Any of these ids.
    pub ids: Option<Vec<Uuid>>,
    /// Substring match.
    pub name: Option<Name>,
    /// Exact match.
    pub price: Option<Money>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductQueryParams {
    pub page: Option<String>,
    pub rows: Option<String>,
    pub order_by: Option<String>,
    pub product_id: Option<String>,
    /// Comma separated.
    pub product_ids: Option<String>,
    pub name: Option<String>,
    pub price: Option<String>,
}

impl ProductQueryParams {
    pub fn parse_filter(&self) -> Result<ProductFilter, FieldErrors> {
        let mut errs = FieldErrors::new();
        let mut filter = ProductFilter::default();

        if let Some(raw) = present(&self.product_id) {
            match parse_uuid("product_id", raw) {
                Ok(id) => filter.id = Some(id),
                Err(e) => errs.add("product_id", e),
            }
        }

        if let Some(raw) = present(&self.product_ids) {
            let parsed: Result<Vec<Uuid>, _> = raw
                .split(',')
                .map(|id| parse_uuid("product_ids", id))
                .collect();
            match parsed {
                Ok(ids) => filter.ids = Some(ids),
                Err(e) => errs.add("product_ids", e),
            }
        }

        if let Some(raw) = present(&self.name) {
            match Name::parse(raw) {
                Ok(name) => filter.name = Some(name),
                Err(e) => errs.add("name", e),
            }
        }

        if let Some(raw) = present(&self.price) {
            match raw.parse::<Money>() {
                Ok(price) => filter.price = Some(price),
                Err(e) => errs.add("price", e),
            }
        }

        errs.into_result().map(|_| filter)
    }
}

// =============================================================================
// User
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserFilter {
    pub id: Option<Uuid>,
    /// Substring match.
    pub name: Option<Name>,
    pub email: Option<Email>,
    /// Inclusive lower bound on `date_created`.
    pub start_created_date: Option<DateTime<Utc>>,
    /// Inclusive upper bound on `date_created`.
    pub end_created_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserQueryParams {
    pub page: Option<String>,
    pub rows: Option<String>,
    pub order_by: Option<String>,
    pub user_id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub start_created_date: Option<String>,
    pub end_created_date: Option<String>,
}

impl UserQueryParams {
    pub fn parse_filter(&self) -> Result<UserFilter, FieldErrors> {
        let mut errs = FieldErrors::new();
        let mut filter = UserFilter::default();

        if let Some(raw) = present(&self.user_id) {
            match parse_uuid("user_id", raw) {
                Ok(id) => filter.id = Some(id),
                Err(e) => errs.add("user_id", e),
            }
        }

        if let Some(raw) = present(&self.name) {
            match Name::parse(raw) {
                Ok(name) => filter.name = Some(name),
                Err(e) => errs.add("name", e),
            }
        }

        if let Some(raw) = present(&self.email) {
            match Email::parse(raw) {
                Ok(email) => filter.email = Some(email),
                Err(e) => errs.add("email", e),
            }
        }

        if let Some(raw) = present(&self.start_created_date) {
            match parse_timestamp("start_created_date", raw) {
                Ok(t) => filter.start_created_date = Some(t),
                Err(e) => errs.add("start_created_date", e),
            }
        }

        if let Some(raw) = present(&self.end_created_date) {
            match parse_timestamp("end_created_date", raw) {
                Ok(t) => filter.end_created_date = Some(t),
                Err(e) => errs.add("end_created_date", e),
            }
        }

        errs.into_result().map(|_| filter)
    }
}
