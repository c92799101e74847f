//! # Ordering
//!
//! Translates a public `order_by` value (`"amount,DESC"`) into a typed sort
//! key through an allow-list. Anything outside the allow-list is rejected,
//! so stores only ever see known fields.
//!
//! ```text
//!   "amount,desc" ──► OrderFields lookup ──► OrderBy { Amount, Desc }
//!   "bogus"       ──► QueryError::UnknownOrderField("bogus")
//!   ""            ──► default order
//! ```

use crate::error::QueryError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::Debug;

// =============================================================================
// Direction
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Asc,
    Desc,
}

impl Direction {
    /// Parses `ASC` / `DESC`, case-insensitive.
    pub fn parse(raw: &str) -> Result<Direction, QueryError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "ASC" => Ok(Direction::Asc),
            "DESC" => Ok(Direction::Desc),
            _ => Err(QueryError::InvalidDirection(raw.to_string())),
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            Direction::Asc => "ASC",
            Direction::Desc => "DESC",
        }
    }
}

// =============================================================================
// OrderBy
// =============================================================================

/// A sort key plus direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderBy<F> {
    pub field: F,
    pub direction: Direction,
}

impl<F: Copy> OrderBy<F> {
    pub fn new(field: F, direction: Direction) -> Self {
        Self { field, direction }
    }

    /// Parses `field` or `field,DIRECTION`.
    ///
    /// ## Example
    /// ```rust
    /// use orderly_core::order::{Direction, OrderBy, OrderFields};
    ///
    /// let fields = OrderFields::new([("sale_id", "id"), ("amount", "amount")]);
    /// let default = OrderBy::new("id", Direction::Asc);
    ///
    /// let order = OrderBy::parse(&fields, Some("amount,DESC"), default).unwrap();
    /// assert_eq!(order, OrderBy::new("amount", Direction::Desc));
    ///
    /// assert_eq!(OrderBy::parse(&fields, None, default).unwrap(), default);
    /// assert!(OrderBy::parse(&fields, Some("bogus,ASC"), default).is_err());
    /// ```
    pub fn parse(
        fields: &OrderFields<F>,
        raw: Option<&str>,
        default: OrderBy<F>,
    ) -> Result<OrderBy<F>, QueryError> {
        let raw = match raw.map(str::trim).filter(|r| !r.is_empty()) {
            Some(raw) => raw,
            None => return Ok(default),
        };

        let parts: Vec<&str> = raw.split(',').map(str::trim).collect();
        let (name, direction) = match parts.as_slice() {
            [name] => (*name, Direction::Asc),
            [name, dir] => (*name, Direction::parse(dir)?),
            _ => return Err(QueryError::MalformedOrder(raw.to_string())),
        };

        if name.is_empty() {
            return Err(QueryError::MalformedOrder(raw.to_string()));
        }

        let field = fields
            .lookup(name)
            .ok_or_else(|| QueryError::UnknownOrderField(name.to_string()))?;

        Ok(OrderBy { field, direction })
    }
}

// =============================================================================
// OrderFields
// =============================================================================

/// Allow-list of public order names and the sort key each maps to.
///
/// Built once at startup and handed to the service that uses it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderFields<F> {
    fields: HashMap<String, F>,
}

impl<F: Copy> OrderFields<F> {
    pub fn new<'a>(pairs: impl IntoIterator<Item = (&'a str, F)>) -> Self {
        Self {
            fields: pairs
                .into_iter()
                .map(|(name, field)| (name.to_string(), field))
                .collect(),
        }
    }

    pub fn lookup(&self, name: &str) -> Option<F> {
        self.fields.get(name).copied()
    }

    /// Public names, sorted.
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.fields.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

// =============================================================================
// Per-entity Sort Keys
// =============================================================================

/// A typed sort key with its standard allow-list and default order.
pub trait OrderField: Copy + Eq + Debug + Send + Sync + 'static {
    fn allow_list() -> OrderFields<Self>;
    fn default_order() -> OrderBy<Self>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SaleOrderField {
    Id,
    UserId,
    Amount,
    CreatedAt,
}

impl OrderField for SaleOrderField {
    fn allow_list() -> OrderFields<Self> {
        OrderFields::new([
            ("sale_id", SaleOrderField::Id),
            ("user_id", SaleOrderField::UserId),
            ("amount", SaleOrderField::Amount),
            ("created_at", SaleOrderField::CreatedAt),
        ])
    }

    fn default_order() -> OrderBy<Self> {
        OrderBy::new(SaleOrderField::Id, Direction::Asc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProductOrderField {
    Id,
    Name,
    Price,
}

impl OrderField for ProductOrderField {
    fn allow_list() -> OrderFields<Self> {
        OrderFields::new([
            ("product_id", ProductOrderField::Id),
            ("name", ProductOrderField::Name),
            ("price", ProductOrderField::Price),
        ])
    }

    fn default_order() -> OrderBy<Self> {
        OrderBy::new(ProductOrderField::Id, Direction::Asc)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UserOrderField {
    Id,
    Name,
    Email,
    Roles,
    Enabled,
}

impl OrderField for UserOrderField {
    fn allow_list() -> OrderFields<Self> {
        OrderFields::new([
            ("user_id", UserOrderField::Id),
            ("name", UserOrderField::Name),
            ("email", UserOrderField::Email),
            ("roles", UserOrderField::Roles),
            ("enabled", UserOrderField::Enabled),
        ])
    }

    fn default_order() -> OrderBy<Self> {
        OrderBy::new(UserOrderField::Id, Direction::Asc)
    }
}
