//! # Domain Types
//!
//! Core domain types used throughout Orderly.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      User       │   │      Sale       │   │    Product      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │◄──│  user_id        │   │  id (UUID)      │       │
//! │  │  name  (Name)   │   │  discount       │   │  name  (Name)   │       │
//! │  │  email (Email)  │   │  amount         │   │  price (Money)  │       │
//! │  │  roles, enabled │   │  items ───┐     │   └────────▲────────┘       │
//! │  └─────────────────┘   └───────────┼─────┘            │                │
//! │                                    ▼                  │                │
//! │                        ┌─────────────────────┐        │                │
//! │                        │      SaleItem       │        │                │
//! │                        │  ─────────────────  │        │                │
//! │                        │  product_id ────────┼────────┘                │
//! │                        │  quantity           │                         │
//! │                        │  unit_price (snap)  │                         │
//! │                        │  amount, discount   │                         │
//! │                        └─────────────────────┘                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Input vs Stored Types
//! `NewXxx` is what a caller supplies, `UpdateXxx` carries only the fields
//! being changed (`None` = not provided), `Xxx` is the persisted entity.

use crate::error::ValidationError;
use crate::money::Money;
use crate::validation::{validate_email, validate_name};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// =============================================================================
// Name
// =============================================================================

/// A trimmed display name of 3 to 100 characters.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Name(String);

impl Name {
    pub fn parse(raw: &str) -> Result<Name, ValidationError> {
        validate_name("name", raw).map(Name)
    }

    /// Parses, panicking on failure. Test fixtures only.
    pub fn must_parse(raw: &str) -> Name {
        match Name::parse(raw) {
            Ok(name) => name,
            Err(err) => panic!("invalid name {raw:?}: {err}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Name {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Name::parse(&raw)
    }
}

impl From<Name> for String {
    fn from(name: Name) -> String {
        name.0
    }
}

// =============================================================================
// Email
// =============================================================================

/// A syntactically valid email address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Email(String);

impl Email {
    pub fn parse(raw: &str) -> Result<Email, ValidationError> {
        validate_email(raw).map(Email)
    }

    /// Parses, panicking on failure. Test fixtures only.
    pub fn must_parse(raw: &str) -> Email {
        match Email::parse(raw) {
            Ok(email) => email,
            Err(err) => panic!("invalid email {raw:?}: {err}"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Email {
    type Error = ValidationError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Email::parse(&raw)
    }
}

impl From<Email> for String {
    fn from(email: Email) -> String {
        email.0
    }
}

// =============================================================================
// Role
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    User,
    Admin,
}

impl Role {
    pub fn parse(raw: &str) -> Result<Role, ValidationError> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(Role::User),
            "ADMIN" => Ok(Role::Admin),
            _ => Err(ValidationError::NotAllowed {
                field: "roles".to_string(),
                allowed: vec!["USER".to_string(), "ADMIN".to_string()],
            }),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "USER",
            Role::Admin => "ADMIN",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Product
// =============================================================================

/// A product available for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Product {
    pub id: Uuid,
    pub name: Name,
    pub price: Money,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewProduct {
    pub name: Name,
    pub price: Money,
}

/// Fields to change on a product; `None` leaves the field as is.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateProduct {
    pub name: Option<Name>,
    pub price: Option<Money>,
}

impl Product {
    /// Returns the product with `upd` applied and `date_updated` set to `now`.
    pub fn apply(mut self, upd: UpdateProduct, now: DateTime<Utc>) -> Product {
        if let Some(name) = upd.name {
            self.name = name;
        }
        if let Some(price) = upd.price {
            self.price = price;
        }
        self.date_updated = now;
        self
    }
}

// =============================================================================
// User
// =============================================================================

/// A customer or operator who can own sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub name: Name,
    pub email: Email,
    pub roles: Vec<Role>,
    pub enabled: bool,
    pub date_created: DateTime<Utc>,
    pub date_updated: DateTime<Utc>,
}

/// New users start enabled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUser {
    pub name: Name,
    pub email: Email,
    pub roles: Vec<Role>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateUser {
    pub name: Option<Name>,
    pub email: Option<Email>,
    pub roles: Option<Vec<Role>>,
    pub enabled: Option<bool>,
}

impl User {
    /// Returns the user with `upd` applied and `date_updated` set to `now`.
    pub fn apply(mut self, upd: UpdateUser, now: DateTime<Utc>) -> User {
        if let Some(name) = upd.name {
            self.name = name;
        }
        if let Some(email) = upd.email {
            self.email = email;
        }
        if let Some(roles) = upd.roles {
            self.roles = roles;
        }
        if let Some(enabled) = upd.enabled {
            self.enabled = enabled;
        }
        self.date_updated = now;
        self
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

// =============================================================================
// Sale
// =============================================================================

/// A completed order.
///
/// ## Invariants
/// - `amount == Σ items[i].amount`
/// - `discount == Σ items[i].discount`
/// - `items` keep the order they were submitted in
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sale {
    pub id: Uuid,
    pub user_id: Uuid,
    pub discount: Money,
    pub amount: Money,
    pub items: Vec<SaleItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Sale {
    /// True when item amounts and discounts add up to the sale totals.
    pub fn totals_match(&self) -> bool {
        let amount: i64 = self.items.iter().map(|i| i.amount.cents()).sum();
        let discount: i64 = self.items.iter().map(|i| i.discount.cents()).sum();
        amount == self.amount.cents() && discount == self.discount.cents()
    }
}

/// One line of a sale. Removed together with its sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleItem {
    pub sale_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i64,
    /// Product price at the time of sale.
    pub unit_price: Money,
    /// quantity × unit_price
    pub amount: Money,
    /// Share of the sale discount. The first item's share can be negative.
    #[serde(deserialize_with = "crate::money::deserialize_signed")]
    pub discount: Money,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSale {
    pub user_id: Uuid,
    pub discount: Money,
    pub items: Vec<NewSaleItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSaleItem {
    pub product_id: Uuid,
    pub quantity: i64,
    /// Price snapshot taken from the product.
    pub price: Money,
}

// =============================================================================
// Unit Tests
// =============================================================================
