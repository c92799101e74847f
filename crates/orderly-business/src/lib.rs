//! # orderly-business: Domain Services and Transaction Protocol
//!
//! Everything between a request and a store. The services here validate,
//! run the allocation engine from `orderly-core` and hand finished records
//! to a storer. They never see SQL.
//!
//! ## Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  workflow     SaleWorkflow (create / delete / query sales)              │
//! │     │                                                                   │
//! │  coordinator  UnitOfWork ──► Domains { user, product, sale }            │
//! │     │                              │                                    │
//! │  tx           Beginner, CommitRollbacker                                │
//! │     │                              │                                    │
//! │  domain       UserBusiness    ProductBusiness    SaleBusiness           │
//! │               UserStorer      ProductStorer      SaleStorer   (traits)  │
//! │                                                                         │
//! │  context      Ctx: cancellation + deadline for every store call         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A backend (see `orderly-db`) implements the three storer traits and
//! [`Beginner`]. Each storer can be rebound to a transaction handle produced
//! by that same backend; [`UnitOfWork`] does the rebinding for a whole
//! request.

pub mod config;
pub mod context;
pub mod coordinator;
pub mod domain;
pub mod error;
pub mod tx;
pub mod workflow;

#[cfg(feature = "testutil")]
pub mod testutil;

#[cfg(test)]
mod fakes;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{OrderingConfig, QueryConfig};
pub use context::{Ctx, CtxError};
pub use coordinator::{Domains, UnitOfWork};
pub use domain::product::{ProductBusiness, ProductStorer};
pub use domain::sale::{SaleBusiness, SaleStorer};
pub use domain::user::{UserBusiness, UserStorer};
pub use error::{BusError, BusResult, ErrorKind, StoreError, StoreResult};
pub use tx::{downcast_tx, Beginner, CommitRollbacker, TransactionHandle};
pub use workflow::{NewSaleItemRequest, NewSaleRequest, SaleView, SaleWorkflow};
