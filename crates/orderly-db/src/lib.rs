//! # orderly-db: SQLite Stores for Orderly
//!
//! This crate implements the Storer traits and the transaction protocol of
//! `orderly-business` on SQLite with sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Orderly Data Flow                                │
//! │                                                                         │
//! │  SaleWorkflow / UnitOfWork / Domain Services   (orderly-business)      │
//! │       │                    │                                            │
//! │       │ XxxStorer          │ Beginner / TransactionHandle               │
//! │       ▼                    ▼                                            │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    orderly-db (THIS CRATE)                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │    Stores     │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │  (store/*.rs) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ SqlitePool    │    │ UserStore     │    │ 001_initial  │  │   │
//! │  │   │ SqliteBeginner│◄───│ ProductStore  │    │ _schema.sql  │  │   │
//! │  │   │ SqliteTx      │    │ SaleStore     │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL)                                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`tx`] - `SqliteTx` and `SqliteBeginner`
//! - [`store`] - Store implementations (user, product, sale)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use orderly_business::{Ctx, SaleWorkflow};
//! use orderly_db::{Database, DbConfig};
//! use std::sync::Arc;
//!
//! let db = Database::new(DbConfig::from_env()?).await?;
//! let workflow = SaleWorkflow::new(db.domains(), Arc::new(db.beginner()));
//!
//! let view = workflow.create_sale(&Ctx::new(), user_id, request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod store;
pub mod tx;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{ConfigError, Database, DbConfig};
pub use store::{ProductStore, SaleStore, UserStore};
pub use tx::{SqliteBeginner, SqliteTx};
