//! # Error Types
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Storer ──► StoreError ──┐                                              │
//! │                          ├──► BusError ──► kind() ──► ErrorKind         │
//! │  orderly-core errors ────┘                                              │
//! │                                                                         │
//! │  ErrorKind::Validation  caller can fix the request                      │
//! │  ErrorKind::NotFound    entity does not exist                           │
//! │  ErrorKind::Cancelled   request context ended                           │
//! │  ErrorKind::Internal    storage failure or programming fault            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::context::CtxError;
use orderly_core::{CoreError, FieldErrors, QueryError, ValidationError};
use thiserror::Error;

// =============================================================================
// Store Error
// =============================================================================

/// What a store implementation reports.
#[derive(Debug, Error)]
pub enum StoreError {
    /// No row matched.
    #[error("{entity} not found")]
    NotFound { entity: &'static str },

    /// A unique constraint rejected the write.
    #[error("{field} already exists")]
    UniqueViolation { field: String },

    #[error(transparent)]
    Cancelled(#[from] CtxError),

    /// The transaction handle belongs to another storage technology.
    #[error("transaction handle is not a {expected} transaction")]
    UnsupportedTransaction { expected: &'static str },

    /// The transaction was already committed or rolled back.
    #[error("transaction already {state}")]
    TransactionClosed { state: &'static str },

    /// Anything else the backend reported.
    #[error("storage backend: {0}")]
    Backend(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// Convenience type alias for store results.
pub type StoreResult<T> = Result<T, StoreError>;

// =============================================================================
// Business Error
// =============================================================================

/// Classification used by callers to choose a response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Cancelled,
    Internal,
}

/// What a Domain Service, UnitOfWork or SaleWorkflow reports.
#[derive(Debug, Error)]
pub enum BusError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("{0}")]
    Fields(#[from] FieldErrors),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Cancelled(#[from] CtxError),

    /// A store call failed; `op` names the operation and target.
    #[error("{op}: {source}")]
    Store {
        op: String,
        #[source]
        source: StoreError,
    },
}

impl BusError {
    /// Wraps a store failure with the operation that hit it.
    ///
    /// Cancellation keeps its own variant so callers see it directly.
    pub fn store(op: impl Into<String>, err: StoreError) -> BusError {
        match err {
            StoreError::Cancelled(c) => BusError::Cancelled(c),
            source => BusError::Store {
                op: op.into(),
                source,
            },
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            BusError::Validation(_)
            | BusError::Fields(_)
            | BusError::Query(_)
            | BusError::Core(_) => ErrorKind::Validation,
            BusError::NotFound { .. } => ErrorKind::NotFound,
            BusError::Cancelled(_) => ErrorKind::Cancelled,
            BusError::Store { source, .. } => match source {
                StoreError::NotFound { .. } => ErrorKind::NotFound,
                StoreError::UniqueViolation { .. } => ErrorKind::Validation,
                StoreError::Cancelled(_) => ErrorKind::Cancelled,
                StoreError::UnsupportedTransaction { .. }
                | StoreError::TransactionClosed { .. }
                | StoreError::Backend(_) => ErrorKind::Internal,
            },
        }
    }
}

/// Convenience type alias for business results.
pub type BusResult<T> = Result<T, BusError>;
