//! # Transaction Protocol
//!
//! Stores for different entities join one database transaction through an
//! opaque handle. The business layer only ever commits or rolls back; each
//! store downcasts the handle to its own technology's transaction type.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │   Beginner::begin() ──► TransactionHandle (Arc<dyn CommitRollbacker>)  │
//! │                                 │                                       │
//! │            ┌────────────────────┼────────────────────┐                  │
//! │            ▼                    ▼                    ▼                  │
//! │   UserStorer::with_tx   ProductStorer::with_tx   SaleStorer::with_tx    │
//! │   (downcast_tx)         (downcast_tx)            (downcast_tx)          │
//! │                                                                         │
//! │   Open ──commit──► Committed                                            │
//! │     └───rollback──► RolledBack      anything after: TransactionClosed   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::{StoreError, StoreResult};
use async_trait::async_trait;
use std::any::Any;
use std::sync::Arc;

/// A transaction the business layer can finish.
#[async_trait]
pub trait CommitRollbacker: Send + Sync + 'static {
    async fn commit(&self) -> StoreResult<()>;

    async fn rollback(&self) -> StoreResult<()>;

    fn as_any(&self) -> &dyn Any;

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

/// Shared handle to one open transaction.
pub type TransactionHandle = Arc<dyn CommitRollbacker>;

/// Starts transactions.
#[async_trait]
pub trait Beginner: Send + Sync {
    async fn begin(&self) -> StoreResult<TransactionHandle>;
}

/// Recovers the concrete transaction behind a handle.
///
/// `expected` names the technology in the error when the handle belongs
/// to something else.
pub fn downcast_tx<T>(tx: &TransactionHandle, expected: &'static str) -> StoreResult<Arc<T>>
where
    T: CommitRollbacker,
{
    Arc::clone(tx)
        .into_any()
        .downcast::<T>()
        .map_err(|_| StoreError::UnsupportedTransaction { expected })
}
