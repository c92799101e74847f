//! # SQLite Transactions
//!
//! [`SqliteTx`] is the concrete [`CommitRollbacker`] behind a
//! `TransactionHandle`. Stores rebound with `with_tx` downcast the handle
//! back to `SqliteTx` and run every statement on its connection.
//!
//! ## States
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   SqliteBeginner::begin()                                              │
//! │        │                                                                │
//! │        ▼                                                                │
//! │     Open(Transaction) ──commit()───► Committed                         │
//! │        │                                                                │
//! │        └─────────────rollback()──► RolledBack                          │
//! │                                                                         │
//! │   Statements, commit or rollback on a closed transaction fail with     │
//! │   DbError::TransactionClosed. Dropping an open SqliteTx rolls back.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The mutex serialises the stores of one request that share the handle;
//! it is never contended across requests.

use async_trait::async_trait;
use orderly_business::{downcast_tx, Beginner, CommitRollbacker, StoreResult, TransactionHandle};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool, Transaction};
use std::any::Any;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;
use tokio::sync::{MappedMutexGuard, Mutex, MutexGuard};
use tracing::debug;

use crate::error::{DbError, DbResult};

/// Name reported when a handle from another backend is offered.
pub const SQLITE: &str = "sqlite";

// =============================================================================
// SqliteTx
// =============================================================================

enum TxState {
    Open(Transaction<'static, Sqlite>),
    Committed,
    RolledBack,
}

impl TxState {
    fn name(&self) -> &'static str {
        match self {
            TxState::Open(_) => "open",
            TxState::Committed => "committed",
            TxState::RolledBack => "rolled back",
        }
    }
}

/// One SQLite transaction, shareable across stores.
pub struct SqliteTx {
    state: Mutex<TxState>,
}

impl SqliteTx {
    fn new(tx: Transaction<'static, Sqlite>) -> Self {
        Self {
            state: Mutex::new(TxState::Open(tx)),
        }
    }

    /// Recovers the SQLite transaction behind a handle.
    pub fn from_handle(tx: &TransactionHandle) -> StoreResult<Arc<SqliteTx>> {
        downcast_tx::<SqliteTx>(tx, SQLITE)
    }

    /// Locks the transaction's connection for one statement (or a few).
    pub(crate) async fn conn(&self) -> DbResult<MappedMutexGuard<'_, Transaction<'static, Sqlite>>> {
        let guard = self.state.lock().await;
        MutexGuard::try_map(guard, |state| match state {
            TxState::Open(tx) => Some(tx),
            _ => None,
        })
        .map_err(|guard| DbError::TransactionClosed(guard.name()))
    }

    /// Takes the open transaction out, leaving `next` in its place.
    async fn finish(&self, next: TxState) -> DbResult<Transaction<'static, Sqlite>> {
        let mut state = self.state.lock().await;
        match std::mem::replace(&mut *state, next) {
            TxState::Open(tx) => Ok(tx),
            closed => {
                let name = closed.name();
                *state = closed;
                Err(DbError::TransactionClosed(name))
            }
        }
    }

    pub async fn state_name(&self) -> &'static str {
        self.state.lock().await.name()
    }
}

#[async_trait]
impl CommitRollbacker for SqliteTx {
    async fn commit(&self) -> StoreResult<()> {
        let tx = self.finish(TxState::Committed).await?;
        tx.commit().await.map_err(DbError::from)?;
        debug!("sqlite transaction committed");
        Ok(())
    }

    async fn rollback(&self) -> StoreResult<()> {
        let tx = self.finish(TxState::RolledBack).await?;
        tx.rollback().await.map_err(DbError::from)?;
        debug!("sqlite transaction rolled back");
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

// =============================================================================
// SqliteBeginner
// =============================================================================

/// Starts [`SqliteTx`] transactions on a pool.
#[derive(Debug, Clone)]
pub struct SqliteBeginner {
    pool: SqlitePool,
}

impl SqliteBeginner {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Beginner for SqliteBeginner {
    async fn begin(&self) -> StoreResult<TransactionHandle> {
        let tx = self.pool.begin().await.map_err(DbError::from)?;
        Ok(Arc::new(SqliteTx::new(tx)))
    }
}

// =============================================================================
// Executor selection for stores
// =============================================================================

/// Where a store sends its statements.
#[derive(Clone)]
pub(crate) enum Conn {
    Pool(SqlitePool),
    Tx(Arc<SqliteTx>),
}

impl Conn {
    /// Rebinds to the SQLite transaction behind `tx`.
    pub(crate) fn bind(tx: &TransactionHandle) -> StoreResult<Conn> {
        Ok(Conn::Tx(SqliteTx::from_handle(tx)?))
    }

    pub(crate) fn is_tx(&self) -> bool {
        matches!(self, Conn::Tx(_))
    }

    /// A connection for the next statements: a pooled one, or the
    /// transaction's own.
    pub(crate) async fn acquire(&self) -> DbResult<ConnGuard<'_>> {
        match self {
            Conn::Pool(pool) => Ok(ConnGuard::Pool(pool.acquire().await?)),
            Conn::Tx(tx) => Ok(ConnGuard::Tx(tx.conn().await?)),
        }
    }
}

pub(crate) enum ConnGuard<'a> {
    Pool(PoolConnection<Sqlite>),
    Tx(MappedMutexGuard<'a, Transaction<'static, Sqlite>>),
}

impl Deref for ConnGuard<'_> {
    type Target = SqliteConnection;

    fn deref(&self) -> &SqliteConnection {
        match self {
            ConnGuard::Pool(conn) => conn,
            ConnGuard::Tx(tx) => tx,
        }
    }
}

impl DerefMut for ConnGuard<'_> {
    fn deref_mut(&mut self) -> &mut SqliteConnection {
        match self {
            ConnGuard::Pool(conn) => conn,
            ConnGuard::Tx(tx) => tx,
        }
    }
}
