//! # Transaction Coordinator
//!
//! `Domains` bundles the three Domain Services so they can be rebound to
//! one transaction together. `UnitOfWork` owns that transaction for the
//! length of one request.
//!
//! ## Request Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  UnitOfWork::run(ctx, domains, f)                                       │
//! │     │                                                                   │
//! │     ├── beginner.begin()               ──► TransactionHandle            │
//! │     ├── domains.with_tx(&tx)           ──► rebound Domains              │
//! │     ├── f(ctx, rebound)                                                 │
//! │     │      ├── Ok(v)  ──► tx.commit()   ──► Ok(v)                       │
//! │     │      └── Err(e) ──► tx.rollback() ──► Err(e)                      │
//! │     │                                                                   │
//! │  The original Domains never see the transaction.                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::context::Ctx;
use crate::domain::product::ProductBusiness;
use crate::domain::sale::SaleBusiness;
use crate::domain::user::UserBusiness;
use crate::error::{BusError, BusResult};
use crate::tx::{Beginner, TransactionHandle};
use std::future::Future;
use std::sync::Arc;
use tracing::{error, info, warn};

/// The three Domain Services of one store backend.
#[derive(Clone)]
pub struct Domains {
    pub user: UserBusiness,
    pub product: ProductBusiness,
    pub sale: SaleBusiness,
}

impl Domains {
    pub fn new(user: UserBusiness, product: ProductBusiness, sale: SaleBusiness) -> Self {
        Self {
            user,
            product,
            sale,
        }
    }

    /// Rebinds every service to the same transaction.
    pub fn with_tx(&self, tx: &TransactionHandle) -> BusResult<Domains> {
        Ok(Domains {
            user: self.user.with_tx(tx)?,
            product: self.product.with_tx(tx)?,
            sale: self.sale.with_tx(tx)?,
        })
    }
}

/// Begins, commits and rolls back one transaction per call to [`run`].
///
/// [`run`]: UnitOfWork::run
#[derive(Clone)]
pub struct UnitOfWork {
    beginner: Arc<dyn Beginner>,
}

impl UnitOfWork {
    pub fn new(beginner: Arc<dyn Beginner>) -> Self {
        Self { beginner }
    }

    /// Runs `f` with `domains` bound to a fresh transaction.
    ///
    /// Commits when `f` returns `Ok`, rolls back on any `Err`, including
    /// cancellation. A failed commit is returned as the error.
    pub async fn run<T, F, Fut>(&self, ctx: &Ctx, domains: &Domains, f: F) -> BusResult<T>
    where
        F: FnOnce(Ctx, Domains) -> Fut,
        Fut: Future<Output = BusResult<T>>,
    {
        let tx = ctx
            .run(self.beginner.begin())
            .await
            .map_err(|e| BusError::store("begin transaction", e))?;
        info!("BEGIN TRANSACTION");

        let rebound = match domains.with_tx(&tx) {
            Ok(rebound) => rebound,
            Err(err) => {
                rollback(&tx, &err).await;
                return Err(err);
            }
        };

        match f(ctx.clone(), rebound).await {
            Ok(value) => {
                tx.commit()
                    .await
                    .map_err(|e| BusError::store("commit transaction", e))?;
                info!("COMMIT TRANSACTION");
                Ok(value)
            }
            Err(err) => {
                rollback(&tx, &err).await;
                Err(err)
            }
        }
    }
}

/// Rolls back, logging instead of replacing the original error.
async fn rollback(tx: &TransactionHandle, cause: &BusError) {
    warn!(error = %cause, "ROLLBACK TRANSACTION");
    if let Err(e) = tx.rollback().await {
        error!(error = %e, "rollback failed");
    }
}
