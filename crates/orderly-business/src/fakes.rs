//! In-memory stores and transactions for unit tests.
//!
//! Every store counts the operations it actually ran, so tests can assert
//! that a rejected request never reached storage.

use crate::context::Ctx;
use crate::domain::product::ProductStorer;
use crate::domain::sale::SaleStorer;
use crate::domain::user::UserStorer;
use crate::error::{StoreError, StoreResult};
use crate::tx::{downcast_tx, Beginner, CommitRollbacker, TransactionHandle};
use async_trait::async_trait;
use orderly_core::filter::{ProductFilter, SaleFilter, UserFilter};
use orderly_core::order::{Direction, ProductOrderField, SaleOrderField, UserOrderField};
use orderly_core::{Email, OrderBy, Page, Product, Sale, User};
use std::any::Any;
use std::cmp::Ordering;
use std::sync::atomic::{AtomicUsize, Ordering as AtomicOrdering};
use std::sync::{Arc, Mutex};
use uuid::Uuid;

// =============================================================================
// Transactions
// =============================================================================

#[derive(Default)]
pub struct FakeTx {
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
}

impl FakeTx {
    pub fn commits(&self) -> usize {
        self.commits.load(AtomicOrdering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(AtomicOrdering::SeqCst)
    }

    fn closed(&self) -> Option<&'static str> {
        if self.commits() > 0 {
            Some("committed")
        } else if self.rollbacks() > 0 {
            Some("rolled back")
        } else {
            None
        }
    }
}

#[async_trait]
impl CommitRollbacker for FakeTx {
    async fn commit(&self) -> StoreResult<()> {
        if let Some(state) = self.closed() {
            return Err(StoreError::TransactionClosed { state });
        }
        self.commits.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    async fn rollback(&self) -> StoreResult<()> {
        if let Some(state) = self.closed() {
            return Err(StoreError::TransactionClosed { state });
        }
        self.rollbacks.fetch_add(1, AtomicOrdering::SeqCst);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

/// A transaction no fake store accepts.
pub struct ForeignTx;

#[async_trait]
impl CommitRollbacker for ForeignTx {
    async fn commit(&self) -> StoreResult<()> {
        Ok(())
    }

    async fn rollback(&self) -> StoreResult<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

#[derive(Default)]
pub struct FakeBeginner {
    foreign: bool,
    started: Mutex<Vec<Arc<FakeTx>>>,
}

impl FakeBeginner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn foreign() -> Self {
        Self {
            foreign: true,
            ..Self::default()
        }
    }

    pub fn last(&self) -> Option<Arc<FakeTx>> {
        self.started.lock().unwrap().last().cloned()
    }
}

#[async_trait]
impl Beginner for FakeBeginner {
    async fn begin(&self) -> StoreResult<TransactionHandle> {
        if self.foreign {
            return Ok(Arc::new(ForeignTx));
        }
        let tx = Arc::new(FakeTx::default());
        self.started.lock().unwrap().push(tx.clone());
        Ok(tx)
    }
}

// =============================================================================
// Shared store plumbing
// =============================================================================

/// Rows plus call counters, shared by a store and its rebound copies.
struct Shared<T> {
    rows: Mutex<Vec<T>>,
    calls: AtomicUsize,
    bound_calls: AtomicUsize,
}

impl<T> Default for Shared<T> {
    fn default() -> Self {
        Self {
            rows: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            bound_calls: AtomicUsize::new(0),
        }
    }
}

struct MemStore<T> {
    shared: Arc<Shared<T>>,
    bound: bool,
    failing: bool,
}

impl<T> Clone for MemStore<T> {
    fn clone(&self) -> Self {
        Self {
            shared: self.shared.clone(),
            bound: self.bound,
            failing: self.failing,
        }
    }
}

impl<T: Clone> MemStore<T> {
    fn new(failing: bool) -> Self {
        Self {
            shared: Arc::default(),
            bound: false,
            failing,
        }
    }

    fn bind(&self, tx: &TransactionHandle) -> StoreResult<Self> {
        downcast_tx::<FakeTx>(tx, "fake")?;
        Ok(Self {
            shared: self.shared.clone(),
            bound: true,
            failing: self.failing,
        })
    }

    fn enter(&self, ctx: &Ctx) -> StoreResult<()> {
        ctx.err()?;
        self.shared.calls.fetch_add(1, AtomicOrdering::SeqCst);
        if self.bound {
            self.shared.bound_calls.fetch_add(1, AtomicOrdering::SeqCst);
        }
        if self.failing {
            return Err(StoreError::Backend("disk on fire".into()));
        }
        Ok(())
    }

    fn rows(&self) -> Vec<T> {
        self.shared.rows.lock().unwrap().clone()
    }

    fn calls(&self) -> usize {
        self.shared.calls.load(AtomicOrdering::SeqCst)
    }

    fn bound_calls(&self) -> usize {
        self.shared.bound_calls.load(AtomicOrdering::SeqCst)
    }

    fn insert(&self, row: T) {
        self.shared.rows.lock().unwrap().push(row);
    }

    fn replace(&self, entity: &'static str, matches: impl Fn(&T) -> bool, row: T) -> StoreResult<()> {
        let mut rows = self.shared.rows.lock().unwrap();
        match rows.iter_mut().find(|r| matches(r)) {
            Some(slot) => {
                *slot = row;
                Ok(())
            }
            None => Err(StoreError::NotFound { entity }),
        }
    }

    fn remove(&self, entity: &'static str, matches: impl Fn(&T) -> bool) -> StoreResult<()> {
        let mut rows = self.shared.rows.lock().unwrap();
        let before = rows.len();
        rows.retain(|r| !matches(r));
        if rows.len() == before {
            return Err(StoreError::NotFound { entity });
        }
        Ok(())
    }

    fn find(&self, entity: &'static str, matches: impl Fn(&T) -> bool) -> StoreResult<T> {
        self.shared
            .rows
            .lock()
            .unwrap()
            .iter()
            .find(|r| matches(r))
            .cloned()
            .ok_or(StoreError::NotFound { entity })
    }

    fn select(&self, keep: impl Fn(&T) -> bool) -> Vec<T> {
        self.shared
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|r| keep(r))
            .cloned()
            .collect()
    }
}

fn sort_and_page<T>(
    mut rows: Vec<T>,
    direction: Direction,
    cmp: impl Fn(&T, &T) -> Ordering,
    page: &Page,
) -> Vec<T> {
    rows.sort_by(|a, b| match direction {
        Direction::Asc => cmp(a, b),
        Direction::Desc => cmp(b, a),
    });
    rows.into_iter()
        .skip(page.offset() as usize)
        .take(page.rows_per_page() as usize)
        .collect()
}

macro_rules! counters {
    ($row:ty) => {
        pub fn rows(&self) -> Vec<$row> {
            self.0.rows()
        }

        pub fn calls(&self) -> usize {
            self.0.calls()
        }

        pub fn bound_calls(&self) -> usize {
            self.0.bound_calls()
        }
    };
}

// =============================================================================
// Sales
// =============================================================================

#[derive(Clone)]
pub struct MemSaleStore(MemStore<Sale>);

impl MemSaleStore {
    pub fn new() -> Self {
        Self(MemStore::new(false))
    }

    /// Every call fails with a backend error.
    pub fn failing() -> Self {
        Self(MemStore::new(true))
    }

    counters!(Sale);
}

fn sale_matches(filter: &SaleFilter, sale: &Sale) -> bool {
    filter.id.map_or(true, |id| sale.id == id)
        && filter.user_id.map_or(true, |id| sale.user_id == id)
}

#[async_trait]
impl SaleStorer for MemSaleStore {
    fn with_tx(&self, tx: &TransactionHandle) -> StoreResult<Arc<dyn SaleStorer>> {
        Ok(Arc::new(Self(self.0.bind(tx)?)))
    }

    async fn create(&self, ctx: &Ctx, sale: &Sale) -> StoreResult<()> {
        self.0.enter(ctx)?;
        self.0.insert(sale.clone());
        Ok(())
    }

    async fn delete(&self, ctx: &Ctx, sale: &Sale) -> StoreResult<()> {
        self.0.enter(ctx)?;
        self.0.remove("sale", |s| s.id == sale.id)
    }

    async fn query(
        &self,
        ctx: &Ctx,
        filter: &SaleFilter,
        order_by: &OrderBy<SaleOrderField>,
        page: &Page,
    ) -> StoreResult<Vec<Sale>> {
        self.0.enter(ctx)?;
        let rows = self.0.select(|s| sale_matches(filter, s));
        let field = order_by.field;
        Ok(sort_and_page(
            rows,
            order_by.direction,
            |a, b| match field {
                SaleOrderField::Id => a.id.cmp(&b.id),
                SaleOrderField::UserId => a.user_id.cmp(&b.user_id),
                SaleOrderField::Amount => a.amount.cmp(&b.amount),
                SaleOrderField::CreatedAt => a.created_at.cmp(&b.created_at),
            },
            page,
        ))
    }

    async fn count(&self, ctx: &Ctx, filter: &SaleFilter) -> StoreResult<usize> {
        self.0.enter(ctx)?;
        Ok(self.0.select(|s| sale_matches(filter, s)).len())
    }

    async fn query_by_id(&self, ctx: &Ctx, sale_id: Uuid) -> StoreResult<Sale> {
        self.0.enter(ctx)?;
        self.0.find("sale", |s| s.id == sale_id)
    }
}

// =============================================================================
// Products
// =============================================================================

#[derive(Clone)]
pub struct MemProductStore(MemStore<Product>);

impl MemProductStore {
    pub fn new() -> Self {
        Self(MemStore::new(false))
    }

    counters!(Product);
}

fn product_matches(filter: &ProductFilter, p: &Product) -> bool {
    filter.id.map_or(true, |id| p.id == id)
        && filter.ids.as_ref().map_or(true, |ids| ids.contains(&p.id))
        && filter
            .name
            .as_ref()
            .map_or(true, |n| p.name.as_str().contains(n.as_str()))
        && filter.price.map_or(true, |price| p.price == price)
}

#[async_trait]
impl ProductStorer for MemProductStore {
    fn with_tx(&self, tx: &TransactionHandle) -> StoreResult<Arc<dyn ProductStorer>> {
        Ok(Arc::new(Self(self.0.bind(tx)?)))
    }

    async fn create(&self, ctx: &Ctx, product: &Product) -> StoreResult<()> {
        self.0.enter(ctx)?;
        self.0.insert(product.clone());
        Ok(())
    }

    async fn update(&self, ctx: &Ctx, product: &Product) -> StoreResult<()> {
        self.0.enter(ctx)?;
        self.0.replace("product", |p| p.id == product.id, product.clone())
    }

    async fn delete(&self, ctx: &Ctx, product: &Product) -> StoreResult<()> {
        self.0.enter(ctx)?;
        self.0.remove("product", |p| p.id == product.id)
    }

    async fn query(
        &self,
        ctx: &Ctx,
        filter: &ProductFilter,
        order_by: &OrderBy<ProductOrderField>,
        page: &Page,
    ) -> StoreResult<Vec<Product>> {
        self.0.enter(ctx)?;
        let rows = self.0.select(|p| product_matches(filter, p));
        let field = order_by.field;
        Ok(sort_and_page(
            rows,
            order_by.direction,
            |a, b| match field {
                ProductOrderField::Id => a.id.cmp(&b.id),
                ProductOrderField::Name => a.name.as_str().cmp(b.name.as_str()),
                ProductOrderField::Price => a.price.cmp(&b.price),
            },
            page,
        ))
    }

    async fn count(&self, ctx: &Ctx, filter: &ProductFilter) -> StoreResult<usize> {
        self.0.enter(ctx)?;
        Ok(self.0.select(|p| product_matches(filter, p)).len())
    }

    async fn query_by_id(&self, ctx: &Ctx, product_id: Uuid) -> StoreResult<Product> {
        self.0.enter(ctx)?;
        self.0.find("product", |p| p.id == product_id)
    }
}

// =============================================================================
// Users
// =============================================================================

#[derive(Clone)]
pub struct MemUserStore(MemStore<User>);

impl MemUserStore {
    pub fn new() -> Self {
        Self(MemStore::new(false))
    }

    counters!(User);
}

fn user_matches(filter: &UserFilter, u: &User) -> bool {
    filter.id.map_or(true, |id| u.id == id)
        && filter
            .name
            .as_ref()
            .map_or(true, |n| u.name.as_str().contains(n.as_str()))
        && filter.email.as_ref().map_or(true, |e| &u.email == e)
        && filter.start_created_date.map_or(true, |t| u.date_created >= t)
        && filter.end_created_date.map_or(true, |t| u.date_created <= t)
}

#[async_trait]
impl UserStorer for MemUserStore {
    fn with_tx(&self, tx: &TransactionHandle) -> StoreResult<Arc<dyn UserStorer>> {
        Ok(Arc::new(Self(self.0.bind(tx)?)))
    }

    async fn create(&self, ctx: &Ctx, user: &User) -> StoreResult<()> {
        self.0.enter(ctx)?;
        if !self.0.select(|u| u.email == user.email).is_empty() {
            return Err(StoreError::UniqueViolation {
                field: "email".to_string(),
            });
        }
        self.0.insert(user.clone());
        Ok(())
    }

    async fn update(&self, ctx: &Ctx, user: &User) -> StoreResult<()> {
        self.0.enter(ctx)?;
        if !self
            .0
            .select(|u| u.email == user.email && u.id != user.id)
            .is_empty()
        {
            return Err(StoreError::UniqueViolation {
                field: "email".to_string(),
            });
        }
        self.0.replace("user", |u| u.id == user.id, user.clone())
    }

    async fn delete(&self, ctx: &Ctx, user: &User) -> StoreResult<()> {
        self.0.enter(ctx)?;
        self.0.remove("user", |u| u.id == user.id)
    }

    async fn query(
        &self,
        ctx: &Ctx,
        filter: &UserFilter,
        order_by: &OrderBy<UserOrderField>,
        page: &Page,
    ) -> StoreResult<Vec<User>> {
        self.0.enter(ctx)?;
        let rows = self.0.select(|u| user_matches(filter, u));
        let field = order_by.field;
        Ok(sort_and_page(
            rows,
            order_by.direction,
            |a, b| match field {
                UserOrderField::Id => a.id.cmp(&b.id),
                UserOrderField::Name => a.name.as_str().cmp(b.name.as_str()),
                UserOrderField::Email => a.email.as_str().cmp(b.email.as_str()),
                UserOrderField::Roles => a.roles.len().cmp(&b.roles.len()),
                UserOrderField::Enabled => a.enabled.cmp(&b.enabled),
            },
            page,
        ))
    }

    async fn count(&self, ctx: &Ctx, filter: &UserFilter) -> StoreResult<usize> {
        self.0.enter(ctx)?;
        Ok(self.0.select(|u| user_matches(filter, u)).len())
    }

    async fn query_by_id(&self, ctx: &Ctx, user_id: Uuid) -> StoreResult<User> {
        self.0.enter(ctx)?;
        self.0.find("user", |u| u.id == user_id)
    }

    async fn query_by_email(&self, ctx: &Ctx, email: &Email) -> StoreResult<User> {
        self.0.enter(ctx)?;
        self.0.find("user", |u| &u.email == email)
    }
}
