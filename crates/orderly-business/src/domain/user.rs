//! # User Domain Service
//!
//! Users own sales. Email addresses are unique; a duplicate is reported as
//! a validation failure on `email`, not as a storage fault.

use crate::config::{OrderingConfig, QueryConfig};
use crate::context::Ctx;
use crate::domain::{parse_order, parse_page};
use crate::error::{BusError, BusResult, StoreError, StoreResult};
use crate::tx::TransactionHandle;
use async_trait::async_trait;
use chrono::Utc;
use orderly_core::filter::{UserFilter, UserQueryParams};
use orderly_core::order::UserOrderField;
use orderly_core::{
    Email, NewUser, OrderBy, Page, PageLimits, QueryResult, UpdateUser, User, ValidationError,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Persistence the user service needs.
///
/// `create` and `update` report a taken email as
/// [`StoreError::UniqueViolation`].
#[async_trait]
pub trait UserStorer: Send + Sync {
    fn with_tx(&self, tx: &TransactionHandle) -> StoreResult<Arc<dyn UserStorer>>;

    async fn create(&self, ctx: &Ctx, user: &User) -> StoreResult<()>;

    async fn update(&self, ctx: &Ctx, user: &User) -> StoreResult<()>;

    async fn delete(&self, ctx: &Ctx, user: &User) -> StoreResult<()>;

    async fn query(
        &self,
        ctx: &Ctx,
        filter: &UserFilter,
        order_by: &OrderBy<UserOrderField>,
        page: &Page,
    ) -> StoreResult<Vec<User>>;

    async fn count(&self, ctx: &Ctx, filter: &UserFilter) -> StoreResult<usize>;

    async fn query_by_id(&self, ctx: &Ctx, user_id: Uuid) -> StoreResult<User>;

    async fn query_by_email(&self, ctx: &Ctx, email: &Email) -> StoreResult<User>;
}

/// User operations.
#[derive(Clone)]
pub struct UserBusiness {
    storer: Arc<dyn UserStorer>,
    query: QueryConfig<UserOrderField>,
}

impl UserBusiness {
    pub fn new(storer: Arc<dyn UserStorer>, ordering: OrderingConfig<UserOrderField>) -> Self {
        Self {
            storer,
            query: ordering.into(),
        }
    }

    pub fn with_page_limits(mut self, limits: PageLimits) -> Self {
        self.query.page_limits = limits;
        self
    }

    pub fn with_tx(&self, tx: &TransactionHandle) -> BusResult<UserBusiness> {
        let storer = self
            .storer
            .with_tx(tx)
            .map_err(|e| BusError::store("user: bind transaction", e))?;

        Ok(UserBusiness {
            storer,
            query: self.query.clone(),
        })
    }

    pub fn default_order(&self) -> OrderBy<UserOrderField> {
        self.query.ordering.default
    }

    pub fn parse_order(&self, raw: Option<&str>) -> BusResult<OrderBy<UserOrderField>> {
        parse_order(&self.query.ordering, raw)
    }

    #[tracing::instrument(skip(self, ctx, nu), fields(email = %nu.email))]
    pub async fn create(&self, ctx: &Ctx, nu: NewUser) -> BusResult<User> {
        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: nu.name,
            email: nu.email,
            roles: nu.roles,
            enabled: true,
            date_created: now,
            date_updated: now,
        };

        ctx.run(self.storer.create(ctx, &user))
            .await
            .map_err(|e| write_error("create user", &user, e))?;

        debug!(user_id = %user.id, "User created");
        Ok(user)
    }

    #[tracing::instrument(skip(self, ctx, user), fields(user_id = %user.id))]
    pub async fn update(&self, ctx: &Ctx, user: User, uu: UpdateUser) -> BusResult<User> {
        let user = user.apply(uu, Utc::now());

        ctx.run(self.storer.update(ctx, &user))
            .await
            .map_err(|e| write_error(&format!("update user[{}]", user.id), &user, e))?;

        Ok(user)
    }

    #[tracing::instrument(skip(self, ctx, user), fields(user_id = %user.id))]
    pub async fn delete(&self, ctx: &Ctx, user: &User) -> BusResult<()> {
        match ctx.run(self.storer.delete(ctx, user)).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { .. }) => Err(not_found(user.id)),
            Err(e) => Err(BusError::store(format!("delete user[{}]", user.id), e)),
        }
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn query(
        &self,
        ctx: &Ctx,
        filter: &UserFilter,
        order_by: &OrderBy<UserOrderField>,
        page: &Page,
    ) -> BusResult<Vec<User>> {
        ctx.run(self.storer.query(ctx, filter, order_by, page))
            .await
            .map_err(|e| BusError::store("query users", e))
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn count(&self, ctx: &Ctx, filter: &UserFilter) -> BusResult<usize> {
        ctx.run(self.storer.count(ctx, filter))
            .await
            .map_err(|e| BusError::store("count users", e))
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn query_by_id(&self, ctx: &Ctx, user_id: Uuid) -> BusResult<User> {
        match ctx.run(self.storer.query_by_id(ctx, user_id)).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound { .. }) => Err(not_found(user_id)),
            Err(e) => Err(BusError::store(format!("query user[{user_id}]"), e)),
        }
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn query_by_email(&self, ctx: &Ctx, email: &Email) -> BusResult<User> {
        match ctx.run(self.storer.query_by_email(ctx, email)).await {
            Ok(user) => Ok(user),
            Err(StoreError::NotFound { .. }) => Err(BusError::NotFound {
                entity: "user",
                id: email.to_string(),
            }),
            Err(e) => Err(BusError::store(format!("query user email[{email}]"), e)),
        }
    }

    pub async fn search(&self, ctx: &Ctx, params: &UserQueryParams) -> BusResult<QueryResult<User>> {
        let page = parse_page(
            self.query.page_limits,
            params.page.as_deref(),
            params.rows.as_deref(),
        )?;
        let order_by = self.parse_order(params.order_by.as_deref())?;
        let filter = params.parse_filter()?;

        let items = self.query(ctx, &filter, &order_by, &page).await?;
        let total = self.count(ctx, &filter).await?;

        Ok(QueryResult::new(items, total, &page))
    }
}

fn not_found(user_id: Uuid) -> BusError {
    BusError::NotFound {
        entity: "user",
        id: user_id.to_string(),
    }
}

/// Maps write failures: a taken email is the caller's problem.
fn write_error(op: &str, user: &User, err: StoreError) -> BusError {
    match err {
        StoreError::UniqueViolation { .. } => ValidationError::Duplicate {
            field: "email".to_string(),
            value: user.email.to_string(),
        }
        .into(),
        StoreError::NotFound { .. } => not_found(user.id),
        other => BusError::store(op, other),
    }
}
