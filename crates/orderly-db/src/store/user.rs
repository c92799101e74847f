//! # User Store
//!
//! `email` carries a UNIQUE index; a second user with the same address
//! surfaces as `StoreError::UniqueViolation { field: "email" }`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderly_business::{Ctx, StoreResult, TransactionHandle, UserStorer};
use orderly_core::filter::UserFilter;
use orderly_core::order::UserOrderField;
use orderly_core::{Email, Name, OrderBy, Page, Role, User};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::store::{contains_pattern, push_order_and_page, Conditions, LIKE_ESCAPE};
use crate::tx::Conn;

const ENTITY: &str = "user";

const SELECT: &str =
    "SELECT user_id, name, email, roles, enabled, date_created, date_updated FROM users";

#[derive(Debug, FromRow)]
struct UserRow {
    user_id: String,
    name: String,
    email: String,
    roles: String,
    enabled: bool,
    date_created: DateTime<Utc>,
    date_updated: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = DbError;

    fn try_from(row: UserRow) -> DbResult<User> {
        let roles = row
            .roles
            .split(',')
            .filter(|r| !r.is_empty())
            .map(Role::parse)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| DbError::corrupt(ENTITY, e))?;

        Ok(User {
            id: Uuid::parse_str(&row.user_id).map_err(|e| DbError::corrupt(ENTITY, e))?,
            name: Name::parse(&row.name).map_err(|e| DbError::corrupt(ENTITY, e))?,
            email: Email::parse(&row.email).map_err(|e| DbError::corrupt(ENTITY, e))?,
            roles,
            enabled: row.enabled,
            date_created: row.date_created,
            date_updated: row.date_updated,
        })
    }
}

/// `ADMIN,USER`
fn encode_roles(roles: &[Role]) -> String {
    roles.iter().map(|r| r.as_str()).collect::<Vec<_>>().join(",")
}

fn order_column(field: UserOrderField) -> &'static str {
    match field {
        UserOrderField::Id => "user_id",
        UserOrderField::Name => "name",
        UserOrderField::Email => "email",
        UserOrderField::Roles => "roles",
        UserOrderField::Enabled => "enabled",
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &UserFilter) {
    let mut w = Conditions::new(qb);

    if let Some(id) = filter.id {
        w.next().push("user_id = ").push_bind(id.to_string());
    }

    if let Some(name) = &filter.name {
        w.next()
            .push("name LIKE ")
            .push_bind(contains_pattern(name.as_str()))
            .push(LIKE_ESCAPE);
    }

    if let Some(email) = &filter.email {
        w.next().push("email = ").push_bind(email.as_str().to_string());
    }

    if let Some(start) = filter.start_created_date {
        w.next().push("date_created >= ").push_bind(start);
    }

    if let Some(end) = filter.end_created_date {
        w.next().push("date_created <= ").push_bind(end);
    }
}

/// Users in SQLite.
#[derive(Clone)]
pub struct UserStore {
    conn: Conn,
}

impl UserStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            conn: Conn::Pool(pool),
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.conn.is_tx()
    }

    pub async fn insert(&self, user: &User) -> DbResult<()> {
        debug!(user_id = %user.id, email = %user.email, "Inserting user");

        let mut conn = self.conn.acquire().await?;
        sqlx::query(
            r#"
            INSERT INTO users (user_id, name, email, roles, enabled, date_created, date_updated)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(user.id.to_string())
        .bind(user.name.as_str())
        .bind(user.email.as_str())
        .bind(encode_roles(&user.roles))
        .bind(user.enabled)
        .bind(user.date_created)
        .bind(user.date_updated)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn update_row(&self, user: &User) -> DbResult<()> {
        debug!(user_id = %user.id, "Updating user");

        let mut conn = self.conn.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = ?2, email = ?3, roles = ?4, enabled = ?5, date_updated = ?6
            WHERE user_id = ?1
            "#,
        )
        .bind(user.id.to_string())
        .bind(user.name.as_str())
        .bind(user.email.as_str())
        .bind(encode_roles(&user.roles))
        .bind(user.enabled)
        .bind(user.date_updated)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, user.id));
        }
        Ok(())
    }

    pub async fn delete_row(&self, user_id: Uuid) -> DbResult<()> {
        debug!(user_id = %user_id, "Deleting user");

        let mut conn = self.conn.acquire().await?;
        let result = sqlx::query("DELETE FROM users WHERE user_id = ?1")
            .bind(user_id.to_string())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, user_id));
        }
        Ok(())
    }

    pub async fn select(
        &self,
        filter: &UserFilter,
        order_by: &OrderBy<UserOrderField>,
        page: &Page,
    ) -> DbResult<Vec<User>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT);
        push_filter(&mut qb, filter);
        push_order_and_page(
            &mut qb,
            order_column(order_by.field),
            "user_id",
            order_by.direction,
            page,
        );

        let mut conn = self.conn.acquire().await?;
        let rows: Vec<UserRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

        debug!(count = rows.len(), "User query returned rows");
        rows.into_iter().map(User::try_from).collect()
    }

    pub async fn count_rows(&self, filter: &UserFilter) -> DbResult<usize> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM users");
        push_filter(&mut qb, filter);

        let mut conn = self.conn.acquire().await?;
        let count: i64 = qb.build_query_scalar().fetch_one(&mut *conn).await?;
        Ok(count as usize)
    }

    pub async fn get_by_id(&self, user_id: Uuid) -> DbResult<User> {
        let mut conn = self.conn.acquire().await?;
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT} WHERE user_id = ?1"))
            .bind(user_id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

        row.ok_or_else(|| DbError::not_found(ENTITY, user_id))?
            .try_into()
    }

    pub async fn get_by_email(&self, email: &Email) -> DbResult<User> {
        let mut conn = self.conn.acquire().await?;
        let row: Option<UserRow> = sqlx::query_as(&format!("{SELECT} WHERE email = ?1"))
            .bind(email.as_str())
            .fetch_optional(&mut *conn)
            .await?;

        row.ok_or_else(|| DbError::not_found(ENTITY, email))?
            .try_into()
    }
}

#[async_trait]
impl UserStorer for UserStore {
    fn with_tx(&self, tx: &TransactionHandle) -> StoreResult<Arc<dyn UserStorer>> {
        Ok(Arc::new(UserStore {
            conn: Conn::bind(tx)?,
        }))
    }

    async fn create(&self, ctx: &Ctx, user: &User) -> StoreResult<()> {
        ctx.err()?;
        Ok(self.insert(user).await?)
    }

    async fn update(&self, ctx: &Ctx, user: &User) -> StoreResult<()> {
        ctx.err()?;
        Ok(self.update_row(user).await?)
    }

    async fn delete(&self, ctx: &Ctx, user: &User) -> StoreResult<()> {
        ctx.err()?;
        Ok(self.delete_row(user.id).await?)
    }

    async fn query(
        &self,
        ctx: &Ctx,
        filter: &UserFilter,
        order_by: &OrderBy<UserOrderField>,
        page: &Page,
    ) -> StoreResult<Vec<User>> {
        ctx.err()?;
        Ok(self.select(filter, order_by, page).await?)
    }

    async fn count(&self, ctx: &Ctx, filter: &UserFilter) -> StoreResult<usize> {
        ctx.err()?;
        Ok(self.count_rows(filter).await?)
    }

    async fn query_by_id(&self, ctx: &Ctx, user_id: Uuid) -> StoreResult<User> {
        ctx.err()?;
        Ok(self.get_by_id(user_id).await?)
    }

    async fn query_by_email(&self, ctx: &Ctx, email: &Email) -> StoreResult<User> {
        ctx.err()?;
        Ok(self.get_by_email(email).await?)
    }
}
