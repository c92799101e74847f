//! # Sale Store
//!
//! Sales and their items.
//!
//! ## Tables
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  sales                              sale_items                          │
//! │  ┌────────────┐                     ┌──────────────────────────┐        │
//! │  │ sale_id PK │◄──── ON DELETE ─────│ sale_id, position  PK    │        │
//! │  │ user_id    │      CASCADE        │ product_id               │        │
//! │  │ discount   │                     │ quantity, unit_price     │        │
//! │  │ amount     │                     │ amount, discount         │        │
//! │  └────────────┘                     └──────────────────────────┘        │
//! │                                                                         │
//! │  create: sale row + item rows in one (nested) transaction              │
//! │  delete: sale row; items follow by cascade                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderly_business::{Ctx, SaleStorer, StoreResult, TransactionHandle};
use orderly_core::filter::SaleFilter;
use orderly_core::order::SaleOrderField;
use orderly_core::{Money, OrderBy, Page, Sale, SaleItem};
use sqlx::{Connection, FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::store::{push_order_and_page, Conditions};
use crate::tx::Conn;

const ENTITY: &str = "sale";

const SELECT: &str = "SELECT sale_id, user_id, discount, amount, created_at, updated_at FROM sales";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, FromRow)]
struct SaleRow {
    sale_id: String,
    user_id: String,
    discount: i64,
    amount: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

#[derive(Debug, FromRow)]
struct SaleItemRow {
    sale_id: String,
    product_id: String,
    quantity: i64,
    unit_price: i64,
    amount: i64,
    discount: i64,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

fn parse_id(raw: &str) -> DbResult<Uuid> {
    Uuid::parse_str(raw).map_err(|e| DbError::corrupt(ENTITY, e))
}

fn money(cents: i64) -> DbResult<Money> {
    Money::try_from_cents(cents).map_err(|e| DbError::corrupt(ENTITY, e))
}

/// Item discount shares may sit below zero.
fn signed_money(cents: i64) -> DbResult<Money> {
    Money::try_from_signed_cents(cents).map_err(|e| DbError::corrupt(ENTITY, e))
}

impl TryFrom<SaleItemRow> for SaleItem {
    type Error = DbError;

    fn try_from(row: SaleItemRow) -> DbResult<SaleItem> {
        Ok(SaleItem {
            sale_id: parse_id(&row.sale_id)?,
            product_id: parse_id(&row.product_id)?,
            quantity: row.quantity,
            unit_price: money(row.unit_price)?,
            amount: money(row.amount)?,
            discount: signed_money(row.discount)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleItem>) -> DbResult<Sale> {
        Ok(Sale {
            id: parse_id(&self.sale_id)?,
            user_id: parse_id(&self.user_id)?,
            discount: money(self.discount)?,
            amount: money(self.amount)?,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

fn order_column(field: SaleOrderField) -> &'static str {
    match field {
        SaleOrderField::Id => "sale_id",
        SaleOrderField::UserId => "user_id",
        SaleOrderField::Amount => "amount",
        SaleOrderField::CreatedAt => "created_at",
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &SaleFilter) {
    let mut w = Conditions::new(qb);

    if let Some(id) = filter.id {
        w.next().push("sale_id = ").push_bind(id.to_string());
    }

    if let Some(user_id) = filter.user_id {
        w.next().push("user_id = ").push_bind(user_id.to_string());
    }
}

/// Items of the given sales, grouped by sale id in submission order.
async fn load_items(
    conn: &mut SqliteConnection,
    sale_ids: &[String],
) -> DbResult<HashMap<String, Vec<SaleItem>>> {
    let mut grouped: HashMap<String, Vec<SaleItem>> = HashMap::new();
    if sale_ids.is_empty() {
        return Ok(grouped);
    }

    let mut qb = QueryBuilder::<Sqlite>::new(
        "SELECT sale_id, product_id, quantity, unit_price, amount, discount, \
         created_at, updated_at FROM sale_items WHERE sale_id IN (",
    );
    let mut list = qb.separated(", ");
    for id in sale_ids {
        list.push_bind(id.clone());
    }
    list.push_unseparated(") ORDER BY sale_id, position");

    let rows: Vec<SaleItemRow> = qb.build_query_as().fetch_all(&mut *conn).await?;
    for row in rows {
        let key = row.sale_id.clone();
        grouped.entry(key).or_default().push(row.try_into()?);
    }
    Ok(grouped)
}

// =============================================================================
// Store
// =============================================================================

/// Sales in SQLite.
#[derive(Clone)]
pub struct SaleStore {
    conn: Conn,
}

impl SaleStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            conn: Conn::Pool(pool),
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.conn.is_tx()
    }

    /// Inserts the sale and every item, or nothing.
    ///
    /// Outside a transaction this opens one; inside a [`SqliteTx`] it uses a
    /// savepoint, so a failed item leaves the outer transaction usable.
    ///
    /// [`SqliteTx`]: crate::tx::SqliteTx
    pub async fn insert(&self, sale: &Sale) -> DbResult<()> {
        debug!(sale_id = %sale.id, items = sale.items.len(), "Inserting sale");

        let mut conn = self.conn.acquire().await?;
        let mut tx = conn.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO sales (sale_id, user_id, discount, amount, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(sale.id.to_string())
        .bind(sale.user_id.to_string())
        .bind(sale.discount.cents())
        .bind(sale.amount.cents())
        .bind(sale.created_at)
        .bind(sale.updated_at)
        .execute(&mut *tx)
        .await?;

        for (position, item) in sale.items.iter().enumerate() {
            sqlx::query(
                r#"
                INSERT INTO sale_items (
                    sale_id, position, product_id, quantity,
                    unit_price, amount, discount, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
                "#,
            )
            .bind(item.sale_id.to_string())
            .bind(position as i64)
            .bind(item.product_id.to_string())
            .bind(item.quantity)
            .bind(item.unit_price.cents())
            .bind(item.amount.cents())
            .bind(item.discount.cents())
            .bind(item.created_at)
            .bind(item.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn delete_row(&self, sale_id: Uuid) -> DbResult<()> {
        debug!(sale_id = %sale_id, "Deleting sale");

        let mut conn = self.conn.acquire().await?;
        let result = sqlx::query("DELETE FROM sales WHERE sale_id = ?1")
            .bind(sale_id.to_string())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, sale_id));
        }
        Ok(())
    }

    pub async fn select(
        &self,
        filter: &SaleFilter,
        order_by: &OrderBy<SaleOrderField>,
        page: &Page,
    ) -> DbResult<Vec<Sale>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT);
        push_filter(&mut qb, filter);
        push_order_and_page(
            &mut qb,
            order_column(order_by.field),
            "sale_id",
            order_by.direction,
            page,
        );

        let mut conn = self.conn.acquire().await?;
        let rows: Vec<SaleRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

        let ids: Vec<String> = rows.iter().map(|r| r.sale_id.clone()).collect();
        let mut items = load_items(&mut conn, &ids).await?;

        debug!(count = rows.len(), "Sale query returned rows");
        rows.into_iter()
            .map(|row| {
                let sale_items = items.remove(&row.sale_id).unwrap_or_default();
                row.into_sale(sale_items)
            })
            .collect()
    }

    pub async fn count_rows(&self, filter: &SaleFilter) -> DbResult<usize> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM sales");
        push_filter(&mut qb, filter);

        let mut conn = self.conn.acquire().await?;
        let count: i64 = qb.build_query_scalar().fetch_one(&mut *conn).await?;
        Ok(count as usize)
    }

    pub async fn get_by_id(&self, sale_id: Uuid) -> DbResult<Sale> {
        let mut conn = self.conn.acquire().await?;
        let row: Option<SaleRow> = sqlx::query_as(&format!("{SELECT} WHERE sale_id = ?1"))
            .bind(sale_id.to_string())
            .fetch_optional(&mut *conn)
            .await?;
        let row = row.ok_or_else(|| DbError::not_found(ENTITY, sale_id))?;

        let mut items = load_items(&mut conn, std::slice::from_ref(&row.sale_id)).await?;
        let sale_items = items.remove(&row.sale_id).unwrap_or_default();
        row.into_sale(sale_items)
    }
}

#[async_trait]
impl SaleStorer for SaleStore {
    fn with_tx(&self, tx: &TransactionHandle) -> StoreResult<Arc<dyn SaleStorer>> {
        Ok(Arc::new(SaleStore {
            conn: Conn::bind(tx)?,
        }))
    }

    async fn create(&self, ctx: &Ctx, sale: &Sale) -> StoreResult<()> {
        ctx.err()?;
        Ok(self.insert(sale).await?)
    }

    async fn delete(&self, ctx: &Ctx, sale: &Sale) -> StoreResult<()> {
        ctx.err()?;
        Ok(self.delete_row(sale.id).await?)
    }

    async fn query(
        &self,
        ctx: &Ctx,
        filter: &SaleFilter,
        order_by: &OrderBy<SaleOrderField>,
        page: &Page,
    ) -> StoreResult<Vec<Sale>> {
        ctx.err()?;
        Ok(self.select(filter, order_by, page).await?)
    }

    async fn count(&self, ctx: &Ctx, filter: &SaleFilter) -> StoreResult<usize> {
        ctx.err()?;
        Ok(self.count_rows(filter).await?)
    }

    async fn query_by_id(&self, ctx: &Ctx, sale_id: Uuid) -> StoreResult<Sale> {
        ctx.err()?;
        Ok(self.get_by_id(sale_id).await?)
    }
}
