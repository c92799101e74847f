//! # Product Store
//!
//! ```text
//! products
//! ┌──────────────┬──────────┬────────────────┬──────────────┬──────────────┐
//! │ product_id   │ name     │ price (cents)  │ date_created │ date_updated │
//! └──────────────┴──────────┴────────────────┴──────────────┴──────────────┘
//! ```

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use orderly_business::{Ctx, ProductStorer, StoreResult, TransactionHandle};
use orderly_core::filter::ProductFilter;
use orderly_core::order::ProductOrderField;
use orderly_core::{Money, Name, OrderBy, Page, Product};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqlitePool};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::store::{contains_pattern, push_order_and_page, Conditions, LIKE_ESCAPE};
use crate::tx::Conn;

const ENTITY: &str = "product";

const SELECT: &str = "SELECT product_id, name, price, date_created, date_updated FROM products";

#[derive(Debug, FromRow)]
struct ProductRow {
    product_id: String,
    name: String,
    price: i64,
    date_created: DateTime<Utc>,
    date_updated: DateTime<Utc>,
}

impl TryFrom<ProductRow> for Product {
    type Error = DbError;

    fn try_from(row: ProductRow) -> DbResult<Product> {
        Ok(Product {
            id: Uuid::parse_str(&row.product_id).map_err(|e| DbError::corrupt(ENTITY, e))?,
            name: Name::parse(&row.name).map_err(|e| DbError::corrupt(ENTITY, e))?,
            price: Money::try_from_cents(row.price).map_err(|e| DbError::corrupt(ENTITY, e))?,
            date_created: row.date_created,
            date_updated: row.date_updated,
        })
    }
}

fn order_column(field: ProductOrderField) -> &'static str {
    match field {
        ProductOrderField::Id => "product_id",
        ProductOrderField::Name => "name",
        ProductOrderField::Price => "price",
    }
}

fn push_filter(qb: &mut QueryBuilder<'_, Sqlite>, filter: &ProductFilter) {
    let mut w = Conditions::new(qb);

    if let Some(id) = filter.id {
        w.next().push("product_id = ").push_bind(id.to_string());
    }

    if let Some(ids) = &filter.ids {
        let mut list = w.next().push("product_id IN (").separated(", ");
        for id in ids {
            list.push_bind(id.to_string());
        }
        list.push_unseparated(")");
    }

    if let Some(name) = &filter.name {
        w.next()
            .push("name LIKE ")
            .push_bind(contains_pattern(name.as_str()))
            .push(LIKE_ESCAPE);
    }

    if let Some(price) = filter.price {
        w.next().push("price = ").push_bind(price.cents());
    }
}

/// Products in SQLite.
#[derive(Clone)]
pub struct ProductStore {
    conn: Conn,
}

impl ProductStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self {
            conn: Conn::Pool(pool),
        }
    }

    pub fn in_transaction(&self) -> bool {
        self.conn.is_tx()
    }

    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        debug!(product_id = %product.id, name = %product.name, "Inserting product");

        let mut conn = self.conn.acquire().await?;
        sqlx::query(
            r#"
            INSERT INTO products (product_id, name, price, date_created, date_updated)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(product.id.to_string())
        .bind(product.name.as_str())
        .bind(product.price.cents())
        .bind(product.date_created)
        .bind(product.date_updated)
        .execute(&mut *conn)
        .await?;

        Ok(())
    }

    pub async fn update_row(&self, product: &Product) -> DbResult<()> {
        debug!(product_id = %product.id, "Updating product");

        let mut conn = self.conn.acquire().await?;
        let result = sqlx::query(
            r#"
            UPDATE products
            SET name = ?2, price = ?3, date_updated = ?4
            WHERE product_id = ?1
            "#,
        )
        .bind(product.id.to_string())
        .bind(product.name.as_str())
        .bind(product.price.cents())
        .bind(product.date_updated)
        .execute(&mut *conn)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, product.id));
        }
        Ok(())
    }

    pub async fn delete_row(&self, product_id: Uuid) -> DbResult<()> {
        debug!(product_id = %product_id, "Deleting product");

        let mut conn = self.conn.acquire().await?;
        let result = sqlx::query("DELETE FROM products WHERE product_id = ?1")
            .bind(product_id.to_string())
            .execute(&mut *conn)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found(ENTITY, product_id));
        }
        Ok(())
    }

    pub async fn select(
        &self,
        filter: &ProductFilter,
        order_by: &OrderBy<ProductOrderField>,
        page: &Page,
    ) -> DbResult<Vec<Product>> {
        let mut qb = QueryBuilder::<Sqlite>::new(SELECT);
        push_filter(&mut qb, filter);
        push_order_and_page(
            &mut qb,
            order_column(order_by.field),
            "product_id",
            order_by.direction,
            page,
        );

        let mut conn = self.conn.acquire().await?;
        let rows: Vec<ProductRow> = qb.build_query_as().fetch_all(&mut *conn).await?;

        debug!(count = rows.len(), "Product query returned rows");
        rows.into_iter().map(Product::try_from).collect()
    }

    pub async fn count_rows(&self, filter: &ProductFilter) -> DbResult<usize> {
        let mut qb = QueryBuilder::<Sqlite>::new("SELECT COUNT(*) FROM products");
        push_filter(&mut qb, filter);

        let mut conn = self.conn.acquire().await?;
        let count: i64 = qb.build_query_scalar().fetch_one(&mut *conn).await?;
        Ok(count as usize)
    }

    pub async fn get_by_id(&self, product_id: Uuid) -> DbResult<Product> {
        let mut conn = self.conn.acquire().await?;
        let row: Option<ProductRow> = sqlx::query_as(&format!("{SELECT} WHERE product_id = ?1"))
            .bind(product_id.to_string())
            .fetch_optional(&mut *conn)
            .await?;

        row.ok_or_else(|| DbError::not_found(ENTITY, product_id))?
            .try_into()
    }
}

#[async_trait]
impl ProductStorer for ProductStore {
    fn with_tx(&self, tx: &TransactionHandle) -> StoreResult<Arc<dyn ProductStorer>> {
        Ok(Arc::new(ProductStore {
            conn: Conn::bind(tx)?,
        }))
    }

    async fn create(&self, ctx: &Ctx, product: &Product) -> StoreResult<()> {
        ctx.err()?;
        Ok(self.insert(product).await?)
    }

    async fn update(&self, ctx: &Ctx, product: &Product) -> StoreResult<()> {
        ctx.err()?;
        Ok(self.update_row(product).await?)
    }

    async fn delete(&self, ctx: &Ctx, product: &Product) -> StoreResult<()> {
        ctx.err()?;
        Ok(self.delete_row(product.id).await?)
    }

    async fn query(
        &self,
        ctx: &Ctx,
        filter: &ProductFilter,
        order_by: &OrderBy<ProductOrderField>,
        page: &Page,
    ) -> StoreResult<Vec<Product>> {
        ctx.err()?;
        Ok(self.select(filter, order_by, page).await?)
    }

    async fn count(&self, ctx: &Ctx, filter: &ProductFilter) -> StoreResult<usize> {
        ctx.err()?;
        Ok(self.count_rows(filter).await?)
    }

    async fn query_by_id(&self, ctx: &Ctx, product_id: Uuid) -> StoreResult<Product> {
        ctx.err()?;
        Ok(self.get_by_id(product_id).await?)
    }
}
