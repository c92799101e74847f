//! # Product Domain Service

use crate::config::{OrderingConfig, QueryConfig};
use crate::context::Ctx;
use crate::domain::{parse_order, parse_page};
use crate::error::{BusError, BusResult, StoreError, StoreResult};
use crate::tx::TransactionHandle;
use async_trait::async_trait;
use chrono::Utc;
use orderly_core::filter::{ProductFilter, ProductQueryParams};
use orderly_core::order::ProductOrderField;
use orderly_core::{NewProduct, OrderBy, Page, PageLimits, Product, QueryResult, UpdateProduct};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// Persistence the product service needs.
#[async_trait]
pub trait ProductStorer: Send + Sync {
    fn with_tx(&self, tx: &TransactionHandle) -> StoreResult<Arc<dyn ProductStorer>>;

    async fn create(&self, ctx: &Ctx, product: &Product) -> StoreResult<()>;

    async fn update(&self, ctx: &Ctx, product: &Product) -> StoreResult<()>;

    async fn delete(&self, ctx: &Ctx, product: &Product) -> StoreResult<()>;

    async fn query(
        &self,
        ctx: &Ctx,
        filter: &ProductFilter,
        order_by: &OrderBy<ProductOrderField>,
        page: &Page,
    ) -> StoreResult<Vec<Product>>;

    async fn count(&self, ctx: &Ctx, filter: &ProductFilter) -> StoreResult<usize>;

    async fn query_by_id(&self, ctx: &Ctx, product_id: Uuid) -> StoreResult<Product>;
}

/// Product operations.
#[derive(Clone)]
pub struct ProductBusiness {
    storer: Arc<dyn ProductStorer>,
    query: QueryConfig<ProductOrderField>,
}

impl ProductBusiness {
    pub fn new(
        storer: Arc<dyn ProductStorer>,
        ordering: OrderingConfig<ProductOrderField>,
    ) -> Self {
        Self {
            storer,
            query: ordering.into(),
        }
    }

    pub fn with_page_limits(mut self, limits: PageLimits) -> Self {
        self.query.page_limits = limits;
        self
    }

    pub fn with_tx(&self, tx: &TransactionHandle) -> BusResult<ProductBusiness> {
        let storer = self
            .storer
            .with_tx(tx)
            .map_err(|e| BusError::store("product: bind transaction", e))?;

        Ok(ProductBusiness {
            storer,
            query: self.query.clone(),
        })
    }

    pub fn default_order(&self) -> OrderBy<ProductOrderField> {
        self.query.ordering.default
    }

    pub fn parse_order(&self, raw: Option<&str>) -> BusResult<OrderBy<ProductOrderField>> {
        parse_order(&self.query.ordering, raw)
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn create(&self, ctx: &Ctx, np: NewProduct) -> BusResult<Product> {
        let now = Utc::now();
        let product = Product {
            id: Uuid::new_v4(),
            name: np.name,
            price: np.price,
            date_created: now,
            date_updated: now,
        };

        ctx.run(self.storer.create(ctx, &product))
            .await
            .map_err(|e| BusError::store("create product", e))?;

        debug!(product_id = %product.id, name = %product.name, "Product created");
        Ok(product)
    }

    /// Applies the provided fields and bumps `date_updated`.
    #[tracing::instrument(skip(self, ctx, product), fields(product_id = %product.id))]
    pub async fn update(&self, ctx: &Ctx, product: Product, up: UpdateProduct) -> BusResult<Product> {
        let product = product.apply(up, Utc::now());

        match ctx.run(self.storer.update(ctx, &product)).await {
            Ok(()) => Ok(product),
            Err(StoreError::NotFound { .. }) => Err(BusError::NotFound {
                entity: "product",
                id: product.id.to_string(),
            }),
            Err(e) => Err(BusError::store(format!("update product[{}]", product.id), e)),
        }
    }

    #[tracing::instrument(skip(self, ctx, product), fields(product_id = %product.id))]
    pub async fn delete(&self, ctx: &Ctx, product: &Product) -> BusResult<()> {
        match ctx.run(self.storer.delete(ctx, product)).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { .. }) => Err(BusError::NotFound {
                entity: "product",
                id: product.id.to_string(),
            }),
            Err(e) => Err(BusError::store(format!("delete product[{}]", product.id), e)),
        }
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn query(
        &self,
        ctx: &Ctx,
        filter: &ProductFilter,
        order_by: &OrderBy<ProductOrderField>,
        page: &Page,
    ) -> BusResult<Vec<Product>> {
        ctx.run(self.storer.query(ctx, filter, order_by, page))
            .await
            .map_err(|e| BusError::store("query products", e))
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn count(&self, ctx: &Ctx, filter: &ProductFilter) -> BusResult<usize> {
        ctx.run(self.storer.count(ctx, filter))
            .await
            .map_err(|e| BusError::store("count products", e))
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn query_by_id(&self, ctx: &Ctx, product_id: Uuid) -> BusResult<Product> {
        match ctx.run(self.storer.query_by_id(ctx, product_id)).await {
            Ok(product) => Ok(product),
            Err(StoreError::NotFound { .. }) => Err(BusError::NotFound {
                entity: "product",
                id: product_id.to_string(),
            }),
            Err(e) => Err(BusError::store(format!("query product[{product_id}]"), e)),
        }
    }

    pub async fn search(
        &self,
        ctx: &Ctx,
        params: &ProductQueryParams,
    ) -> BusResult<QueryResult<Product>> {
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
