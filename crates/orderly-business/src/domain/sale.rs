//! # Sale Domain Service
//!
//! Creating a sale turns a [`NewSale`] (product snapshots + aggregate
//! discount) into a persisted [`Sale`] whose items carry their share of the
//! discount.
//!
//! ## Create Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewSale                                                                │
//! │     │                                                                   │
//! │     ├── validate item count and quantities                             │
//! │     ├── allocate()  ─► amounts, discount shares   (orderly-core)       │
//! │     │      └── ZeroSaleAmount / DiscountExceedsAmount / ... ──► Err     │
//! │     ├── build Sale + SaleItems (one id, one timestamp)                 │
//! │     └── SaleStorer::create  (sale and items in one call)               │
//! │                                                                         │
//! │  Nothing reaches the store unless every check passed.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::config::{OrderingConfig, QueryConfig};
use crate::context::Ctx;
use crate::domain::{parse_order, parse_page};
use crate::error::{BusError, BusResult, StoreError, StoreResult};
use crate::tx::TransactionHandle;
use async_trait::async_trait;
use chrono::Utc;
use orderly_core::allocation::{allocate, AllocationInput};
use orderly_core::filter::{SaleFilter, SaleQueryParams};
use orderly_core::order::SaleOrderField;
use orderly_core::validation::{validate_quantity, validate_sale_size};
use orderly_core::{NewSale, OrderBy, Page, PageLimits, QueryResult, Sale, SaleItem};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

// =============================================================================
// Storer
// =============================================================================

/// Persistence the sale service needs.
///
/// `create` stores the sale and all of its items atomically; `delete`
/// removes both. Missing rows are [`StoreError::NotFound`].
#[async_trait]
pub trait SaleStorer: Send + Sync {
    /// A storer that runs every call inside `tx`.
    fn with_tx(&self, tx: &TransactionHandle) -> StoreResult<Arc<dyn SaleStorer>>;

    async fn create(&self, ctx: &Ctx, sale: &Sale) -> StoreResult<()>;

    async fn delete(&self, ctx: &Ctx, sale: &Sale) -> StoreResult<()>;

    async fn query(
        &self,
        ctx: &Ctx,
        filter: &SaleFilter,
        order_by: &OrderBy<SaleOrderField>,
        page: &Page,
    ) -> StoreResult<Vec<Sale>>;

    async fn count(&self, ctx: &Ctx, filter: &SaleFilter) -> StoreResult<usize>;

    async fn query_by_id(&self, ctx: &Ctx, sale_id: Uuid) -> StoreResult<Sale>;
}

// =============================================================================
// Business
// =============================================================================

/// Sale operations.
#[derive(Clone)]
pub struct SaleBusiness {
    storer: Arc<dyn SaleStorer>,
    query: QueryConfig<SaleOrderField>,
}

impl SaleBusiness {
    pub fn new(storer: Arc<dyn SaleStorer>, ordering: OrderingConfig<SaleOrderField>) -> Self {
        Self {
            storer,
            query: ordering.into(),
        }
    }

    pub fn with_page_limits(mut self, limits: PageLimits) -> Self {
        self.query.page_limits = limits;
        self
    }

    /// A copy of this service bound to `tx`.
    pub fn with_tx(&self, tx: &TransactionHandle) -> BusResult<SaleBusiness> {
        let storer = self
            .storer
            .with_tx(tx)
            .map_err(|e| BusError::store("sale: bind transaction", e))?;

        Ok(SaleBusiness {
            storer,
            query: self.query.clone(),
        })
    }

    pub fn default_order(&self) -> OrderBy<SaleOrderField> {
        self.query.ordering.default
    }

    pub fn parse_order(&self, raw: Option<&str>) -> BusResult<OrderBy<SaleOrderField>> {
        parse_order(&self.query.ordering, raw)
    }

    pub fn page_limits(&self) -> PageLimits {
        self.query.page_limits
    }

    /// Validates, allocates the discount and persists a new sale.
    #[tracing::instrument(skip(self, ctx, ns), fields(user_id = %ns.user_id, items = ns.items.len()))]
    pub async fn create(&self, ctx: &Ctx, ns: NewSale) -> BusResult<Sale> {
        validate_sale_size(ns.items.len())?;
        for item in &ns.items {
            validate_quantity(item.quantity)?;
        }

        let inputs: Vec<AllocationInput> = ns
            .items
            .iter()
            .map(|item| AllocationInput {
                quantity: item.quantity,
                unit_price: item.price,
            })
            .collect();
        let split = allocate(&inputs, ns.discount)?;

        let now = Utc::now();
        let sale_id = Uuid::new_v4();

        let items = ns
            .items
            .iter()
            .zip(split.items)
            .map(|(item, value)| SaleItem {
                sale_id,
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price: item.price,
                amount: value.amount,
                discount: value.discount,
                created_at: now,
                updated_at: now,
            })
            .collect();

        let sale = Sale {
            id: sale_id,
            user_id: ns.user_id,
            discount: split.discount,
            amount: split.amount,
            items,
            created_at: now,
            updated_at: now,
        };

        ctx.run(self.storer.create(ctx, &sale))
            .await
            .map_err(|e| BusError::store("create sale", e))?;

        debug!(sale_id = %sale.id, amount = %sale.amount, discount = %sale.discount, "Sale created");
        Ok(sale)
    }

    #[tracing::instrument(skip(self, ctx, sale), fields(sale_id = %sale.id))]
    pub async fn delete(&self, ctx: &Ctx, sale: &Sale) -> BusResult<()> {
        match ctx.run(self.storer.delete(ctx, sale)).await {
            Ok(()) => Ok(()),
            Err(StoreError::NotFound { .. }) => Err(BusError::NotFound {
                entity: "sale",
                id: sale.id.to_string(),
            }),
            Err(e) => Err(BusError::store(format!("delete sale[{}]", sale.id), e)),
        }
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn query(
        &self,
        ctx: &Ctx,
        filter: &SaleFilter,
        order_by: &OrderBy<SaleOrderField>,
        page: &Page,
    ) -> BusResult<Vec<Sale>> {
        ctx.run(self.storer.query(ctx, filter, order_by, page))
            .await
            .map_err(|e| BusError::store("query sales", e))
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn count(&self, ctx: &Ctx, filter: &SaleFilter) -> BusResult<usize> {
        ctx.run(self.storer.count(ctx, filter))
            .await
            .map_err(|e| BusError::store("count sales", e))
    }

    #[tracing::instrument(skip(self, ctx))]
    pub async fn query_by_id(&self, ctx: &Ctx, sale_id: Uuid) -> BusResult<Sale> {
        match ctx.run(self.storer.query_by_id(ctx, sale_id)).await {
            Ok(sale) => Ok(sale),
            Err(StoreError::NotFound { .. }) => Err(BusError::NotFound {
                entity: "sale",
                id: sale_id.to_string(),
            }),
            Err(e) => Err(BusError::store(format!("query sale[{sale_id}]"), e)),
        }
    }

    /// Parses raw query parameters, then runs `query` and `count`.
    pub async fn search(&self, ctx: &Ctx, params: &SaleQueryParams) -> BusResult<QueryResult<Sale>> {
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

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::CtxError;
    use crate::error::ErrorKind;
    use crate::fakes::MemSaleStore;
    use orderly_core::{CoreError, Money, NewSaleItem};

    fn business(store: &MemSaleStore) -> SaleBusiness {
        SaleBusiness::new(Arc::new(store.clone()), OrderingConfig::default())
    }

    fn new_sale(lines: &[(i64, f64)], discount: f64) -> NewSale {
        NewSale {
            user_id: Uuid::new_v4(),
            discount: Money::must_parse(discount),
            items: lines
                .iter()
                .map(|(quantity, price)| NewSaleItem {
                    product_id: Uuid::new_v4(),
                    quantity: *quantity,
                    price: Money::must_parse(*price),
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_create_allocates_and_persists() {
        let store = MemSaleStore::new();
        let bus = business(&store);
        let ns = new_sale(&[(1, 10.34), (2, 5.00)], 3.00);

        let sale = bus.create(&Ctx::new(), ns.clone()).await.unwrap();

        assert_eq!(sale.amount.cents(), 2034);
        assert_eq!(sale.discount.cents(), 300);
        assert!(sale.totals_match());

        let shares: Vec<i64> = sale.items.iter().map(|i| i.discount.cents()).collect();
        assert_eq!(shares, vec![153, 147]);

        for (item, input) in sale.items.iter().zip(&ns.items) {
            assert_eq!(item.sale_id, sale.id);
            assert_eq!(item.product_id, input.product_id);
            assert_eq!(item.unit_price, input.price);
            assert_eq!(item.created_at, sale.created_at);
        }

        assert_eq!(store.calls(), 1);
        assert_eq!(store.rows(), vec![sale]);
    }

    #[tokio::test]
    async fn test_discount_exceeding_amount_never_reaches_store() {
        let store = MemSaleStore::new();
        let err = business(&store)
            .create(&Ctx::new(), new_sale(&[(1, 10.34), (2, 5.00)], 30.00))
            .await
            .unwrap_err();

        assert!(matches!(err, BusError::Core(CoreError::DiscountExceedsAmount { .. })));
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_zero_amount_never_reaches_store() {
        let store = MemSaleStore::new();
        let err = business(&store)
            .create(&Ctx::new(), new_sale(&[(2, 0.0)], 0.0))
            .await
            .unwrap_err();

        assert!(matches!(err, BusError::Core(CoreError::ZeroSaleAmount)));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_invalid_quantity_rejected() {
        let store = MemSaleStore::new();
        let bus = business(&store);

        let err = bus
            .create(&Ctx::new(), new_sale(&[(0, 1.00)], 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::Validation(_)));

        let err = bus
            .create(&Ctx::new(), new_sale(&[(101, 1.00)], 0.0))
            .await
            .unwrap_err();
        assert!(matches!(err, BusError::Validation(_)));

        let err = bus.create(&Ctx::new(), new_sale(&[], 0.0)).await.unwrap_err();
        assert!(matches!(err, BusError::Validation(_)));

        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_context_stops_before_store() {
        let store = MemSaleStore::new();
        let ctx = Ctx::new();
        ctx.cancel();

        let err = business(&store)
            .create(&ctx, new_sale(&[(1, 1.00)], 0.0))
            .await
            .unwrap_err();

        assert!(matches!(err, BusError::Cancelled(CtxError::Canceled)));
        assert_eq!(store.calls(), 0);
    }

    #[tokio::test]
    async fn test_store_errors_are_wrapped() {
        let store = MemSaleStore::failing();
        let err = business(&store)
            .create(&Ctx::new(), new_sale(&[(1, 1.00)], 0.0))
            .await
            .unwrap_err();

        assert!(err.to_string().starts_with("create sale: "));
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[tokio::test]
    async fn test_query_by_id_and_delete() {
        let store = MemSaleStore::new();
        let bus = business(&store);
        let ctx = Ctx::new();

        let sale = bus.create(&ctx, new_sale(&[(1, 2.50)], 0.50)).await.unwrap();
        assert_eq!(bus.query_by_id(&ctx, sale.id).await.unwrap(), sale);

        bus.delete(&ctx, &sale).await.unwrap();

        let err = bus.query_by_id(&ctx, sale.id).await.unwrap_err();
        assert!(matches!(err, BusError::NotFound { entity: "sale", .. }));

        let err = bus.delete(&ctx, &sale).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_search() {
        let store = MemSaleStore::new();
        let bus = business(&store);
        let ctx = Ctx::new();

        let mut created = Vec::new();
        for price in [3.00, 1.00, 2.00] {
            created.push(bus.create(&ctx, new_sale(&[(1, price)], 0.0)).await.unwrap());
        }

        let params = SaleQueryParams {
            page: Some("1".to_string()),
            rows: Some("2".to_string()),
            order_by: Some("amount,DESC".to_string()),
            ..Default::default()
        };
        let result = bus.search(&ctx, &params).await.unwrap();

        assert_eq!(result.total, 3);
        assert_eq!(result.rows_per_page, 2);
        let amounts: Vec<i64> = result.items.iter().map(|s| s.amount.cents()).collect();
        assert_eq!(amounts, vec![300, 200]);

        let params = SaleQueryParams {
            user_id: Some(created[1].user_id.to_string()),
            ..Default::default()
        };
        let result = bus.search(&ctx, &params).await.unwrap();
        assert_eq!(result.total, 1);
        assert_eq!(result.items[0].id, created[1].id);

        let params = SaleQueryParams {
            order_by: Some("bogus,ASC".to_string()),
            ..Default::default()
        };
        let err = bus.search(&ctx, &params).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
