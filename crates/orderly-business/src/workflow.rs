//! # Sale Workflow
//!
//! Request-level operations that span several Domain Services.
//!
//! ## Create Sale
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  NewSaleRequest { discount, items: [(product_id, quantity)] }          │
//! │     │                                                                   │
//! │     ├── parse discount and product ids      (FieldErrors on failure)   │
//! │     │                                                                   │
//! │     └── UnitOfWork ─────────────────────────────────────────────┐      │
//! │           ├── user.query_by_id(user_id)          NotFound ──► Err      │
//! │           ├── product.query(ids ∈ request)                      │      │
//! │           ├── unknown ids ──► FieldErrors("product_ids")        │      │
//! │           ├── NewSale with price snapshots                      │      │
//! │           └── sale.create(NewSale)                              │      │
//! │                                                  commit / rollback     │
//! │     ▼                                                                   │
//! │  SaleView { customer, items with product names }                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::context::Ctx;
use crate::coordinator::{Domains, UnitOfWork};
use crate::domain::product::ProductBusiness;
use crate::error::{BusError, BusResult};
use crate::tx::Beginner;
use chrono::{DateTime, Utc};
use orderly_core::filter::{ProductFilter, SaleQueryParams};
use orderly_core::validation::parse_uuid;
use orderly_core::{
    FieldErrors, Money, NewSale, NewSaleItem, Page, Product, QueryResult, Sale, User,
    MAX_SALE_ITEMS,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

// =============================================================================
// Request / View Types
// =============================================================================

/// A sale as a client submits it: products by id, prices resolved here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSaleRequest {
    #[serde(default)]
    pub discount: f64,
    pub items: Vec<NewSaleItemRequest>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSaleItemRequest {
    pub product_id: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleViewItem {
    /// Product id.
    pub id: Uuid,
    pub name: String,
    pub unit_price: Money,
    pub quantity: i64,
    pub amount: Money,
    #[serde(deserialize_with = "orderly_core::money::deserialize_signed")]
    pub discount: Money,
}

/// A sale with its customer and product names filled in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleView {
    pub id: Uuid,
    pub customer: Customer,
    pub amount: Money,
    pub discount: Money,
    pub items: Vec<SaleViewItem>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl SaleView {
    /// Products missing from `products` get an empty name.
    pub fn new(sale: &Sale, user: &User, products: &HashMap<Uuid, Product>) -> SaleView {
        SaleView {
            id: sale.id,
            customer: Customer {
                id: user.id,
                name: user.name.to_string(),
                email: user.email.to_string(),
            },
            amount: sale.amount,
            discount: sale.discount,
            items: sale
                .items
                .iter()
                .map(|item| SaleViewItem {
                    id: item.product_id,
                    name: products
                        .get(&item.product_id)
                        .map(|p| p.name.to_string())
                        .unwrap_or_default(),
                    unit_price: item.unit_price,
                    quantity: item.quantity,
                    amount: item.amount,
                    discount: item.discount,
                })
                .collect(),
            created_at: sale.created_at,
            updated_at: sale.updated_at,
        }
    }
}

// =============================================================================
// Workflow
// =============================================================================

/// Sale operations at the request level.
#[derive(Clone)]
pub struct SaleWorkflow {
    domains: Domains,
    uow: UnitOfWork,
}

impl SaleWorkflow {
    pub fn new(domains: Domains, beginner: Arc<dyn Beginner>) -> Self {
        Self {
            domains,
            uow: UnitOfWork::new(beginner),
        }
    }

    /// Creates a sale for `user_id` inside one transaction.
    #[tracing::instrument(skip(self, ctx, req), fields(items = req.items.len()))]
    pub async fn create_sale(
        &self,
        ctx: &Ctx,
        user_id: Uuid,
        req: NewSaleRequest,
    ) -> BusResult<SaleView> {
        let (discount, lines) = parse_request(&req)?;

        let view = self
            .uow
            .run(ctx, &self.domains, |ctx, d| async move {
                let user = d.user.query_by_id(&ctx, user_id).await?;

                let ids: Vec<Uuid> = unique(lines.iter().map(|(id, _)| *id));
                let products = load_products(&ctx, &d.product, &ids).await?;

                let missing: Vec<String> = ids
                    .iter()
                    .filter(|id| !products.contains_key(id))
                    .map(Uuid::to_string)
                    .collect();
                if !missing.is_empty() {
                    return Err(BusError::from(FieldErrors::single(
                        "product_ids",
                        format!("products not found: {}", missing.join(", ")),
                    )));
                }

                let ns = NewSale {
                    user_id,
                    discount,
                    items: lines
                        .iter()
                        .map(|(product_id, quantity)| NewSaleItem {
                            product_id: *product_id,
                            quantity: *quantity,
                            price: products[product_id].price,
                        })
                        .collect(),
                };

                let sale = d.sale.create(&ctx, ns).await?;
                Ok::<_, BusError>(SaleView::new(&sale, &user, &products))
            })
            .await?;

        info!(sale_id = %view.id, %user_id, "Sale recorded");
        Ok(view)
    }

    /// Deletes a sale and its items inside one transaction.
    #[tracing::instrument(skip(self, ctx))]
    pub async fn delete_sale(&self, ctx: &Ctx, sale_id: Uuid) -> BusResult<()> {
        self.uow
            .run(ctx, &self.domains, |ctx, d| async move {
                let sale = d.sale.query_by_id(&ctx, sale_id).await?;
                d.sale.delete(&ctx, &sale).await
            })
            .await
    }

    /// Reads a page of sales with customers and product names.
    pub async fn query_sales(
        &self,
        ctx: &Ctx,
        params: &SaleQueryParams,
    ) -> BusResult<QueryResult<SaleView>> {
        let result = self.domains.sale.search(ctx, params).await?;

        let mut users: HashMap<Uuid, User> = HashMap::new();
        for user_id in unique(result.items.iter().map(|s| s.user_id)) {
            let user = self.domains.user.query_by_id(ctx, user_id).await?;
            users.insert(user_id, user);
        }

        let product_ids = unique(
            result
                .items
                .iter()
                .flat_map(|s| s.items.iter().map(|i| i.product_id)),
        );
        let products = load_products(ctx, &self.domains.product, &product_ids).await?;

        let mut views = Vec::with_capacity(result.items.len());
        for sale in &result.items {
            let user = users.get(&sale.user_id).ok_or_else(|| BusError::NotFound {
                entity: "user",
                id: sale.user_id.to_string(),
            })?;
            views.push(SaleView::new(sale, user, &products));
        }

        Ok(QueryResult {
            items: views,
            total: result.total,
            page: result.page,
            rows_per_page: result.rows_per_page,
        })
    }
}

// =============================================================================
// Helpers
// =============================================================================

/// Parses the discount and product ids, collecting every bad field.
fn parse_request(req: &NewSaleRequest) -> Result<(Money, Vec<(Uuid, i64)>), FieldErrors> {
    let mut errs = FieldErrors::new();

    let discount = match Money::parse(req.discount) {
        Ok(discount) => discount,
        Err(e) => {
            errs.add("discount", e);
            Money::zero()
        }
    };

    if req.items.is_empty() {
        errs.add("items", "at least one item is required");
    }
    if req.items.len() > MAX_SALE_ITEMS {
        errs.add("items", format!("at most {MAX_SALE_ITEMS} items are allowed"));
    }

    let mut lines = Vec::with_capacity(req.items.len());
    for (idx, item) in req.items.iter().enumerate() {
        let field = format!("items[{idx}].productId");
        match parse_uuid(&field, &item.product_id) {
            Ok(id) => lines.push((id, item.quantity)),
            Err(e) => errs.add(field, e),
        }
    }

    errs.into_result().map(|_| (discount, lines))
}

/// Distinct values, in first-seen order.
fn unique(ids: impl Iterator<Item = Uuid>) -> Vec<Uuid> {
    let mut seen = BTreeSet::new();
    ids.filter(|id| seen.insert(*id)).collect()
}

/// Loads products by id, one page of at most 100 ids at a time.
async fn load_products(
    ctx: &Ctx,
    product: &ProductBusiness,
    ids: &[Uuid],
) -> BusResult<HashMap<Uuid, Product>> {
    let page = Page::parse(Some("1"), Some("100"))?;
    let order_by = product.default_order();

    let mut products = HashMap::with_capacity(ids.len());
    for chunk in ids.chunks(page.rows_per_page() as usize) {
        let filter = ProductFilter {
            ids: Some(chunk.to_vec()),
            ..Default::default()
        };
        for p in product.query(ctx, &filter, &order_by, &page).await? {
            products.insert(p.id, p);
        }
    }
    Ok(products)
}
