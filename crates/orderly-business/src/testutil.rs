//! Fixture generators and seeders for tests and the seed binary.
//!
//! Values are deterministic; a process-wide counter keeps names and emails
//! unique across calls so repeated seeding never collides.

use crate::context::Ctx;
use crate::domain::product::ProductBusiness;
use crate::domain::sale::SaleBusiness;
use crate::domain::user::UserBusiness;
use crate::error::BusResult;
use orderly_core::{
    Email, Money, Name, NewProduct, NewSale, NewSaleItem, NewUser, Product, Role, Sale, User,
};
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

static NEXT: AtomicU64 = AtomicU64::new(1000);

fn next_idx(n: usize) -> u64 {
    NEXT.fetch_add(n as u64, Ordering::Relaxed)
}

// =============================================================================
// Products
// =============================================================================

/// `n` products named `Name<idx>`, priced between 1.00 and 500.00.
pub fn generate_new_products(n: usize) -> Vec<NewProduct> {
    let start = next_idx(n);
    (start..start + n as u64)
        .map(|idx| NewProduct {
            name: Name::must_parse(&format!("Name{idx}")),
            price: Money::must_parse((idx % 500 + 1) as f64),
        })
        .collect()
}

pub async fn seed_products(ctx: &Ctx, n: usize, bus: &ProductBusiness) -> BusResult<Vec<Product>> {
    let mut products = Vec::with_capacity(n);
    for np in generate_new_products(n) {
        products.push(bus.create(ctx, np).await?);
    }
    Ok(products)
}

// =============================================================================
// Users
// =============================================================================

pub fn generate_new_users(n: usize, role: Role) -> Vec<NewUser> {
    let start = next_idx(n);
    (start..start + n as u64)
        .map(|idx| NewUser {
            name: Name::must_parse(&format!("Name{idx}")),
            email: Email::must_parse(&format!("user{idx}@example.com")),
            roles: vec![role],
        })
        .collect()
}

pub async fn seed_users(
    ctx: &Ctx,
    n: usize,
    role: Role,
    bus: &UserBusiness,
) -> BusResult<Vec<User>> {
    let mut users = Vec::with_capacity(n);
    for nu in generate_new_users(n, role) {
        users.push(bus.create(ctx, nu).await?);
    }
    Ok(users)
}

// =============================================================================
// Sales
// =============================================================================

/// One item of quantity 1 per product, at the product's current price.
pub fn sale_items(products: &[Product]) -> Vec<NewSaleItem> {
    products
        .iter()
        .map(|p| NewSaleItem {
            product_id: p.id,
            quantity: 1,
            price: p.price,
        })
        .collect()
}

/// `n` sales of `items`, discounts between 0.00 and 9.00 capped at the
/// sale amount.
pub fn generate_sales(n: usize, user_id: Uuid, items: &[NewSaleItem]) -> Vec<NewSale> {
    let amount: i64 = items
        .iter()
        .map(|i| i.price.cents().saturating_mul(i.quantity))
        .sum();

    let start = next_idx(n);
    (start..start + n as u64)
        .map(|idx| {
            let cents = ((idx % 10) as i64 * 100).min(amount).max(0);
            NewSale {
                user_id,
                discount: Money::try_from_cents(cents).unwrap_or_default(),
                items: items.to_vec(),
            }
        })
        .collect()
}

pub async fn seed_sales(
    ctx: &Ctx,
    n: usize,
    user_id: Uuid,
    items: &[NewSaleItem],
    bus: &SaleBusiness,
) -> BusResult<Vec<Sale>> {
    let mut sales = Vec::with_capacity(n);
    for ns in generate_sales(n, user_id, items) {
        sales.push(bus.create(ctx, ns).await?);
    }
    Ok(sales)
}
