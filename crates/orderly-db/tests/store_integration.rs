//! SQLite store integration tests
//!
//! Each test gets its own in-memory database and drives the stores through
//! the Domain Services, the way a request would.
//!
//! ```bash
//! cargo test -p orderly-db --test store_integration
//! ```

use orderly_business::{BusError, Ctx, Domains, ErrorKind};
use orderly_core::filter::{ProductQueryParams, SaleQueryParams, UserQueryParams};
use orderly_core::{
    Email, Money, Name, NewProduct, NewSale, NewSaleItem, NewUser, Product, Role, UpdateProduct,
    UpdateUser, User, ValidationError,
};
use orderly_db::{Database, DbConfig};

async fn setup() -> (Database, Domains) {
    let db = Database::new(DbConfig::in_memory()).await.unwrap();
    let domains = db.domains();
    (db, domains)
}

async fn product(d: &Domains, name: &str, price: f64) -> Product {
    d.product
        .create(
            &Ctx::new(),
            NewProduct {
                name: Name::must_parse(name),
                price: Money::must_parse(price),
            },
        )
        .await
        .unwrap()
}

async fn user(d: &Domains, name: &str, email: &str) -> User {
    d.user
        .create(
            &Ctx::new(),
            NewUser {
                name: Name::must_parse(name),
                email: Email::must_parse(email),
                roles: vec![Role::User],
            },
        )
        .await
        .unwrap()
}

async fn table_count(db: &Database, table: &str) -> i64 {
    sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {table}"))
        .fetch_one(db.pool())
        .await
        .unwrap()
}

// =============================================================================
// Products
// =============================================================================

#[tokio::test]
async fn test_product_crud() {
    let (_db, d) = setup().await;
    let ctx = Ctx::new();

    let created = product(&d, "Notebook", 10.34).await;
    let loaded = d.product.query_by_id(&ctx, created.id).await.unwrap();
    assert_eq!(loaded.name, created.name);
    assert_eq!(loaded.price.cents(), 1034);
    assert_eq!(loaded.date_created, created.date_created);

    let updated = d
        .product
        .update(
            &ctx,
            loaded,
            UpdateProduct {
                name: Some(Name::must_parse("Spiral Notebook")),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let loaded = d.product.query_by_id(&ctx, created.id).await.unwrap();
    assert_eq!(loaded.name.as_str(), "Spiral Notebook");
    assert_eq!(loaded.price.cents(), 1034);

    d.product.delete(&ctx, &updated).await.unwrap();
    let err = d.product.query_by_id(&ctx, created.id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);

    let err = d.product.delete(&ctx, &updated).await.unwrap_err();
    assert!(matches!(err, BusError::NotFound { entity: "product", .. }));
}

#[tokio::test]
async fn test_product_filter_order_and_page() {
    let (_db, d) = setup().await;
    let ctx = Ctx::new();

    let pen = product(&d, "Blue Pen", 1.50).await;
    let pencil = product(&d, "Red Pencil", 0.75).await;
    let ruler = product(&d, "Ruler", 3.00).await;
    let eraser = product(&d, "Eraser", 0.50).await;
    let _stapler = product(&d, "Stapler", 12.00).await;

    // price DESC, second page of two
    let params = ProductQueryParams {
        page: Some("2".to_string()),
        rows: Some("2".to_string()),
        order_by: Some("price,DESC".to_string()),
        ..Default::default()
    };
    let result = d.product.search(&ctx, &params).await.unwrap();
    assert_eq!(result.total, 5);
    assert_eq!(result.page, 2);
    let ids: Vec<_> = result.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![pen.id, pencil.id]);

    // several ids, default order
    let params = ProductQueryParams {
        product_ids: Some(format!("{},{},{}", ruler.id, eraser.id, pen.id)),
        order_by: Some("price,ASC".to_string()),
        ..Default::default()
    };
    let result = d.product.search(&ctx, &params).await.unwrap();
    let ids: Vec<_> = result.items.iter().map(|p| p.id).collect();
    assert_eq!(ids, vec![eraser.id, pen.id, ruler.id]);

    // substring name
    let params = ProductQueryParams {
        name: Some("Pen".to_string()),
        ..Default::default()
    };
    assert_eq!(d.product.search(&ctx, &params).await.unwrap().total, 2);

    // exact price
    let params = ProductQueryParams {
        price: Some("3.00".to_string()),
        ..Default::default()
    };
    let result = d.product.search(&ctx, &params).await.unwrap();
    assert_eq!(result.items.len(), 1);
    assert_eq!(result.items[0].id, ruler.id);
}

#[tokio::test]
async fn test_name_filter_matches_wildcards_literally() {
    let (_db, d) = setup().await;
    let ctx = Ctx::new();

    let underscore = product(&d, "Part a_c", 1.00).await;
    let _plain = product(&d, "Part abc", 1.00).await;
    let percent = product(&d, "Promo 50%", 1.00).await;
    let _fifty = product(&d, "Promo 500", 1.00).await;

    let search = |name: &str| ProductQueryParams {
        name: Some(name.to_string()),
        ..Default::default()
    };

    let result = d.product.search(&ctx, &search("a_c")).await.unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.items[0].id, underscore.id);

    let result = d.product.search(&ctx, &search("50%")).await.unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.items[0].id, percent.id);

    user(&d, "Anne_Marie", "anne@example.com").await;
    user(&d, "AnneXMarie", "annex@example.com").await;
    let params = UserQueryParams {
        name: Some("e_M".to_string()),
        ..Default::default()
    };
    assert_eq!(d.user.search(&ctx, &params).await.unwrap().total, 1);
}

#[tokio::test]
async fn test_product_search_rejects_bad_params() {
    let (_db, d) = setup().await;

    let params = ProductQueryParams {
        order_by: Some("bogus,ASC".to_string()),
        ..Default::default()
    };
    let err = d.product.search(&Ctx::new(), &params).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert!(err.to_string().contains("bogus"));

    let params = ProductQueryParams {
        rows: Some("500".to_string()),
        ..Default::default()
    };
    let err = d.product.search(&Ctx::new(), &params).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);
}

// =============================================================================
// Users
// =============================================================================

#[tokio::test]
async fn test_user_unique_email() {
    let (db, d) = setup().await;
    let ctx = Ctx::new();

    let bill = user(&d, "Bill Kennedy", "bill@example.com").await;
    let err = d
        .user
        .create(
            &ctx,
            NewUser {
                name: Name::must_parse("Another Bill"),
                email: Email::must_parse("bill@example.com"),
                roles: vec![Role::Admin],
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, BusError::Validation(ValidationError::Duplicate { .. })));
    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(table_count(&db, "users").await, 1);

    let found = d.user.query_by_email(&ctx, &bill.email).await.unwrap();
    assert_eq!(found.id, bill.id);
    assert_eq!(found.roles, vec![Role::User]);
    assert!(found.enabled);
}

#[tokio::test]
async fn test_user_update_and_filters() {
    let (_db, d) = setup().await;
    let ctx = Ctx::new();

    let bill = user(&d, "Bill Kennedy", "bill@example.com").await;
    let ada = user(&d, "Ada Lovelace", "ada@example.com").await;

    let updated = d
        .user
        .update(
            &ctx,
            ada.clone(),
            UpdateUser {
                roles: Some(vec![Role::Admin, Role::User]),
                enabled: Some(false),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let loaded = d.user.query_by_id(&ctx, ada.id).await.unwrap();
    assert_eq!(loaded.roles, vec![Role::Admin, Role::User]);
    assert!(!loaded.enabled);
    assert_eq!(loaded.date_updated, updated.date_updated);

    let params = UserQueryParams {
        name: Some("Kenn".to_string()),
        ..Default::default()
    };
    let result = d.user.search(&ctx, &params).await.unwrap();
    assert_eq!(result.total, 1);
    assert_eq!(result.items[0].id, bill.id);

    let params = UserQueryParams {
        start_created_date: Some(bill.date_created.to_rfc3339()),
        end_created_date: Some(ada.date_created.to_rfc3339()),
        order_by: Some("email,ASC".to_string()),
        ..Default::default()
    };
    let result = d.user.search(&ctx, &params).await.unwrap();
    let emails: Vec<_> = result.items.iter().map(|u| u.email.as_str()).collect();
    assert_eq!(emails, vec!["ada@example.com", "bill@example.com"]);
}

// =============================================================================
// Sales
// =============================================================================

#[tokio::test]
async fn test_sale_allocation_is_persisted() {
    let (_db, d) = setup().await;
    let ctx = Ctx::new();

    let bill = user(&d, "Bill Kennedy", "bill@example.com").await;
    let notebook = product(&d, "Notebook", 10.34).await;
    let case = product(&d, "Pencil Case", 5.00).await;

    let sale = d
        .sale
        .create(
            &ctx,
            NewSale {
                user_id: bill.id,
                discount: Money::must_parse(3.00),
                items: vec![
                    NewSaleItem {
                        product_id: notebook.id,
                        quantity: 1,
                        price: notebook.price,
                    },
                    NewSaleItem {
                        product_id: case.id,
                        quantity: 2,
                        price: case.price,
                    },
                ],
            },
        )
        .await
        .unwrap();

    let loaded = d.sale.query_by_id(&ctx, sale.id).await.unwrap();
    assert!(loaded.totals_match());
    assert_eq!(loaded.amount.cents(), 2034);
    assert_eq!(loaded.discount.cents(), 300);

    let items: Vec<_> = loaded
        .items
        .iter()
        .map(|i| (i.product_id, i.unit_price.cents(), i.amount.cents(), i.discount.cents()))
        .collect();
    assert_eq!(
        items,
        vec![(notebook.id, 1034, 1034, 153), (case.id, 500, 1000, 147)]
    );
}

#[tokio::test]
async fn test_negative_first_item_share_is_persisted() {
    let (_db, d) = setup().await;
    let ctx = Ctx::new();

    let bill = user(&d, "Bill Kennedy", "bill@example.com").await;
    let eraser = product(&d, "Eraser", 0.10).await;
    let pens = [
        product(&d, "Blue Pen", 1.00).await,
        product(&d, "Red Pen", 1.00).await,
        product(&d, "Black Pen", 1.00).await,
    ];

    let items = std::iter::once(&eraser)
        .chain(pens.iter())
        .map(|p| NewSaleItem {
            product_id: p.id,
            quantity: 1,
            price: p.price,
        })
        .collect();

    let sale = d
        .sale
        .create(
            &ctx,
            NewSale {
                user_id: bill.id,
                discount: Money::must_parse(0.05),
                items,
            },
        )
        .await
        .unwrap();

    let loaded = d.sale.query_by_id(&ctx, sale.id).await.unwrap();
    assert!(loaded.totals_match());
    let shares: Vec<i64> = loaded.items.iter().map(|i| i.discount.cents()).collect();
    assert_eq!(shares, vec![-1, 2, 2, 2]);
    assert_eq!(loaded.items[0].product_id, eraser.id);
    assert_eq!(loaded.items, sale.items);
}

#[tokio::test]
async fn test_rejected_sale_writes_nothing() {
    let (db, d) = setup().await;
    let ctx = Ctx::new();

    let bill = user(&d, "Bill Kennedy", "bill@example.com").await;
    let pen = product(&d, "Blue Pen", 1.00).await;

    let err = d
        .sale
        .create(
            &ctx,
            NewSale {
                user_id: bill.id,
                discount: Money::must_parse(5.00),
                items: vec![NewSaleItem {
                    product_id: pen.id,
                    quantity: 2,
                    price: pen.price,
                }],
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Validation);
    assert_eq!(table_count(&db, "sales").await, 0);
    assert_eq!(table_count(&db, "sale_items").await, 0);
}

#[tokio::test]
async fn test_sale_with_missing_product_is_atomic() {
    let (db, d) = setup().await;
    let ctx = Ctx::new();

    let bill = user(&d, "Bill Kennedy", "bill@example.com").await;
    let pen = product(&d, "Blue Pen", 1.00).await;

    // the second item violates the product foreign key after the sale row
    // and the first item were written
    let err = d
        .sale
        .create(
            &ctx,
            NewSale {
                user_id: bill.id,
                discount: Money::zero(),
                items: vec![
                    NewSaleItem {
                        product_id: pen.id,
                        quantity: 1,
                        price: pen.price,
                    },
                    NewSaleItem {
                        product_id: uuid::Uuid::new_v4(),
                        quantity: 1,
                        price: Money::must_parse(2.00),
                    },
                ],
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Internal);
    assert!(err.to_string().starts_with("create sale"));
    assert_eq!(table_count(&db, "sales").await, 0);
    assert_eq!(table_count(&db, "sale_items").await, 0);
}

#[tokio::test]
async fn test_sale_search_and_cascade_delete() {
    let (db, d) = setup().await;
    let ctx = Ctx::new();

    let bill = user(&d, "Bill Kennedy", "bill@example.com").await;
    let ada = user(&d, "Ada Lovelace", "ada@example.com").await;
    let pen = product(&d, "Blue Pen", 1.00).await;

    let mut bills_sales = Vec::new();
    for (owner, quantity) in [(&bill, 1), (&bill, 3), (&ada, 2)] {
        let sale = d
            .sale
            .create(
                &ctx,
                NewSale {
                    user_id: owner.id,
                    discount: Money::zero(),
                    items: vec![NewSaleItem {
                        product_id: pen.id,
                        quantity,
                        price: pen.price,
                    }],
                },
            )
            .await
            .unwrap();
        if owner.id == bill.id {
            bills_sales.push(sale);
        }
    }

    let params = SaleQueryParams {
        user_id: Some(bill.id.to_string()),
        order_by: Some("amount,DESC".to_string()),
        ..Default::default()
    };
    let result = d.sale.search(&ctx, &params).await.unwrap();
    assert_eq!(result.total, 2);
    let amounts: Vec<_> = result.items.iter().map(|s| s.amount.cents()).collect();
    assert_eq!(amounts, vec![300, 100]);
    assert!(result.items.iter().all(|s| s.items.len() == 1));

    d.sale.delete(&ctx, &bills_sales[0]).await.unwrap();
    assert_eq!(table_count(&db, "sales").await, 2);
    assert_eq!(table_count(&db, "sale_items").await, 2);

    let err = d.sale.query_by_id(&ctx, bills_sales[0].id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
}

#[tokio::test]
async fn test_cancelled_context_reaches_no_store() {
    let (db, d) = setup().await;
    let ctx = Ctx::new();
    ctx.cancel();

    let err = d
        .product
        .create(
            &ctx,
            NewProduct {
                name: Name::must_parse("Blue Pen"),
                price: Money::must_parse(1.00),
            },
        )
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::Cancelled);
    assert_eq!(table_count(&db, "products").await, 0);
}
