//! # Seed Data Generator
//!
//! Populates a development database with users, products and sales. All
//! rows go through the Domain Services inside one transaction, so a failed
//! seed leaves the database untouched.
//!
//! ## Usage
//! ```bash
//! # Defaults: 2 users, 20 products, 5 sales per user
//! cargo run -p orderly-db --bin seed
//!
//! # Custom amounts
//! cargo run -p orderly-db --bin seed -- --users 5 --products 100 --sales 10
//!
//! # Database path (ORDERLY_DB_PATH is used when set)
//! cargo run -p orderly-db --bin seed -- --db ./data/orderly.db
//!
//! # Verbose logs
//! RUST_LOG=orderly_db=debug,orderly_business=debug cargo run -p orderly-db --bin seed
//! ```

use orderly_business::testutil::{sale_items, seed_products, seed_sales, seed_users};
use orderly_business::{BusError, Ctx, UnitOfWork};
use orderly_core::filter::ProductFilter;
use orderly_core::Role;
use orderly_db::{Database, DbConfig};
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Products per sale.
const ITEMS_PER_SALE: usize = 3;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args: Vec<String> = env::args().collect();

    let mut users: usize = 2;
    let mut products: usize = 20;
    let mut sales: usize = 5;
    let mut db_path: Option<String> = None;

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--users" | "-u" => {
                if i + 1 < args.len() {
                    users = args[i + 1].parse().unwrap_or(users);
                    i += 1;
                }
            }
            "--products" | "-p" => {
                if i + 1 < args.len() {
                    products = args[i + 1].parse().unwrap_or(products);
                    i += 1;
                }
            }
            "--sales" | "-s" => {
                if i + 1 < args.len() {
                    sales = args[i + 1].parse().unwrap_or(sales);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Orderly Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -u, --users <N>      Customers to create (default: 2)");
                println!("  -p, --products <N>   Products to create (default: 20)");
                println!("  -s, --sales <N>      Sales per customer (default: 5)");
                println!("  -d, --db <PATH>      Database file (default: $ORDERLY_DB_PATH or ./orderly_dev.db)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    let config = match db_path {
        Some(path) => DbConfig::new(path),
        None => DbConfig::from_env().unwrap_or_else(|_| DbConfig::new("./orderly_dev.db")),
    };

    println!("🌱 Orderly Seed Data Generator");
    println!("==============================");
    println!("Database: {}", config.database_path.display());
    println!("Users:    {} (+1 admin)", users);
    println!("Products: {}", products);
    println!("Sales:    {} per user", sales);
    println!();

    let db = Database::new(config).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let ctx = Ctx::new();
    let domains = db.domains();

    let existing = domains.product.count(&ctx, &ProductFilter::default()).await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let start = std::time::Instant::now();
    let uow = UnitOfWork::new(Arc::new(db.beginner()));

    let (user_count, sale_count) = uow
        .run(&ctx, &domains, |ctx, d| async move {
            seed_users(&ctx, 1, Role::Admin, &d.user).await?;
            let customers = seed_users(&ctx, users, Role::User, &d.user).await?;
            let catalog = seed_products(&ctx, products, &d.product).await?;

            let mut sale_count = 0;
            if !catalog.is_empty() {
                for (idx, customer) in customers.iter().enumerate() {
                    // each customer buys a different window of the catalog
                    let first = (idx * ITEMS_PER_SALE) % catalog.len();
                    let picked: Vec<_> = catalog
                        .iter()
                        .cycle()
                        .skip(first)
                        .take(ITEMS_PER_SALE.min(catalog.len()))
                        .cloned()
                        .collect();

                    let seeded =
                        seed_sales(&ctx, sales, customer.id, &sale_items(&picked), &d.sale).await?;
                    sale_count += seeded.len();
                }
            }

            info!(users = customers.len(), sales = sale_count, "Seed data staged");
            Ok::<_, BusError>((customers.len() + 1, sale_count))
        })
        .await?;

    let elapsed = start.elapsed();
    println!();
    println!("✓ Created {} users", user_count);
    println!("✓ Created {} products", products);
    println!("✓ Created {} sales", sale_count);
    println!("  in {:?}", elapsed);

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
