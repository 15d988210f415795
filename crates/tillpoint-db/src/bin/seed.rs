//! # Seed Data Generator
//!
//! Populates a development database with suppliers, categories, products,
//! customers and vouchers.
//!
//! ## Usage
//! ```bash
//! # Seed ./tillpoint_dev.db with 10 products per category (default)
//! cargo run -p tillpoint-db --bin seed
//!
//! # Custom amount and path
//! cargo run -p tillpoint-db --bin seed -- --per-category 50 --db ./data/tillpoint.db
//! ```
//!
//! ## Generated Data
//! - Two suppliers, shared round-robin across products
//! - Categories with their tax rates (0%, 5%, 8%, 10%)
//! - Products `{CATEGORY}-{NNN}` with prices, stock and a few promotions
//! - Customers spread across every default loyalty tier
//! - Three vouchers: percent, fixed and a limited-use one

use chrono::{Duration, Utc};
use std::env;
use tillpoint_core::{Category, Customer, Discount, Money, Percent, Product, Supplier, TierPolicy, Voucher};
use tillpoint_db::repository::new_id;
use tillpoint_db::{Database, DbConfig};

/// (code, name, tax bps, product names)
const CATEGORIES: &[(&str, &str, u32, &[&str])] = &[
    ("BEV", "Beverages", 1000, &["Espresso beans", "Green tea", "Orange juice", "Sparkling water", "Cocoa powder"]),
    ("SNK", "Snacks", 800, &["Rice crackers", "Dried mango", "Cashews", "Dark chocolate", "Seaweed chips"]),
    ("HOM", "Homeware", 1000, &["Electric kettle", "Ceramic mug", "Tea pot", "French press", "Glass jar"]),
    ("BKS", "Books", 0, &["Coffee atlas", "Tea ceremony", "Baking basics", "Street food", "Home brewing"]),
    ("STA", "Stationery", 500, &["Notebook", "Gel pen", "Sticky notes", "Desk planner", "Marker set"]),
];

/// (name, points)
const CUSTOMERS: &[(&str, i64)] = &[
    ("Walk-in Customer", 0),
    ("An Nguyen", 120),
    ("Binh Tran", 640),
    ("Chi Le", 1_150),
    ("Dung Pham", 2_400),
];

const SUPPLIERS: &[(&str, &str)] = &[
    ("Saigon Trading Co.", "Hoa Nguyen"),
    ("Red River Supplies", "Long Vu"),
];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut per_category: usize = 10;
    let mut db_path = String::from("./tillpoint_dev.db");

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--per-category" | "-n" => {
                if i + 1 < args.len() {
                    per_category = args[i + 1].parse().unwrap_or(per_category);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Tillpoint Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -n, --per-category <N>  Products per category (default: 10)");
                println!("  -d, --db <PATH>         Database file path (default: ./tillpoint_dev.db)");
                println!("  -h, --help              Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Tillpoint Seed Data Generator");
    println!("=============================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let now = Utc::now();
    let mut products = 0;

    let mut suppliers = Vec::new();
    for (name, contact) in SUPPLIERS {
        let mut supplier = Supplier::new(*name);
        supplier.contact_name = Some(contact.to_string());
        suppliers.push(db.suppliers().insert(&supplier).await?);
    }
    println!("✓ {} suppliers", suppliers.len());

    for (code, name, tax_bps, names) in CATEGORIES {
        let category = db
            .categories()
            .insert(&Category {
                id: new_id(),
                name: name.to_string(),
                description: None,
                tax_rate_bps: *tax_bps,
                created_at: now,
            })
            .await?;

        for n in 0..per_category {
            let mut product = generate_product(code, names[n % names.len()], &category.id, products);
            product.supplier_id = Some(suppliers[products % suppliers.len()].id.clone());
            if let Err(e) = db.products().insert(&product).await {
                eprintln!("Failed to insert {}: {}", product.code, e);
                continue;
            }
            products += 1;
        }
    }
    println!("✓ {} categories, {} products", CATEGORIES.len(), products);

    let policy = TierPolicy::default();
    for (name, points) in CUSTOMERS {
        db.customers()
            .insert(&Customer {
                id: new_id(),
                name: name.to_string(),
                phone: Some(format!("09{:08}", name.len() * 1_234_567 % 100_000_000)),
                email: None,
                address: None,
                tier: policy.tier_for(*points).name.clone(),
                points: *points,
                created_at: now,
            })
            .await?;
    }
    println!("✓ {} customers", CUSTOMERS.len());

    let month = now + Duration::days(30);
    let mut limited = Voucher::new(
        "FIRST50",
        Discount::Fixed(Money::from_major(50_000)),
        Money::from_major(200_000),
        now,
        month,
    );
    limited.usage_limit = 50;

    for voucher in [
        Voucher::new("WELCOME10", Discount::Percent(Percent::from_whole(10)), Money::from_major(100_000), now, month),
        Voucher::new("SAVE20K", Discount::Fixed(Money::from_major(20_000)), Money::zero(), now, month),
        limited,
    ] {
        db.vouchers().insert(&voucher).await?;
    }
    println!("✓ 3 vouchers");

    println!();
    println!("✓ Seed complete!");
    Ok(())
}

/// Generates one product; every seventh gets a 15% promotion.
fn generate_product(category: &str, name: &str, category_id: &str, seed: usize) -> Product {
    let mut product = Product::new(
        format!("{}-{:03}", category, seed),
        format!("{} #{}", name, seed + 1),
        // 15,000 - 489,000 in whole currency units
        Money::from_major(15_000 + ((seed * 7_919) % 475) as i64 * 1_000).cents(),
    );
    product.category_id = Some(category_id.to_string());
    product.stock_quantity = (seed * 13 % 60) as i64;
    if seed % 7 == 0 {
        product.promo_bps = 1500;
    }
    product
}
