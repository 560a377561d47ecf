//! # Seed Data
//!
//! Populates a fresh database with the default categories and drink menu.
//!
//! ## Usage
//! ```bash
//! # Seed ./kasir.db (default)
//! cargo run -p kasir-db --bin seed
//!
//! # Specify database path
//! cargo run -p kasir-db --bin seed -- --db ./data/kasir.db
//! ```
//!
//! Existing categories are reused; products are only added when the catalog
//! is empty, so running it twice is harmless.

use std::env;

use kasir_core::{Money, NewProduct};
use kasir_db::{Database, DbConfig};

const CATEGORIES: &[&str] = &["Makanan", "Minuman", "Snack"];

/// Default menu: (name, price in rupiah). All go into "Minuman".
const DRINKS: &[(&str, i64)] = &[
    ("Avo Coffee", 25_000),
    ("Cappucino", 22_000),
    ("Chococa", 20_000),
    ("Green Tea", 18_000),
    ("Macachino", 24_000),
    ("Machiato", 26_000),
    ("Vallate Coffee Milk", 23_000),
];

const OPENING_STOCK: i64 = 100;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = env::args().collect();

    let mut db_path = env::var("DATABASE_PATH").unwrap_or_else(|_| String::from("./kasir.db"));

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Kasir POS Seed Data");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $DATABASE_PATH or ./kasir.db)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("🌱 Kasir POS Seed Data");
    println!("======================");
    println!("Database: {}", db_path);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database, migrations applied");

    let mut minuman_id = None;
    for name in CATEGORIES {
        let category = match db.categories().get_by_name(name).await? {
            Some(existing) => existing,
            None => {
                let created = db.categories().create(name).await?;
                println!("  + category {}", created.name);
                created
            }
        };
        if *name == "Minuman" {
            minuman_id = Some(category.id);
        }
    }

    let Some(minuman_id) = minuman_id else {
        return Err("category Minuman missing after seeding".into());
    };

    let existing = db.products().list(None, None).await?;
    if !existing.is_empty() {
        println!("⚠ Catalog already has {} products, skipping menu", existing.len());
        db.close().await;
        return Ok(());
    }

    for (name, price) in DRINKS {
        let product = db
            .products()
            .create(&NewProduct {
                category_id: minuman_id.clone(),
                name: name.to_string(),
                price: Money::from_minor(*price),
                stock: OPENING_STOCK,
                image: None,
            })
            .await?;
        println!("  + {} ({}) × {}", product.name, product.price, product.stock);
    }

    println!();
    println!("✓ Seeded {} products", DRINKS.len());

    db.close().await;
    Ok(())
}
