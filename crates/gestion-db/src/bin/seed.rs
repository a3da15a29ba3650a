//! # Seed Data Generator
//!
//! Populates the database with a small demo catalog and walks one purchase
//! and one sale through their whole lifecycle.
//!
//! ## Usage
//! ```bash
//! # Seed the database named by GESTION_DATABASE_PATH (default ./gestion.db)
//! cargo run -p gestion-db --bin seed
//!
//! # Specify database path
//! cargo run -p gestion-db --bin seed -- --db ./data/gestion.db
//! ```
//!
//! ## Generated Data
//! - Categories: Bebidas, Abarrotes, Limpieza
//! - One supplier and one client
//! - Products with zero stock, then a received purchase that stocks them
//! - A completed sale that draws some of that stock back out

use std::env;
use std::sync::Arc;

use gestion_core::{
    Actor, Money, NewClient, NewProduct, NewSupplier, OrderKind, Role, RolePolicy,
};
use gestion_db::{AppConfig, Database};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Demo catalog: (code, name, category, sale price, purchase cost, units bought)
const PRODUCTS: &[(&str, &str, &str, i64, i64, i64)] = &[
    ("BEB-001", "Agua mineral 600ml", "Bebidas", 75, 40, 48),
    ("BEB-002", "Jugo de naranja 1L", "Bebidas", 225, 150, 24),
    ("BEB-003", "Cafe molido 500g", "Bebidas", 1150, 800, 12),
    ("ABA-001", "Arroz 1kg", "Abarrotes", 180, 120, 40),
    ("ABA-002", "Frijol negro 1kg", "Abarrotes", 210, 140, 30),
    ("ABA-003", "Azucar 2kg", "Abarrotes", 260, 190, 20),
    ("LIM-001", "Detergente 1kg", "Limpieza", 340, 230, 15),
    ("LIM-002", "Jabon de barra", "Limpieza", 95, 55, 36),
];

/// Units sold in the demo sale: (code, quantity)
const SALE: &[(&str, i64)] = &[("BEB-001", 6), ("ABA-001", 2), ("LIM-002", 3)];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = AppConfig::load()?;

    // Parse command line arguments
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    config.database_path = args[i + 1].clone().into();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Gestion Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -d, --db <PATH>    Database file path (default: $GESTION_DATABASE_PATH)");
                println!("  -h, --help         Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.log_filter))
        .init();

    println!("🌱 Gestion Seed Data Generator");
    println!("==============================");
    println!("Database: {}", config.database_path.display());
    println!();

    let db = Database::new(config.db_config()).await?;
    println!("✓ Connected to database");

    // Check existing products
    let existing = db.products().count().await?;
    if existing > 0 {
        println!("⚠ Database already has {} products", existing);
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    // Catalog
    let mut categories = Vec::new();
    for name in ["Bebidas", "Abarrotes", "Limpieza"] {
        categories.push(db.categories().insert(name).await?);
    }

    let supplier = db
        .suppliers()
        .insert(&NewSupplier {
            company: "Distribuidora Central".to_string(),
            contact: "Laura Mendez".to_string(),
            phone: "22445566".to_string(),
            address: "Bodega 12, Zona Franca".to_string(),
        })
        .await?;

    let client = db
        .clients()
        .insert(&NewClient {
            name: "Pulperia La Esquina".to_string(),
            address: "Barrio El Carmen, 200m norte".to_string(),
            phone: "88112233".to_string(),
            email: "compras@laesquina.example".to_string(),
        })
        .await?;

    let mut products = Vec::new();
    for (code, name, category, price, _, _) in PRODUCTS {
        let category_id = categories
            .iter()
            .find(|c| c.name == *category)
            .map(|c| c.id);
        let product = db
            .products()
            .insert(&NewProduct {
                code: code.to_string(),
                name: name.to_string(),
                description: None,
                sale_price_cents: *price,
                purchase_cost_cents: 0,
                stock_quantity: 0,
                supplier_id: Some(supplier.id),
                category_id,
            })
            .await?;
        products.push(product);
    }
    println!("✓ Catalog: {} products in {} categories", products.len(), categories.len());

    let orders = db.order_service(Arc::new(RolePolicy));
    let admin = Actor::new("seed", [Role::Administrator]);

    // Purchase: stock everything up
    let purchase = orders.create_purchase(&admin, supplier.id).await?;
    for (product, (_, _, _, _, cost, units)) in products.iter().zip(PRODUCTS) {
        orders
            .add_purchase_line(&admin, purchase.id, product.id, *units, Money::from_cents(*cost))
            .await?;
    }
    let received = orders
        .finalize(&admin, OrderKind::Purchase, purchase.id)
        .await?;
    println!(
        "✓ Purchase {} {} ({} movements, total {})",
        received.order.number,
        received.order.status,
        received.movements.len(),
        received.order.total()
    );

    // Sale: draw part of it back out
    let sale = orders.create_sale(&admin, client.id).await?;
    for (code, quantity) in SALE {
        if let Some(product) = products.iter().find(|p| p.code == *code) {
            orders.add_sale_line(&admin, sale.id, product.id, *quantity).await?;
        }
    }
    let completed = orders.finalize(&admin, OrderKind::Sale, sale.id).await?;
    println!(
        "✓ Sale {} {} ({} movements, total {})",
        completed.order.number,
        completed.order.status,
        completed.movements.len(),
        completed.order.total()
    );

    info!(
        products = products.len(),
        movements = db.movements().count().await?,
        "Seed complete"
    );

    println!();
    println!("✓ Seed complete!");

    db.close().await;
    Ok(())
}
