//! # Repository Module
//!
//! Database repository implementations for Gestion.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Caller                                                                │
//! │       │  db.products().get_by_code("CAF-500")                          │
//! │       ▼                                                                 │
//! │  ProductRepository { pool }                                            │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Order writes are NOT exposed here: they only happen through           │
//! │  `OrderService`, which runs the connection-scoped helpers of           │
//! │  `order`, `product` and `movement` inside one transaction.             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD, stock and inventory listing
//! - [`client::ClientRepository`], [`supplier::SupplierRepository`],
//!   [`category::CategoryRepository`] - Counterparty and category CRUD
//! - [`order::OrderRepository`] - Order lookups and filtered listings
//! - [`movement::MovementRepository`] - Inventory ledger reads
//! - [`report::ReportRepository`] - Dashboard aggregates

pub mod category;
pub mod client;
pub mod movement;
pub mod order;
pub mod product;
pub mod report;
pub mod supplier;

#[cfg(test)]
pub(crate) mod test_support {
    use crate::pool::{Database, DbConfig};
    use gestion_core::{NewClient, NewProduct, NewSupplier};

    pub async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn new_product(code: &str, sale_price_cents: i64, stock_quantity: i64) -> NewProduct {
        NewProduct {
            code: code.to_string(),
            name: format!("Producto {code}"),
            description: None,
            sale_price_cents,
            purchase_cost_cents: 0,
            stock_quantity,
            supplier_id: None,
            category_id: None,
        }
    }

    pub fn new_client(name: &str) -> NewClient {
        NewClient {
            name: name.to_string(),
            address: "Av. Central 100".to_string(),
            phone: "22001100".to_string(),
            email: "cliente@example.com".to_string(),
        }
    }

    pub fn new_supplier(company: &str) -> NewSupplier {
        NewSupplier {
            company: company.to_string(),
            contact: "Ana Soto".to_string(),
            phone: "22334455".to_string(),
            address: "Zona Industrial 4".to_string(),
        }
    }
}
