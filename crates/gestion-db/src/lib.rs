//! # gestion-db: Database Layer and Order Services
//!
//! SQLite storage for the catalog, orders and the inventory ledger, plus the
//! [`OrderService`] that runs every order workflow inside one transaction.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Gestion Data Flow                                │
//! │                                                                         │
//! │  Web handler (POST /ventas/{id}/finalizar)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                   gestion-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │ OrderService  │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │ (service/)    │    │ (repository/) │    │  (embedded)  │  │   │
//! │  │   │               │    │               │    │              │  │   │
//! │  │   │ create        │    │ ProductRepo   │    │ 001_initial  │  │   │
//! │  │   │ add/remove    │───►│ OrderRepo     │    │ _schema.sql  │  │   │
//! │  │   │ finalize      │    │ MovementRepo  │    │              │  │   │
//! │  │   │ cancel        │    │ ReportRepo    │    │              │  │   │
//! │  │   └───────┬───────┘    └───────────────┘    └──────────────┘  │   │
//! │  │           │ rules                                               │   │
//! │  │           ▼                                                     │   │
//! │  │   gestion-core (totals, transitions, stock plan, policy)       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (gestion.db)                │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`config`] - Environment-driven settings
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog CRUD and read-side queries
//! - [`service`] - Transactional order workflow
//!
//! ## Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use gestion_db::{AppConfig, Database};
//! use gestion_core::{Actor, Role, RolePolicy};
//!
//! let config = AppConfig::load()?;
//! let db = Database::new(config.db_config()).await?;
//!
//! let orders = db.order_service(Arc::new(RolePolicy));
//! let seller = Actor::new("lucia", [Role::Seller]);
//!
//! let sale = orders.create_sale(&seller, client_id).await?;
//! orders.add_sale_line(&seller, sale.id, product_id, 2).await?;
//! orders.finalize(&seller, OrderKind::Sale, sale.id).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;
pub mod service;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::{AppConfig, ConfigError};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use service::{LineUpsert, OrderService, TransitionOutcome};

// Repository re-exports for convenience
pub use repository::category::CategoryRepository;
pub use repository::client::ClientRepository;
pub use repository::movement::MovementRepository;
pub use repository::order::OrderRepository;
pub use repository::product::ProductRepository;
pub use repository::report::ReportRepository;
pub use repository::supplier::SupplierRepository;
