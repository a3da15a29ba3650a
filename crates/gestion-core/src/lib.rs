//! # gestion-core: Pure Business Logic for Gestion
//!
//! Domain types and the rules of the order workflow, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Gestion Architecture                             │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │            HTTP / UI layer (routing, rendering, auth)           │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              gestion-db (OrderService, repositories)            │   │
//! │  │        transactions, SQL, ledger writes, reporting reads        │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │              ★ gestion-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   types     order        policy       money     validation     │   │
//! │  │   Product   numbering    Authorizer   Money     codes, qty     │   │
//! │  │   Order     totals       RolePolicy                            │   │
//! │  │   LineItem  upsert plan                                        │   │
//! │  │             finalize plan                                      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Catalog, order, line and ledger types
//! - [`order`] - Order numbering, state machine, totals, upsert and finalize planning
//! - [`policy`] - Capability check (`Authorizer`) and the default role policy
//! - [`money`] - Integer-cents money
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use gestion_core::order::order_number;
//! use gestion_core::OrderKind;
//!
//! assert_eq!(order_number(OrderKind::Sale, 42), "PED-00042");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod money;
pub mod order;
pub mod policy;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use policy::{Action, Actor, Authorizer, Role, RolePolicy};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum quantity on a single order line, after consolidation.
///
/// Guards against typos (10000 instead of 10) turning into stock movements.
pub const MAX_LINE_QUANTITY: i64 = 99_999;

/// Largest price or cost, in cents ($99,999,999.99).
///
/// Together with [`MAX_LINE_QUANTITY`] this keeps every line subtotal well
/// inside `i64`.
pub const MAX_PRICE_CENTS: i64 = 9_999_999_999;

/// Largest stock level a product may hold.
///
/// Receiving a purchase that would push stock past it fails instead of
/// overflowing.
pub const MAX_STOCK_QUANTITY: i64 = 999_999_999;
