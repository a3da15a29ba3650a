//! # Domain Types
//!
//! Core domain types used throughout Gestion.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog                    Orders                    Ledger            │
//! │  ─────────────────          ─────────────────         ──────────────    │
//! │  Product ◄──────────────── LineItem                   InventoryMovement │
//! │   │ supplier_id ──┐         │ order_id ──► Order        product_id      │
//! │   │ category_id   │         │ quantity      kind        kind            │
//! │  Supplier ◄───────┘         │ unit_price    number      sale_id /       │
//! │  Client                                   status      purchase_id     │
//! │  Category                                 total                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Every entity uses an integer id assigned by the database. The order number
//! (`PED-00042`, `ORD-00042`) is derived from that id, so it only exists after
//! the header row has been persisted.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Catalog
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: i64,
    pub name: String,
}

/// A supplier company; counterparty of purchase orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Supplier {
    pub id: i64,
    /// Company name.
    pub company: String,
    /// Main contact person.
    pub contact: String,
    pub phone: String,
    pub address: String,
}

/// A customer; counterparty of sales orders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Client {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

/// A product held in inventory.
///
/// `stock_quantity` and `purchase_cost_cents` are only changed by purchase
/// and sale finalization; everything else is plain catalog data.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    pub id: i64,

    /// Unique business code (e.g. "CAF-500").
    pub code: String,

    pub name: String,

    pub description: Option<String>,

    /// Price charged to clients, in cents.
    pub sale_price_cents: i64,

    /// Last price paid to the supplier, in cents.
    pub purchase_cost_cents: i64,

    /// Units on hand. Never negative at rest.
    pub stock_quantity: i64,

    pub supplier_id: Option<i64>,

    pub category_id: Option<i64>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn sale_price(&self) -> Money {
        Money::from_cents(self.sale_price_cents)
    }

    #[inline]
    pub fn purchase_cost(&self) -> Money {
        Money::from_cents(self.purchase_cost_cents)
    }

    /// Whether this product may appear on a purchase placed with `supplier_id`.
    pub fn is_supplied_by(&self, supplier_id: i64) -> bool {
        self.supplier_id == Some(supplier_id)
    }
}

/// Fields for a new product row. Stock starts wherever the caller says;
/// afterwards it only moves through order finalization.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewProduct {
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub sale_price_cents: i64,
    pub purchase_cost_cents: i64,
    pub stock_quantity: i64,
    pub supplier_id: Option<i64>,
    pub category_id: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewClient {
    pub name: String,
    pub address: String,
    pub phone: String,
    pub email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewSupplier {
    pub company: String,
    pub contact: String,
    pub phone: String,
    pub address: String,
}

// =============================================================================
// Order Kind
// =============================================================================

/// Sales and purchases share one order shape; the kind selects the
/// counterparty, the number prefix and the stock direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderKind {
    Sale,
    Purchase,
}

impl OrderKind {
    /// Entity name used in errors and logs.
    pub const fn entity(&self) -> &'static str {
        match self {
            OrderKind::Sale => "Sale",
            OrderKind::Purchase => "Purchase",
        }
    }

    /// Counterparty entity name.
    pub const fn counterparty(&self) -> &'static str {
        match self {
            OrderKind::Sale => "Client",
            OrderKind::Purchase => "Supplier",
        }
    }

    /// Prefix of the persisted order number.
    pub const fn number_prefix(&self) -> &'static str {
        match self {
            OrderKind::Sale => "PED",
            OrderKind::Purchase => "ORD",
        }
    }

    /// Terminal success status reached by `finalize`.
    pub const fn finalized_status(&self) -> OrderStatus {
        match self {
            OrderKind::Sale => OrderStatus::Completed,
            OrderKind::Purchase => OrderStatus::Received,
        }
    }

    /// Stock direction of the movements written at finalization.
    pub const fn movement_kind(&self) -> MovementKind {
        match self {
            OrderKind::Sale => MovementKind::Outbound,
            OrderKind::Purchase => MovementKind::Inbound,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderKind::Sale => "sale",
            OrderKind::Purchase => "purchase",
        }
    }
}

impl fmt::Display for OrderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.entity())
    }
}

// =============================================================================
// Order Status
// =============================================================================

/// Lifecycle status of an order.
///
/// ```text
/// Pending ──┬──► Completed (sale) / Received (purchase)
///           └──► Cancelled
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    /// Lines may be edited; no stock has been touched.
    #[default]
    Pending,
    /// Sale finalized, stock decremented.
    Completed,
    /// Purchase finalized, stock incremented.
    Received,
    Cancelled,
}

impl OrderStatus {
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, OrderStatus::Pending)
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::Completed => "completed",
            OrderStatus::Received => "received",
            OrderStatus::Cancelled => "cancelled",
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Order
// =============================================================================

/// Header of a sale or purchase order.
///
/// `total` is not settable from outside this crate: it is always the
/// recomputed sum of the order's line subtotals, written by storage through
/// the line-item operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Order {
    pub id: i64,
    pub kind: OrderKind,
    /// `PED-00042` / `ORD-00042`.
    pub number: String,
    /// Client id for sales, supplier id for purchases.
    pub counterparty_id: i64,
    pub status: OrderStatus,
    total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    #[inline]
    pub fn is_pending(&self) -> bool {
        self.status == OrderStatus::Pending
    }
}

#[cfg(test)]
impl Order {
    /// An unsaved header for rule tests; real orders only come from storage.
    pub(crate) fn stub(
        kind: OrderKind,
        status: OrderStatus,
        counterparty_id: i64,
        total_cents: i64,
    ) -> Self {
        let now = Utc::now();
        Order {
            id: 1,
            kind,
            number: crate::order::order_number(kind, 1),
            counterparty_id,
            status,
            total_cents,
            created_at: now,
            updated_at: now,
        }
    }
}

// =============================================================================
// Line Item
// =============================================================================

/// One product line of an order.
///
/// `unit_price_cents` is a snapshot: the product's sale price at the moment
/// the line was (last) added for sales, the negotiated cost for purchases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct LineItem {
    pub id: i64,
    pub order_id: i64,
    pub product_id: i64,
    pub quantity: i64,
    pub unit_price_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl LineItem {
    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    /// quantity × unit price; computed, never stored. `None` on overflow.
    #[inline]
    pub fn subtotal(&self) -> Option<Money> {
        self.unit_price().checked_mul_quantity(self.quantity)
    }
}

// =============================================================================
// Inventory Ledger
// =============================================================================

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[ts(export)]
pub enum MovementKind {
    #[cfg_attr(feature = "sqlx", sqlx(rename = "entrada"))]
    #[serde(rename = "entrada")]
    Inbound,
    #[cfg_attr(feature = "sqlx", sqlx(rename = "salida"))]
    #[serde(rename = "salida")]
    Outbound,
}

/// Immutable ledger record of one stock change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryMovement {
    pub id: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    pub kind: MovementKind,
    pub product_id: i64,
    /// Always positive; the direction lives in `kind`.
    pub quantity: i64,
    pub sale_id: Option<i64>,
    pub purchase_id: Option<i64>,
}

// =============================================================================
// Filters & Report Rows
// =============================================================================

/// Order listing filter used by reports.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderFilter {
    /// First calendar day included (UTC).
    pub from: Option<NaiveDate>,
    /// Last calendar day included (UTC).
    pub to: Option<NaiveDate>,
    /// Case-insensitive substring of the client name / supplier company.
    pub counterparty_contains: Option<String>,
}

/// Inventory listing filter.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InventoryFilter {
    pub name_contains: Option<String>,
    pub category_id: Option<i64>,
    /// Only products with at most this much stock ("low stock" view).
    pub max_stock: Option<i64>,
}

/// Sales total for one calendar month (`YYYY-MM`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct MonthlyTotal {
    pub month: String,
    pub total_cents: i64,
}

/// Quantity sold per product across all sale lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ProductSales {
    pub product_id: i64,
    pub product_name: String,
    pub quantity: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(quantity: i64, unit_price_cents: i64) -> LineItem {
        LineItem {
            id: 1,
            order_id: 1,
            product_id: 1,
            quantity,
            unit_price_cents,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_status_default_is_pending() {
        assert_eq!(OrderStatus::default(), OrderStatus::Pending);
        assert!(!OrderStatus::Pending.is_terminal());
        assert!(OrderStatus::Completed.is_terminal());
        assert!(OrderStatus::Received.is_terminal());
        assert!(OrderStatus::Cancelled.is_terminal());
    }

    #[test]
    fn test_kind_mappings() {
        assert_eq!(OrderKind::Sale.finalized_status(), OrderStatus::Completed);
        assert_eq!(OrderKind::Purchase.finalized_status(), OrderStatus::Received);
        assert_eq!(OrderKind::Sale.movement_kind(), MovementKind::Outbound);
        assert_eq!(OrderKind::Purchase.movement_kind(), MovementKind::Inbound);
        assert_eq!(OrderKind::Sale.counterparty(), "Client");
    }

    #[test]
    fn test_line_subtotal() {
        assert_eq!(line(4, 250).subtotal(), Some(Money::from_cents(1000)));
        assert_eq!(line(3, i64::MAX / 2).subtotal(), None);
    }

    #[test]
    fn test_order_total_reads_stored_cents() {
        let order = Order::stub(OrderKind::Sale, OrderStatus::Pending, 7, 2948);
        assert_eq!(order.total(), Money::from_cents(2948));
        assert_eq!(order.number, "PED-00001");
        assert!(order.is_pending());
    }

    #[test]
    fn test_movement_kind_serialized_names() {
        assert_eq!(
            serde_json::to_string(&MovementKind::Inbound).unwrap(),
            "\"entrada\""
        );
        assert_eq!(
            serde_json::to_string(&MovementKind::Outbound).unwrap(),
            "\"salida\""
        );
    }

    #[test]
    fn test_product_supplier_check() {
        let now = Utc::now();
        let product = Product {
            id: 7,
            code: "CAF-500".to_string(),
            name: "Cafe 500g".to_string(),
            description: None,
            sale_price_cents: 1099,
            purchase_cost_cents: 700,
            stock_quantity: 3,
            supplier_id: Some(2),
            category_id: None,
            created_at: now,
            updated_at: now,
        };
        assert!(product.is_supplied_by(2));
        assert!(!product.is_supplied_by(3));
        assert_eq!(product.sale_price().cents(), 1099);
    }
}
