//! # Order Workflow Rules
//!
//! The pure half of the order workflow. Storage (gestion-db) loads rows,
//! asks these functions what to do, and writes the answer back inside one
//! transaction.
//!
//! ## Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create ──► Pending ──(add/remove lines)──► Pending                    │
//! │                │                                                        │
//! │                ├── finalize ──► plan_finalize() ──► Completed/Received │
//! │                │                   │                                    │
//! │                │                   └── InsufficientStock (sale only):  │
//! │                │                       nothing applied, stays Pending  │
//! │                │                                                        │
//! │                └── cancel ────► Cancelled                              │
//! │                                                                         │
//! │  Terminal states never transition again; finalize/cancel are no-ops.   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{LineItem, MovementKind, Order, OrderKind, OrderStatus, Product};
use crate::validation::{validate_price_cents, validate_quantity};
use crate::MAX_STOCK_QUANTITY;

// =============================================================================
// Order Numbers
// =============================================================================

/// Formats the persisted order number: prefix + 5-digit zero-padded id.
///
/// Ids wider than five digits are printed in full.
///
/// ## Example
/// ```rust
/// use gestion_core::order::order_number;
/// use gestion_core::OrderKind;
///
/// assert_eq!(order_number(OrderKind::Sale, 42), "PED-00042");
/// assert_eq!(order_number(OrderKind::Purchase, 7), "ORD-00007");
/// ```
pub fn order_number(kind: OrderKind, id: i64) -> String {
    format!("{}-{:05}", kind.number_prefix(), id)
}

// =============================================================================
// State Machine
// =============================================================================

/// A requested lifecycle transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    Finalize,
    Cancel,
}

/// Returns the status an order moves to, or `None` when the transition is a
/// no-op because the order is already terminal.
pub fn next_status(kind: OrderKind, current: OrderStatus, transition: Transition) -> Option<OrderStatus> {
    if current.is_terminal() {
        return None;
    }
    match transition {
        Transition::Finalize => Some(kind.finalized_status()),
        Transition::Cancel => Some(OrderStatus::Cancelled),
    }
}

/// Rejects line edits outside `Pending`.
pub fn ensure_editable(order: &Order, operation: &str) -> CoreResult<()> {
    if order.is_pending() {
        return Ok(());
    }
    Err(CoreError::InvalidState {
        entity: order.kind.entity().to_string(),
        id: order.number.clone(),
        status: order.status.to_string(),
        operation: operation.to_string(),
    })
}

// =============================================================================
// Totals
// =============================================================================

/// Sum of all line subtotals; the only value an order total may hold.
///
/// Fails with `OutOfRange` instead of wrapping when the sum does not fit.
pub fn order_total(lines: &[LineItem]) -> CoreResult<Money> {
    lines
        .iter()
        .try_fold(Money::zero(), |total, line| {
            line.subtotal().and_then(|subtotal| total.checked_add(subtotal))
        })
        .ok_or_else(|| {
            ValidationError::OutOfRange {
                field: "total".to_string(),
                min: 0,
                max: i64::MAX,
            }
            .into()
        })
}

// =============================================================================
// Line Upsert
// =============================================================================

/// What storage must do to apply an add-line request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LineChange {
    /// No line for this product yet.
    Insert { quantity: i64, unit_price_cents: i64 },
    /// Existing line: quantity accumulated, price overwritten.
    Update {
        line_id: i64,
        quantity: i64,
        unit_price_cents: i64,
    },
}

/// Plans an add-line request against the existing line for the same
/// (order, product) pair, if any.
///
/// The new quantity is ADDED to the existing one and the unit price is
/// replaced by the latest value.
pub fn plan_line_upsert(
    existing: Option<&LineItem>,
    quantity: i64,
    unit_price: Money,
) -> CoreResult<LineChange> {
    validate_quantity(quantity)?;
    validate_price_cents(unit_price.cents())?;

    let change = match existing {
        Some(line) => {
            let merged = line.quantity + quantity;
            validate_quantity(merged)?;
            LineChange::Update {
                line_id: line.id,
                quantity: merged,
                unit_price_cents: unit_price.cents(),
            }
        }
        None => LineChange::Insert {
            quantity,
            unit_price_cents: unit_price.cents(),
        },
    };
    Ok(change)
}

/// Purchase lines may only reference products of the order's supplier.
pub fn ensure_supplied_by(order: &Order, product: &Product) -> CoreResult<()> {
    if order.kind != OrderKind::Purchase || product.is_supplied_by(order.counterparty_id) {
        return Ok(());
    }
    Err(CoreError::InvalidProduct {
        product: product.code.clone(),
        supplier: order.counterparty_id.to_string(),
    })
}

// =============================================================================
// Finalize Planning
// =============================================================================

/// The stock change finalization applies for one line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockEffect {
    pub product_id: i64,
    pub kind: MovementKind,
    /// Units moved (always positive).
    pub quantity: i64,
    /// Product stock after this effect.
    pub stock_after: i64,
    /// New purchase cost (purchases only).
    pub purchase_cost_cents: Option<i64>,
}

/// Computes every stock effect of finalizing an order, in line order.
///
/// For sales the availability check runs over ALL lines before any effect is
/// produced; a single short line fails the whole plan. Stock is tracked per
/// product while planning, so two lines on one product draw from the same
/// balance. For purchases the last line for a product sets its cost.
pub fn plan_finalize(
    kind: OrderKind,
    lines: &[LineItem],
    products: &HashMap<i64, Product>,
) -> CoreResult<Vec<StockEffect>> {
    let mut running: HashMap<i64, i64> = HashMap::with_capacity(products.len());
    let mut effects = Vec::with_capacity(lines.len());

    for line in lines {
        let product = products
            .get(&line.product_id)
            .ok_or_else(|| CoreError::not_found("Product", line.product_id))?;
        let stock = running
            .entry(product.id)
            .or_insert(product.stock_quantity);

        let effect = match kind {
            OrderKind::Sale => {
                if *stock < line.quantity {
                    return Err(CoreError::InsufficientStock {
                        product: product.code.clone(),
                        requested: line.quantity,
                        available: *stock,
                    });
                }
                *stock -= line.quantity;
                StockEffect {
                    product_id: product.id,
                    kind: MovementKind::Outbound,
                    quantity: line.quantity,
                    stock_after: *stock,
                    purchase_cost_cents: None,
                }
            }
            OrderKind::Purchase => {
                *stock = stock
                    .checked_add(line.quantity)
                    .filter(|after| *after <= MAX_STOCK_QUANTITY)
                    .ok_or_else(|| ValidationError::OutOfRange {
                        field: format!("stock_quantity of {}", product.code),
                        min: 0,
                        max: MAX_STOCK_QUANTITY,
                    })?;
                StockEffect {
                    product_id: product.id,
                    kind: MovementKind::Inbound,
                    quantity: line.quantity,
                    stock_after: *stock,
                    purchase_cost_cents: Some(line.unit_price_cents),
                }
            }
        };
        effects.push(effect);
    }

    Ok(effects)
}

// =============================================================================
// Unit Tests
// =============================================================================
