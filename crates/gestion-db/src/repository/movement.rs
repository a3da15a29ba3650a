//! # Inventory Movement Repository
//!
//! The append-only stock ledger.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  finalize(sale)      ──► one `salida`  row per line, sale_id set       │
//! │  finalize(purchase)  ──► one `entrada` row per line, purchase_id set   │
//! │                                                                         │
//! │  Rows are written in the same transaction as the stock change and are  │
//! │  never updated afterwards (a trigger rejects updates).                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};

use crate::error::DbResult;
use crate::repository::order::tables;
use gestion_core::order::StockEffect;
use gestion_core::{InventoryMovement, OrderKind};

const MOVEMENT_SELECT: &str = "SELECT id, created_at, kind, product_id, quantity, sale_id, purchase_id \
                               FROM inventory_movements";

/// Read access to the inventory ledger, newest entries first.
#[derive(Debug, Clone)]
pub struct MovementRepository {
    pool: SqlitePool,
}

impl MovementRepository {
    pub fn new(pool: SqlitePool) -> Self {
        MovementRepository { pool }
    }

    /// Movements of one product.
    pub async fn by_product(&self, product_id: i64) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!("{MOVEMENT_SELECT} WHERE product_id = ?1 ORDER BY created_at DESC, id DESC");
        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .bind(product_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// Movements caused by one order.
    pub async fn by_order(&self, kind: OrderKind, order_id: i64) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!(
            "{MOVEMENT_SELECT} WHERE {} = ?1 ORDER BY created_at DESC, id DESC",
            tables(kind).movement_column
        );
        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .bind(order_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    /// The whole ledger.
    pub async fn list(&self) -> DbResult<Vec<InventoryMovement>> {
        let sql = format!("{MOVEMENT_SELECT} ORDER BY created_at DESC, id DESC");
        let movements = sqlx::query_as::<_, InventoryMovement>(&sql)
            .fetch_all(&self.pool)
            .await?;

        Ok(movements)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM inventory_movements")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

/// Appends the ledger row for one finalization effect.
pub(crate) async fn record_movement(
    conn: &mut SqliteConnection,
    order_kind: OrderKind,
    order_id: i64,
    effect: &StockEffect,
    now: DateTime<Utc>,
) -> DbResult<InventoryMovement> {
    let (sale_id, purchase_id) = match order_kind {
        OrderKind::Sale => (Some(order_id), None),
        OrderKind::Purchase => (None, Some(order_id)),
    };

    let id = sqlx::query(
        r#"
        INSERT INTO inventory_movements (created_at, kind, product_id, quantity, sale_id, purchase_id)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(now)
    .bind(effect.kind)
    .bind(effect.product_id)
    .bind(effect.quantity)
    .bind(sale_id)
    .bind(purchase_id)
    .execute(&mut *conn)
    .await?
    .last_insert_rowid();

    Ok(InventoryMovement {
        id,
        created_at: now,
        kind: effect.kind,
        product_id: effect.product_id,
        quantity: effect.quantity,
        sale_id,
        purchase_id,
    })
}
