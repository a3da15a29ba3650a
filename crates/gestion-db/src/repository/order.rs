//! # Order Repository
//!
//! Row access for sales and purchases and their lines.
//!
//! ## Storage Layout
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │   OrderKind::Sale                      OrderKind::Purchase              │
//! │   ───────────────                      ───────────────────              │
//! │   sales          (client_id)           purchases      (supplier_id)     │
//! │   sale_lines     (order_id)            purchase_lines (order_id)        │
//! │   movements.sale_id                    movements.purchase_id            │
//! │                                                                         │
//! │   Both decode into the same `Order` / `LineItem` types; the kind is     │
//! │   selected as a literal column and the counterparty column is          │
//! │   aliased to `counterparty_id`.                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The public [`OrderRepository`] is read-only. Every write lives in the
//! connection-scoped helpers below, which `OrderService` calls inside its own
//! transaction.

use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use gestion_core::order::order_total;
use gestion_core::{LineItem, Money, Order, OrderFilter, OrderKind, OrderStatus};

// =============================================================================
// Table Mapping
// =============================================================================

/// Table and column names backing one order kind.
#[derive(Debug, Clone, Copy)]
pub(crate) struct OrderTables {
    pub header: &'static str,
    pub lines: &'static str,
    pub counterparty_column: &'static str,
    pub counterparty_table: &'static str,
    pub counterparty_name: &'static str,
    /// Column of `inventory_movements` pointing back at this kind.
    pub movement_column: &'static str,
}

pub(crate) const fn tables(kind: OrderKind) -> OrderTables {
    match kind {
        OrderKind::Sale => OrderTables {
            header: "sales",
            lines: "sale_lines",
            counterparty_column: "client_id",
            counterparty_table: "clients",
            counterparty_name: "name",
            movement_column: "sale_id",
        },
        OrderKind::Purchase => OrderTables {
            header: "purchases",
            lines: "purchase_lines",
            counterparty_column: "supplier_id",
            counterparty_table: "suppliers",
            counterparty_name: "company",
            movement_column: "purchase_id",
        },
    }
}

/// SELECT list producing an `Order` row, with the header aliased as `o`.
fn order_select(kind: OrderKind) -> String {
    let t = tables(kind);
    format!(
        "SELECT o.id, '{kind}' AS kind, o.number, o.{cp} AS counterparty_id, o.status, \
         o.total_cents, o.created_at, o.updated_at FROM {header} o",
        kind = kind.as_str(),
        cp = t.counterparty_column,
        header = t.header,
    )
}

fn line_select(kind: OrderKind) -> String {
    format!(
        "SELECT id, order_id, product_id, quantity, unit_price_cents, created_at FROM {}",
        tables(kind).lines
    )
}

// =============================================================================
// Read-only Repository
// =============================================================================

/// Read access to orders for lookups and reporting.
#[derive(Debug, Clone)]
pub struct OrderRepository {
    pool: SqlitePool,
}

impl OrderRepository {
    pub fn new(pool: SqlitePool) -> Self {
        OrderRepository { pool }
    }

    /// Gets an order header by id.
    pub async fn get(&self, kind: OrderKind, id: i64) -> DbResult<Option<Order>> {
        let mut conn = self.pool.acquire().await?;
        fetch_order(&mut conn, kind, id).await
    }

    /// Gets an order by its formatted number (`PED-00042`).
    pub async fn get_by_number(&self, kind: OrderKind, number: &str) -> DbResult<Option<Order>> {
        let sql = format!("{} WHERE o.number = ?1", order_select(kind));
        let order = sqlx::query_as::<_, Order>(&sql)
            .bind(number)
            .fetch_optional(&self.pool)
            .await?;

        Ok(order)
    }

    /// Lines of an order in insertion order.
    pub async fn lines(&self, kind: OrderKind, order_id: i64) -> DbResult<Vec<LineItem>> {
        let mut conn = self.pool.acquire().await?;
        fetch_lines(&mut conn, kind, order_id).await
    }

    /// Lists orders newest first.
    ///
    /// ## Filters
    /// - `from` / `to`: calendar days (UTC), both inclusive
    /// - `counterparty_contains`: case-insensitive substring of the client
    ///   name (sales) or supplier company (purchases)
    pub async fn list(&self, kind: OrderKind, filter: &OrderFilter) -> DbResult<Vec<Order>> {
        debug!(%kind, ?filter, "Listing orders");

        let t = tables(kind);
        let mut query: QueryBuilder<Sqlite> = QueryBuilder::new(format!(
            "{} JOIN {} c ON c.id = o.{} WHERE 1 = 1",
            order_select(kind),
            t.counterparty_table,
            t.counterparty_column
        ));

        if let Some(from) = filter.from {
            query.push(" AND o.created_at >= ").push_bind(start_of_day(from));
        }
        if let Some(end) = filter.to.and_then(|to| to.succ_opt()) {
            query.push(" AND o.created_at < ").push_bind(start_of_day(end));
        }
        if let Some(needle) = filter.counterparty_contains.as_deref().map(str::trim) {
            if !needle.is_empty() {
                query
                    .push(format!(" AND instr(lower(c.{}), lower(", t.counterparty_name))
                    .push_bind(needle.to_string())
                    .push(")) > 0");
            }
        }
        query.push(" ORDER BY o.created_at DESC, o.id DESC");

        let orders = query.build_query_as::<Order>().fetch_all(&self.pool).await?;

        debug!(count = orders.len(), "Listed orders");
        Ok(orders)
    }

    pub async fn count(&self, kind: OrderKind) -> DbResult<i64> {
        let sql = format!("SELECT COUNT(*) FROM {}", tables(kind).header);
        let count: i64 = sqlx::query_scalar(&sql).fetch_one(&self.pool).await?;
        Ok(count)
    }
}

fn start_of_day(date: NaiveDate) -> DateTime<Utc> {
    Utc.from_utc_datetime(&date.and_time(NaiveTime::default()))
}

// =============================================================================
// Transaction-scoped helpers (used by OrderService)
// =============================================================================

/// Touches the order row so the transaction holds the write lock before it
/// reads anything. Returns false when the order does not exist.
pub(crate) async fn claim_order(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    id: i64,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let sql = format!("UPDATE {} SET updated_at = ?2 WHERE id = ?1", tables(kind).header);
    let result = sqlx::query(&sql)
        .bind(id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Same as [`claim_order`], addressed through one of the order's lines.
pub(crate) async fn claim_order_of_line(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    line_id: i64,
    now: DateTime<Utc>,
) -> DbResult<bool> {
    let t = tables(kind);
    let sql = format!(
        "UPDATE {} SET updated_at = ?2 WHERE id = (SELECT order_id FROM {} WHERE id = ?1)",
        t.header, t.lines
    );
    let result = sqlx::query(&sql)
        .bind(line_id)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(result.rows_affected() > 0)
}

pub(crate) async fn fetch_order(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    id: i64,
) -> DbResult<Option<Order>> {
    let sql = format!("{} WHERE o.id = ?1", order_select(kind));
    let order = sqlx::query_as::<_, Order>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(order)
}

/// Inserts a Pending header under a unique placeholder number and returns
/// the generated id. The real number needs that id; see [`stamp_number`].
pub(crate) async fn insert_header(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    counterparty_id: i64,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let t = tables(kind);
    let sql = format!(
        "INSERT INTO {} (number, {}, status, total_cents, created_at, updated_at) \
         VALUES (?1, ?2, ?3, 0, ?4, ?4)",
        t.header, t.counterparty_column
    );
    let placeholder = format!("TMP-{}", Uuid::new_v4());

    let id = sqlx::query(&sql)
        .bind(placeholder)
        .bind(counterparty_id)
        .bind(OrderStatus::Pending)
        .bind(now)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    Ok(id)
}

pub(crate) async fn stamp_number(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    id: i64,
    number: &str,
) -> DbResult<()> {
    let sql = format!("UPDATE {} SET number = ?2 WHERE id = ?1", tables(kind).header);
    sqlx::query(&sql)
        .bind(id)
        .bind(number)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub(crate) async fn set_status(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    id: i64,
    status: OrderStatus,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let sql = format!(
        "UPDATE {} SET status = ?2, updated_at = ?3 WHERE id = ?1",
        tables(kind).header
    );
    sqlx::query(&sql)
        .bind(id)
        .bind(status)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub(crate) async fn fetch_lines(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    order_id: i64,
) -> DbResult<Vec<LineItem>> {
    let sql = format!("{} WHERE order_id = ?1 ORDER BY id", line_select(kind));
    let lines = sqlx::query_as::<_, LineItem>(&sql)
        .bind(order_id)
        .fetch_all(&mut *conn)
        .await?;

    Ok(lines)
}

pub(crate) async fn fetch_line(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    line_id: i64,
) -> DbResult<Option<LineItem>> {
    let sql = format!("{} WHERE id = ?1", line_select(kind));
    let line = sqlx::query_as::<_, LineItem>(&sql)
        .bind(line_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(line)
}

/// The line for an (order, product) pair, if one exists.
pub(crate) async fn find_line(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    order_id: i64,
    product_id: i64,
) -> DbResult<Option<LineItem>> {
    let sql = format!(
        "{} WHERE order_id = ?1 AND product_id = ?2",
        line_select(kind)
    );
    let line = sqlx::query_as::<_, LineItem>(&sql)
        .bind(order_id)
        .bind(product_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(line)
}

pub(crate) async fn insert_line(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    order_id: i64,
    product_id: i64,
    quantity: i64,
    unit_price_cents: i64,
    now: DateTime<Utc>,
) -> DbResult<i64> {
    let sql = format!(
        "INSERT INTO {} (order_id, product_id, quantity, unit_price_cents, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        tables(kind).lines
    );
    let id = sqlx::query(&sql)
        .bind(order_id)
        .bind(product_id)
        .bind(quantity)
        .bind(unit_price_cents)
        .bind(now)
        .execute(&mut *conn)
        .await?
        .last_insert_rowid();

    Ok(id)
}

pub(crate) async fn update_line(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    line_id: i64,
    quantity: i64,
    unit_price_cents: i64,
) -> DbResult<()> {
    let sql = format!(
        "UPDATE {} SET quantity = ?2, unit_price_cents = ?3 WHERE id = ?1",
        tables(kind).lines
    );
    sqlx::query(&sql)
        .bind(line_id)
        .bind(quantity)
        .bind(unit_price_cents)
        .execute(&mut *conn)
        .await?;

    Ok(())
}

pub(crate) async fn delete_line(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    line_id: i64,
) -> DbResult<()> {
    let sql = format!("DELETE FROM {} WHERE id = ?1", tables(kind).lines);
    sqlx::query(&sql).bind(line_id).execute(&mut *conn).await?;
    Ok(())
}

/// Recomputes the order total from its current lines and stores it.
pub(crate) async fn recompute_total(
    conn: &mut SqliteConnection,
    kind: OrderKind,
    order_id: i64,
) -> DbResult<Money> {
    let lines = fetch_lines(conn, kind, order_id).await?;
    let total = order_total(&lines)?;

    let sql = format!(
        "UPDATE {} SET total_cents = ?2 WHERE id = ?1",
        tables(kind).header
    );
    sqlx::query(&sql)
        .bind(order_id)
        .bind(total.cents())
        .execute(&mut *conn)
        .await?;

    debug!(%kind, order_id, total = %total, "Order total recomputed");
    Ok(total)
}
