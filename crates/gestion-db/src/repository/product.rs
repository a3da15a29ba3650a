//! # Product Repository
//!
//! Database operations for products.
//!
//! ## Key Operations
//! - CRUD operations on catalog fields (code, name, prices, references)
//! - Inventory listing with name / category / low-stock filters
//! - Absolute stock and purchase-cost writes used by order finalization
//!
//! ## Who Writes What
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  Catalog maintenance ──► code, name, description, prices, references   │
//! │                                                                         │
//! │  Order finalization ───► stock_quantity, purchase_cost_cents           │
//! │  (OrderService, same transaction as the ledger rows)                   │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::order;
use gestion_core::validation::{validate_new_product, validate_price_cents, validate_stock};
use gestion_core::{InventoryFilter, Money, NewProduct, OrderKind, Product};

const PRODUCT_COLUMNS: &str = r#"
    id,
    code,
    name,
    description,
    sale_price_cents,
    purchase_cost_cents,
    stock_quantity,
    supplier_id,
    category_id,
    created_at,
    updated_at
"#;

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let product = repo.get_by_code("CAF-500").await?;
/// let low = repo.list(&InventoryFilter { max_stock: Some(5), ..Default::default() }).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, id).await
    }

    /// Gets a product by its business code (e.g., "CAF-500").
    pub async fn get_by_code(&self, code: &str) -> DbResult<Option<Product>> {
        let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE code = ?1");
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(code.trim())
            .fetch_optional(&self.pool)
            .await?;

        Ok(product)
    }

    /// Inserts a new product.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Inserted product with generated id and timestamps
    /// * `Err(DbError::UniqueViolation)` - Code already exists
    /// * `Err(DbError::ForeignKeyViolation)` - Unknown supplier or category
    pub async fn insert(&self, product: &NewProduct) -> DbResult<Product> {
        validate_new_product(product)?;
        debug!(code = %product.code, "Inserting product");

        let now = Utc::now();
        let code = product.code.trim();

        let id = sqlx::query(
            r#"
            INSERT INTO products (
                code, name, description,
                sale_price_cents, purchase_cost_cents, stock_quantity,
                supplier_id, category_id, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)
            "#,
        )
        .bind(code)
        .bind(product.name.trim())
        .bind(&product.description)
        .bind(product.sale_price_cents)
        .bind(product.purchase_cost_cents)
        .bind(product.stock_quantity)
        .bind(product.supplier_id)
        .bind(product.category_id)
        .bind(now)
        .execute(&self.pool)
        .await
        .map_err(|e| match DbError::from(e) {
            DbError::UniqueViolation { field, .. } => DbError::duplicate(field, code),
            other => other,
        })?
        .last_insert_rowid();

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))
    }

    /// Updates the catalog fields of an existing product.
    ///
    /// Stock is not touched here; it moves through order finalization or
    /// [`ProductRepository::set_stock`].
    ///
    /// ## Returns
    /// * `Ok(())` - Update successful
    /// * `Err(DbError::Domain(NotFound))` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        debug!(id = product.id, "Updating product");

        validate_new_product(&NewProduct {
            code: product.code.clone(),
            name: product.name.clone(),
            description: product.description.clone(),
            sale_price_cents: product.sale_price_cents,
            purchase_cost_cents: product.purchase_cost_cents,
            stock_quantity: product.stock_quantity,
            supplier_id: product.supplier_id,
            category_id: product.category_id,
        })?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                code = ?2,
                name = ?3,
                description = ?4,
                sale_price_cents = ?5,
                purchase_cost_cents = ?6,
                supplier_id = ?7,
                category_id = ?8,
                updated_at = ?9
            WHERE id = ?1
            "#,
        )
        .bind(product.id)
        .bind(product.code.trim())
        .bind(product.name.trim())
        .bind(&product.description)
        .bind(product.sale_price_cents)
        .bind(product.purchase_cost_cents)
        .bind(product.supplier_id)
        .bind(product.category_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", product.id));
        }

        Ok(())
    }

    /// Deletes a product. Its order lines and ledger rows go with it.
    ///
    /// Every order that lost a line gets its total recomputed in the same
    /// transaction, finalized and cancelled ones included: a total is always
    /// the sum of the lines the order still has.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting product");

        let mut tx = self.pool.begin().await?;

        let mut affected = Vec::new();
        for kind in [OrderKind::Sale, OrderKind::Purchase] {
            let sql = format!(
                "SELECT DISTINCT order_id FROM {} WHERE product_id = ?1",
                order::tables(kind).lines
            );
            let order_ids: Vec<i64> = sqlx::query_scalar(&sql)
                .bind(id)
                .fetch_all(&mut *tx)
                .await?;
            affected.extend(order_ids.into_iter().map(|order_id| (kind, order_id)));
        }

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        for (kind, order_id) in &affected {
            order::recompute_total(&mut tx, *kind, *order_id).await?;
        }

        tx.commit().await?;

        debug!(id, orders = affected.len(), "Product deleted");
        Ok(())
    }

    /// Sets the absolute stock level (manual inventory correction).
    pub async fn set_stock(&self, id: i64, quantity: i64) -> DbResult<()> {
        validate_stock(quantity)?;
        debug!(id, quantity, "Setting stock");

        let mut conn = self.pool.acquire().await?;
        write_stock(&mut conn, id, quantity, None, Utc::now()).await
    }

    /// Overwrites the last purchase cost.
    pub async fn update_purchase_cost(&self, id: i64, cost: Money) -> DbResult<()> {
        validate_price_cents(cost.cents())?;
        debug!(id, cost = %cost, "Updating purchase cost");

        let result = sqlx::query(
            "UPDATE products SET purchase_cost_cents = ?2, updated_at = ?3 WHERE id = ?1",
        )
        .bind(id)
        .bind(cost.cents())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Lists products matching the inventory filter, sorted by name.
    ///
    /// ## Filters
    /// - `name_contains`: case-insensitive substring of the name
    /// - `category_id`: exact category
    /// - `max_stock`: stock at or below this level ("low stock" view)
    pub async fn list(&self, filter: &InventoryFilter) -> DbResult<Vec<Product>> {
        debug!(?filter, "Listing products");

        let mut query: QueryBuilder<Sqlite> =
            QueryBuilder::new(format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE 1 = 1"));

        if let Some(name) = filter.name_contains.as_deref().map(str::trim) {
            if !name.is_empty() {
                query
                    .push(" AND instr(lower(name), lower(")
                    .push_bind(name.to_string())
                    .push(")) > 0");
            }
        }
        if let Some(category_id) = filter.category_id {
            query.push(" AND category_id = ").push_bind(category_id);
        }
        if let Some(max_stock) = filter.max_stock {
            query.push(" AND stock_quantity <= ").push_bind(max_stock);
        }
        query.push(" ORDER BY name, id");

        let products = query
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Products a purchase placed with `supplier_id` may contain.
    pub async fn list_by_supplier(&self, supplier_id: i64) -> DbResult<Vec<Product>> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM products WHERE supplier_id = ?1 ORDER BY name, id"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(supplier_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(products)
    }

    /// Counts total products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Transaction-scoped helpers (used by OrderService)
// =============================================================================

pub(crate) async fn fetch_product(conn: &mut SqliteConnection, id: i64) -> DbResult<Option<Product>> {
    let sql = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1");
    let product = sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(product)
}

/// Writes an absolute stock level, and the purchase cost when given.
pub(crate) async fn write_stock(
    conn: &mut SqliteConnection,
    id: i64,
    stock_quantity: i64,
    purchase_cost_cents: Option<i64>,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            stock_quantity = ?2,
            purchase_cost_cents = COALESCE(?3, purchase_cost_cents),
            updated_at = ?4
        WHERE id = ?1
        "#,
    )
    .bind(id)
    .bind(stock_quantity)
    .bind(purchase_cost_cents)
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
