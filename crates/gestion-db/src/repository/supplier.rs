//! # Supplier Repository
//!
//! Plain CRUD for suppliers, the counterparties of purchases.
//!
//! Deleting a supplier deletes its purchases and clears `supplier_id` on the
//! products it used to supply.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use gestion_core::validation::validate_new_supplier;
use gestion_core::{NewSupplier, Supplier};

/// Repository for supplier database operations.
#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Supplier>> {
        let supplier = sqlx::query_as::<_, Supplier>(
            "SELECT id, company, contact, phone, address FROM suppliers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(supplier)
    }

    pub async fn insert(&self, supplier: &NewSupplier) -> DbResult<Supplier> {
        validate_new_supplier(supplier)?;
        debug!(company = %supplier.company, "Inserting supplier");

        let id = sqlx::query(
            "INSERT INTO suppliers (company, contact, phone, address) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(supplier.company.trim())
        .bind(supplier.contact.trim())
        .bind(supplier.phone.trim())
        .bind(supplier.address.trim())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn update(&self, supplier: &Supplier) -> DbResult<()> {
        validate_new_supplier(&NewSupplier {
            company: supplier.company.clone(),
            contact: supplier.contact.clone(),
            phone: supplier.phone.clone(),
            address: supplier.address.clone(),
        })?;
        debug!(id = supplier.id, "Updating supplier");

        let result = sqlx::query(
            "UPDATE suppliers SET company = ?2, contact = ?3, phone = ?4, address = ?5 WHERE id = ?1",
        )
        .bind(supplier.id)
        .bind(supplier.company.trim())
        .bind(supplier.contact.trim())
        .bind(supplier.phone.trim())
        .bind(supplier.address.trim())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", supplier.id));
        }

        Ok(())
    }

    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting supplier");

        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        Ok(())
    }

    /// All suppliers, sorted by company name.
    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let suppliers = sqlx::query_as::<_, Supplier>(
            "SELECT id, company, contact, phone, address FROM suppliers ORDER BY company, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(suppliers)
    }
}
