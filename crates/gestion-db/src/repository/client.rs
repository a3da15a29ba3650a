//! # Client Repository
//!
//! Plain CRUD for clients, the counterparties of sales. Deleting a client
//! deletes its sales (and their lines).

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::{DbError, DbResult};
use gestion_core::validation::validate_new_client;
use gestion_core::{Client, NewClient};

/// Repository for client database operations.
#[derive(Debug, Clone)]
pub struct ClientRepository {
    pool: SqlitePool,
}

impl ClientRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ClientRepository { pool }
    }

    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<Client>> {
        let client = sqlx::query_as::<_, Client>(
            "SELECT id, name, address, phone, email FROM clients WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(client)
    }

    pub async fn insert(&self, client: &NewClient) -> DbResult<Client> {
        validate_new_client(client)?;
        debug!(name = %client.name, "Inserting client");

        let id = sqlx::query(
            "INSERT INTO clients (name, address, phone, email) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(client.name.trim())
        .bind(client.address.trim())
        .bind(client.phone.trim())
        .bind(client.email.trim())
        .execute(&self.pool)
        .await?
        .last_insert_rowid();

        self.get_by_id(id)
            .await?
            .ok_or_else(|| DbError::not_found("Client", id))
    }

    pub async fn update(&self, client: &Client) -> DbResult<()> {
        validate_new_client(&NewClient {
            name: client.name.clone(),
            address: client.address.clone(),
            phone: client.phone.clone(),
            email: client.email.clone(),
        })?;
        debug!(id = client.id, "Updating client");

        let result = sqlx::query(
            "UPDATE clients SET name = ?2, address = ?3, phone = ?4, email = ?5 WHERE id = ?1",
        )
        .bind(client.id)
        .bind(client.name.trim())
        .bind(client.address.trim())
        .bind(client.phone.trim())
        .bind(client.email.trim())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", client.id));
        }

        Ok(())
    }

    /// Deletes a client together with its sales.
    pub async fn delete(&self, id: i64) -> DbResult<()> {
        debug!(id, "Deleting client");

        let result = sqlx::query("DELETE FROM clients WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Client", id));
        }

        Ok(())
    }

    /// All clients, sorted by name.
    pub async fn list(&self) -> DbResult<Vec<Client>> {
        let clients = sqlx::query_as::<_, Client>(
            "SELECT id, name, address, phone, email FROM clients ORDER BY name, id",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(clients)
    }
}

#[cfg(test)]
mod tests {
    use crate::repository::test_support::{new_client, test_db};

    #[tokio::test]
    async fn test_client_crud() {
        let db = test_db().await;
        let repo = db.clients();

        let mut client = repo.insert(&new_client("Marta Ruiz")).await.unwrap();
        client.phone = "77001122".to_string();
        repo.update(&client).await.unwrap();

        let stored = repo.get_by_id(client.id).await.unwrap().unwrap();
        assert_eq!(stored.phone, "77001122");
        assert_eq!(repo.list().await.unwrap().len(), 1);

        repo.delete(client.id).await.unwrap();
        assert!(repo.get_by_id(client.id).await.unwrap().is_none());
        assert!(repo.delete(client.id).await.unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn test_invalid_email_is_rejected() {
        let db = test_db().await;
        let mut client = new_client("Marta Ruiz");
        client.email = "marta".to_string();

        assert!(db.clients().insert(&client).await.is_err());
    }
}
