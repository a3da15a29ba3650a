//! Order headers: two-phase creation and lookups.

use chrono::Utc;
use tracing::{debug, info};

use super::{log_rejection, OrderService};
use crate::error::{DbError, DbResult};
use crate::repository::order;
use gestion_core::order::order_number;
use gestion_core::{Action, Actor, LineItem, Order, OrderKind};

impl OrderService {
    /// Opens a Pending sale for `client_id`.
    pub async fn create_sale(&self, actor: &Actor, client_id: i64) -> DbResult<Order> {
        self.create(actor, OrderKind::Sale, client_id).await
    }

    /// Opens a Pending purchase with `supplier_id`.
    pub async fn create_purchase(&self, actor: &Actor, supplier_id: i64) -> DbResult<Order> {
        self.create(actor, OrderKind::Purchase, supplier_id).await
    }

    /// Creates the header in two phases inside one transaction: insert under
    /// a placeholder number to obtain the id, then stamp the number derived
    /// from it.
    async fn create(&self, actor: &Actor, kind: OrderKind, counterparty_id: i64) -> DbResult<Order> {
        self.authorize(actor, Action::create(kind))?;
        debug!(%kind, counterparty_id, "Creating order");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        let id = match order::insert_header(&mut tx, kind, counterparty_id, now).await {
            Ok(id) => id,
            Err(DbError::ForeignKeyViolation { .. }) => {
                let err = DbError::not_found(kind.counterparty(), counterparty_id);
                log_rejection("create", kind, counterparty_id, &err);
                return Err(err);
            }
            Err(err) => return Err(err),
        };

        let number = order_number(kind, id);
        order::stamp_number(&mut tx, kind, id, &number).await?;

        let created = order::fetch_order(&mut tx, kind, id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), id))?;

        tx.commit().await?;

        info!(%kind, id, number = %created.number, counterparty_id, "Order created");
        Ok(created)
    }

    /// Looks up an order header.
    pub async fn get_order(&self, kind: OrderKind, id: i64) -> DbResult<Order> {
        let mut conn = self.pool.acquire().await?;
        order::fetch_order(&mut conn, kind, id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), id))
    }

    /// Lines of an existing order, in insertion order.
    pub async fn order_lines(&self, kind: OrderKind, id: i64) -> DbResult<Vec<LineItem>> {
        let mut conn = self.pool.acquire().await?;
        if order::fetch_order(&mut conn, kind, id).await?.is_none() {
            return Err(DbError::not_found(kind.entity(), id));
        }
        order::fetch_lines(&mut conn, kind, id).await
    }
}
