//! Line-item management: upsert by product, removal, total recomputation.

use chrono::Utc;
use tracing::{debug, info};

use super::{log_rejection, LineUpsert, OrderService};
use crate::error::{DbError, DbResult};
use crate::repository::{order, product};
use gestion_core::order::{ensure_editable, ensure_supplied_by, plan_line_upsert, LineChange};
use gestion_core::{Action, Actor, Money, Order, OrderKind};

impl OrderService {
    /// Adds `quantity` units of a product to a Pending sale.
    ///
    /// The unit price is the product's sale price right now; an existing
    /// line for the product gets the quantity added and the price refreshed.
    pub async fn add_sale_line(
        &self,
        actor: &Actor,
        sale_id: i64,
        product_id: i64,
        quantity: i64,
    ) -> DbResult<LineUpsert> {
        self.authorize(actor, Action::EditSaleLines)?;
        self.upsert_line(OrderKind::Sale, sale_id, product_id, quantity, None)
            .await
            .inspect_err(|err| log_rejection("add line", OrderKind::Sale, sale_id, err))
    }

    /// Adds `quantity` units at the negotiated `unit_cost` to a Pending
    /// purchase. The product must be supplied by the purchase's supplier.
    pub async fn add_purchase_line(
        &self,
        actor: &Actor,
        purchase_id: i64,
        product_id: i64,
        quantity: i64,
        unit_cost: Money,
    ) -> DbResult<LineUpsert> {
        self.authorize(actor, Action::EditPurchaseLines)?;
        self.upsert_line(
            OrderKind::Purchase,
            purchase_id,
            product_id,
            quantity,
            Some(unit_cost),
        )
        .await
        .inspect_err(|err| log_rejection("add line", OrderKind::Purchase, purchase_id, err))
    }

    /// Deletes a line from a Pending order and recomputes its total.
    pub async fn remove_line(&self, actor: &Actor, kind: OrderKind, line_id: i64) -> DbResult<Order> {
        self.authorize(actor, Action::edit_lines(kind))?;
        self.remove_line_in_tx(kind, line_id)
            .await
            .inspect_err(|err| log_rejection("remove line", kind, line_id, err))
    }

    async fn upsert_line(
        &self,
        kind: OrderKind,
        order_id: i64,
        product_id: i64,
        quantity: i64,
        unit_cost: Option<Money>,
    ) -> DbResult<LineUpsert> {
        debug!(%kind, order_id, product_id, quantity, "Upserting order line");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if !order::claim_order(&mut tx, kind, order_id, now).await? {
            return Err(DbError::not_found(kind.entity(), order_id));
        }
        let current = order::fetch_order(&mut tx, kind, order_id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), order_id))?;
        ensure_editable(&current, "add lines")?;

        let item = product::fetch_product(&mut tx, product_id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", product_id))?;
        ensure_supplied_by(&current, &item)?;

        let unit_price = unit_cost.unwrap_or_else(|| item.sale_price());

        let existing = order::find_line(&mut tx, kind, order_id, product_id).await?;
        let line_id = match plan_line_upsert(existing.as_ref(), quantity, unit_price)? {
            LineChange::Insert {
                quantity,
                unit_price_cents,
            } => {
                order::insert_line(
                    &mut tx,
                    kind,
                    order_id,
                    product_id,
                    quantity,
                    unit_price_cents,
                    now,
                )
                .await?
            }
            LineChange::Update {
                line_id,
                quantity,
                unit_price_cents,
            } => {
                order::update_line(&mut tx, kind, line_id, quantity, unit_price_cents).await?;
                line_id
            }
        };

        let total = order::recompute_total(&mut tx, kind, order_id).await?;

        let line = order::fetch_line(&mut tx, kind, line_id)
            .await?
            .ok_or_else(|| DbError::not_found("Line", line_id))?;
        let updated = order::fetch_order(&mut tx, kind, order_id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), order_id))?;

        tx.commit().await?;

        info!(
            %kind,
            number = %updated.number,
            product = %item.code,
            quantity = line.quantity,
            total = %total,
            "Order line upserted"
        );
        Ok(LineUpsert {
            order: updated,
            line,
        })
    }

    async fn remove_line_in_tx(&self, kind: OrderKind, line_id: i64) -> DbResult<Order> {
        debug!(%kind, line_id, "Removing order line");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if !order::claim_order_of_line(&mut tx, kind, line_id, now).await? {
            return Err(DbError::not_found("Line", line_id));
        }
        let line = order::fetch_line(&mut tx, kind, line_id)
            .await?
            .ok_or_else(|| DbError::not_found("Line", line_id))?;
        let current = order::fetch_order(&mut tx, kind, line.order_id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), line.order_id))?;
        ensure_editable(&current, "remove lines")?;

        order::delete_line(&mut tx, kind, line_id).await?;
        let total = order::recompute_total(&mut tx, kind, current.id).await?;

        let updated = order::fetch_order(&mut tx, kind, current.id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), current.id))?;

        tx.commit().await?;

        info!(%kind, number = %updated.number, line_id, total = %total, "Order line removed");
        Ok(updated)
    }
}
