//! Fulfillment state machine: finalize and cancel.
//!
//! ```text
//! finalize(sale)      Pending ──► Completed   stock -= qty, `salida` rows
//! finalize(purchase)  Pending ──► Received    stock += qty, cost = last line, `entrada` rows
//! cancel(any)         Pending ──► Cancelled   no stock or ledger effect
//! any call on a terminal order: no-op, `applied == false`
//! ```

use chrono::Utc;
use std::collections::HashMap;
use tracing::{debug, info};

use super::{log_rejection, OrderService, TransitionOutcome};
use crate::error::{DbError, DbResult};
use crate::repository::{movement, order, product};
use gestion_core::order::{next_status, plan_finalize, Transition};
use gestion_core::{Action, Actor, OrderKind};

impl OrderService {
    /// Commits the order's stock effects and moves it to Completed (sale)
    /// or Received (purchase).
    ///
    /// Sales fail with `InsufficientStock` when any line exceeds the stock
    /// on hand; nothing is applied in that case.
    pub async fn finalize(
        &self,
        actor: &Actor,
        kind: OrderKind,
        order_id: i64,
    ) -> DbResult<TransitionOutcome> {
        self.authorize(actor, Action::finalize(kind))?;
        self.finalize_in_tx(kind, order_id)
            .await
            .inspect_err(|err| log_rejection("finalize", kind, order_id, err))
    }

    /// Moves a Pending order to Cancelled.
    pub async fn cancel(
        &self,
        actor: &Actor,
        kind: OrderKind,
        order_id: i64,
    ) -> DbResult<TransitionOutcome> {
        self.authorize(actor, Action::cancel(kind))?;
        self.cancel_in_tx(kind, order_id)
            .await
            .inspect_err(|err| log_rejection("cancel", kind, order_id, err))
    }

    async fn finalize_in_tx(&self, kind: OrderKind, order_id: i64) -> DbResult<TransitionOutcome> {
        debug!(%kind, order_id, "Finalizing order");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if !order::claim_order(&mut tx, kind, order_id, now).await? {
            return Err(DbError::not_found(kind.entity(), order_id));
        }
        let current = order::fetch_order(&mut tx, kind, order_id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), order_id))?;

        let Some(status) = next_status(kind, current.status, Transition::Finalize) else {
            // Dropping the transaction reverts the claim as well.
            debug!(%kind, number = %current.number, status = %current.status, "Already terminal");
            return Ok(TransitionOutcome {
                order: current,
                applied: false,
                movements: Vec::new(),
            });
        };

        let lines = order::fetch_lines(&mut tx, kind, order_id).await?;
        let mut products = HashMap::with_capacity(lines.len());
        for line in &lines {
            if products.contains_key(&line.product_id) {
                continue;
            }
            if let Some(item) = product::fetch_product(&mut tx, line.product_id).await? {
                products.insert(item.id, item);
            }
        }

        let effects = plan_finalize(kind, &lines, &products)?;

        let mut movements = Vec::with_capacity(effects.len());
        for effect in &effects {
            product::write_stock(
                &mut tx,
                effect.product_id,
                effect.stock_after,
                effect.purchase_cost_cents,
                now,
            )
            .await?;
            movements.push(movement::record_movement(&mut tx, kind, order_id, effect, now).await?);
        }

        order::set_status(&mut tx, kind, order_id, status, now).await?;
        let finalized = order::fetch_order(&mut tx, kind, order_id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), order_id))?;

        tx.commit().await?;

        info!(
            %kind,
            number = %finalized.number,
            status = %finalized.status,
            movements = movements.len(),
            total = %finalized.total(),
            "Order finalized"
        );
        Ok(TransitionOutcome {
            order: finalized,
            applied: true,
            movements,
        })
    }

    async fn cancel_in_tx(&self, kind: OrderKind, order_id: i64) -> DbResult<TransitionOutcome> {
        debug!(%kind, order_id, "Cancelling order");

        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        if !order::claim_order(&mut tx, kind, order_id, now).await? {
            return Err(DbError::not_found(kind.entity(), order_id));
        }
        let current = order::fetch_order(&mut tx, kind, order_id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), order_id))?;

        let Some(status) = next_status(kind, current.status, Transition::Cancel) else {
            debug!(%kind, number = %current.number, status = %current.status, "Already terminal");
            return Ok(TransitionOutcome {
                order: current,
                applied: false,
                movements: Vec::new(),
            });
        };

        order::set_status(&mut tx, kind, order_id, status, now).await?;
        let cancelled = order::fetch_order(&mut tx, kind, order_id)
            .await?
            .ok_or_else(|| DbError::not_found(kind.entity(), order_id))?;

        tx.commit().await?;

        info!(%kind, number = %cancelled.number, "Order cancelled");
        Ok(TransitionOutcome {
            order: cancelled,
            applied: true,
            movements: Vec::new(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_support::Fixture;
    use crate::pool::{Database, DbConfig};
    use gestion_core::{
        Actor, CoreError, Money, MovementKind, OrderKind, OrderStatus, Role, ValidationError,
        MAX_STOCK_QUANTITY,
    };
    use std::time::Duration;
    use uuid::Uuid;

    #[tokio::test]
    async fn test_sale_finalize_decrements_stock_and_records_outbound() {
        let fx = Fixture::new().await;
        let coffee = fx.product("CAF-500", 1000, 10).await;
        let sale = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        fx.service.add_sale_line(&fx.admin, sale.id, coffee.id, 4).await.unwrap();

        let outcome = fx
            .service
            .finalize(&fx.admin, OrderKind::Sale, sale.id)
            .await
            .unwrap();

        assert!(outcome.applied);
        assert_eq!(outcome.order.status, OrderStatus::Completed);
        assert_eq!(fx.stock(coffee.id).await, 6);

        let ledger = fx.db.movements().by_order(OrderKind::Sale, sale.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, MovementKind::Outbound);
        assert_eq!(ledger[0].quantity, 4);
        assert_eq!(ledger[0].product_id, coffee.id);
        assert_eq!(ledger[0].sale_id, Some(sale.id));
        assert_eq!(ledger[0].purchase_id, None);
        assert_eq!(outcome.movements.len(), 1);
        assert_eq!(outcome.movements[0].id, ledger[0].id);
    }

    #[tokio::test]
    async fn test_sale_finalize_is_all_or_nothing() {
        let fx = Fixture::new().await;
        let a = fx.product("A-1", 1000, 5).await;
        let b = fx.product("B-1", 1000, 1).await;
        let sale = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        fx.service.add_sale_line(&fx.admin, sale.id, a.id, 3).await.unwrap();
        fx.service.add_sale_line(&fx.admin, sale.id, b.id, 2).await.unwrap();

        let err = fx
            .service
            .finalize(&fx.admin, OrderKind::Sale, sale.id)
            .await
            .unwrap_err();
        assert_eq!(
            err.domain(),
            Some(&CoreError::InsufficientStock {
                product: "B-1".to_string(),
                requested: 2,
                available: 1,
            })
        );

        let stored = fx.service.get_order(OrderKind::Sale, sale.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(fx.stock(a.id).await, 5);
        assert_eq!(fx.stock(b.id).await, 1);
        assert_eq!(fx.db.movements().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_purchase_receive_increments_stock_and_cost() {
        let fx = Fixture::new().await;
        let beans = fx.product("GRANO-1", 900, 0).await;
        let purchase = fx
            .service
            .create_purchase(&fx.admin, fx.supplier_id)
            .await
            .unwrap();
        fx.service
            .add_purchase_line(&fx.admin, purchase.id, beans.id, 10, Money::from_cents(250))
            .await
            .unwrap();

        let outcome = fx
            .service
            .finalize(&fx.admin, OrderKind::Purchase, purchase.id)
            .await
            .unwrap();
        assert_eq!(outcome.order.status, OrderStatus::Received);

        let stored = fx.db.products().get_by_id(beans.id).await.unwrap().unwrap();
        assert_eq!(stored.stock_quantity, 10);
        assert_eq!(stored.purchase_cost(), Money::from_cents(250));

        let ledger = fx.db.movements().by_product(beans.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, MovementKind::Inbound);
        assert_eq!(ledger[0].quantity, 10);
        assert_eq!(ledger[0].purchase_id, Some(purchase.id));
    }

    #[tokio::test]
    async fn test_terminal_orders_do_not_change() {
        let fx = Fixture::new().await;
        let coffee = fx.product("CAF-500", 1000, 10).await;
        let sale = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        fx.service.add_sale_line(&fx.admin, sale.id, coffee.id, 4).await.unwrap();
        let completed = fx
            .service
            .finalize(&fx.admin, OrderKind::Sale, sale.id)
            .await
            .unwrap()
            .order;

        let again = fx
            .service
            .finalize(&fx.admin, OrderKind::Sale, sale.id)
            .await
            .unwrap();
        assert!(!again.applied);
        assert!(again.movements.is_empty());

        let cancel = fx
            .service
            .cancel(&fx.admin, OrderKind::Sale, sale.id)
            .await
            .unwrap();
        assert!(!cancel.applied);

        let stored = fx.service.get_order(OrderKind::Sale, sale.id).await.unwrap();
        assert_eq!(stored, completed);
        assert_eq!(fx.stock(coffee.id).await, 6);
        assert_eq!(fx.db.movements().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_received_purchase_does_not_change() {
        let fx = Fixture::new().await;
        let beans = fx.product("GRANO-1", 900, 2).await;
        let purchase = fx
            .service
            .create_purchase(&fx.admin, fx.supplier_id)
            .await
            .unwrap();
        fx.service
            .add_purchase_line(&fx.admin, purchase.id, beans.id, 10, Money::from_cents(250))
            .await
            .unwrap();
        let received = fx
            .service
            .finalize(&fx.admin, OrderKind::Purchase, purchase.id)
            .await
            .unwrap()
            .order;

        // A later catalog edit must survive the repeated calls below.
        fx.db
            .products()
            .update_purchase_cost(beans.id, Money::from_cents(275))
            .await
            .unwrap();

        let again = fx
            .service
            .finalize(&fx.admin, OrderKind::Purchase, purchase.id)
            .await
            .unwrap();
        assert!(!again.applied);
        assert!(again.movements.is_empty());

        let cancel = fx
            .service
            .cancel(&fx.admin, OrderKind::Purchase, purchase.id)
            .await
            .unwrap();
        assert!(!cancel.applied);
        assert_eq!(cancel.order.status, OrderStatus::Received);

        let stored = fx
            .service
            .get_order(OrderKind::Purchase, purchase.id)
            .await
            .unwrap();
        assert_eq!(stored, received);

        let product = fx.db.products().get_by_id(beans.id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, 12);
        assert_eq!(product.purchase_cost(), Money::from_cents(275));

        let ledger = fx.db.movements().by_product(beans.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, MovementKind::Inbound);
    }

    #[tokio::test]
    async fn test_receive_past_stock_limit_is_rejected() {
        let fx = Fixture::new().await;
        let beans = fx.product("GRANO-1", 900, 0).await;
        let sugar = fx.product("AZU-1", 300, 4).await;
        fx.db
            .products()
            .set_stock(beans.id, MAX_STOCK_QUANTITY - 1)
            .await
            .unwrap();

        let purchase = fx
            .service
            .create_purchase(&fx.admin, fx.supplier_id)
            .await
            .unwrap();
        fx.service
            .add_purchase_line(&fx.admin, purchase.id, sugar.id, 6, Money::from_cents(200))
            .await
            .unwrap();
        fx.service
            .add_purchase_line(&fx.admin, purchase.id, beans.id, 10, Money::from_cents(250))
            .await
            .unwrap();

        let err = fx
            .service
            .finalize(&fx.admin, OrderKind::Purchase, purchase.id)
            .await
            .unwrap_err();
        assert!(matches!(
            err.domain(),
            Some(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));

        let stored = fx
            .service
            .get_order(OrderKind::Purchase, purchase.id)
            .await
            .unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
        assert_eq!(fx.stock(beans.id).await, MAX_STOCK_QUANTITY - 1);
        assert_eq!(fx.stock(sugar.id).await, 4);
        assert_eq!(fx.db.movements().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_cancel_has_no_stock_effect() {
        let fx = Fixture::new().await;
        let coffee = fx.product("CAF-500", 1000, 10).await;
        let sale = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        fx.service.add_sale_line(&fx.admin, sale.id, coffee.id, 4).await.unwrap();

        let outcome = fx
            .service
            .cancel(&fx.admin, OrderKind::Sale, sale.id)
            .await
            .unwrap();
        assert!(outcome.applied);
        assert_eq!(outcome.order.status, OrderStatus::Cancelled);
        assert_eq!(outcome.order.total().cents(), 4000);

        // A cancelled order never finalizes.
        let finalize = fx
            .service
            .finalize(&fx.admin, OrderKind::Sale, sale.id)
            .await
            .unwrap();
        assert!(!finalize.applied);
        assert_eq!(finalize.order.status, OrderStatus::Cancelled);

        assert_eq!(fx.stock(coffee.id).await, 10);
        assert_eq!(fx.db.movements().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_transitions_are_gated_by_policy() {
        let fx = Fixture::new().await;
        let sale = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        let buyer = Actor::new("bea", [Role::Buyer]);

        let err = fx
            .service
            .finalize(&buyer, OrderKind::Sale, sale.id)
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::Forbidden { .. })));

        let err = fx
            .service
            .cancel(&buyer, OrderKind::Sale, sale.id)
            .await
            .unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::Forbidden { .. })));

        let stored = fx.service.get_order(OrderKind::Sale, sale.id).await.unwrap();
        assert_eq!(stored.status, OrderStatus::Pending);
    }

    #[tokio::test]
    async fn test_unknown_order_is_not_found() {
        let fx = Fixture::new().await;

        let err = fx
            .service
            .finalize(&fx.admin, OrderKind::Purchase, 77)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_finalize_sells_last_unit_once() {
        let path = std::env::temp_dir().join(format!("gestion-finalize-{}.db", Uuid::new_v4()));
        let db = Database::new(
            DbConfig::new(path.clone())
                .max_connections(4)
                .busy_timeout(Duration::from_secs(30)),
        )
        .await
        .unwrap();
        let fx = Fixture::with_db(db).await;

        let last_unit = fx.product("ULT-1", 1000, 1).await;
        let first = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        let second = fx.service.create_sale(&fx.admin, fx.client_id).await.unwrap();
        fx.service.add_sale_line(&fx.admin, first.id, last_unit.id, 1).await.unwrap();
        fx.service.add_sale_line(&fx.admin, second.id, last_unit.id, 1).await.unwrap();

        let (a, b) = {
            let (svc_a, svc_b) = (fx.service.clone(), fx.service.clone());
            let (admin_a, admin_b) = (fx.admin.clone(), fx.admin.clone());
            let (first_id, second_id) = (first.id, second.id);
            let task_a = tokio::spawn(async move {
                svc_a.finalize(&admin_a, OrderKind::Sale, first_id).await
            });
            let task_b = tokio::spawn(async move {
                svc_b.finalize(&admin_b, OrderKind::Sale, second_id).await
            });
            (task_a.await.unwrap(), task_b.await.unwrap())
        };

        assert_eq!([&a, &b].iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(fx.stock(last_unit.id).await, 0);

        let ledger = fx.db.movements().by_product(last_unit.id).await.unwrap();
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger[0].kind, MovementKind::Outbound);

        let statuses = [
            fx.service.get_order(OrderKind::Sale, first.id).await.unwrap().status,
            fx.service.get_order(OrderKind::Sale, second.id).await.unwrap().status,
        ];
        assert_eq!(
            statuses.iter().filter(|s| **s == OrderStatus::Completed).count(),
            1
        );
        assert_eq!(
            statuses.iter().filter(|s| **s == OrderStatus::Pending).count(),
            1
        );

        fx.db.close().await;
        for suffix in ["", "-wal", "-shm"] {
            let _ = std::fs::remove_file(format!("{}{}", path.display(), suffix));
        }
    }
}
