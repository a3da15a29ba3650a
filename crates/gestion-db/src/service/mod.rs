//! # Order Service
//!
//! The transactional order workflow: header creation, line upserts and the
//! fulfillment state machine.
//!
//! ## Unit of Work
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  every mutating call                                                    │
//! │                                                                         │
//! │  1. policy check ─────────────── Forbidden? return, nothing opened     │
//! │  2. BEGIN                                                               │
//! │  3. touch order row (updated_at) ── takes the SQLite write lock FIRST, │
//! │     so every read below sees the latest committed state and no other   │
//! │     writer can interleave until COMMIT                                 │
//! │  4. read order / lines / products                                      │
//! │  5. ask gestion-core what to do (plan_line_upsert, plan_finalize)      │
//! │  6. write lines / total / stock / ledger / status                      │
//! │  7. COMMIT                                                              │
//! │                                                                         │
//! │  Any error between 2 and 7 drops the transaction: full rollback.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Operations live in three files, one per concern:
//! - `orders`: create and look up order headers
//! - `line_items`: add / remove lines, total recomputation
//! - `fulfillment`: finalize and cancel

mod fulfillment;
mod line_items;
mod orders;

use serde::Serialize;
use sqlx::SqlitePool;
use std::fmt;
use std::sync::Arc;
use tracing::warn;

use crate::error::{DbError, DbResult};
use gestion_core::policy::authorize;
use gestion_core::{Action, Actor, Authorizer, InventoryMovement, LineItem, Order, OrderKind};

/// Result of a finalize or cancel call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TransitionOutcome {
    /// The order as stored after the call.
    pub order: Order,
    /// False when the order was already terminal and nothing changed.
    pub applied: bool,
    /// Ledger rows written by this call (finalize only).
    pub movements: Vec<InventoryMovement>,
}

/// Result of a line upsert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineUpsert {
    /// The order with its recomputed total.
    pub order: Order,
    /// The inserted or consolidated line.
    pub line: LineItem,
}

/// Order workflow over one connection pool, guarded by an [`Authorizer`].
#[derive(Clone)]
pub struct OrderService {
    pool: SqlitePool,
    policy: Arc<dyn Authorizer>,
}

impl fmt::Debug for OrderService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OrderService").finish_non_exhaustive()
    }
}

impl OrderService {
    pub fn new(pool: SqlitePool, policy: Arc<dyn Authorizer>) -> Self {
        OrderService { pool, policy }
    }

    fn authorize(&self, actor: &Actor, action: Action) -> DbResult<()> {
        authorize(self.policy.as_ref(), actor, action).map_err(|err| {
            warn!(actor = %actor.username, %action, "Operation forbidden");
            DbError::from(err)
        })
    }
}

/// Logs a domain rejection; storage failures are left to the caller.
fn log_rejection(operation: &str, kind: OrderKind, id: i64, err: &DbError) {
    if let Some(reason) = err.domain() {
        warn!(operation, %kind, id, %reason, "Order operation rejected");
    }
}

// =============================================================================
// Test Support
// =============================================================================

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::pool::Database;
    use crate::repository::test_support::{new_client, new_product, new_supplier, test_db};
    use gestion_core::{Product, Role, RolePolicy};

    pub struct Fixture {
        pub db: Database,
        pub service: OrderService,
        pub admin: Actor,
        pub client_id: i64,
        pub supplier_id: i64,
    }

    impl Fixture {
        pub async fn new() -> Self {
            Self::with_db(test_db().await).await
        }

        pub async fn with_db(db: Database) -> Self {
            let client_id = db.clients().insert(&new_client("Marta Ruiz")).await.unwrap().id;
            let supplier_id = db
                .suppliers()
                .insert(&new_supplier("Cafetalera del Sur"))
                .await
                .unwrap()
                .id;

            Fixture {
                service: db.order_service(Arc::new(RolePolicy)),
                db,
                admin: Actor::new("admin", [Role::Administrator]),
                client_id,
                supplier_id,
            }
        }

        /// A product supplied by the fixture supplier.
        pub async fn product(&self, code: &str, sale_price_cents: i64, stock: i64) -> Product {
            let mut product = new_product(code, sale_price_cents, stock);
            product.supplier_id = Some(self.supplier_id);
            self.db.products().insert(&product).await.unwrap()
        }

        pub async fn stock(&self, product_id: i64) -> i64 {
            self.db
                .products()
                .get_by_id(product_id)
                .await
                .unwrap()
                .unwrap()
                .stock_quantity
        }
    }
}
