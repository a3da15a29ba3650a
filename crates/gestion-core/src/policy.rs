//! # Capability Policy
//!
//! Every mutating order operation asks an [`Authorizer`] first and fails
//! with [`CoreError::Forbidden`] on denial. How actors are authenticated is
//! the caller's business; this module only answers "may this actor do that".
//!
//! ## Default Roles
//! ```text
//! ┌──────────────────┬───────────────────────────────────────────────────┐
//! │ Role             │ Allowed actions                                   │
//! ├──────────────────┼───────────────────────────────────────────────────┤
//! │ Administrator    │ everything                                        │
//! │ Seller           │ create / edit / finalize / cancel sales           │
//! │ Buyer            │ create / edit / receive / cancel purchases        │
//! └──────────────────┴───────────────────────────────────────────────────┘
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::types::OrderKind;

/// A user group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Administrator,
    Seller,
    Buyer,
}

/// The authenticated caller of an operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Actor {
    pub username: String,
    pub roles: Vec<Role>,
}

impl Actor {
    pub fn new(username: impl Into<String>, roles: impl IntoIterator<Item = Role>) -> Self {
        Actor {
            username: username.into(),
            roles: roles.into_iter().collect(),
        }
    }

    pub fn has_role(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }
}

/// Order operations subject to the capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    CreateSale,
    EditSaleLines,
    FinalizeSale,
    CancelSale,
    CreatePurchase,
    EditPurchaseLines,
    ReceivePurchase,
    CancelPurchase,
}

impl Action {
    pub const fn create(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Sale => Action::CreateSale,
            OrderKind::Purchase => Action::CreatePurchase,
        }
    }

    pub const fn edit_lines(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Sale => Action::EditSaleLines,
            OrderKind::Purchase => Action::EditPurchaseLines,
        }
    }

    pub const fn finalize(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Sale => Action::FinalizeSale,
            OrderKind::Purchase => Action::ReceivePurchase,
        }
    }

    pub const fn cancel(kind: OrderKind) -> Self {
        match kind {
            OrderKind::Sale => Action::CancelSale,
            OrderKind::Purchase => Action::CancelPurchase,
        }
    }

    /// The order kind this action operates on.
    pub const fn kind(&self) -> OrderKind {
        match self {
            Action::CreateSale | Action::EditSaleLines | Action::FinalizeSale | Action::CancelSale => {
                OrderKind::Sale
            }
            _ => OrderKind::Purchase,
        }
    }

    pub const fn as_str(&self) -> &'static str {
        match self {
            Action::CreateSale => "create sales",
            Action::EditSaleLines => "edit sale lines",
            Action::FinalizeSale => "finalize sales",
            Action::CancelSale => "cancel sales",
            Action::CreatePurchase => "create purchases",
            Action::EditPurchaseLines => "edit purchase lines",
            Action::ReceivePurchase => "receive purchases",
            Action::CancelPurchase => "cancel purchases",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Capability check consulted before every mutating order operation.
pub trait Authorizer: Send + Sync {
    fn actor_can_perform(&self, actor: &Actor, action: Action) -> bool;
}

/// Group-based policy: administrators do everything, sellers own sales,
/// buyers own purchases.
#[derive(Debug, Clone, Copy, Default)]
pub struct RolePolicy;

impl Authorizer for RolePolicy {
    fn actor_can_perform(&self, actor: &Actor, action: Action) -> bool {
        if actor.has_role(Role::Administrator) {
            return true;
        }
        match action.kind() {
            OrderKind::Sale => actor.has_role(Role::Seller),
            OrderKind::Purchase => actor.has_role(Role::Buyer),
        }
    }
}

/// Runs the capability check, turning a denial into `Forbidden`.
pub fn authorize(policy: &dyn Authorizer, actor: &Actor, action: Action) -> CoreResult<()> {
    if policy.actor_can_perform(actor, action) {
        return Ok(());
    }
    Err(CoreError::Forbidden {
        actor: actor.username.clone(),
        action: action.to_string(),
    })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_administrator_may_do_everything() {
        let admin = Actor::new("ana", [Role::Administrator]);
        for kind in [OrderKind::Sale, OrderKind::Purchase] {
            for action in [
                Action::create(kind),
                Action::edit_lines(kind),
                Action::finalize(kind),
                Action::cancel(kind),
            ] {
                assert!(RolePolicy.actor_can_perform(&admin, action));
            }
        }
    }

    #[test]
    fn test_seller_and_buyer_are_separated() {
        let seller = Actor::new("sam", [Role::Seller]);
        let buyer = Actor::new("bea", [Role::Buyer]);

        assert!(RolePolicy.actor_can_perform(&seller, Action::FinalizeSale));
        assert!(!RolePolicy.actor_can_perform(&seller, Action::CreatePurchase));
        assert!(RolePolicy.actor_can_perform(&buyer, Action::ReceivePurchase));
        assert!(!RolePolicy.actor_can_perform(&buyer, Action::EditSaleLines));
    }

    #[test]
    fn test_authorize_reports_forbidden() {
        let nobody = Actor::new("guest", Vec::new());
        let err = authorize(&RolePolicy, &nobody, Action::CreatePurchase).unwrap_err();
        assert_eq!(err.to_string(), "guest is not permitted to create purchases");
    }

    #[test]
    fn test_action_kind_mapping() {
        assert_eq!(Action::finalize(OrderKind::Purchase), Action::ReceivePurchase);
        assert_eq!(Action::ReceivePurchase.kind(), OrderKind::Purchase);
        assert_eq!(Action::CancelSale.kind(), OrderKind::Sale);
    }
}
