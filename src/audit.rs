use serde_json::Value;
use uuid::Uuid;

use crate::{db::DbPool, error::AppResult};

/// Business events written to `audit_logs` once their transaction committed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditAction {
    CartAdd,
    CartUpdate,
    CartRemove,
    Checkout,
    OrderCancel,
    OrderStatusUpdate,
    VoucherRedeem,
    VoucherCreate,
    VoucherUpdate,
    VoucherDelete,
}

impl AuditAction {
    pub fn as_str(self) -> &'static str {
        match self {
            AuditAction::CartAdd => "cart_add",
            AuditAction::CartUpdate => "cart_update",
            AuditAction::CartRemove => "cart_remove",
            AuditAction::Checkout => "checkout",
            AuditAction::OrderCancel => "order_cancel",
            AuditAction::OrderStatusUpdate => "order_status_update",
            AuditAction::VoucherRedeem => "voucher_redeem",
            AuditAction::VoucherCreate => "voucher_create",
            AuditAction::VoucherUpdate => "voucher_update",
            AuditAction::VoucherDelete => "voucher_delete",
        }
    }

    /// Table the event touched.
    pub fn resource(self) -> &'static str {
        match self {
            AuditAction::CartAdd | AuditAction::CartUpdate | AuditAction::CartRemove => "cart_items",
            AuditAction::Checkout | AuditAction::OrderCancel | AuditAction::OrderStatusUpdate => {
                "orders"
            }
            AuditAction::VoucherRedeem => "user_vouchers",
            AuditAction::VoucherCreate
            | AuditAction::VoucherUpdate
            | AuditAction::VoucherDelete => "vouchers",
        }
    }
}

async fn insert_entry(
    pool: &DbPool,
    actor: Uuid,
    action: AuditAction,
    metadata: &Value,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO audit_logs (id, user_id, action, resource, metadata)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(actor)
    .bind(action.as_str())
    .bind(action.resource())
    .bind(metadata)
    .execute(pool)
    .await?;
    Ok(())
}

/// Best-effort: the change is already committed, so a failed write is only logged.
pub async fn record(pool: &DbPool, actor: Uuid, action: AuditAction, metadata: Value) {
    if let Err(err) = insert_entry(pool, actor, action, &metadata).await {
        tracing::warn!(error = %err, action = action.as_str(), "audit log failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cart_events_share_a_resource() {
        for action in [AuditAction::CartAdd, AuditAction::CartUpdate, AuditAction::CartRemove] {
            assert_eq!(action.resource(), "cart_items");
        }
        assert_eq!(AuditAction::Checkout.as_str(), "checkout");
        assert_eq!(AuditAction::VoucherRedeem.resource(), "user_vouchers");
    }
}
