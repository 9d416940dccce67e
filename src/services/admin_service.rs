use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    db::is_unique_violation,
    domain::order_status,
    dto::{
        orders::{OrderDetail, OrderList, UpdateOrderStatusRequest},
        vouchers::VoucherRequest,
    },
    entity::{
        orders::{Entity as Orders, OrderStatus},
        user_vouchers::{Column as UserVoucherCol, Entity as UserVouchers},
        vouchers::{ActiveModel as VoucherActive, Entity as Vouchers},
    },
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Voucher,
    response::{Ack, ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    order_service::list_orders_for(state, None, query).await
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id)
        .one(state.orm.as_ref())
        .await?
        .ok_or(AppError::NotFound)?;

    let detail = order_service::load_detail(state.orm.as_ref(), order).await?;
    Ok(ApiResponse::success("Order found", detail, Some(Meta::empty())))
}

/// Moves an order along the lifecycle. The role check comes before the
/// status is parsed or the order is read.
#[tracing::instrument(skip(state, user, payload), fields(admin_id = %user.user_id))]
pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Ack>> {
    ensure_admin(user)?;
    let next: OrderStatus = payload.status.parse()?;

    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let from = order.status;
    let transition = order_status::admin_update(from, next)?;
    let ack = order_service::apply_transition(&txn, order, transition).await?;
    txn.commit().await?;

    tracing::info!(order_id = %id, ?from, to = ?next, "order status updated");

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderStatusUpdate,
        serde_json::json!({ "order_id": id, "from": from, "to": next }),
    )
    .await;

    Ok(ApiResponse::success("Order updated", ack, Some(Meta::empty())))
}

pub async fn create_voucher(
    state: &AppState,
    user: &AuthUser,
    payload: VoucherRequest,
) -> AppResult<ApiResponse<Voucher>> {
    ensure_admin(user)?;
    payload.validate()?;

    let voucher = VoucherActive {
        id: Set(Uuid::new_v4()),
        code: Set(payload.code.trim().to_string()),
        description: Set(payload.description),
        discount_type: Set(payload.discount_type),
        discount_value: Set(payload.discount_value),
        min_order: Set(payload.min_order),
        max_discount: Set(payload.max_discount),
        start_date: Set(payload.start_date.into()),
        end_date: Set(payload.end_date.into()),
        usage_limit_global: Set(payload.usage_limit_global),
        usage_limit_per_user: Set(payload.usage_limit_per_user),
        redeemed_count: Set(0),
        created_at: NotSet,
    }
    .insert(state.orm.as_ref())
    .await
    .map_err(duplicate_code)?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::VoucherCreate,
        serde_json::json!({ "voucher_id": voucher.id, "code": voucher.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Voucher created",
        voucher.into(),
        Some(Meta::empty()),
    ))
}

fn duplicate_code(err: sea_orm::DbErr) -> AppError {
    if is_unique_violation(&err) {
        AppError::BadRequest("voucher code already exists".into())
    } else {
        AppError::from(err)
    }
}

/// Replaces every editable field. The row is locked so the new limits are
/// checked against a `redeemed_count` no claim can move underneath us.
#[tracing::instrument(skip(state, user, payload), fields(admin_id = %user.user_id))]
pub async fn update_voucher(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: VoucherRequest,
) -> AppResult<ApiResponse<Voucher>> {
    ensure_admin(user)?;
    payload.validate()?;

    let txn = state.orm.begin().await?;
    let current = Vouchers::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::VoucherNotFound)?;

    if payload.usage_limit_global < current.redeemed_count {
        return Err(AppError::BadRequest(format!(
            "usage_limit_global cannot go below the {} uses already claimed",
            current.redeemed_count
        )));
    }

    let mut voucher: VoucherActive = current.into();
    voucher.code = Set(payload.code.trim().to_string());
    voucher.description = Set(payload.description);
    voucher.discount_type = Set(payload.discount_type);
    voucher.discount_value = Set(payload.discount_value);
    voucher.min_order = Set(payload.min_order);
    voucher.max_discount = Set(payload.max_discount);
    voucher.start_date = Set(payload.start_date.into());
    voucher.end_date = Set(payload.end_date.into());
    voucher.usage_limit_global = Set(payload.usage_limit_global);
    voucher.usage_limit_per_user = Set(payload.usage_limit_per_user);
    let voucher = voucher.update(&txn).await.map_err(duplicate_code)?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::VoucherUpdate,
        serde_json::json!({ "voucher_id": voucher.id, "code": voucher.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Voucher updated",
        voucher.into(),
        Some(Meta::empty()),
    ))
}

/// Only vouchers nobody has claimed can be deleted; claims and the orders
/// that consumed them keep pointing at the voucher.
#[tracing::instrument(skip(state, user), fields(admin_id = %user.user_id))]
pub async fn delete_voucher(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Voucher>> {
    ensure_admin(user)?;

    let txn = state.orm.begin().await?;
    let voucher = Vouchers::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::VoucherNotFound)?;

    let claims = UserVouchers::find()
        .filter(UserVoucherCol::VoucherId.eq(id))
        .count(&txn)
        .await?;
    if claims > 0 {
        return Err(AppError::VoucherInUse);
    }

    voucher.clone().delete(&txn).await?;
    txn.commit().await?;

    tracing::info!(voucher_id = %id, code = %voucher.code, "voucher deleted");
    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::VoucherDelete,
        serde_json::json!({ "voucher_id": id, "code": voucher.code }),
    )
    .await;

    Ok(ApiResponse::success(
        "Voucher deleted",
        voucher.into(),
        Some(Meta::empty()),
    ))
}
