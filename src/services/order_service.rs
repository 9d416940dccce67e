use anyhow::anyhow;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    domain::{
        assembler::{self, AssembledOrder},
        order_status::{self, Transition},
        payment_methods,
    },
    dto::orders::{CreateOrderRequest, OrderDetail, OrderList, OrderSummary},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
        },
        payments::{ActiveModel as PaymentActive, Column as PaymentCol, Entity as Payments},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{Ack, ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    services::{cart_service, voucher_service},
    state::AppState,
};

/// Turns the caller's active cart into an order in one transaction.
///
/// Input is validated before a connection is taken. Any failure after `begin`
/// drops the transaction, so no order, payment, redemption or cart change is
/// left behind.
#[tracing::instrument(skip(conn, user, payload), fields(user_id = %user.user_id))]
pub async fn checkout(
    conn: &DatabaseConnection,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<OrderSummary> {
    let request = payload.validate()?;
    payment_methods::ensure_available(request.payment_method)?;

    let now = Utc::now();
    let txn = conn.begin().await?;

    let snapshot = cart_service::read_snapshot(&txn, user.user_id).await?;
    let quote = voucher_service::evaluate(
        &txn,
        user.user_id,
        request.voucher_code.as_deref(),
        snapshot.subtotal,
        now,
    )
    .await?;

    let AssembledOrder {
        order_id,
        invoice_number,
        subtotal,
        discount,
        total,
        order,
        lines,
        payment,
    } = assembler::assemble(
        user.user_id,
        &request.shipping,
        request.payment_method,
        &snapshot,
        quote.as_ref(),
    );

    let order = order.insert(&txn).await?;
    OrderItems::insert_many(lines)
        .exec_without_returning(&txn)
        .await?;
    payment.insert(&txn).await?;

    if let Some(quote) = &quote {
        voucher_service::apply_redemption(&txn, user.user_id, quote, now).await?;
    }

    cart_service::rotate_cart(&txn, snapshot.cart_id, user.user_id).await?;

    txn.commit().await?;

    tracing::info!(%order_id, %invoice_number, subtotal, discount, total, "order placed");

    Ok(OrderSummary {
        order_id,
        invoice_number,
        subtotal,
        discount,
        total,
        payment_method: order.payment_method,
        status: order.status,
    })
}

pub async fn create_order(
    state: &AppState,
    user: &AuthUser,
    payload: CreateOrderRequest,
) -> AppResult<ApiResponse<OrderSummary>> {
    let voucher_code = payload.voucher_code.clone();
    let summary = checkout(state.orm.as_ref(), user, payload).await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::Checkout,
        serde_json::json!({
            "order_id": summary.order_id,
            "total": summary.total,
            "discount": summary.discount,
            "voucher_code": voucher_code,
        }),
    )
    .await;

    Ok(ApiResponse::success(
        "Order created",
        summary,
        Some(Meta::empty()),
    ))
}

/// Lists orders, newest first unless asked otherwise. `owner` narrows the
/// listing to one user.
pub(crate) async fn list_orders_for(
    state: &AppState,
    owner: Option<Uuid>,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let (page, limit, offset) = query.pagination().normalize();

    let mut condition = Condition::all();
    if let Some(user_id) = owner {
        condition = condition.add(OrderCol::UserId.eq(user_id));
    }
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(state.orm.as_ref()).await? as i64;

    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(state.orm.as_ref())
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let meta = Meta::new(page, limit, total);
    Ok(ApiResponse::success(
        "Ok",
        OrderList { items: orders },
        Some(meta),
    ))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    list_orders_for(state, Some(user.user_id), query).await
}

pub(crate) async fn load_detail<C>(conn: &C, order: OrderModel) -> AppResult<OrderDetail>
where
    C: ConnectionTrait,
{
    let items = OrderItems::find()
        .filter(OrderItemCol::OrderId.eq(order.id))
        .order_by_asc(OrderItemCol::CreatedAt)
        .all(conn)
        .await?
        .into_iter()
        .map(OrderItem::from)
        .collect();

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order.id))
        .one(conn)
        .await?
        .map(Into::into);

    Ok(OrderDetail {
        order: order.into(),
        items,
        payment,
    })
}

/// Another user's order reads as missing.
pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderDetail>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(state.orm.as_ref())
        .await?
        .ok_or(AppError::NotFound)?;

    let detail = load_detail(state.orm.as_ref(), order).await?;
    Ok(ApiResponse::success("OK", detail, Some(Meta::empty())))
}

/// Writes an accepted transition to the order and, when it mirrors the
/// change, to its payment. The order row must already be locked.
pub(crate) async fn apply_transition<C>(
    conn: &C,
    order: OrderModel,
    transition: Transition,
) -> AppResult<Ack>
where
    C: ConnectionTrait,
{
    let order_id = order.id;
    let now = Utc::now();

    let mut active: OrderActive = order.into();
    active.status = Set(transition.order);
    active.updated_at = Set(now.into());
    active.update(conn).await?;

    let payment = Payments::find()
        .filter(PaymentCol::OrderId.eq(order_id))
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow!("order {order_id} has no payment")))?;

    let payment_status = match transition.payment {
        Some(next) if next != payment.status => {
            let mut active: PaymentActive = payment.into();
            active.status = Set(next);
            active.updated_at = Set(now.into());
            active.update(conn).await?.status
        }
        _ => payment.status,
    };

    Ok(Ack {
        order_id,
        status: transition.order,
        payment_status,
    })
}

#[tracing::instrument(skip(state, user), fields(user_id = %user.user_id))]
pub async fn cancel_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<Ack>> {
    let txn = state.orm.begin().await?;

    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let transition = order_status::cancel(order.status)?;
    let ack = apply_transition(&txn, order, transition).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::OrderCancel,
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(ApiResponse::success("Order cancelled", ack, Some(Meta::empty())))
}
