use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};
use uuid::Uuid;

use crate::{
    dto::{
        orders::{OrderDetail, OrderList, UpdateOrderStatusRequest},
        vouchers::VoucherRequest,
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Voucher,
    response::{Ack, ApiResponse},
    routes::params::OrderListQuery,
    services::admin_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/orders", get(list_all_orders))
        .route("/orders/{id}", get(get_order_admin))
        .route("/orders/{id}/status", put(update_order_status))
        .route("/vouchers", post(create_voucher))
        .route("/vouchers/{id}", put(update_voucher).delete(delete_voucher))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders",
    params(OrderListQuery),
    responses(
    (status = 200, description = "Get all orders (admin only)", body = ApiResponse<OrderList>),
    (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn list_all_orders(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<OrderListQuery>,
) -> AppResult<Json<ApiResponse<OrderList>>> {
    let resp = admin_service::list_all_orders(&state, &user, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/admin/orders/{id}",
    params(("id" = Uuid, Path, description = "Order ID")),
    responses(
    (status = 200, description = "Any order with lines and payment (admin only)", body = ApiResponse<OrderDetail>),
    (status = 404, description = "Not Found"),
    (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn get_order_admin(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<OrderDetail>>> {
    let resp = admin_service::get_order_admin(&state, &user, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/orders/{id}/status",
    params(("id" = Uuid, Path, description = "Order ID")),
    request_body = UpdateOrderStatusRequest,
    responses(
        (status = 200, description = "Update order status", body = ApiResponse<Ack>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Not Found"),
        (status = 409, description = "Transition not allowed"),
        (status = 422, description = "Unknown status"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_order_status(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateOrderStatusRequest>,
) -> AppResult<Json<ApiResponse<Ack>>> {
    let resp = admin_service::update_order_status(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/admin/vouchers",
    request_body = VoucherRequest,
    responses(
        (status = 200, description = "Create a voucher", body = ApiResponse<Voucher>),
        (status = 400, description = "Invalid voucher"),
        (status = 403, description = "Forbidden"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn create_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<VoucherRequest>,
) -> AppResult<Json<ApiResponse<Voucher>>> {
    let resp = admin_service::create_voucher(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/admin/vouchers/{id}",
    params(("id" = Uuid, Path, description = "Voucher ID")),
    request_body = VoucherRequest,
    responses(
        (status = 200, description = "Replace a voucher's terms", body = ApiResponse<Voucher>),
        (status = 400, description = "Invalid voucher or limit below uses already claimed"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Voucher not found"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn update_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
    Json(payload): Json<VoucherRequest>,
) -> AppResult<Json<ApiResponse<Voucher>>> {
    let resp = admin_service::update_voucher(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/admin/vouchers/{id}",
    params(("id" = Uuid, Path, description = "Voucher ID")),
    responses(
        (status = 200, description = "Delete an unclaimed voucher", body = ApiResponse<Voucher>),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Voucher not found"),
        (status = 409, description = "Voucher already claimed"),
    ),
    security(("bearer_auth" = [])),
    tag = "Admin"
)]
pub async fn delete_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Voucher>>> {
    let resp = admin_service::delete_voucher(&state, &user, id).await?;
    Ok(Json(resp))
}
