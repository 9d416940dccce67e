use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};
use uuid::Uuid;

use crate::{
    dto::vouchers::{RedeemVoucherRequest, UserVoucherList, VoucherList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::{Redemption, Voucher},
    response::ApiResponse,
    routes::params::Pagination,
    services::voucher_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_vouchers))
        .route("/redeem", post(redeem_voucher))
        .route("/{id}", get(get_voucher))
}

pub fn user_router() -> Router<AppState> {
    Router::new().route("/vouchers", get(list_user_vouchers))
}

#[utoipa::path(
    get,
    path = "/api/vouchers",
    params(Pagination),
    responses(
        (status = 200, description = "List vouchers", body = ApiResponse<VoucherList>)
    ),
    tag = "Vouchers"
)]
pub async fn list_vouchers(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<VoucherList>>> {
    let resp = voucher_service::list_vouchers(&state, pagination).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/vouchers/{id}",
    params(("id" = Uuid, Path, description = "Voucher ID")),
    responses(
        (status = 200, description = "Voucher detail", body = ApiResponse<Voucher>),
        (status = 404, description = "Voucher not found"),
    ),
    tag = "Vouchers"
)]
pub async fn get_voucher(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<Voucher>>> {
    let resp = voucher_service::get_voucher(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/vouchers/redeem",
    request_body = RedeemVoucherRequest,
    responses(
        (status = 200, description = "Voucher claimed for a later checkout", body = ApiResponse<Redemption>),
        (status = 404, description = "Voucher not found"),
        (status = 409, description = "Already held, not active or limit reached"),
    ),
    security(("bearer_auth" = [])),
    tag = "Vouchers"
)]
pub async fn redeem_voucher(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<RedeemVoucherRequest>,
) -> AppResult<Json<ApiResponse<Redemption>>> {
    let resp = voucher_service::redeem_voucher(&state, &user, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    get,
    path = "/api/user/vouchers",
    responses(
        (status = 200, description = "Vouchers claimed by the current user", body = ApiResponse<UserVoucherList>)
    ),
    security(("bearer_auth" = [])),
    tag = "Vouchers"
)]
pub async fn list_user_vouchers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserVoucherList>>> {
    let resp = voucher_service::list_user_vouchers(&state, &user).await?;
    Ok(Json(resp))
}
