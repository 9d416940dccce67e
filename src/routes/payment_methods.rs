use axum::{Json, Router, routing::get};

use crate::{
    domain::payment_methods::{PaymentMethodInfo, catalogue},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_payment_methods))
}

#[utoipa::path(
    get,
    path = "/api/payment-methods",
    responses(
        (status = 200, description = "Payment methods and whether checkout accepts them", body = ApiResponse<Vec<PaymentMethodInfo>>)
    ),
    tag = "Payments"
)]
pub async fn list_payment_methods() -> Json<ApiResponse<Vec<PaymentMethodInfo>>> {
    Json(ApiResponse::success(
        "OK",
        catalogue(),
        Some(Meta::empty()),
    ))
}
