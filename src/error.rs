use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::entity::orders::OrderStatus;
use crate::response::{ApiResponse, Meta};

/// Coarse classification of every [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or missing input, rejected before storage is touched.
    Validation,
    NotFound,
    /// The request is well formed but the current state forbids it.
    StateConflict,
    /// Storage failure; the transaction was rolled back and the caller may retry.
    Persistence,
    Authorization,
    Internal,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not Found")]
    NotFound,

    #[error("Bad Request {0}")]
    BadRequest(String),

    #[error("Unauthorized {0}")]
    Unauthorized(String),

    #[error("Forbidden")]
    Forbidden,

    #[error("Cart is empty")]
    EmptyCart,

    #[error("Product {0} is no longer available")]
    ProductUnavailable(Uuid),

    #[error("Payment method is not available yet")]
    PaymentMethodUnavailable,

    #[error("Voucher not found")]
    VoucherNotFound,

    #[error("Voucher is not valid at this time")]
    VoucherNotActive,

    #[error("Order does not reach the voucher minimum of {min_order}")]
    MinOrderNotMet { min_order: i64 },

    #[error("Voucher has redemptions and cannot be deleted")]
    VoucherInUse,

    #[error("Voucher is already held and unused")]
    AlreadyHeldUnused,

    #[error("Voucher was already consumed")]
    AlreadyConsumed,

    #[error("Voucher per-user usage limit reached")]
    PerUserLimitReached,

    #[error("Voucher global usage limit reached")]
    GlobalLimitReached,

    #[error("Invalid order status {0}")]
    InvalidStatus(String),

    #[error("Cannot move order from {from:?} to {to:?}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("Database error")]
    DbError(#[from] sqlx::Error),

    #[error("ORM error")]
    OrmError(#[from] sea_orm::DbErr),

    #[error("Internal Server Error")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AppError::BadRequest(_)
            | AppError::PaymentMethodUnavailable
            | AppError::MinOrderNotMet { .. }
            | AppError::InvalidStatus(_) => ErrorKind::Validation,
            // No active cart and a cart without lines both mean there is nothing to order.
            AppError::NotFound
            | AppError::EmptyCart
            | AppError::ProductUnavailable(_)
            | AppError::VoucherNotFound => ErrorKind::NotFound,
            AppError::VoucherNotActive
            | AppError::VoucherInUse
            | AppError::AlreadyHeldUnused
            | AppError::AlreadyConsumed
            | AppError::PerUserLimitReached
            | AppError::GlobalLimitReached
            | AppError::InvalidTransition { .. } => ErrorKind::StateConflict,
            AppError::DbError(_) | AppError::OrmError(_) => ErrorKind::Persistence,
            AppError::Unauthorized(_) | AppError::Forbidden => ErrorKind::Authorization,
            AppError::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Stable machine-readable code for clients.
    pub fn code(&self) -> &'static str {
        match self {
            AppError::NotFound => "NOT_FOUND",
            AppError::BadRequest(_) => "VALIDATION_ERROR",
            AppError::Unauthorized(_) => "UNAUTHORIZED",
            AppError::Forbidden => "FORBIDDEN",
            AppError::EmptyCart => "EMPTY_CART",
            AppError::ProductUnavailable(_) => "PRODUCT_UNAVAILABLE",
            AppError::PaymentMethodUnavailable => "PAYMENT_METHOD_UNAVAILABLE",
            AppError::VoucherNotFound => "VOUCHER_NOT_FOUND",
            AppError::VoucherNotActive => "VOUCHER_NOT_ACTIVE",
            AppError::MinOrderNotMet { .. } => "MIN_ORDER_NOT_MET",
            AppError::VoucherInUse => "VOUCHER_IN_USE",
            AppError::AlreadyHeldUnused => "ALREADY_HELD_UNUSED",
            AppError::AlreadyConsumed => "ALREADY_CONSUMED",
            AppError::PerUserLimitReached => "PER_USER_LIMIT_REACHED",
            AppError::GlobalLimitReached => "GLOBAL_LIMIT_REACHED",
            AppError::InvalidStatus(_) => "INVALID_STATUS",
            AppError::InvalidTransition { .. } => "INVALID_TRANSITION",
            AppError::DbError(_) | AppError::OrmError(_) => "PERSISTENCE_ERROR",
            AppError::Internal(_) => "INTERNAL_ERROR",
        }
    }

    /// Whether a client may retry the same request unchanged.
    pub fn is_retryable(&self) -> bool {
        self.kind() == ErrorKind::Persistence
    }

    fn status(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::Validation => match self {
                AppError::InvalidStatus(_) | AppError::MinOrderNotMet { .. } => {
                    StatusCode::UNPROCESSABLE_ENTITY
                }
                _ => StatusCode::BAD_REQUEST,
            },
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::StateConflict => StatusCode::CONFLICT,
            ErrorKind::Persistence => StatusCode::SERVICE_UNAVAILABLE,
            ErrorKind::Authorization => match self {
                AppError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
                _ => StatusCode::FORBIDDEN,
            },
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorData {
    error: String,
    code: &'static str,
    retryable: bool,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match &self {
            AppError::DbError(err) => tracing::error!(error = %err, "database error"),
            AppError::OrmError(err) => tracing::error!(error = %err, "orm error"),
            AppError::Internal(err) => tracing::error!(error = %err, "internal error"),
            _ => {}
        }

        let body = ApiResponse {
            message: self.to_string(),
            data: Some(ErrorData {
                error: self.to_string(),
                code: self.code(),
                retryable: self.is_retryable(),
            }),
            meta: Some(Meta::empty()),
        };

        (status, axum::Json(body)).into_response()
    }
}

pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn voucher_limits_are_state_conflicts() {
        for err in [
            AppError::AlreadyHeldUnused,
            AppError::PerUserLimitReached,
            AppError::GlobalLimitReached,
            AppError::InvalidTransition {
                from: OrderStatus::Completed,
                to: OrderStatus::Cancelled,
            },
        ] {
            assert_eq!(err.kind(), ErrorKind::StateConflict);
            assert_eq!(err.status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn persistence_errors_are_retryable() {
        let err = AppError::from(sea_orm::DbErr::Custom("connection reset".into()));
        assert_eq!(err.kind(), ErrorKind::Persistence);
        assert!(err.is_retryable());
        assert_eq!(err.code(), "PERSISTENCE_ERROR");
        assert!(!AppError::EmptyCart.is_retryable());
    }

    #[test]
    fn missing_records_map_to_404() {
        assert_eq!(AppError::VoucherNotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            AppError::ProductUnavailable(Uuid::nil()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(AppError::EmptyCart.kind(), ErrorKind::NotFound);
        assert_eq!(AppError::EmptyCart.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::EmptyCart.code(), "EMPTY_CART");
    }
}
