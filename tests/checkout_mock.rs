use axum_checkout_api::{
    dto::orders::CreateOrderRequest,
    entity::{cart_items, carts, products, vouchers},
    error::AppError,
    middleware::auth::AuthUser,
    services::order_service,
};
use chrono::Utc;
use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};
use uuid::Uuid;

fn customer() -> AuthUser {
    AuthUser {
        user_id: Uuid::new_v4(),
        role: "user".into(),
    }
}

fn request(payment_method: &str, voucher_code: Option<&str>) -> CreateOrderRequest {
    CreateOrderRequest {
        full_name: "Ferris Crab".into(),
        phone: "0900000000".into(),
        address: "1 Harbour Road".into(),
        note: None,
        payment_method: payment_method.into(),
        voucher_code: voucher_code.map(str::to_string),
    }
}

fn active_cart(user_id: Uuid) -> carts::Model {
    carts::Model {
        id: Uuid::new_v4(),
        user_id,
        status: carts::CartStatus::Active,
        created_at: Utc::now().into(),
        updated_at: Utc::now().into(),
    }
}

fn line(cart_id: Uuid, product_id: Uuid, quantity: i32) -> cart_items::Model {
    cart_items::Model {
        id: Uuid::new_v4(),
        cart_id,
        product_id,
        quantity,
        created_at: Utc::now().into(),
    }
}

fn statement_log(db: DatabaseConnection) -> String {
    format!("{:?}", db.into_transaction_log())
}

fn assert_no_writes(log: &str) {
    assert!(!log.contains("INSERT"), "unexpected insert: {log}");
    assert!(!log.contains("DELETE"), "unexpected delete: {log}");
}

#[tokio::test]
async fn invalid_input_never_touches_storage() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
    let mut req = request("COD", None);
    req.full_name = "   ".into();

    let err = order_service::checkout(&db, &customer(), req).await.unwrap_err();
    assert!(matches!(err, AppError::BadRequest(_)));
    assert!(db.into_transaction_log().is_empty());
}

#[tokio::test]
async fn unavailable_payment_method_is_rejected_before_begin() {
    let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

    let err = order_service::checkout(&db, &customer(), request("MOMO", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::PaymentMethodUnavailable));
    assert!(db.into_transaction_log().is_empty());
}

#[tokio::test]
async fn missing_cart_is_empty_cart_without_writes() {
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([Vec::<carts::Model>::new()])
        .into_connection();

    let err = order_service::checkout(&db, &customer(), request("COD", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));

    let log = statement_log(db);
    assert!(log.contains("carts"));
    assert_no_writes(&log);
}

#[tokio::test]
async fn cart_without_lines_is_empty_cart_without_writes() {
    let user = customer();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![active_cart(user.user_id)]])
        .append_query_results([Vec::<cart_items::Model>::new()])
        .into_connection();

    let err = order_service::checkout(&db, &user, request("COD", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::EmptyCart));
    assert_no_writes(&statement_log(db));
}

#[tokio::test]
async fn vanished_product_aborts_checkout() {
    let user = customer();
    let cart = active_cart(user.user_id);
    let gone = Uuid::new_v4();
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![cart.clone()]])
        .append_query_results([vec![line(cart.id, gone, 1)]])
        .append_query_results([Vec::<products::Model>::new()])
        .into_connection();

    let err = order_service::checkout(&db, &user, request("COD", None))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::ProductUnavailable(id) if id == gone));
    assert_no_writes(&statement_log(db));
}

#[tokio::test]
async fn unknown_voucher_aborts_checkout() {
    let user = customer();
    let cart = active_cart(user.user_id);
    let product = products::Model {
        id: Uuid::new_v4(),
        name: "Ferris Mug".into(),
        description: None,
        price: 120_000,
        created_at: Utc::now().into(),
    };
    let db = MockDatabase::new(DatabaseBackend::Postgres)
        .append_query_results([vec![cart.clone()]])
        .append_query_results([vec![line(cart.id, product.id, 2)]])
        .append_query_results([vec![product]])
        .append_query_results([Vec::<vouchers::Model>::new()])
        .into_connection();

    let err = order_service::checkout(&db, &user, request("cod", Some("NOPE")))
        .await
        .unwrap_err();
    assert!(matches!(err, AppError::VoucherNotFound));
    assert_no_writes(&statement_log(db));
}
