use sea_orm::{
    ActiveEnum, ActiveModelTrait, ColumnTrait, ConnectionTrait, DbErr, EntityTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, OnConflict, SimpleExpr};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    domain::snapshot::{CartSnapshot, SnapshotLine},
    dto::cart::{AddToCartRequest, CartLineDto, CartView, UpdateCartItemRequest},
    entity::{
        cart_items::{
            ActiveModel as CartItemActive, Column as ItemCol, Entity as CartItems,
            Model as CartItemModel,
        },
        carts::{
            ActiveModel as CartActive, CartStatus, Column as CartCol, Entity as Carts,
            Model as CartModel,
        },
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::CartItem,
    response::{ApiResponse, Meta},
    services::product_catalog,
    state::AppState,
};

pub const MAX_LINE_QUANTITY: i32 = 999;

async fn find_active_cart<C>(conn: &C, user_id: Uuid, lock: bool) -> AppResult<Option<CartModel>>
where
    C: ConnectionTrait,
{
    let mut finder = Carts::find()
        .filter(CartCol::UserId.eq(user_id))
        .filter(CartCol::Status.eq(CartStatus::Active));
    if lock {
        finder = finder.lock(LockType::Update);
    }
    Ok(finder.one(conn).await?)
}

fn new_active_cart(user_id: Uuid) -> CartActive {
    CartActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        status: Set(CartStatus::Active),
        created_at: NotSet,
        updated_at: NotSet,
    }
}

/// Locks the user's active cart, creating it first when there is none.
///
/// A concurrent creator wins through the partial unique index; the insert is a
/// no-op and the re-read picks up its cart.
async fn lock_or_create_active_cart<C>(conn: &C, user_id: Uuid) -> AppResult<CartModel>
where
    C: ConnectionTrait,
{
    if let Some(cart) = find_active_cart(conn, user_id, true).await? {
        return Ok(cart);
    }

    Carts::insert(new_active_cart(user_id))
        .on_conflict(OnConflict::new().do_nothing().to_owned())
        .exec_without_returning(conn)
        .await?;

    find_active_cart(conn, user_id, true)
        .await?
        .ok_or_else(|| AppError::OrmError(DbErr::RecordNotFound("active cart".into())))
}

/// Reads the active cart and prices every line against the catalogue.
///
/// The cart row stays locked until the surrounding transaction ends, so two
/// checkouts for the same user run one after the other.
pub async fn read_snapshot<C>(conn: &C, user_id: Uuid) -> AppResult<CartSnapshot>
where
    C: ConnectionTrait,
{
    let cart = find_active_cart(conn, user_id, true)
        .await?
        .ok_or(AppError::EmptyCart)?;

    let items = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .order_by_asc(ItemCol::CreatedAt)
        .all(conn)
        .await?;
    if items.is_empty() {
        return Err(AppError::EmptyCart);
    }

    let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let prices = product_catalog::price_and_existence(conn, &product_ids).await?;

    let lines = items
        .iter()
        .map(|item| {
            let unit_price = prices
                .get(&item.product_id)
                .copied()
                .ok_or(AppError::ProductUnavailable(item.product_id))?;
            Ok(SnapshotLine {
                product_id: item.product_id,
                quantity: item.quantity,
                unit_price,
            })
        })
        .collect::<AppResult<Vec<_>>>()?;

    CartSnapshot::new(cart.id, lines)
}

/// Retires the consumed cart and gives the user a fresh empty one.
pub async fn rotate_cart<C>(conn: &C, cart_id: Uuid, user_id: Uuid) -> AppResult<CartModel>
where
    C: ConnectionTrait,
{
    CartItems::delete_many()
        .filter(ItemCol::CartId.eq(cart_id))
        .exec(conn)
        .await?;

    let retired = Carts::update_many()
        .col_expr(CartCol::Status, Expr::value(CartStatus::Retired.into_value()))
        .col_expr(CartCol::UpdatedAt, SimpleExpr::from(Expr::current_timestamp()))
        .filter(CartCol::Id.eq(cart_id))
        .filter(CartCol::UserId.eq(user_id))
        .filter(CartCol::Status.eq(CartStatus::Active))
        .exec(conn)
        .await?;
    if retired.rows_affected != 1 {
        return Err(AppError::OrmError(DbErr::RecordNotUpdated));
    }

    Ok(new_active_cart(user_id).insert(conn).await?)
}

async fn build_view<C>(conn: &C, cart: Option<CartModel>) -> AppResult<CartView>
where
    C: ConnectionTrait,
{
    let Some(cart) = cart else {
        return Ok(CartView {
            cart: None,
            items: Vec::new(),
            length: 0,
            total: 0,
        });
    };

    let items = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .order_by_asc(ItemCol::CreatedAt)
        .all(conn)
        .await?;
    let product_ids: Vec<Uuid> = items.iter().map(|item| item.product_id).collect();
    let mut products = product_catalog::find_products(conn, &product_ids).await?;

    let mut lines = Vec::with_capacity(items.len());
    let mut total: i64 = 0;
    for item in items {
        // Lines whose product left the catalogue are kept in storage and
        // rejected at checkout; they are not shown here.
        let Some(product) = products.remove(&item.product_id) else {
            tracing::warn!(cart_id = %cart.id, product_id = %item.product_id, "cart line without product");
            continue;
        };
        let line_total = product.price.saturating_mul(i64::from(item.quantity));
        total = total.saturating_add(line_total);
        lines.push(CartLineDto {
            item: item.into(),
            product: product.into(),
            line_total,
        });
    }

    Ok(CartView {
        cart: Some(cart.into()),
        length: lines.len(),
        items: lines,
        total,
    })
}

fn validate_quantity(quantity: i32) -> AppResult<()> {
    if quantity <= 0 {
        return Err(AppError::BadRequest(
            "quantity must be greater than 0".to_string(),
        ));
    }
    if quantity > MAX_LINE_QUANTITY {
        return Err(AppError::BadRequest(format!(
            "quantity must not exceed {MAX_LINE_QUANTITY}"
        )));
    }
    Ok(())
}

pub async fn init_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let txn = state.orm.begin().await?;
    let cart = lock_or_create_active_cart(&txn, user.user_id).await?;
    let view = build_view(&txn, Some(cart)).await?;
    txn.commit().await?;

    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn get_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartView>> {
    let cart = find_active_cart(state.orm.as_ref(), user.user_id, false).await?;
    let view = build_view(state.orm.as_ref(), cart).await?;
    Ok(ApiResponse::success("OK", view, Some(Meta::empty())))
}

pub async fn add_item(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    validate_quantity(payload.quantity)?;

    let known = product_catalog::price_and_existence(state.orm.as_ref(), &[payload.product_id]).await?;
    if !known.contains_key(&payload.product_id) {
        return Err(AppError::ProductUnavailable(payload.product_id));
    }

    let txn = state.orm.begin().await?;
    let cart = lock_or_create_active_cart(&txn, user.user_id).await?;

    let existing = CartItems::find()
        .filter(ItemCol::CartId.eq(cart.id))
        .filter(ItemCol::ProductId.eq(payload.product_id))
        .one(&txn)
        .await?;

    let item: CartItemModel = match existing {
        Some(item) => {
            let quantity = item
                .quantity
                .checked_add(payload.quantity)
                .filter(|q| *q <= MAX_LINE_QUANTITY)
                .ok_or_else(|| {
                    AppError::BadRequest(format!("quantity must not exceed {MAX_LINE_QUANTITY}"))
                })?;
            let mut active: CartItemActive = item.into();
            active.quantity = Set(quantity);
            active.update(&txn).await?
        }
        None => {
            CartItemActive {
                id: Set(Uuid::new_v4()),
                cart_id: Set(cart.id),
                product_id: Set(payload.product_id),
                quantity: Set(payload.quantity),
                created_at: NotSet,
            }
            .insert(&txn)
            .await?
        }
    };

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CartAdd,
        serde_json::json!({ "product_id": payload.product_id, "quantity": item.quantity }),
    )
    .await;

    Ok(ApiResponse::success("Added to cart", item.into(), None))
}

pub async fn update_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartItem>> {
    validate_quantity(payload.quantity)?;

    let txn = state.orm.begin().await?;
    let cart = find_active_cart(&txn, user.user_id, true)
        .await?
        .ok_or(AppError::NotFound)?;

    let item = CartItems::find()
        .filter(ItemCol::Id.eq(item_id))
        .filter(ItemCol::CartId.eq(cart.id))
        .one(&txn)
        .await?
        .ok_or(AppError::NotFound)?;

    let mut active: CartItemActive = item.into();
    active.quantity = Set(payload.quantity);
    let item = active.update(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CartUpdate,
        serde_json::json!({ "item_id": item_id, "quantity": payload.quantity }),
    )
    .await;

    Ok(ApiResponse::success("OK", item.into(), None))
}

pub async fn remove_item(
    state: &AppState,
    user: &AuthUser,
    item_id: Uuid,
) -> AppResult<ApiResponse<serde_json::Value>> {
    let txn = state.orm.begin().await?;
    let cart = find_active_cart(&txn, user.user_id, true)
        .await?
        .ok_or(AppError::NotFound)?;

    let result = CartItems::delete_many()
        .filter(ItemCol::Id.eq(item_id))
        .filter(ItemCol::CartId.eq(cart.id))
        .exec(&txn)
        .await?;
    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }
    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::CartRemove,
        serde_json::json!({ "item_id": item_id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Removed from cart",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quantity_bounds() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(MAX_LINE_QUANTITY).is_ok());
        assert!(matches!(validate_quantity(0), Err(AppError::BadRequest(_))));
        assert!(matches!(validate_quantity(-3), Err(AppError::BadRequest(_))));
        assert!(matches!(
            validate_quantity(MAX_LINE_QUANTITY + 1),
            Err(AppError::BadRequest(_))
        ));
    }
}
