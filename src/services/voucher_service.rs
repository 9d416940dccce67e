use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::ActiveValue::NotSet;
use sea_orm::sea_query::{Expr, LockType, SimpleExpr};
use uuid::Uuid;

use crate::{
    audit::{self, AuditAction},
    db::is_unique_violation,
    domain::discount::{self, RedemptionPlan, RedemptionUsage, VoucherQuote},
    dto::vouchers::{RedeemVoucherRequest, UserVoucherDto, UserVoucherList, VoucherList},
    entity::{
        user_vouchers::{
            ActiveModel as UserVoucherActive, Column as UvCol, Entity as UserVouchers,
            Model as UserVoucherModel,
        },
        vouchers::{Column as VoucherCol, Entity as Vouchers, Model as VoucherModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Redemption, Voucher},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

/// Finds a voucher by its exact code and locks the row for the rest of the
/// transaction. Every claim and checkout on one voucher passes through here.
pub async fn lock_voucher_by_code<C>(conn: &C, code: &str) -> AppResult<VoucherModel>
where
    C: ConnectionTrait,
{
    Vouchers::find()
        .filter(VoucherCol::Code.eq(code))
        .lock(LockType::Update)
        .one(conn)
        .await?
        .ok_or(AppError::VoucherNotFound)
}

pub async fn load_usage<C>(
    conn: &C,
    user_id: Uuid,
    voucher_id: Uuid,
) -> AppResult<RedemptionUsage>
where
    C: ConnectionTrait,
{
    let claims = UserVouchers::find()
        .filter(UvCol::UserId.eq(user_id))
        .filter(UvCol::VoucherId.eq(voucher_id))
        .all(conn)
        .await?;

    Ok(RedemptionUsage {
        held_unused: claims.iter().find(|c| !c.used).map(|c| c.id),
        total_for_user: claims.len() as i64,
    })
}

/// Validates an optional voucher code for a checkout of `subtotal`.
///
/// No code means no discount and no redemption side effect. With a code the
/// voucher row stays locked until the caller's transaction ends.
#[tracing::instrument(skip(conn))]
pub async fn evaluate<C>(
    conn: &C,
    user_id: Uuid,
    code: Option<&str>,
    subtotal: i64,
    now: DateTime<Utc>,
) -> AppResult<Option<VoucherQuote>>
where
    C: ConnectionTrait,
{
    let Some(code) = code else {
        return Ok(None);
    };

    let voucher = lock_voucher_by_code(conn, code).await?;
    discount::ensure_active(&voucher, now)?;
    discount::ensure_min_order(&voucher, subtotal)?;

    let usage = load_usage(conn, user_id, voucher.id).await?;
    let plan = discount::plan_checkout(&voucher, &usage)?;

    Ok(Some(VoucherQuote {
        voucher_id: voucher.id,
        discount: discount::discount_for(&voucher, subtotal),
        code: voucher.code,
        plan,
    }))
}

/// Takes one use from the global limit. The guard in the `WHERE` clause is
/// the authoritative check; zero updated rows means the limit is spent.
pub async fn reserve_global_use<C>(conn: &C, voucher_id: Uuid) -> AppResult<()>
where
    C: ConnectionTrait,
{
    let result = Vouchers::update_many()
        .col_expr(
            VoucherCol::RedeemedCount,
            Expr::col(VoucherCol::RedeemedCount).add(1),
        )
        .filter(VoucherCol::Id.eq(voucher_id))
        .filter(
            Expr::col(VoucherCol::RedeemedCount).lt(Expr::col(VoucherCol::UsageLimitGlobal)),
        )
        .exec(conn)
        .await?;

    if result.rows_affected == 0 {
        return Err(AppError::GlobalLimitReached);
    }
    Ok(())
}

fn new_redemption(
    user_id: Uuid,
    voucher_id: Uuid,
    used_at: Option<DateTime<Utc>>,
) -> UserVoucherActive {
    UserVoucherActive {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        voucher_id: Set(voucher_id),
        used: Set(used_at.is_some()),
        created_at: NotSet,
        used_at: Set(used_at.map(Into::into)),
    }
}

/// Writes the redemption side of a checkout.
pub async fn apply_redemption<C>(
    conn: &C,
    user_id: Uuid,
    quote: &VoucherQuote,
    now: DateTime<Utc>,
) -> AppResult<()>
where
    C: ConnectionTrait,
{
    match quote.plan {
        RedemptionPlan::ConsumeHeld(redemption_id) => {
            let result = UserVouchers::update_many()
                .col_expr(UvCol::Used, Expr::value(true))
                .col_expr(UvCol::UsedAt, SimpleExpr::from(Expr::current_timestamp()))
                .filter(UvCol::Id.eq(redemption_id))
                .filter(UvCol::UserId.eq(user_id))
                .filter(UvCol::Used.eq(false))
                .exec(conn)
                .await?;
            if result.rows_affected == 0 {
                return Err(AppError::AlreadyConsumed);
            }
        }
        RedemptionPlan::ClaimAndConsume => {
            reserve_global_use(conn, quote.voucher_id).await?;
            new_redemption(user_id, quote.voucher_id, Some(now))
                .insert(conn)
                .await?;
        }
    }

    tracing::debug!(voucher_id = %quote.voucher_id, plan = ?quote.plan, "voucher redeemed");
    Ok(())
}

/// Claims a voucher into the caller's wallet for a later checkout.
#[tracing::instrument(skip(state, user, payload), fields(user_id = %user.user_id))]
pub async fn redeem_voucher(
    state: &AppState,
    user: &AuthUser,
    payload: RedeemVoucherRequest,
) -> AppResult<ApiResponse<Redemption>> {
    let code = payload.voucher_code.trim();
    if code.is_empty() {
        return Err(AppError::BadRequest("voucher_code is required".into()));
    }

    let txn = state.orm.begin().await?;

    let voucher = lock_voucher_by_code(&txn, code).await?;
    discount::ensure_active(&voucher, Utc::now())?;
    let usage = load_usage(&txn, user.user_id, voucher.id).await?;
    discount::check_claim(&voucher, &usage)?;

    reserve_global_use(&txn, voucher.id).await?;
    let redemption: UserVoucherModel = new_redemption(user.user_id, voucher.id, None)
        .insert(&txn)
        .await
        .map_err(|err| {
            if is_unique_violation(&err) {
                AppError::AlreadyHeldUnused
            } else {
                AppError::from(err)
            }
        })?;

    txn.commit().await?;

    audit::record(
        &state.pool,
        user.user_id,
        AuditAction::VoucherRedeem,
        serde_json::json!({ "voucher_id": voucher.id, "redemption_id": redemption.id }),
    )
    .await;

    Ok(ApiResponse::success(
        "Voucher redeemed",
        redemption.into(),
        Some(Meta::empty()),
    ))
}

pub async fn list_vouchers(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<VoucherList>> {
    let (page, limit, offset) = pagination.normalize();
    let finder = Vouchers::find().order_by_desc(VoucherCol::CreatedAt);

    let total = finder.clone().count(state.orm.as_ref()).await? as i64;
    let items = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(state.orm.as_ref())
        .await?
        .into_iter()
        .map(Voucher::from)
        .collect();

    Ok(ApiResponse::success(
        "OK",
        VoucherList { items },
        Some(Meta::new(page, limit, total)),
    ))
}

pub async fn get_voucher(state: &AppState, id: Uuid) -> AppResult<ApiResponse<Voucher>> {
    let voucher = Vouchers::find_by_id(id)
        .one(state.orm.as_ref())
        .await?
        .ok_or(AppError::VoucherNotFound)?;
    Ok(ApiResponse::success("OK", voucher.into(), Some(Meta::empty())))
}

pub async fn list_user_vouchers(
    state: &AppState,
    user: &AuthUser,
) -> AppResult<ApiResponse<UserVoucherList>> {
    let rows = UserVouchers::find()
        .filter(UvCol::UserId.eq(user.user_id))
        .order_by_desc(UvCol::CreatedAt)
        .find_also_related(Vouchers)
        .all(state.orm.as_ref())
        .await?;

    let items = rows
        .into_iter()
        .filter_map(|(redemption, voucher)| {
            voucher.map(|voucher| UserVoucherDto {
                redemption: redemption.into(),
                voucher: voucher.into(),
            })
        })
        .collect();

    Ok(ApiResponse::success(
        "OK",
        UserVoucherList { items },
        Some(Meta::empty()),
    ))
}
