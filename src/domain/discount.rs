use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::{
    entity::vouchers::{DiscountType, Model as VoucherModel},
    error::{AppError, AppResult},
};

/// A user's existing redemptions of one voucher, read inside the transaction
/// that holds the voucher row lock.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RedemptionUsage {
    pub held_unused: Option<Uuid>,
    pub total_for_user: i64,
}

/// How a checkout turns a voucher into a consumed redemption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedemptionPlan {
    /// Flip the user's claimed-but-unused redemption to used.
    ConsumeHeld(Uuid),
    /// Claim and consume in one step: take a global use and insert a used redemption.
    ClaimAndConsume,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoucherQuote {
    pub voucher_id: Uuid,
    pub code: String,
    pub discount: i64,
    pub plan: RedemptionPlan,
}

pub fn ensure_active(voucher: &VoucherModel, now: DateTime<Utc>) -> AppResult<()> {
    let start = voucher.start_date.with_timezone(&Utc);
    let end = voucher.end_date.with_timezone(&Utc);
    if now < start || now > end {
        return Err(AppError::VoucherNotActive);
    }
    Ok(())
}

pub fn ensure_min_order(voucher: &VoucherModel, subtotal: i64) -> AppResult<()> {
    if subtotal < voucher.min_order {
        return Err(AppError::MinOrderNotMet {
            min_order: voucher.min_order,
        });
    }
    Ok(())
}

fn ensure_limits(voucher: &VoucherModel, usage: &RedemptionUsage) -> AppResult<()> {
    if usage.total_for_user >= voucher.usage_limit_per_user {
        return Err(AppError::PerUserLimitReached);
    }
    if voucher.redeemed_count >= voucher.usage_limit_global {
        return Err(AppError::GlobalLimitReached);
    }
    Ok(())
}

/// Rules for claiming a voucher into the user's wallet.
pub fn check_claim(voucher: &VoucherModel, usage: &RedemptionUsage) -> AppResult<()> {
    if usage.held_unused.is_some() {
        return Err(AppError::AlreadyHeldUnused);
    }
    ensure_limits(voucher, usage)
}

/// Rules for spending a voucher at checkout. A held claim was already counted
/// against both limits when it was taken.
pub fn plan_checkout(voucher: &VoucherModel, usage: &RedemptionUsage) -> AppResult<RedemptionPlan> {
    if let Some(id) = usage.held_unused {
        return Ok(RedemptionPlan::ConsumeHeld(id));
    }
    ensure_limits(voucher, usage)?;
    Ok(RedemptionPlan::ClaimAndConsume)
}

/// Discount for `subtotal`, never above it.
///
/// Percent vouchers round down to the minor unit and honour `max_discount`
/// when it is positive.
pub fn compute_discount(
    discount_type: DiscountType,
    value: i64,
    max_discount: i64,
    subtotal: i64,
) -> i64 {
    if subtotal <= 0 || value <= 0 {
        return 0;
    }

    let raw = match discount_type {
        DiscountType::Percent => {
            let pct = i128::from(subtotal) * i128::from(value) / 100;
            let pct = i64::try_from(pct).unwrap_or(i64::MAX);
            if max_discount > 0 {
                pct.min(max_discount)
            } else {
                pct
            }
        }
        DiscountType::Fixed => value,
    };

    raw.clamp(0, subtotal)
}

pub fn discount_for(voucher: &VoucherModel, subtotal: i64) -> i64 {
    compute_discount(
        voucher.discount_type,
        voucher.discount_value,
        voucher.max_discount,
        subtotal,
    )
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn voucher(discount_type: DiscountType, value: i64, max_discount: i64) -> VoucherModel {
        let now = Utc::now();
        VoucherModel {
            id: Uuid::new_v4(),
            code: "SAVE10".into(),
            description: None,
            discount_type,
            discount_value: value,
            min_order: 0,
            max_discount,
            start_date: (now - Duration::days(1)).into(),
            end_date: (now + Duration::days(1)).into(),
            usage_limit_global: 10,
            usage_limit_per_user: 1,
            redeemed_count: 0,
            created_at: now.into(),
        }
    }

    #[test]
    fn percent_discount_is_capped() {
        // 10% of 500,000 is 50,000; the cap brings it to 40,000.
        let v = voucher(DiscountType::Percent, 10, 40_000);
        let discount = discount_for(&v, 500_000);
        assert_eq!(discount, 40_000);
        assert_eq!(500_000 - discount, 460_000);
    }

    #[test]
    fn percent_without_cap_uses_full_rate() {
        assert_eq!(compute_discount(DiscountType::Percent, 10, 0, 500_000), 50_000);
        assert_eq!(compute_discount(DiscountType::Percent, 15, 0, 999), 149);
    }

    #[test]
    fn fixed_discount_is_clamped_to_subtotal() {
        let v = voucher(DiscountType::Fixed, 150_000, 0);
        let discount = discount_for(&v, 100_000);
        assert_eq!(discount, 100_000);
        assert_eq!(100_000 - discount, 0);
        assert_eq!(compute_discount(DiscountType::Fixed, 20_000, 0, 100_000), 20_000);
    }

    #[test]
    fn fixed_discount_ignores_max_discount() {
        assert_eq!(compute_discount(DiscountType::Fixed, 30_000, 10_000, 100_000), 30_000);
    }

    #[test]
    fn discount_stays_within_bounds() {
        for subtotal in [0_i64, 1, 99, 100, 12_345, 1_000_000, i64::MAX] {
            for (kind, value, cap) in [
                (DiscountType::Percent, 0, 0),
                (DiscountType::Percent, 50, 0),
                (DiscountType::Percent, 100, 0),
                (DiscountType::Percent, 250, 0),
                (DiscountType::Percent, 30, 5_000),
                (DiscountType::Fixed, 0, 0),
                (DiscountType::Fixed, 7_500, 0),
                (DiscountType::Fixed, i64::MAX, 0),
            ] {
                let d = compute_discount(kind, value, cap, subtotal);
                assert!(d >= 0 && d <= subtotal, "{kind:?} {value} {cap} {subtotal} -> {d}");
            }
        }
    }

    #[test]
    fn validity_window_is_inclusive() {
        let v = voucher(DiscountType::Fixed, 1, 0);
        assert!(ensure_active(&v, v.start_date.with_timezone(&Utc)).is_ok());
        assert!(ensure_active(&v, v.end_date.with_timezone(&Utc)).is_ok());
        assert!(matches!(
            ensure_active(&v, Utc::now() + Duration::days(2)),
            Err(AppError::VoucherNotActive)
        ));
        assert!(matches!(
            ensure_active(&v, Utc::now() - Duration::days(2)),
            Err(AppError::VoucherNotActive)
        ));
    }

    #[test]
    fn min_order_is_enforced() {
        let mut v = voucher(DiscountType::Fixed, 1, 0);
        v.min_order = 200_000;
        assert!(matches!(
            ensure_min_order(&v, 199_999),
            Err(AppError::MinOrderNotMet { min_order: 200_000 })
        ));
        assert!(ensure_min_order(&v, 200_000).is_ok());
    }

    #[test]
    fn claim_rejects_held_unused_first() {
        let v = voucher(DiscountType::Percent, 10, 0);
        let usage = RedemptionUsage {
            held_unused: Some(Uuid::new_v4()),
            total_for_user: 1,
        };
        assert!(matches!(check_claim(&v, &usage), Err(AppError::AlreadyHeldUnused)));
    }

    #[test]
    fn claim_respects_per_user_then_global_limits() {
        let mut v = voucher(DiscountType::Percent, 10, 0);
        v.usage_limit_per_user = 2;
        let spent_twice = RedemptionUsage {
            held_unused: None,
            total_for_user: 2,
        };
        assert!(matches!(check_claim(&v, &spent_twice), Err(AppError::PerUserLimitReached)));

        v.redeemed_count = v.usage_limit_global;
        assert!(matches!(
            check_claim(&v, &RedemptionUsage::default()),
            Err(AppError::GlobalLimitReached)
        ));
    }

    #[test]
    fn checkout_consumes_held_claim_even_at_limits() {
        let mut v = voucher(DiscountType::Percent, 10, 0);
        v.redeemed_count = v.usage_limit_global;
        let held = Uuid::new_v4();
        let usage = RedemptionUsage {
            held_unused: Some(held),
            total_for_user: 1,
        };
        assert_eq!(plan_checkout(&v, &usage).unwrap(), RedemptionPlan::ConsumeHeld(held));
    }

    #[test]
    fn checkout_without_claim_claims_in_one_step() {
        let v = voucher(DiscountType::Percent, 10, 0);
        assert_eq!(
            plan_checkout(&v, &RedemptionUsage::default()).unwrap(),
            RedemptionPlan::ClaimAndConsume
        );

        let mut exhausted = v.clone();
        exhausted.redeemed_count = exhausted.usage_limit_global;
        assert!(matches!(
            plan_checkout(&exhausted, &RedemptionUsage::default()),
            Err(AppError::GlobalLimitReached)
        ));
    }
}
