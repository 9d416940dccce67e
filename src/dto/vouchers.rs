use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    entity::vouchers::DiscountType,
    error::{AppError, AppResult},
    models::{Redemption, Voucher},
};

#[derive(Debug, Deserialize, ToSchema)]
pub struct RedeemVoucherRequest {
    pub voucher_code: String,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct VoucherRequest {
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    #[serde(default)]
    pub min_order: i64,
    #[serde(default)]
    pub max_discount: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit_global: i64,
    pub usage_limit_per_user: i64,
}

impl VoucherRequest {
    pub fn validate(&self) -> AppResult<()> {
        let code = self.code.trim();
        if code.is_empty() || code.len() > 50 {
            return Err(AppError::BadRequest(
                "code must be between 1 and 50 characters".into(),
            ));
        }
        if self.discount_value <= 0 {
            return Err(AppError::BadRequest("discount_value must be positive".into()));
        }
        if self.discount_type == DiscountType::Percent && self.discount_value > 100 {
            return Err(AppError::BadRequest(
                "percent discount_value must be at most 100".into(),
            ));
        }
        if self.min_order < 0 || self.max_discount < 0 {
            return Err(AppError::BadRequest(
                "min_order and max_discount must not be negative".into(),
            ));
        }
        if self.start_date > self.end_date {
            return Err(AppError::BadRequest("start_date must not be after end_date".into()));
        }
        if self.usage_limit_global <= 0 || self.usage_limit_per_user <= 0 {
            return Err(AppError::BadRequest("usage limits must be positive".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VoucherList {
    pub items: Vec<Voucher>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserVoucherDto {
    pub redemption: Redemption,
    pub voucher: Voucher,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct UserVoucherList {
    pub items: Vec<UserVoucherDto>,
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn request() -> VoucherRequest {
        VoucherRequest {
            code: "SAVE10".into(),
            description: None,
            discount_type: DiscountType::Percent,
            discount_value: 10,
            min_order: 0,
            max_discount: 40_000,
            start_date: Utc::now(),
            end_date: Utc::now() + Duration::days(30),
            usage_limit_global: 100,
            usage_limit_per_user: 1,
        }
    }

    #[test]
    fn accepts_a_well_formed_voucher() {
        assert!(request().validate().is_ok());
    }

    #[test]
    fn rejects_inverted_window_and_big_percent() {
        let mut req = request();
        req.end_date = req.start_date - Duration::days(1);
        assert!(req.validate().is_err());

        let mut req = request();
        req.discount_value = 150;
        assert!(req.validate().is_err());

        let mut req = request();
        req.discount_type = DiscountType::Fixed;
        req.discount_value = 150_000;
        assert!(req.validate().is_ok());
    }
}
