use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Clone, Copy, Debug, PartialEq, Eq, EnumIter, DeriveActiveEnum, Serialize, Deserialize, ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    #[sea_orm(string_value = "percent")]
    Percent,
    #[sea_orm(string_value = "fixed")]
    Fixed,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "vouchers")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order: i64,
    /// Upper bound for percent discounts; 0 means uncapped.
    pub max_discount: i64,
    pub start_date: DateTimeWithTimeZone,
    pub end_date: DateTimeWithTimeZone,
    pub usage_limit_global: i64,
    pub usage_limit_per_user: i64,
    /// Claims counted against `usage_limit_global`. Only ever moved by a
    /// guarded `redeemed_count < usage_limit_global` update.
    pub redeemed_count: i64,
    pub created_at: DateTimeWithTimeZone,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::user_vouchers::Entity")]
    UserVouchers,
}

impl Related<super::user_vouchers::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::UserVouchers.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
