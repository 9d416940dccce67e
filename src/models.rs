use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{
    cart_items, carts,
    carts::CartStatus,
    order_items, orders,
    orders::OrderStatus,
    payments,
    payments::{PaymentMethod, PaymentStatus},
    products, user_vouchers, vouchers,
    vouchers::DiscountType,
};

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Cart {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: CartStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    pub id: Uuid,
    pub cart_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Voucher {
    pub id: Uuid,
    pub code: String,
    pub description: Option<String>,
    pub discount_type: DiscountType,
    pub discount_value: i64,
    pub min_order: i64,
    pub max_discount: i64,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub usage_limit_global: i64,
    pub usage_limit_per_user: i64,
    pub redeemed_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Redemption {
    pub id: Uuid,
    pub user_id: Uuid,
    pub voucher_id: Uuid,
    pub used: bool,
    pub created_at: DateTime<Utc>,
    pub used_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    pub voucher_id: Option<Uuid>,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
    pub invoice_number: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: Uuid,
    pub quantity: i32,
    pub unit_price: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Payment {
    pub id: Uuid,
    pub order_id: Uuid,
    pub method: PaymentMethod,
    pub amount: i64,
    pub status: PaymentStatus,
    pub transaction_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<carts::Model> for Cart {
    fn from(model: carts::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            status: model.status,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<cart_items::Model> for CartItem {
    fn from(model: cart_items::Model) -> Self {
        Self {
            id: model.id,
            cart_id: model.cart_id,
            product_id: model.product_id,
            quantity: model.quantity,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<vouchers::Model> for Voucher {
    fn from(model: vouchers::Model) -> Self {
        Self {
            id: model.id,
            code: model.code,
            description: model.description,
            discount_type: model.discount_type,
            discount_value: model.discount_value,
            min_order: model.min_order,
            max_discount: model.max_discount,
            start_date: model.start_date.with_timezone(&Utc),
            end_date: model.end_date.with_timezone(&Utc),
            usage_limit_global: model.usage_limit_global,
            usage_limit_per_user: model.usage_limit_per_user,
            redeemed_count: model.redeemed_count,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<user_vouchers::Model> for Redemption {
    fn from(model: user_vouchers::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            voucher_id: model.voucher_id,
            used: model.used,
            created_at: model.created_at.with_timezone(&Utc),
            used_at: model.used_at.map(|dt| dt.with_timezone(&Utc)),
        }
    }
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        Self {
            id: model.id,
            user_id: model.user_id,
            full_name: model.full_name,
            phone: model.phone,
            address: model.address,
            note: model.note,
            subtotal: model.subtotal,
            discount: model.discount,
            total: model.total,
            voucher_id: model.voucher_id,
            payment_method: model.payment_method,
            status: model.status,
            invoice_number: model.invoice_number,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            unit_price: model.unit_price,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<payments::Model> for Payment {
    fn from(model: payments::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            method: model.method,
            amount: model.amount,
            status: model.status,
            transaction_id: model.transaction_id,
            created_at: model.created_at.with_timezone(&Utc),
            updated_at: model.updated_at.with_timezone(&Utc),
        }
    }
}
