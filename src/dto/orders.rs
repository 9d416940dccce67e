use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    domain::assembler::ShippingInfo,
    entity::{
        orders::OrderStatus,
        payments::PaymentMethod,
    },
    error::{AppError, AppResult},
    models::{Order, OrderItem, Payment},
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct CreateOrderRequest {
    pub full_name: String,
    pub phone: String,
    pub address: String,
    pub note: Option<String>,
    pub payment_method: String,
    pub voucher_code: Option<String>,
}

/// A create-order request that passed input validation.
#[derive(Debug, Clone)]
pub struct ValidatedOrder {
    pub shipping: ShippingInfo,
    pub payment_method: PaymentMethod,
    pub voucher_code: Option<String>,
}

impl CreateOrderRequest {
    pub fn validate(self) -> AppResult<ValidatedOrder> {
        let full_name = required("full_name", &self.full_name, 255)?;
        let phone = required("phone", &self.phone, 20)?;
        let address = required("address", &self.address, 500)?;
        if !phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, '+' | ' ' | '-'))
        {
            return Err(AppError::BadRequest("phone has invalid characters".into()));
        }
        let payment_method = PaymentMethod::parse(&self.payment_method)?;
        let note = self
            .note
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());
        let voucher_code = self
            .voucher_code
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty());

        Ok(ValidatedOrder {
            shipping: ShippingInfo {
                full_name,
                phone,
                address,
                note,
            },
            payment_method,
            voucher_code,
        })
    }
}

fn required(field: &str, value: &str, max_len: usize) -> AppResult<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::BadRequest(format!("{field} is required")));
    }
    if value.chars().count() > max_len {
        return Err(AppError::BadRequest(format!(
            "{field} must be at most {max_len} characters"
        )));
    }
    Ok(value.to_string())
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OrderSummary {
    pub order_id: Uuid,
    pub invoice_number: String,
    pub subtotal: i64,
    pub discount: i64,
    pub total: i64,
    pub payment_method: PaymentMethod,
    pub status: OrderStatus,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderDetail {
    pub order: Order,
    pub items: Vec<OrderItem>,
    pub payment: Option<Payment>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct OrderList {
    pub items: Vec<Order>,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> CreateOrderRequest {
        CreateOrderRequest {
            full_name: "  Ferris Crab ".into(),
            phone: "+84 900-000-000".into(),
            address: "1 Harbour Road".into(),
            note: Some("   ".into()),
            payment_method: "cod".into(),
            voucher_code: Some(" SAVE10 ".into()),
        }
    }

    #[test]
    fn trims_and_normalises_input() {
        let order = request().validate().unwrap();
        assert_eq!(order.shipping.full_name, "Ferris Crab");
        assert_eq!(order.shipping.note, None);
        assert_eq!(order.payment_method, PaymentMethod::Cod);
        assert_eq!(order.voucher_code.as_deref(), Some("SAVE10"));
    }

    #[test]
    fn blank_voucher_code_means_no_voucher() {
        let mut req = request();
        req.voucher_code = Some(String::new());
        assert_eq!(req.validate().unwrap().voucher_code, None);
    }

    #[test]
    fn missing_fields_are_rejected() {
        let mut req = request();
        req.address = " ".into();
        assert!(matches!(req.validate(), Err(AppError::BadRequest(msg)) if msg.contains("address")));

        let mut req = request();
        req.phone = "call me".into();
        assert!(matches!(req.validate(), Err(AppError::BadRequest(_))));

        let mut req = request();
        req.payment_method = "crypto".into();
        assert!(matches!(req.validate(), Err(AppError::BadRequest(_))));
    }
}
