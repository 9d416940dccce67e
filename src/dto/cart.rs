use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::models::{Cart, CartItem, Product};

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: Uuid,
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct CartLineDto {
    pub item: CartItem,
    pub product: Product,
    pub line_total: i64,
}

/// The active cart priced at current catalogue prices.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    pub cart: Option<Cart>,
    pub items: Vec<CartLineDto>,
    pub length: usize,
    pub total: i64,
}
