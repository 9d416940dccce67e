use utoipa::{
    Modify, OpenApi,
    openapi::{
        self,
        OpenApi as OpenApiSpec,
        security::{HttpAuthScheme, HttpBuilder, SecurityScheme},
    },
};
use utoipa_scalar::{Scalar, Servable};

use crate::{
    domain::payment_methods::PaymentMethodInfo,
    dto::{
        cart::{AddToCartRequest, CartLineDto, CartView, UpdateCartItemRequest},
        orders::{CreateOrderRequest, OrderDetail, OrderList, OrderSummary, UpdateOrderStatusRequest},
        vouchers::{
            VoucherRequest, RedeemVoucherRequest, UserVoucherDto, UserVoucherList,
            VoucherList,
        },
    },
    entity::{
        carts::CartStatus,
        orders::OrderStatus,
        payments::{PaymentMethod, PaymentStatus},
        vouchers::DiscountType,
    },
    models::{Cart, CartItem, Order, OrderItem, Payment, Product, Redemption, Voucher},
    response::{Ack, ApiResponse, Meta},
    routes::{admin, cart, health, orders, params, payment_methods, vouchers},
};

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health_check,
        cart::get_cart,
        cart::init_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::cancel_order,
        vouchers::list_vouchers,
        vouchers::get_voucher,
        vouchers::redeem_voucher,
        vouchers::list_user_vouchers,
        payment_methods::list_payment_methods,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
        admin::create_voucher,
        admin::update_voucher,
        admin::delete_voucher
    ),
    components(
        schemas(
            Product,
            Cart,
            CartItem,
            CartStatus,
            Order,
            OrderItem,
            OrderStatus,
            Payment,
            PaymentMethod,
            PaymentStatus,
            PaymentMethodInfo,
            Voucher,
            DiscountType,
            Redemption,
            AddToCartRequest,
            UpdateCartItemRequest,
            CartLineDto,
            CartView,
            CreateOrderRequest,
            OrderSummary,
            OrderDetail,
            OrderList,
            UpdateOrderStatusRequest,
            RedeemVoucherRequest,
            VoucherRequest,
            VoucherList,
            UserVoucherDto,
            UserVoucherList,
            Ack,
            params::Pagination,
            params::OrderListQuery,
            params::SortOrder,
            Meta,
            ApiResponse<OrderSummary>,
            ApiResponse<OrderDetail>,
            ApiResponse<OrderList>,
            ApiResponse<CartView>,
            ApiResponse<Ack>,
            ApiResponse<Voucher>,
            ApiResponse<Redemption>
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Cart", description = "Active cart endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Vouchers", description = "Voucher endpoints"),
        (name = "Payments", description = "Payment method catalogue"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn openapi_lists_checkout_routes() {
        let doc = ApiDoc::openapi();
        for path in [
            "/api/orders",
            "/api/orders/{id}/cancel",
            "/api/vouchers/redeem",
            "/api/admin/orders/{id}/status",
            "/api/admin/vouchers/{id}",
            "/api/payment-methods",
        ] {
            assert!(doc.paths.paths.contains_key(path), "missing {path}");
        }
    }
}
