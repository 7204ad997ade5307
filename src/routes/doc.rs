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
    dto::{
        addresses::{Address, CreateAddressRequest},
        cart::{AddCartItemRequest, Cart, CartItem, CartProduct, UpdateCartItemRequest},
        orders::{
            CreateOrderRequest, Order, OrderItem, OrderSummary, PaymentIntentResponse,
            UpdateOrderStatusRequest,
        },
        products::{Product, ProductSummary},
        reviews::{CreateReviewRequest, Review, UpdateReviewRequest},
    },
    entity::orders::OrderStatus,
    response::{ErrorBody, Meta, Page},
    routes::{
        addresses, admin, cart, health, orders, payments, payments::WebhookAck,
        products as product_routes, reviews,
    },
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
        product_routes::list_products,
        product_routes::get_product,
        reviews::list_reviews,
        reviews::create_review,
        reviews::update_review,
        reviews::delete_review,
        cart::get_cart,
        cart::add_cart_item,
        cart::update_cart_item,
        cart::remove_cart_item,
        addresses::list_addresses,
        addresses::create_address,
        addresses::delete_address,
        orders::create_order,
        orders::list_orders,
        orders::get_order,
        orders::create_payment_intent,
        payments::payment_webhook,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status,
    ),
    components(
        schemas(
            health::HealthData,
            Meta,
            ErrorBody,
            OrderStatus,
            Product,
            ProductSummary,
            Page<Product>,
            Review,
            CreateReviewRequest,
            UpdateReviewRequest,
            Page<Review>,
            Cart,
            CartItem,
            CartProduct,
            AddCartItemRequest,
            UpdateCartItemRequest,
            Address,
            CreateAddressRequest,
            CreateOrderRequest,
            Order,
            OrderItem,
            OrderSummary,
            Page<OrderSummary>,
            PaymentIntentResponse,
            UpdateOrderStatusRequest,
            WebhookAck,
        )
    ),
    security(
        ("bearer_auth" = [])
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Products", description = "Product endpoints"),
        (name = "Reviews", description = "Product review endpoints"),
        (name = "Cart", description = "Cart endpoints"),
        (name = "Addresses", description = "Shipping address endpoints"),
        (name = "Orders", description = "Checkout and order endpoints"),
        (name = "Payments", description = "Payment processor callbacks"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
