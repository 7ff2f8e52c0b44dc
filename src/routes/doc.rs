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
    catalog::{ProductFilter, ProductSort},
    dto::{
        admin::{DashboardStats, UpdateOrderStatusRequest},
        cart::{AddToCartRequest, CartView, UpdateCartItemRequest},
        orders::{CheckoutRequest, OrderList, OrderWithItems, QuoteQuery},
        products::{CategoryList, CreateProductRequest, ProductList, ReviewList, UpdateProductRequest},
    },
    models::{CartItem, CartProduct, Category, Order, OrderItem, Product, Review, ReviewAuthor, ShippingAddress},
    response::{ApiResponse, Meta},
    routes::{admin, cart, categories, checkout, health, orders, params, products, setup},
    services::{
        checkout_service::{OrderTotals, ShippingMethod},
        setup_service::SetupResponse,
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
        setup::setup_db,
        products::list_products,
        products::get_product,
        products::related_products,
        products::product_reviews,
        products::create_product,
        products::update_product,
        products::delete_product,
        categories::list_categories,
        cart::get_cart,
        cart::add_item,
        cart::update_item,
        cart::remove_item,
        cart::clear_cart,
        checkout::quote,
        checkout::checkout,
        orders::list_orders,
        orders::get_order,
        admin::dashboard,
        admin::list_all_orders,
        admin::get_order_admin,
        admin::update_order_status
    ),
    components(
        schemas(
            Product,
            Category,
            Review,
            ReviewAuthor,
            CartItem,
            CartProduct,
            CartView,
            Order,
            OrderItem,
            ShippingAddress,
            ShippingMethod,
            OrderTotals,
            ProductFilter,
            ProductSort,
            ProductList,
            CategoryList,
            ReviewList,
            CreateProductRequest,
            UpdateProductRequest,
            AddToCartRequest,
            UpdateCartItemRequest,
            CheckoutRequest,
            QuoteQuery,
            OrderList,
            OrderWithItems,
            DashboardStats,
            UpdateOrderStatusRequest,
            SetupResponse,
            params::Pagination,
            params::OrderListQuery,
            Meta,
            ApiResponse<Product>,
            ApiResponse<ProductList>,
            ApiResponse<CartView>,
            ApiResponse<OrderWithItems>,
            ApiResponse<OrderList>,
            ApiResponse<DashboardStats>
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Health check endpoint"),
        (name = "Setup", description = "Database setup"),
        (name = "Products", description = "Catalog endpoints"),
        (name = "Cart", description = "Guest and signed-in cart endpoints"),
        (name = "Checkout", description = "Pricing and order placement"),
        (name = "Orders", description = "Order history"),
        (name = "Admin", description = "Admin endpoints"),
    )
)]
pub struct ApiDoc;

pub fn scalar_docs() -> Scalar<OpenApiSpec> {
    Scalar::with_url("/docs", ApiDoc::openapi())
}
