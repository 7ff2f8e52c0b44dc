use async_trait::async_trait;
use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, DbErr, EntityTrait, Set};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{
    cart::{CartError, CartStore},
    db::OrmConn,
    dto::orders::{CheckoutRequest, OrderWithItems},
    entity::{
        order_items::{ActiveModel as OrderItemActive, Entity as OrderItems},
        orders::ActiveModel as OrderActive,
    },
    error::{AppError, AppResult},
    models::{CartItem, Order, OrderItem, ShippingAddress},
    response::{ApiResponse, Meta},
};

pub const DEFAULT_PAYMENT_METHOD: &str = "credit_card";

/// Tax as a percentage of the subtotal.
pub const TAX_PERCENT: i64 = 8;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ShippingMethod {
    #[default]
    Standard,
    Express,
}

impl ShippingMethod {
    /// Flat fee in cents.
    pub fn fee(self) -> i64 {
        match self {
            ShippingMethod::Standard => 599,
            ShippingMethod::Express => 1299,
        }
    }
}

/// Order pricing, all in cents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct OrderTotals {
    pub subtotal: i64,
    pub shipping: i64,
    pub tax: i64,
    pub total: i64,
}

impl OrderTotals {
    pub fn compute(subtotal: i64, method: ShippingMethod) -> Self {
        let shipping = method.fee();
        // half-up to the cent
        let tax = subtotal.saturating_mul(TAX_PERCENT).saturating_add(50) / 100;
        Self {
            subtotal,
            shipping,
            tax,
            total: subtotal.saturating_add(shipping).saturating_add(tax),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NewOrder {
    pub user_id: Uuid,
    pub total: i64,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
}

/// The two writes a checkout performs.
#[async_trait]
pub trait OrderWriter: Send + Sync {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, DbErr>;

    /// Insert one row per line with the line's current unit price.
    async fn insert_items(
        &self,
        order_id: Uuid,
        lines: &[CartItem],
    ) -> Result<Vec<OrderItem>, DbErr>;
}

pub struct DbOrderWriter {
    orm: OrmConn,
}

impl DbOrderWriter {
    pub fn new(orm: OrmConn) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl OrderWriter for DbOrderWriter {
    async fn insert_order(&self, order: NewOrder) -> Result<Order, DbErr> {
        let shipping_address = serde_json::to_value(&order.shipping_address)
            .map_err(|err| DbErr::Json(err.to_string()))?;

        let model = OrderActive {
            id: Set(Uuid::new_v4()),
            user_id: Set(order.user_id),
            status: Set("pending".into()),
            total: Set(order.total),
            shipping_address: Set(shipping_address),
            payment_method: Set(order.payment_method),
            created_at: NotSet,
        }
        .insert(&self.orm)
        .await?;

        Ok(Order::from(model))
    }

    async fn insert_items(
        &self,
        order_id: Uuid,
        lines: &[CartItem],
    ) -> Result<Vec<OrderItem>, DbErr> {
        let items: Vec<OrderItem> = lines
            .iter()
            .map(|line| OrderItem {
                id: Uuid::new_v4(),
                order_id,
                product_id: line.product_id.clone(),
                quantity: line.quantity,
                price: line.product.price,
            })
            .collect();
        if items.is_empty() {
            return Ok(items);
        }

        let rows = items.iter().map(|item| OrderItemActive {
            id: Set(item.id),
            order_id: Set(item.order_id),
            product_id: Set(item.product_id.clone()),
            quantity: Set(item.quantity),
            price: Set(item.price),
        });
        OrderItems::insert_many(rows).exec(&self.orm).await?;

        Ok(items)
    }
}

/// Every variant renders the same message; the cause is logged.
#[derive(Debug, Error)]
pub enum CheckoutError {
    #[error("Something went wrong. Please try again.")]
    Order(#[source] DbErr),

    #[error("Something went wrong. Please try again.")]
    Items {
        order_id: Uuid,
        #[source]
        source: DbErr,
    },

    #[error("Something went wrong. Please try again.")]
    ClearCart {
        order_id: Uuid,
        #[source]
        source: CartError,
    },
}

pub fn quote(cart: &CartStore, method: ShippingMethod) -> OrderTotals {
    OrderTotals::compute(cart.subtotal(), method)
}

/// Write the order, then its items, then clear the cart. A failed step
/// stops the sequence; earlier writes stay in place.
pub async fn place_order(
    writer: &dyn OrderWriter,
    cart: &mut CartStore,
    user_id: Uuid,
    request: CheckoutRequest,
) -> Result<OrderWithItems, CheckoutError> {
    let totals = quote(cart, request.shipping_method);
    let payment_method = request
        .payment_method
        .filter(|method| !method.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_PAYMENT_METHOD.to_string());

    let order = writer
        .insert_order(NewOrder {
            user_id,
            total: totals.total,
            shipping_address: request.shipping_address,
            payment_method,
        })
        .await
        .map_err(|err| {
            tracing::error!(error = %err, %user_id, "order insert failed");
            CheckoutError::Order(err)
        })?;

    let items = writer
        .insert_items(order.id, cart.items())
        .await
        .map_err(|err| {
            tracing::error!(error = %err, order_id = %order.id, "order items insert failed, order left without items");
            CheckoutError::Items {
                order_id: order.id,
                source: err,
            }
        })?;

    cart.clear_cart().await.map_err(|err| {
        tracing::error!(error = %err, order_id = %order.id, "cart not cleared after checkout");
        CheckoutError::ClearCart {
            order_id: order.id,
            source: err,
        }
    })?;

    tracing::info!(
        order_id = %order.id,
        %user_id,
        lines = items.len(),
        total = totals.total,
        "order placed"
    );
    Ok(OrderWithItems { order, items })
}

pub fn get_quote(cart: &CartStore, method: ShippingMethod) -> ApiResponse<OrderTotals> {
    ApiResponse::success("Quote", quote(cart, method), Some(Meta::empty()))
}

pub async fn checkout(
    writer: &dyn OrderWriter,
    cart: &mut CartStore,
    user_id: Uuid,
    request: CheckoutRequest,
) -> AppResult<ApiResponse<OrderWithItems>> {
    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }
    let missing = request.shipping_address.missing_fields();
    if !missing.is_empty() {
        return Err(AppError::BadRequest(format!(
            "Missing shipping address fields: {}",
            missing.join(", ")
        )));
    }

    let placed = place_order(writer, cart, user_id, request).await?;
    Ok(ApiResponse::success(
        "Order placed",
        placed,
        Some(Meta::empty()),
    ))
}
