use sea_orm::{ActiveModelTrait, Condition, EntityTrait, QueryOrder, QuerySelect, Set};
use uuid::Uuid;

use crate::{
    dto::{
        admin::{DashboardStats, UpdateOrderStatusRequest},
        orders::{OrderList, OrderWithItems},
    },
    entity::orders::{ActiveModel as OrderActive, Column as OrderCol, Entity as Orders},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Order,
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::order_service,
    state::AppState,
};

pub const ORDER_STATUSES: [&str; 5] = ["pending", "processing", "shipped", "completed", "cancelled"];

/// Products at or below this stock level count as low stock.
pub const LOW_STOCK_THRESHOLD: i32 = 5;

const RECENT_ORDERS: u64 = 5;

pub async fn dashboard(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<DashboardStats>> {
    ensure_admin(user)?;

    let (total_orders, total_revenue, pending_orders): (i64, i64, i64) = sqlx::query_as(
        r#"
        SELECT COUNT(*),
               COALESCE(SUM(total), 0)::BIGINT,
               COUNT(*) FILTER (WHERE status = 'pending')
        FROM orders
        "#,
    )
    .fetch_one(&state.pool)
    .await?;

    let (total_products, low_stock_products): (i64, i64) = sqlx::query_as(
        "SELECT COUNT(*), COUNT(*) FILTER (WHERE stock <= $1) FROM products",
    )
    .bind(LOW_STOCK_THRESHOLD)
    .fetch_one(&state.pool)
    .await?;

    let recent_orders = Orders::find()
        .order_by_desc(OrderCol::CreatedAt)
        .limit(RECENT_ORDERS)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Order::from)
        .collect();

    let data = DashboardStats {
        total_orders,
        total_revenue,
        pending_orders,
        total_products,
        low_stock_products,
        recent_orders,
    };
    Ok(ApiResponse::success("Dashboard", data, Some(Meta::empty())))
}

pub async fn list_all_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    ensure_admin(user)?;
    let (items, meta) = order_service::list_page(&state.orm, Condition::all(), query).await?;
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order_admin(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    ensure_admin(user)?;
    let order = Orders::find_by_id(id).one(&state.orm).await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let data = order_service::with_items(&state.orm, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Order found", data, Some(Meta::empty())))
}

pub async fn update_order_status(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
    payload: UpdateOrderStatusRequest,
) -> AppResult<ApiResponse<Order>> {
    ensure_admin(user)?;
    validate_order_status(&payload.status)?;

    let existing = Orders::find_by_id(id).one(&state.orm).await?;
    let existing = match existing {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let previous = existing.status.clone();
    let mut active: OrderActive = existing.into();
    active.status = Set(payload.status);
    let order = active.update(&state.orm).await?;

    tracing::info!(
        order_id = %order.id,
        from = %previous,
        to = %order.status,
        admin = %user.user_id,
        "order status updated"
    );
    Ok(ApiResponse::success(
        "Order updated",
        Order::from(order),
        Some(Meta::empty()),
    ))
}

fn validate_order_status(status: &str) -> Result<(), AppError> {
    if ORDER_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::BadRequest("Invalid order status".into()))
    }
}
