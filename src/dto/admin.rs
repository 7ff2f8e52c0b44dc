use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::models::Order;

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateOrderStatusRequest {
    pub status: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DashboardStats {
    pub total_orders: i64,
    /// Sum of order totals, in cents.
    pub total_revenue: i64,
    pub pending_orders: i64,
    pub total_products: i64,
    pub low_stock_products: i64,
    pub recent_orders: Vec<Order>,
}
