use std::collections::HashMap;

use sea_orm::{
    ColumnTrait, Condition, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, QuerySelect,
};
use uuid::Uuid;

use crate::{
    db::OrmConn,
    dto::orders::{OrderList, OrderWithItems},
    entity::{
        order_items::{Column as OrderItemCol, Entity as OrderItems},
        orders::{Column as OrderCol, Entity as Orders, Model as OrderModel},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{Order, OrderItem},
    response::{ApiResponse, Meta},
    routes::params::{OrderListQuery, SortOrder},
    state::AppState,
};

/// Attach items to each order with a single `order_items` query.
pub(crate) async fn with_items(
    orm: &OrmConn,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<OrderWithItems>> {
    let ids: Vec<Uuid> = orders.iter().map(|o| o.id).collect();
    let mut grouped: HashMap<Uuid, Vec<OrderItem>> = HashMap::new();
    if !ids.is_empty() {
        let items = OrderItems::find()
            .filter(OrderItemCol::OrderId.is_in(ids))
            .all(orm)
            .await?;
        for item in items {
            grouped
                .entry(item.order_id)
                .or_default()
                .push(OrderItem::from(item));
        }
    }

    Ok(orders
        .into_iter()
        .map(|model| {
            let items = grouped.remove(&model.id).unwrap_or_default();
            OrderWithItems {
                order: Order::from(model),
                items,
            }
        })
        .collect())
}

/// Orders matching `condition`, paginated and sorted by creation time.
pub(crate) async fn list_page(
    orm: &OrmConn,
    condition: Condition,
    query: OrderListQuery,
) -> AppResult<(Vec<OrderWithItems>, Meta)> {
    let (page, limit, offset) = query.pagination.normalize();
    let mut condition = condition;
    if let Some(status) = query.status.as_ref().filter(|s| !s.is_empty()) {
        condition = condition.add(OrderCol::Status.eq(status.clone()));
    }

    let mut finder = Orders::find().filter(condition);
    finder = match query.sort_order.unwrap_or(SortOrder::Desc) {
        SortOrder::Asc => finder.order_by_asc(OrderCol::CreatedAt),
        SortOrder::Desc => finder.order_by_desc(OrderCol::CreatedAt),
    };

    let total = finder.clone().count(orm).await? as i64;
    let orders = finder
        .limit(limit as u64)
        .offset(offset as u64)
        .all(orm)
        .await?;

    let items = with_items(orm, orders).await?;
    Ok((items, Meta::new(page, limit, total)))
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let condition = Condition::all().add(OrderCol::UserId.eq(user.user_id));
    let (items, meta) = list_page(&state.orm, condition, query).await?;
    Ok(ApiResponse::success("Orders", OrderList { items }, Some(meta)))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: Uuid,
) -> AppResult<ApiResponse<OrderWithItems>> {
    let order = Orders::find()
        .filter(
            Condition::all()
                .add(OrderCol::UserId.eq(user.user_id))
                .add(OrderCol::Id.eq(id)),
        )
        .one(&state.orm)
        .await?;
    let order = match order {
        Some(o) => o,
        None => return Err(AppError::NotFound),
    };

    let data = with_items(&state.orm, vec![order])
        .await?
        .pop()
        .ok_or(AppError::NotFound)?;
    Ok(ApiResponse::success("Order", data, Some(Meta::empty())))
}
