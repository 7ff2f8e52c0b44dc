use axum::{
    Json, Router,
    extract::{Query, State},
    routing::get,
};

use crate::{
    dto::orders::{CheckoutRequest, OrderWithItems, QuoteQuery},
    error::AppResult,
    middleware::{auth::AuthUser, cart_session::CartSession},
    response::ApiResponse,
    services::checkout_service::{self, OrderTotals},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", axum::routing::post(checkout))
        .route("/quote", get(quote))
}

#[utoipa::path(
    get,
    path = "/api/checkout/quote",
    params(
        ("shipping_method" = Option<String>, Query, description = "standard (default) or express"),
        ("x-cart-session" = Option<String>, Header, description = "Cart session id")
    ),
    responses(
        (status = 200, description = "Subtotal, shipping, tax and total in cents", body = ApiResponse<OrderTotals>),
        (status = 401, description = "Unauthorized"),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn quote(
    State(state): State<AppState>,
    session: CartSession,
    user: AuthUser,
    Query(query): Query<QuoteQuery>,
) -> (CartSession, Json<ApiResponse<OrderTotals>>) {
    let cart = state.carts.open(session.id, user.identity()).await;
    let resp = checkout_service::get_quote(&cart, query.shipping_method);
    (session, Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/checkout",
    params(
        ("x-cart-session" = Option<String>, Header, description = "Cart session id")
    ),
    request_body = CheckoutRequest,
    responses(
        (status = 200, description = "Order placed and cart cleared", body = ApiResponse<OrderWithItems>),
        (status = 400, description = "Cart is empty or shipping address incomplete"),
        (status = 401, description = "Unauthorized"),
        (status = 500, description = "Something went wrong. Please try again."),
    ),
    security(("bearer_auth" = [])),
    tag = "Checkout"
)]
pub async fn checkout(
    State(state): State<AppState>,
    session: CartSession,
    user: AuthUser,
    Json(payload): Json<CheckoutRequest>,
) -> (CartSession, AppResult<Json<ApiResponse<OrderWithItems>>>) {
    let mut cart = state.carts.open(session.id, user.identity()).await;
    let resp =
        checkout_service::checkout(state.orders.as_ref(), &mut cart, user.user_id, payload).await;
    (session, resp.map(Json))
}
