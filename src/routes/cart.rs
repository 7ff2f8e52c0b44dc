use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, patch},
};

use crate::{
    dto::cart::{AddToCartRequest, CartView, UpdateCartItemRequest},
    error::AppResult,
    middleware::{auth::MaybeAuthUser, cart_session::CartSession},
    response::ApiResponse,
    services::cart_service,
    state::AppState,
};

type CartResponse = (CartSession, AppResult<Json<ApiResponse<CartView>>>);

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(get_cart).delete(clear_cart))
        .route("/items", axum::routing::post(add_item))
        .route("/items/{id}", patch(update_item).delete(remove_item))
}

#[utoipa::path(
    get,
    path = "/api/cart",
    params(
        ("x-cart-session" = Option<String>, Header, description = "Cart session id; a new one is issued when missing")
    ),
    responses(
        (status = 200, description = "Current cart", body = ApiResponse<CartView>)
    ),
    tag = "Cart"
)]
pub async fn get_cart(
    State(state): State<AppState>,
    session: CartSession,
    user: MaybeAuthUser,
) -> CartResponse {
    let cart = state.carts.open(session.id, user.identity()).await;
    (session, Ok(Json(cart_service::get_cart(&cart))))
}

#[utoipa::path(
    post,
    path = "/api/cart/items",
    params(
        ("x-cart-session" = Option<String>, Header, description = "Cart session id")
    ),
    request_body = AddToCartRequest,
    responses(
        (status = 200, description = "Added; an existing line for the product has its quantity increased", body = ApiResponse<CartView>),
        (status = 400, description = "Invalid quantity or unknown product"),
    ),
    tag = "Cart"
)]
pub async fn add_item(
    State(state): State<AppState>,
    session: CartSession,
    user: MaybeAuthUser,
    Json(payload): Json<AddToCartRequest>,
) -> CartResponse {
    let mut cart = state.carts.open(session.id, user.identity()).await;
    let resp = cart_service::add_item(&mut cart, payload).await;
    (session, resp.map(Json))
}

#[utoipa::path(
    patch,
    path = "/api/cart/items/{id}",
    params(
        ("id" = String, Path, description = "Cart line ID"),
        ("x-cart-session" = Option<String>, Header, description = "Cart session id")
    ),
    request_body = UpdateCartItemRequest,
    responses(
        (status = 200, description = "Updated cart; quantities below 1 are ignored", body = ApiResponse<CartView>),
    ),
    tag = "Cart"
)]
pub async fn update_item(
    State(state): State<AppState>,
    session: CartSession,
    user: MaybeAuthUser,
    Path(id): Path<String>,
    Json(payload): Json<UpdateCartItemRequest>,
) -> CartResponse {
    let mut cart = state.carts.open(session.id, user.identity()).await;
    let resp = cart_service::update_item(&mut cart, &id, payload).await;
    (session, resp.map(Json))
}

#[utoipa::path(
    delete,
    path = "/api/cart/items/{id}",
    params(
        ("id" = String, Path, description = "Cart line ID"),
        ("x-cart-session" = Option<String>, Header, description = "Cart session id")
    ),
    responses(
        (status = 200, description = "Line removed", body = ApiResponse<CartView>),
        (status = 500, description = "Removed locally but the server delete failed"),
    ),
    tag = "Cart"
)]
pub async fn remove_item(
    State(state): State<AppState>,
    session: CartSession,
    user: MaybeAuthUser,
    Path(id): Path<String>,
) -> CartResponse {
    let mut cart = state.carts.open(session.id, user.identity()).await;
    let resp = cart_service::remove_item(&mut cart, &id).await;
    (session, resp.map(Json))
}

#[utoipa::path(
    delete,
    path = "/api/cart",
    params(
        ("x-cart-session" = Option<String>, Header, description = "Cart session id")
    ),
    responses(
        (status = 200, description = "Cart emptied", body = ApiResponse<CartView>),
    ),
    tag = "Cart"
)]
pub async fn clear_cart(
    State(state): State<AppState>,
    session: CartSession,
    user: MaybeAuthUser,
) -> CartResponse {
    let mut cart = state.carts.open(session.id, user.identity()).await;
    let resp = cart_service::clear(&mut cart).await;
    (session, resp.map(Json))
}
