use crate::{
    cart::CartStore,
    dto::cart::{AddToCartRequest, CartView, UpdateCartItemRequest},
    error::AppResult,
    response::{ApiResponse, Meta},
};

fn render(message: &str, cart: &CartStore) -> ApiResponse<CartView> {
    let meta = Meta::total(cart.items().len());
    ApiResponse::success(message, CartView::from(cart), Some(meta))
}

pub fn get_cart(cart: &CartStore) -> ApiResponse<CartView> {
    render("Cart", cart)
}

pub async fn add_item(
    cart: &mut CartStore,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartView>> {
    cart.add_to_cart(&payload.product_id, payload.quantity)
        .await?;
    Ok(render("Added to cart", cart))
}

/// Quantities below 1 leave the cart unchanged; the line is removed
/// through [`remove_item`] instead.
pub async fn update_item(
    cart: &mut CartStore,
    id: &str,
    payload: UpdateCartItemRequest,
) -> AppResult<ApiResponse<CartView>> {
    cart.update_quantity(id, payload.quantity).await;
    Ok(render("Cart updated", cart))
}

pub async fn remove_item(cart: &mut CartStore, id: &str) -> AppResult<ApiResponse<CartView>> {
    cart.remove_from_cart(id).await?;
    Ok(render("Removed from cart", cart))
}

pub async fn clear(cart: &mut CartStore) -> AppResult<ApiResponse<CartView>> {
    cart.clear_cart().await?;
    Ok(render("Cart cleared", cart))
}
