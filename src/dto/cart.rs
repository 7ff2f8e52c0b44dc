use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{cart::CartStore, models::CartItem};

fn one() -> i32 {
    1
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct AddToCartRequest {
    pub product_id: String,
    #[serde(default = "one")]
    pub quantity: i32,
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateCartItemRequest {
    pub quantity: i32,
}

/// The cart as rendered to the client. `subtotal` is in cents.
#[derive(Debug, Serialize, ToSchema)]
pub struct CartView {
    /// `guest` or `authenticated`.
    pub mode: String,
    pub items: Vec<CartItem>,
    pub item_count: i64,
    pub subtotal: i64,
    pub loading: bool,
}

impl From<&CartStore> for CartView {
    fn from(cart: &CartStore) -> Self {
        Self {
            mode: cart.identity().mode().to_string(),
            items: cart.items().to_vec(),
            item_count: cart.item_count(),
            subtotal: cart.subtotal(),
            loading: cart.is_loading(),
        }
    }
}
