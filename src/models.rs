use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::entity::{categories, order_items, orders, products};

/// Catalog product. `price` is in cents.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: String,
    pub price: i64,
    pub image: String,
    pub category: String,
    pub rating: i32,
    pub reviews: i32,
    pub stock: i32,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub image: String,
}

/// Product snapshot embedded in a cart line at add time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartProduct {
    pub id: String,
    pub name: String,
    pub price: i64,
    pub image: String,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CartItem {
    /// Server UUID for authenticated carts, `local-<millis>` for guest carts.
    pub id: String,
    pub product_id: String,
    pub quantity: i32,
    pub product: CartProduct,
}

impl CartItem {
    pub fn line_total(&self) -> i64 {
        self.product.price.saturating_mul(i64::from(self.quantity))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(default)]
pub struct ShippingAddress {
    pub first_name: String,
    pub last_name: String,
    pub address: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

impl ShippingAddress {
    /// Required fields left blank, in form order. `state` is optional.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        [
            ("first_name", &self.first_name),
            ("last_name", &self.last_name),
            ("address", &self.address),
            ("city", &self.city),
            ("zip", &self.zip),
            ("country", &self.country),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Order {
    pub id: Uuid,
    pub user_id: Uuid,
    pub status: String,
    pub total: i64,
    pub shipping_address: ShippingAddress,
    pub payment_method: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct OrderItem {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_id: String,
    pub quantity: i32,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ReviewAuthor {
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Review {
    pub id: Uuid,
    pub product_id: String,
    pub user_id: Uuid,
    pub rating: i32,
    pub comment: String,
    pub created_at: DateTime<Utc>,
    pub author: Option<ReviewAuthor>,
}

impl From<products::Model> for Product {
    fn from(model: products::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            price: model.price,
            image: model.image,
            category: model.category,
            rating: model.rating,
            reviews: model.reviews,
            stock: model.stock,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

impl From<&Product> for CartProduct {
    fn from(product: &Product) -> Self {
        Self {
            id: product.id.clone(),
            name: product.name.clone(),
            price: product.price,
            image: product.image.clone(),
            category: product.category.clone(),
        }
    }
}

impl From<categories::Model> for Category {
    fn from(model: categories::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            image: model.image,
        }
    }
}

impl From<order_items::Model> for OrderItem {
    fn from(model: order_items::Model) -> Self {
        Self {
            id: model.id,
            order_id: model.order_id,
            product_id: model.product_id,
            quantity: model.quantity,
            price: model.price,
        }
    }
}

impl From<orders::Model> for Order {
    fn from(model: orders::Model) -> Self {
        let shipping_address = serde_json::from_value(model.shipping_address).unwrap_or_else(|err| {
            tracing::warn!(order_id = %model.id, error = %err, "unreadable shipping address on order");
            ShippingAddress::default()
        });
        Self {
            id: model.id,
            user_id: model.user_id,
            status: model.status,
            total: model.total,
            shipping_address,
            payment_method: model.payment_method,
            created_at: model.created_at.with_timezone(&Utc),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line(price: i64, quantity: i32) -> CartItem {
        CartItem {
            id: "local-1".into(),
            product_id: "1".into(),
            quantity,
            product: CartProduct {
                id: "1".into(),
                name: "Wireless Headphones".into(),
                price,
                image: String::new(),
                category: "Electronics".into(),
            },
        }
    }

    #[test]
    fn line_total_saturates() {
        assert_eq!(line(12999, 3).line_total(), 38997);
        assert_eq!(line(i64::MAX / 2, i32::MAX).line_total(), i64::MAX);
    }

    #[test]
    fn missing_fields_ignores_state() {
        let address = ShippingAddress {
            first_name: "Ada".into(),
            last_name: " ".into(),
            address: "12 Analytical Row".into(),
            city: "London".into(),
            zip: "N1".into(),
            ..ShippingAddress::default()
        };
        assert_eq!(address.missing_fields(), ["last_name", "country"]);
        assert!(ShippingAddress::default().missing_fields().len() == 6);
    }
}
