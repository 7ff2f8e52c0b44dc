//! Static catalog served when the database cannot be queried.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use crate::models::{Category, Product, Review, ReviewAuthor};

const PLACEHOLDER_PRODUCT_IMAGE: &str = "/placeholder.svg?height=400&width=400";
const PLACEHOLDER_CATEGORY_IMAGE: &str = "/placeholder.svg?height=300&width=300";

/// Number of related products shown on a product page.
pub const RELATED_LIMIT: usize = 4;

/// id, name, category, price, rating, reviews, stock, description
type Row = (&'static str, &'static str, &'static str, i64, i32, i32, i32, &'static str);

const PRODUCTS: [Row; 4] = [
    (
        "1",
        "Wireless Headphones",
        "Electronics",
        12999,
        4,
        42,
        38,
        "Premium wireless headphones with noise cancellation and long battery life.",
    ),
    (
        "2",
        "Smart Watch",
        "Electronics",
        19999,
        5,
        87,
        24,
        "Feature-packed smartwatch with health monitoring and smartphone notifications.",
    ),
    (
        "3",
        "Leather Backpack",
        "Accessories",
        7999,
        4,
        36,
        52,
        "Stylish and durable leather backpack with multiple compartments.",
    ),
    (
        "4",
        "Running Shoes",
        "Footwear",
        8999,
        4,
        128,
        18,
        "Comfortable running shoes with excellent support and cushioning.",
    ),
];

pub fn products() -> Vec<Product> {
    let now = Utc::now();
    PRODUCTS
        .iter()
        .map(
            |&(id, name, category, price, rating, reviews, stock, description)| Product {
                id: id.to_string(),
                name: name.to_string(),
                description: description.to_string(),
                price,
                image: PLACEHOLDER_PRODUCT_IMAGE.to_string(),
                category: category.to_string(),
                rating,
                reviews,
                stock,
                created_at: now,
            },
        )
        .collect()
}

pub fn product_by_id(id: &str) -> Option<Product> {
    products().into_iter().find(|p| p.id == id)
}

/// Fallback products sharing `category` (any category when `None`), never
/// including `id` itself.
pub fn related_products(id: &str, category: Option<&str>) -> Vec<Product> {
    products()
        .into_iter()
        .filter(|p| p.id != id)
        .filter(|p| category.is_none_or(|c| p.category == c))
        .take(RELATED_LIMIT)
        .collect()
}

pub fn categories() -> Vec<Category> {
    [
        ("electronics", "Electronics"),
        ("clothing", "Clothing"),
        ("home", "Home & Kitchen"),
        ("beauty", "Beauty & Personal Care"),
    ]
    .into_iter()
    .map(|(id, name)| Category {
        id: id.to_string(),
        name: name.to_string(),
        image: PLACEHOLDER_CATEGORY_IMAGE.to_string(),
    })
    .collect()
}

pub fn reviews(product_id: &str) -> Vec<Review> {
    let review = |n: u128,
                  rating: i32,
                  comment: &str,
                  date: DateTime<Utc>,
                  first: &str,
                  last: &str| Review {
        id: Uuid::from_u128(n),
        product_id: product_id.to_string(),
        user_id: Uuid::nil(),
        rating,
        comment: comment.to_string(),
        created_at: date,
        author: Some(ReviewAuthor {
            first_name: first.to_string(),
            last_name: last.to_string(),
        }),
    };

    vec![
        review(
            1,
            5,
            "Excellent product! The quality exceeded my expectations. Would definitely recommend.",
            Utc.with_ymd_and_hms(2023, 3, 15, 0, 0, 0).single().unwrap_or_default(),
            "John",
            "D.",
        ),
        review(
            2,
            4,
            "Great product for the price. Shipping was fast and the item was as described.",
            Utc.with_ymd_and_hms(2023, 2, 28, 0, 0, 0).single().unwrap_or_default(),
            "Sarah",
            "M.",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fallback_catalog_is_the_fixed_four_items() {
        let names: Vec<_> = products().into_iter().map(|p| p.name).collect();
        assert_eq!(
            names,
            ["Wireless Headphones", "Smart Watch", "Leather Backpack", "Running Shoes"]
        );
        assert_eq!(categories().len(), 4);
    }

    #[test]
    fn related_excludes_self_and_filters_category() {
        let related = related_products("1", Some("Electronics"));
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, "2");

        let any = related_products("1", None);
        assert_eq!(any.len(), 3);
        assert!(any.iter().all(|p| p.id != "1"));
    }

    #[test]
    fn lookup_by_id() {
        assert_eq!(product_by_id("3").map(|p| p.price), Some(7999));
        assert!(product_by_id("99").is_none());
    }
}
