use axum::http::StatusCode;
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    db::{DbPool, run_migrations},
    state::AppState,
};

/// Body of `/api/setup-db`; the only response outside the usual envelope.
#[derive(Debug, Serialize, ToSchema)]
pub struct SetupResponse {
    pub success: bool,
    pub message: String,
}

impl SetupResponse {
    fn new(success: bool, message: &str) -> Self {
        Self {
            success,
            message: message.to_string(),
        }
    }
}

/// id, name
const CATEGORIES: [(&str, &str); 5] = [
    ("electronics", "Electronics"),
    ("clothing", "Clothing"),
    ("home", "Home & Kitchen"),
    ("accessories", "Accessories"),
    ("footwear", "Footwear"),
];

/// id, name, description, price (cents), category, rating, reviews, stock
type SeedProduct = (&'static str, &'static str, &'static str, i64, &'static str, i32, i32, i32);

const PRODUCTS: [SeedProduct; 5] = [
    (
        "1",
        "Wireless Headphones",
        "Premium wireless headphones with noise cancellation and long battery life.",
        12999,
        "Electronics",
        4,
        42,
        38,
    ),
    (
        "2",
        "Smart Watch",
        "Feature-packed smartwatch with health monitoring and smartphone notifications.",
        19999,
        "Electronics",
        5,
        87,
        24,
    ),
    (
        "3",
        "Leather Backpack",
        "Stylish and durable leather backpack with multiple compartments.",
        7999,
        "Accessories",
        4,
        36,
        52,
    ),
    (
        "4",
        "Running Shoes",
        "Comfortable running shoes with excellent support and cushioning.",
        8999,
        "Footwear",
        4,
        128,
        18,
    ),
    (
        "5",
        "Coffee Maker",
        "Programmable coffee maker with thermal carafe to keep your coffee hot for hours.",
        5999,
        "Home",
        3,
        24,
        15,
    ),
];

const CATEGORY_IMAGE: &str = "/placeholder.svg?height=300&width=300";
const PRODUCT_IMAGE: &str = "/placeholder.svg?height=400&width=400";

/// Insert the sample catalog. Rows that already exist are left alone.
pub async fn seed_catalog(pool: &DbPool) -> Result<(), sqlx::Error> {
    for (id, name) in CATEGORIES {
        sqlx::query(
            "INSERT INTO categories (id, name, image) VALUES ($1, $2, $3) ON CONFLICT (id) DO NOTHING",
        )
        .bind(id)
        .bind(name)
        .bind(CATEGORY_IMAGE)
        .execute(pool)
        .await?;
    }
    tracing::info!(count = CATEGORIES.len(), "sample categories ensured");

    for (id, name, description, price, category, rating, reviews, stock) in PRODUCTS {
        sqlx::query(
            r#"
            INSERT INTO products (id, name, description, price, image, category, rating, reviews, stock)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(id)
        .bind(name)
        .bind(description)
        .bind(price)
        .bind(PRODUCT_IMAGE)
        .bind(category)
        .bind(rating)
        .bind(reviews)
        .bind(stock)
        .execute(pool)
        .await?;
    }
    tracing::info!(count = PRODUCTS.len(), "sample products ensured");

    Ok(())
}

pub async fn setup_database(state: &AppState) -> (StatusCode, SetupResponse) {
    if let Err(err) = run_migrations(&state.orm).await {
        tracing::error!(error = %err, "database table setup failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            SetupResponse::new(false, "Failed to set up database tables"),
        );
    }

    if let Err(err) = seed_catalog(&state.pool).await {
        tracing::error!(error = %err, "sample data insert failed");
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            SetupResponse::new(false, "Failed to insert sample data"),
        );
    }

    (
        StatusCode::OK,
        SetupResponse::new(true, "Database setup completed successfully"),
    )
}
