use sea_orm::ActiveValue::NotSet;
use sea_orm::{ActiveModelTrait, EntityTrait, Set, SqlErr};
use uuid::Uuid;

use crate::{
    catalog::{Fetched, ProductFilter, fallback, or_fallback},
    dto::products::{CreateProductRequest, ProductList, ReviewList, UpdateProductRequest},
    entity::products::{ActiveModel, Entity as Products},
    error::{AppError, AppResult},
    middleware::auth::{AuthUser, ensure_admin},
    models::Product,
    response::{ApiResponse, Meta},
    state::AppState,
};

fn message(fetched: &Fetched<impl Sized>, live: &str, fallback: &str) -> String {
    if fetched.is_fallback() {
        fallback.to_string()
    } else {
        live.to_string()
    }
}

pub async fn list_products(
    state: &AppState,
    filter: ProductFilter,
) -> ApiResponse<ProductList> {
    let fetched = or_fallback(
        state.catalog.products(&filter).await,
        "products",
        fallback::products,
    );
    let message = message(&fetched, "Products", "Fallback products");
    let items = fetched.into_inner();
    let len = items.len();
    ApiResponse::list(message, ProductList { items }, len)
}

/// Look a product up, serving the fallback entry when the catalog is
/// unreachable.
async fn find_product(state: &AppState, id: &str) -> AppResult<Fetched<Product>> {
    match state.catalog.product(id).await {
        Ok(Some(product)) => Ok(Fetched::Live(product)),
        Ok(None) => Err(AppError::NotFound),
        Err(err) => {
            tracing::warn!(error = %err, product_id = id, "product read failed, serving fallback data");
            fallback::product_by_id(id)
                .map(Fetched::Fallback)
                .ok_or(AppError::NotFound)
        }
    }
}

pub async fn get_product(state: &AppState, id: &str) -> AppResult<ApiResponse<Product>> {
    let fetched = find_product(state, id).await?;
    let message = message(&fetched, "Product", "Fallback product");
    Ok(ApiResponse::success(message, fetched.into_inner(), None))
}

pub async fn related_products(
    state: &AppState,
    id: &str,
) -> AppResult<ApiResponse<ProductList>> {
    let product = find_product(state, id).await?.into_inner();
    let fetched = or_fallback(
        state.catalog.related_products(id, &product.category).await,
        "related products",
        || fallback::related_products(id, Some(product.category.as_str())),
    );
    let message = message(&fetched, "Related products", "Fallback related products");
    let items = fetched.into_inner();
    let len = items.len();
    Ok(ApiResponse::list(message, ProductList { items }, len))
}

pub async fn product_reviews(state: &AppState, id: &str) -> ApiResponse<ReviewList> {
    let fetched = or_fallback(state.catalog.reviews(id).await, "reviews", || {
        fallback::reviews(id)
    });
    let message = message(&fetched, "Reviews", "Fallback reviews");
    let items = fetched.into_inner();
    let len = items.len();
    ApiResponse::list(message, ReviewList { items }, len)
}

pub async fn create_product(
    state: &AppState,
    user: &AuthUser,
    payload: CreateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    validate_product(&payload.name, payload.price, payload.stock)?;

    let id = payload
        .id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| Uuid::new_v4().to_string());
    let active = ActiveModel {
        id: Set(id),
        name: Set(payload.name),
        description: Set(payload.description),
        price: Set(payload.price),
        image: Set(payload.image),
        category: Set(payload.category),
        rating: Set(0),
        reviews: Set(0),
        stock: Set(payload.stock),
        created_at: NotSet,
    };
    let product = active.insert(&state.orm).await.map_err(|err| match err.sql_err() {
        Some(SqlErr::UniqueConstraintViolation(_)) => {
            AppError::BadRequest("Product id already exists".into())
        }
        _ => AppError::OrmError(err),
    })?;

    tracing::info!(product_id = %product.id, admin = %user.user_id, "product created");
    Ok(ApiResponse::success(
        "Product created",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn update_product(
    state: &AppState,
    user: &AuthUser,
    id: &str,
    payload: UpdateProductRequest,
) -> AppResult<ApiResponse<Product>> {
    ensure_admin(user)?;
    let existing = Products::find_by_id(id.to_string())
        .one(&state.orm)
        .await?;
    let existing = match existing {
        Some(p) => p,
        None => return Err(AppError::NotFound),
    };

    validate_product(
        payload.name.as_deref().unwrap_or(&existing.name),
        payload.price.unwrap_or(existing.price),
        payload.stock.unwrap_or(existing.stock),
    )?;

    let mut active: ActiveModel = existing.into();
    if let Some(name) = payload.name {
        active.name = Set(name);
    }
    if let Some(description) = payload.description {
        active.description = Set(description);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(image) = payload.image {
        active.image = Set(image);
    }
    if let Some(category) = payload.category {
        active.category = Set(category);
    }
    if let Some(stock) = payload.stock {
        active.stock = Set(stock);
    }

    let product = active.update(&state.orm).await?;

    tracing::info!(product_id = %product.id, admin = %user.user_id, "product updated");
    Ok(ApiResponse::success(
        "Updated",
        Product::from(product),
        Some(Meta::empty()),
    ))
}

pub async fn delete_product(
    state: &AppState,
    user: &AuthUser,
    id: &str,
) -> AppResult<ApiResponse<serde_json::Value>> {
    ensure_admin(user)?;
    let result = Products::delete_by_id(id.to_string())
        .exec(&state.orm)
        .await
        .map_err(|err| match err.sql_err() {
            Some(SqlErr::ForeignKeyConstraintViolation(_)) => {
                AppError::BadRequest("Product is referenced by orders or carts".into())
            }
            _ => AppError::OrmError(err),
        })?;

    if result.rows_affected == 0 {
        return Err(AppError::NotFound);
    }

    tracing::info!(product_id = id, admin = %user.user_id, "product deleted");
    Ok(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    ))
}

/// Upper bound on a product price, in cents.
pub const MAX_PRICE: i64 = 10_000_000_000;

fn validate_product(name: &str, price: i64, stock: i32) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::BadRequest("name must not be empty".into()));
    }
    if price < 0 {
        return Err(AppError::BadRequest("price must not be negative".into()));
    }
    if price > MAX_PRICE {
        return Err(AppError::BadRequest(format!(
            "price must be at most {MAX_PRICE} cents"
        )));
    }
    if stock < 0 {
        return Err(AppError::BadRequest("stock must not be negative".into()));
    }
    Ok(())
}
