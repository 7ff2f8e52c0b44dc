//! Product, category and review readers.
//!
//! Readers never substitute data themselves: they return
//! `Result<_, FetchError>` and the caller decides whether to serve the static
//! [`fallback`] catalog via [`or_fallback`].

pub mod fallback;

use async_trait::async_trait;
use sea_orm::sea_query::Expr;
use sea_orm::sea_query::extension::postgres::PgExpr;
use sea_orm::{ColumnTrait, Condition, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::Deserialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::{
    db::OrmConn,
    entity::{
        categories::{Column as CategoryCol, Entity as Categories},
        products::{Column as ProdCol, Entity as Products},
        reviews::{Column as ReviewCol, Entity as Reviews},
        users::Entity as Users,
    },
    models::{Category, Product, Review, ReviewAuthor},
};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("catalog query failed: {0}")]
    Query(#[from] sea_orm::DbErr),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Featured,
    PriceLowHigh,
    PriceHighLow,
    Rating,
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct ProductFilter {
    pub category: Option<String>,
    pub limit: Option<u64>,
    /// Case-insensitive substring of the product name.
    pub q: Option<String>,
    /// Inclusive lower bound, in cents.
    pub min_price: Option<i64>,
    /// Inclusive upper bound, in cents.
    pub max_price: Option<i64>,
    pub sort: Option<ProductSort>,
}

#[async_trait]
pub trait CatalogSource: Send + Sync {
    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, FetchError>;
    async fn product(&self, id: &str) -> Result<Option<Product>, FetchError>;
    async fn related_products(
        &self,
        id: &str,
        category: &str,
    ) -> Result<Vec<Product>, FetchError>;
    async fn categories(&self) -> Result<Vec<Category>, FetchError>;
    async fn reviews(&self, product_id: &str) -> Result<Vec<Review>, FetchError>;
}

/// Where a read result came from.
#[derive(Debug, Clone, PartialEq)]
pub enum Fetched<T> {
    Live(T),
    Fallback(T),
}

impl<T> Fetched<T> {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Fetched::Fallback(_))
    }

    pub fn into_inner(self) -> T {
        match self {
            Fetched::Live(data) | Fetched::Fallback(data) => data,
        }
    }
}

/// Substitute `fallback()` when `result` is an error, logging the failure.
pub fn or_fallback<T>(
    result: Result<T, FetchError>,
    what: &str,
    fallback: impl FnOnce() -> T,
) -> Fetched<T> {
    match result {
        Ok(data) => Fetched::Live(data),
        Err(err) => {
            tracing::warn!(error = %err, what, "catalog read failed, serving fallback data");
            Fetched::Fallback(fallback())
        }
    }
}

/// `%<needle>%` with the needle's own wildcards escaped.
fn contains_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

#[derive(Clone)]
pub struct DbCatalog {
    orm: OrmConn,
}

impl DbCatalog {
    pub fn new(orm: OrmConn) -> Self {
        Self { orm }
    }
}

#[async_trait]
impl CatalogSource for DbCatalog {
    async fn products(&self, filter: &ProductFilter) -> Result<Vec<Product>, FetchError> {
        let mut condition = Condition::all();

        if let Some(category) = filter.category.as_ref().filter(|c| !c.is_empty()) {
            condition = condition.add(ProdCol::Category.eq(category.clone()));
        }

        if let Some(search) = filter.q.as_ref().filter(|s| !s.is_empty()) {
            condition = condition.add(Expr::col(ProdCol::Name).ilike(contains_pattern(search)));
        }

        if let Some(min_price) = filter.min_price {
            condition = condition.add(ProdCol::Price.gte(min_price));
        }

        if let Some(max_price) = filter.max_price {
            condition = condition.add(ProdCol::Price.lte(max_price));
        }

        let mut finder = Products::find().filter(condition);
        finder = match filter.sort.unwrap_or_default() {
            ProductSort::Featured => finder.order_by_asc(ProdCol::CreatedAt),
            ProductSort::PriceLowHigh => finder.order_by_asc(ProdCol::Price),
            ProductSort::PriceHighLow => finder.order_by_desc(ProdCol::Price),
            ProductSort::Rating => finder.order_by_desc(ProdCol::Rating),
        };

        if let Some(limit) = filter.limit {
            finder = finder.limit(limit);
        }

        let items = finder
            .all(&self.orm)
            .await?
            .into_iter()
            .map(Product::from)
            .collect();
        Ok(items)
    }

    async fn product(&self, id: &str) -> Result<Option<Product>, FetchError> {
        let product = Products::find_by_id(id.to_string())
            .one(&self.orm)
            .await?
            .map(Product::from);
        Ok(product)
    }

    async fn related_products(
        &self,
        id: &str,
        category: &str,
    ) -> Result<Vec<Product>, FetchError> {
        let items = Products::find()
            .filter(ProdCol::Category.eq(category))
            .filter(ProdCol::Id.ne(id))
            .limit(fallback::RELATED_LIMIT as u64)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(Product::from)
            .collect();
        Ok(items)
    }

    async fn categories(&self) -> Result<Vec<Category>, FetchError> {
        let items = Categories::find()
            .order_by_asc(CategoryCol::Name)
            .all(&self.orm)
            .await?
            .into_iter()
            .map(Category::from)
            .collect();
        Ok(items)
    }

    async fn reviews(&self, product_id: &str) -> Result<Vec<Review>, FetchError> {
        let rows = Reviews::find()
            .filter(ReviewCol::ProductId.eq(product_id))
            .order_by_desc(ReviewCol::CreatedAt)
            .find_also_related(Users)
            .all(&self.orm)
            .await?;

        let items = rows
            .into_iter()
            .map(|(review, user)| Review {
                id: review.id,
                product_id: review.product_id,
                user_id: review.user_id,
                rating: review.rating,
                comment: review.comment,
                created_at: review.created_at.with_timezone(&chrono::Utc),
                author: user.map(|u| ReviewAuthor {
                    first_name: u.first_name,
                    last_name: u.last_name,
                }),
            })
            .collect();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn or_fallback_passes_live_data_through() {
        let fetched = or_fallback(Ok(vec![1, 2]), "numbers", Vec::new);
        assert!(!fetched.is_fallback());
        assert_eq!(fetched.into_inner(), vec![1, 2]);
    }

    #[test]
    fn or_fallback_substitutes_on_error() {
        let err = FetchError::Query(sea_orm::DbErr::Custom("connection refused".into()));
        let fetched = or_fallback(Err(err), "products", fallback::products);
        assert!(fetched.is_fallback());
        assert_eq!(fetched.into_inner().len(), 4);
    }

    #[test]
    fn search_pattern_escapes_wildcards() {
        assert_eq!(contains_pattern("watch"), "%watch%");
        assert_eq!(contains_pattern("%"), "%\\%%");
        assert_eq!(contains_pattern("50_off"), "%50\\_off%");
        assert_eq!(contains_pattern("a\\b"), "%a\\\\b%");
    }

    #[test]
    fn product_sort_parses_snake_case() {
        let sort: ProductSort = serde_json::from_str("\"price_high_low\"").unwrap();
        assert_eq!(sort, ProductSort::PriceHighLow);
    }
}
