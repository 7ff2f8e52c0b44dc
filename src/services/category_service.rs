use crate::{
    catalog::{fallback, or_fallback},
    dto::products::CategoryList,
    response::ApiResponse,
    state::AppState,
};

pub async fn list_categories(state: &AppState) -> ApiResponse<CategoryList> {
    let fetched = or_fallback(
        state.catalog.categories().await,
        "categories",
        fallback::categories,
    );
    let message = if fetched.is_fallback() {
        "Fallback categories"
    } else {
        "Categories"
    };
    let items = fetched.into_inner();
    let len = items.len();
    ApiResponse::list(message, CategoryList { items }, len)
}
