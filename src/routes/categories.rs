use axum::{Json, Router, extract::State, routing::get};

use crate::{
    dto::products::CategoryList, response::ApiResponse, services::category_service,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new().route("/", get(list_categories))
}

#[utoipa::path(
    get,
    path = "/api/categories",
    responses(
        (status = 200, description = "List categories; message is `Fallback categories` when the database is unreachable", body = ApiResponse<CategoryList>)
    ),
    tag = "Products"
)]
pub async fn list_categories(State(state): State<AppState>) -> Json<ApiResponse<CategoryList>> {
    Json(category_service::list_categories(&state).await)
}
