use axum::{Json, extract::State, http::StatusCode};

use crate::{
    services::setup_service::{self, SetupResponse},
    state::AppState,
};

#[utoipa::path(
    get,
    path = "/api/setup-db",
    responses(
        (status = 200, description = "Tables created and sample data inserted", body = SetupResponse),
        (status = 500, description = "Table setup or sample data insert failed", body = SetupResponse),
    ),
    tag = "Setup"
)]
pub async fn setup_db(State(state): State<AppState>) -> (StatusCode, Json<SetupResponse>) {
    let (status, body) = setup_service::setup_database(&state).await;
    (status, Json(body))
}
