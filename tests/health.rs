mod common;

use axum::http::StatusCode;
use common::{Call, offline_app, send, temp_dir};

#[tokio::test]
async fn health_reports_database_down_but_service_ok() {
    let app = offline_app(&temp_dir());
    let (response, body) = send(&app, Call::get("/health")).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body["message"], "Health check");
    assert_eq!(body["data"]["status"], "ok");
    assert_eq!(body["data"]["database"], "down");
    assert!(response.headers().contains_key("x-request-id"));
}

#[tokio::test]
async fn unknown_route_is_enveloped_not_found() {
    let app = offline_app(&temp_dir());
    let (response, body) = send(&app, Call::get("/api/nope")).await;

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body["message"], "Not Found");
    assert_eq!(body["data"]["path"], "/api/nope");
}
