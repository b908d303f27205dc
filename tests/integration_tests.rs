use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use promptverse::{
    config::Config, create_app, database::Database, handlers::AppState,
};
use serde_json::Value;
use tower::ServiceExt;

/// An app whose pool points at a closed port, so nothing here needs a database.
fn test_app() -> (Router, tempfile::TempDir) {
    let uploads = tempfile::tempdir().unwrap();
    let mut config = Config::for_tests();
    config.database_url = "postgresql://promptverse@127.0.0.1:1/promptverse".to_string();
    config.upload_dir = uploads.path().to_string_lossy().into_owned();

    let database = Database::connect_lazy(&config.database_url).unwrap();
    let state = AppState::new(config, database, None).unwrap();
    (create_app(state), uploads)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

async fn body_text(response: axum::response::Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

#[tokio::test]
async fn test_health_check() {
    let (app, _uploads) = test_app();

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_readiness_reports_unreachable_database() {
    let (app, _uploads) = test_app();

    let response = app
        .oneshot(Request::builder().uri("/ready").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    let body = body_json(response).await;
    assert_eq!(body["checks"]["database"], "unhealthy");
    assert_eq!(body["checks"]["redis"], "disabled");
}

#[tokio::test]
async fn test_protected_routes_require_token() {
    let (app, _uploads) = test_app();

    for (method, uri) in [
        ("GET", "/api/auth/me"),
        ("POST", "/api/prompts"),
        ("GET", "/api/subscriptions/usage"),
        ("GET", "/api/rewards/stats"),
    ] {
        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .method(method)
                    .uri(uri)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from("{}"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{} {}", method, uri);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Authentication required");
        assert_eq!(body["status"], 401);
    }
}

#[tokio::test]
async fn test_invalid_token_is_rejected() {
    let (app, _uploads) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/auth/me")
                .header(header::AUTHORIZATION, "Bearer not-a-jwt")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"], "Invalid or expired token");
}

#[tokio::test]
async fn test_leaderboard_rejects_unknown_direction() {
    let (app, _uploads) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api/rewards/leaderboard?type=sideways")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_openapi_document_lists_reward_routes() {
    let (app, _uploads) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body["info"]["title"], "PromptVerse API");
    assert!(body["paths"]["/api/trends/{id}/rewards"]["post"].is_object());
    assert!(body["paths"]["/api/rewards/leaderboard"]["get"].is_object());
}

#[tokio::test]
async fn test_openapi_documents_image_upload_as_multipart() {
    let (app, _uploads) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    let upload = &body["paths"]["/api/prompts/{id}/images"]["post"];
    assert!(upload["requestBody"]["content"]["multipart/form-data"].is_object());
    assert!(body["paths"]["/api/prompts/{id}"]["put"].is_object());
    assert!(body["paths"]["/api/prompts/{id}/downvote"]["post"].is_object());
    assert!(body["paths"]["/api/auth/reset-password"]["post"].is_object());
}

#[tokio::test]
async fn test_profile_routes_require_token() {
    let (app, _uploads) = test_app();

    let response = app
        .oneshot(
            Request::builder()
                .method("PATCH")
                .uri("/api/auth/profile")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(r#"{"bio":"hello"}"#))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_metrics_exposes_request_latency() {
    let (app, _uploads) = test_app();

    let response = app
        .clone()
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let text = body_text(response).await;
    assert!(text.contains("promptverse_request_duration_seconds"));
    assert!(text.contains("route=\"/health\""));
}
