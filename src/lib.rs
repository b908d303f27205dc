pub mod auth;
pub mod config;
pub mod database;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod services;
pub mod storage;
pub mod utils;

use std::time::Duration;

use axum::{
    error_handling::HandleErrorLayer,
    extract::DefaultBodyLimit,
    http::StatusCode,
    response::Json,
    routing::{delete, get, post, put},
    BoxError, Router,
};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    services::ServeDir,
    trace::TraceLayer,
};

use crate::handlers::{
    admin, auth as auth_handlers, communities, docs, health, metrics, prompts, rewards,
    subscriptions, trends, AppState,
};

/// Room for multipart framing and the caption on top of the image itself.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

async fn handle_middleware_error(err: BoxError) -> (StatusCode, Json<serde_json::Value>) {
    let (status, message) = if err.is::<tower::timeout::error::Elapsed>() {
        (StatusCode::REQUEST_TIMEOUT, "Request timed out")
    } else if err.is::<tower::load_shed::error::Overloaded>() {
        (StatusCode::SERVICE_UNAVAILABLE, "Service is overloaded, try again later")
    } else {
        tracing::error!(error = %err, "Unhandled middleware error");
        (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error")
    };

    (
        status,
        Json(json!({
            "error": message,
            "status": status.as_u16()
        })),
    )
}

pub fn create_app(state: AppState) -> Router {
    let config = state.config.clone();

    let auth_routes = Router::new()
        .route("/register", post(auth_handlers::register))
        .route("/verify-otp", post(auth_handlers::verify_otp))
        .route("/resend-otp", post(auth_handlers::resend_otp))
        .route("/login", post(auth_handlers::login))
        .route("/refresh", post(auth_handlers::refresh))
        .route("/forgot-password", post(auth_handlers::forgot_password))
        .route("/reset-password", post(auth_handlers::reset_password))
        .route("/me", get(auth_handlers::me))
        .route(
            "/profile",
            get(auth_handlers::get_profile).patch(auth_handlers::update_profile),
        );

    let subscription_routes = Router::new()
        .route("/plans", get(subscriptions::list_plans))
        .route("/free", post(subscriptions::activate_free_plan))
        .route("/usage", get(subscriptions::usage_summary))
        .route("/cancel", post(subscriptions::cancel));

    let admin_routes = Router::new()
        .route("/users/:id/plan", put(admin::assign_plan))
        .route("/users/:id/level", put(admin::set_level));

    let prompt_routes = Router::new()
        .route("/", post(prompts::create_prompt).get(prompts::list_prompts))
        .route(
            "/:id",
            get(prompts::get_prompt)
                .put(prompts::update_prompt)
                .delete(prompts::delete_prompt),
        )
        .route(
            "/:id/images",
            post(prompts::upload_image)
                .layer(DefaultBodyLimit::max(config.max_file_size + MULTIPART_OVERHEAD)),
        )
        .route("/:id/images/:index", delete(prompts::remove_image))
        .route("/:id/images/:index/primary", put(prompts::set_primary_image))
        .route("/:id/upvote", post(prompts::upvote_prompt))
        .route("/:id/downvote", post(prompts::downvote_prompt));

    let community_routes = Router::new()
        .route("/", post(communities::create_community).get(communities::list_communities))
        .route("/:id", get(communities::get_community))
        .route("/:id/join", post(communities::join_community))
        .route("/:id/leave", post(communities::leave_community));

    let trend_routes = Router::new()
        .route("/", post(trends::create_trend).get(trends::list_trends))
        .route("/:id", get(trends::get_trend))
        .route("/:id/upvote", post(trends::upvote_trend))
        .route("/:id/downvote", post(trends::downvote_trend))
        .route("/:id/comments", post(trends::add_comment))
        .route("/:id/rewards", post(rewards::give_reward).get(rewards::reward_summary));

    let reward_routes = Router::new()
        .route("/types", get(rewards::list_reward_types))
        .route("/stats", get(rewards::user_stats))
        .route("/leaderboard", get(rewards::get_leaderboard));

    let api = Router::new()
        .nest("/auth", auth_routes)
        .nest("/subscriptions", subscription_routes)
        .nest("/admin", admin_routes)
        .nest("/prompts", prompt_routes)
        .nest("/communities", community_routes)
        .nest("/trends", trend_routes)
        .nest("/rewards", reward_routes)
        .layer(
            ServiceBuilder::new()
                .layer(HandleErrorLayer::new(handle_middleware_error))
                .load_shed()
                .concurrency_limit(config.max_concurrent_requests)
                .timeout(Duration::from_secs(config.request_timeout_seconds)),
        );

    // Health and metrics stay outside the load shedding and timeout stack.
    Router::new()
        .nest("/api", api)
        .route("/health", get(health::liveness))
        .route("/ready", get(health::readiness))
        .route("/metrics", get(metrics::metrics_handler))
        .merge(docs::create_docs_router())
        .nest_service("/uploads", ServeDir::new(&config.upload_dir))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            middleware::metrics_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
