use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::handlers::AppState;

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::handlers::health::liveness,
        crate::handlers::health::readiness,
        crate::handlers::auth::register,
        crate::handlers::auth::verify_otp,
        crate::handlers::auth::resend_otp,
        crate::handlers::auth::login,
        crate::handlers::auth::refresh,
        crate::handlers::auth::me,
        crate::handlers::auth::forgot_password,
        crate::handlers::auth::reset_password,
        crate::handlers::auth::get_profile,
        crate::handlers::auth::update_profile,
        crate::handlers::subscriptions::list_plans,
        crate::handlers::subscriptions::activate_free_plan,
        crate::handlers::subscriptions::usage_summary,
        crate::handlers::subscriptions::cancel,
        crate::handlers::admin::assign_plan,
        crate::handlers::admin::set_level,
        crate::handlers::prompts::create_prompt,
        crate::handlers::prompts::list_prompts,
        crate::handlers::prompts::get_prompt,
        crate::handlers::prompts::update_prompt,
        crate::handlers::prompts::delete_prompt,
        crate::handlers::prompts::upload_image,
        crate::handlers::prompts::remove_image,
        crate::handlers::prompts::set_primary_image,
        crate::handlers::prompts::upvote_prompt,
        crate::handlers::prompts::downvote_prompt,
        crate::handlers::communities::create_community,
        crate::handlers::communities::get_community,
        crate::handlers::communities::join_community,
        crate::handlers::communities::leave_community,
        crate::handlers::communities::list_communities,
        crate::handlers::trends::create_trend,
        crate::handlers::trends::list_trends,
        crate::handlers::trends::get_trend,
        crate::handlers::trends::upvote_trend,
        crate::handlers::trends::downvote_trend,
        crate::handlers::trends::add_comment,
        crate::handlers::rewards::list_reward_types,
        crate::handlers::rewards::give_reward,
        crate::handlers::rewards::reward_summary,
        crate::handlers::rewards::user_stats,
        crate::handlers::rewards::get_leaderboard,
    ),
    components(
        schemas(
            crate::models::CreateUserRequest,
            crate::models::LoginRequest,
            crate::models::VerifyOtpRequest,
            crate::models::ResendOtpRequest,
            crate::models::RefreshRequest,
            crate::models::ForgotPasswordRequest,
            crate::models::ResetPasswordRequest,
            crate::models::UpdateProfileRequest,
            crate::models::Profile,
            crate::models::SetLevelRequest,
            crate::models::AssignPlanRequest,
            crate::models::CreatePromptRequest,
            crate::models::UpdatePromptRequest,
            crate::models::CreateCommunityRequest,
            crate::models::CreateTrendRequest,
            crate::models::CreateCommentRequest,
            crate::models::GiveRewardRequest,
        )
    ),
    tags(
        (name = "auth", description = "Registration, verification, tokens and profiles"),
        (name = "subscriptions", description = "Plans and usage"),
        (name = "admin", description = "Account administration"),
        (name = "prompts", description = "Prompts and their images"),
        (name = "communities", description = "Communities"),
        (name = "trends", description = "Community posts, votes and comments"),
        (name = "rewards", description = "Medals, stats and leaderboard"),
        (name = "health", description = "Health check endpoints")
    ),
    info(
        title = "PromptVerse API",
        version = "1.0.0",
        description = "Community backend for sharing AI prompts, with plan entitlements and a medal ledger"
    )
)]
pub struct ApiDoc;

pub fn create_docs_router() -> Router<AppState> {
    Router::new().merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
