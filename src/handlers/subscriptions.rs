use axum::{
    extract::{Query, State},
    response::Json,
};
use chrono::{Duration, Utc};
use serde::Deserialize;
use serde_json::json;
use tracing::info;

use crate::{
    database::queries::{AccountQueries, PlanQueries},
    errors::{AppError, Result},
    handlers::{active_plan, AppState},
    middleware::{AuthenticatedUser, MaybeUser},
    models::{Currency, PlanResponse, PlanTier, SubscriptionStatus},
    services::entitlement::{self, Decision},
};

pub const TRIAL_DAYS: i64 = 30;

#[derive(Debug, Deserialize)]
pub struct PlanListParams {
    pub currency: Option<String>,
}

#[utoipa::path(
    get,
    path = "/api/subscriptions/plans",
    params(("currency" = Option<String>, Query, description = "USD or NGN")),
    responses((status = 200, description = "Active plans by tier")),
    tag = "subscriptions"
)]
pub async fn list_plans(
    State(state): State<AppState>,
    user: MaybeUser,
    Query(params): Query<PlanListParams>,
) -> Result<Json<serde_json::Value>> {
    let currency = match (params.currency.as_deref(), user.id()) {
        (Some(raw), _) => raw.parse::<Currency>()?,
        (None, Some(account_id)) => AccountQueries::find_by_id(state.database.pool(), account_id)
            .await?
            .map(|account| account.currency_preference)
            .unwrap_or(Currency::Usd),
        (None, None) => Currency::Usd,
    };

    let plans: Vec<PlanResponse> = PlanQueries::list_active(state.database.pool())
        .await?
        .iter()
        .map(|plan| PlanResponse::project(plan, currency))
        .collect();

    Ok(Json(json!({
        "data": plans,
        "currency": currency
    })))
}

#[utoipa::path(
    post,
    path = "/api/subscriptions/free",
    responses(
        (status = 200, description = "Free plan activated as a trial"),
        (status = 403, description = "Level too low for the plan"),
        (status = 409, description = "A subscription is already active")
    ),
    tag = "subscriptions"
)]
pub async fn activate_free_plan(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    let mut tx = state.database.begin().await?;

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if account.plan_id.is_some() && account.subscription_status.is_current() {
        return Err(AppError::Conflict(
            "You already have an active subscription".to_string(),
        ));
    }

    let plan = PlanQueries::find_by_tier(&mut *tx, PlanTier::Basic)
        .await?
        .filter(|plan| plan.is_free && plan.is_active)
        .ok_or(AppError::NotFound("Free plan"))?;

    entitlement::check_level(account.level, plan.level_required)
        .map_err(|denial| state.deny(account.id, denial))?;

    let now = Utc::now();
    let period_end = now + Duration::days(TRIAL_DAYS);
    account.plan_id = Some(plan.id);
    account.subscription_status = SubscriptionStatus::Trial;
    account.current_period_start = Some(now);
    account.current_period_end = Some(period_end);
    account.trial_ends_at = Some(period_end);
    account.usage.reset_period(now);
    account.updated_at = now;

    AccountQueries::save(&mut *tx, &account).await?;
    tx.commit().await?;

    info!(account_id = %account.id, plan = %plan.name, "Free plan activated");

    Ok(Json(json!({
        "message": format!("{} activated", plan.display_name),
        "data": {
            "plan": PlanResponse::project(&plan, account.currency_preference),
            "status": account.subscription_status,
            "current_period_end": period_end
        }
    })))
}

#[utoipa::path(
    get,
    path = "/api/subscriptions/usage",
    responses((status = 200, description = "Counters, limits and storage for the current period")),
    tag = "subscriptions"
)]
pub async fn usage_summary(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    let mut tx = state.database.begin().await?;

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let plan = active_plan(&mut *tx, &account).await?;

    let now = Utc::now();
    let last_reset = account.usage.last_reset;
    let decision = entitlement::can_create_content(&mut account.usage, plan.as_ref(), now);

    // The check may have rolled the month over; keep that reset.
    if account.usage.last_reset != last_reset {
        account.updated_at = now;
        AccountQueries::save(&mut *tx, &account).await?;
    }
    tx.commit().await?;

    let can_create_content = match &decision {
        Decision::Allowed(allowance) => json!({
            "allowed": true,
            "remaining": allowance.remaining,
            "current_usage": allowance.current_usage
        }),
        Decision::Denied(denial) => json!({
            "allowed": false,
            "reason": denial.reason,
            "kind": denial.kind,
            "retry_after": denial.retry_after
        }),
    };

    let usage = &account.usage;
    let limits = plan.as_ref().map(|plan| &plan.limits.0);

    Ok(Json(json!({
        "data": {
            "plan": plan.as_ref().map(|plan| json!({
                "id": plan.id,
                "name": plan.name,
                "display_name": plan.display_name,
                "tier": plan.tier
            })),
            "status": account.subscription_status,
            "level": account.level,
            "usage": {
                "prompts_this_month": usage.prompts_this_month,
                "prompts_limit": limits.map(|l| l.prompts_limit),
                "prompts_created": usage.prompts_created,
                "api_calls": usage.api_calls,
                "api_calls_limit": limits.map(|l| l.api_calls_limit),
                "images_uploaded": usage.images_uploaded,
                "communities_joined": account.joined_communities.len(),
                "max_communities": limits.map(|l| l.max_communities),
                "last_reset": usage.last_reset
            },
            "can_create_content": can_create_content,
            "features": limits.map(|l| json!({
                "can_create_private": l.can_create_private,
                "can_export": l.can_export,
                "max_prompt_length": l.max_prompt_length,
                "max_image_size_mb": l.max_image_size_mb,
                "max_images_per_prompt": l.max_images_per_prompt,
                "image_formats": l.image_formats
            })),
            "storage": usage.storage_summary(limits)
        }
    })))
}

#[utoipa::path(
    post,
    path = "/api/subscriptions/cancel",
    responses(
        (status = 200, description = "Plan reference cleared"),
        (status = 404, description = "No subscription to cancel")
    ),
    tag = "subscriptions"
)]
pub async fn cancel(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    let mut tx = state.database.begin().await?;

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let Some(plan_id) = account.plan_id.take() else {
        return Err(AppError::NotFound("Subscription"));
    };

    let now = Utc::now();
    account.subscription_status = SubscriptionStatus::Canceled;
    account.current_period_end = Some(now);
    account.updated_at = now;
    AccountQueries::save(&mut *tx, &account).await?;
    tx.commit().await?;

    info!(account_id = %account.id, plan_id = %plan_id, "Subscription canceled");

    Ok(Json(json!({
        "message": "Subscription canceled"
    })))
}
