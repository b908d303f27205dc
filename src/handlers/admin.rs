use axum::{
    extract::{Path, State},
    response::Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    database::queries::{AccountQueries, PlanQueries},
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AdminUser,
    models::{AssignPlanRequest, Level, PlanTier, SetLevelRequest, SubscriptionStatus, UserResponse},
};

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/plan",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = AssignPlanRequest,
    responses(
        (status = 200, description = "Plan assigned"),
        (status = 403, description = "Admin role required")
    ),
    tag = "admin"
)]
pub async fn assign_plan(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(account_id): Path<Uuid>,
    Json(request): Json<AssignPlanRequest>,
) -> Result<Json<serde_json::Value>> {
    let tier: PlanTier = request.tier.parse()?;
    let status = match request.status.as_deref() {
        Some(raw) => raw.parse()?,
        None => SubscriptionStatus::Active,
    };

    let mut tx = state.database.begin().await?;

    let plan = PlanQueries::find_by_tier(&mut *tx, tier)
        .await?
        .filter(|plan| plan.is_active)
        .ok_or(AppError::NotFound("Plan"))?;

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, account_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let now = Utc::now();
    let changed_plan = account.plan_id != Some(plan.id);
    account.plan_id = Some(plan.id);
    account.subscription_status = status;
    if changed_plan {
        account.current_period_start = Some(now);
        account.current_period_end = None;
        account.trial_ends_at = None;
    }
    account.updated_at = now;

    AccountQueries::save(&mut *tx, &account).await?;
    tx.commit().await?;

    info!(
        admin_id = %admin.id,
        account_id = %account.id,
        plan = %plan.name,
        status = %status,
        "Plan assigned"
    );

    Ok(Json(json!({
        "message": format!("{} assigned", plan.display_name),
        "data": UserResponse::from(&account)
    })))
}

#[utoipa::path(
    put,
    path = "/api/admin/users/{id}/level",
    params(("id" = Uuid, Path, description = "Account id")),
    request_body = SetLevelRequest,
    responses(
        (status = 200, description = "Level raised"),
        (status = 400, description = "Levels only move forward")
    ),
    tag = "admin"
)]
pub async fn set_level(
    State(state): State<AppState>,
    AdminUser(admin): AdminUser,
    Path(account_id): Path<Uuid>,
    Json(request): Json<SetLevelRequest>,
) -> Result<Json<serde_json::Value>> {
    let level: Level = request.level.parse()?;

    let mut tx = state.database.begin().await?;
    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, account_id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if level < account.level {
        return Err(AppError::Validation(format!(
            "Cannot lower level from {} to {}",
            account.level, level
        )));
    }

    let previous = account.level;
    account.level = level;
    account.updated_at = Utc::now();
    AccountQueries::save(&mut *tx, &account).await?;
    tx.commit().await?;

    info!(admin_id = %admin.id, account_id = %account.id, from = %previous, to = %level, "Level changed");

    Ok(Json(json!({
        "data": UserResponse::from(&account)
    })))
}
