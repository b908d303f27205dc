use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::{error, info};
use uuid::Uuid;

use crate::{
    database::queries::{AccountQueries, RewardTypeQueries, TrendQueries},
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::{Account, GiveRewardRequest, LeaderboardParams},
    services::{
        leaderboard::{self, LeaderboardQuery},
        rewards::{self, RewardError, MAX_REWARD_MESSAGE},
    },
    utils::validation,
};

#[utoipa::path(
    get,
    path = "/api/rewards/types",
    responses((status = 200, description = "Active reward types, most valuable first")),
    tag = "rewards"
)]
pub async fn list_reward_types(State(state): State<AppState>) -> Result<Json<serde_json::Value>> {
    let reward_types = RewardTypeQueries::list_active(state.database.pool()).await?;

    Ok(Json(json!({
        "data": reward_types
    })))
}

/// Ids carried into the log when a step of the transfer fails.
struct TransferContext {
    giver_id: Uuid,
    author_id: Uuid,
    trend_id: Uuid,
    reward_type_id: Uuid,
}

impl TransferContext {
    fn failed(&self, step: &'static str) -> impl FnOnce(AppError) -> AppError + '_ {
        move |e| {
            error!(
                giver_id = %self.giver_id,
                author_id = %self.author_id,
                trend_id = %self.trend_id,
                reward_type_id = %self.reward_type_id,
                step,
                error = %e,
                "Reward transfer failed"
            );
            e
        }
    }
}

#[utoipa::path(
    post,
    path = "/api/trends/{id}/rewards",
    params(("id" = Uuid, Path, description = "Trend id")),
    request_body = GiveRewardRequest,
    responses(
        (status = 201, description = "Reward given; points moved from giver to author"),
        (status = 400, description = "Invalid type, self reward or insufficient points"),
        (status = 404, description = "Trend not found"),
        (status = 429, description = "Daily limit or cooldown active")
    ),
    tag = "rewards"
)]
pub async fn give_reward(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(trend_id): Path<Uuid>,
    Json(request): Json<GiveRewardRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let message = validation::optional_text("Message", request.message.as_deref(), MAX_REWARD_MESSAGE)?;
    let is_anonymous = request.is_anonymous.unwrap_or(false);

    let mut tx = state.database.begin().await?;

    // The medal is resolved before the trend is looked up or locked.
    let reward_type = RewardTypeQueries::find_by_id(&mut *tx, request.reward_type_id)
        .await?
        .filter(|reward_type| reward_type.is_active)
        .ok_or(RewardError::InvalidRewardType)?;
    let mut trend = TrendQueries::find_by_id_for_update(&mut *tx, trend_id)
        .await?
        .ok_or(RewardError::ContentNotFound)?;

    let now = Utc::now();

    if trend.author_id == user.id {
        let giver = AccountQueries::find_by_id(&mut *tx, user.id)
            .await?
            .ok_or(AppError::NotFound("User"))?;
        rewards::validate_reward(&trend, &giver, &reward_type, now)?;
        return Err(RewardError::SelfRewardForbidden.into());
    }

    // Both accounts are locked in id order so concurrent transfers between
    // the same pair cannot deadlock.
    let (first, second) = if user.id < trend.author_id {
        (user.id, trend.author_id)
    } else {
        (trend.author_id, user.id)
    };
    let first = AccountQueries::find_by_id_for_update(&mut *tx, first).await?;
    let second = AccountQueries::find_by_id_for_update(&mut *tx, second).await?;
    let (mut giver, mut author): (Account, Account) = match (first, second) {
        (Some(a), Some(b)) if a.id == user.id => (a, b),
        (Some(a), Some(b)) => (b, a),
        _ => return Err(AppError::NotFound("User")),
    };

    let reward = rewards::give_reward(
        &mut trend,
        &mut giver,
        &mut author,
        &reward_type,
        Some(message).filter(|m| !m.is_empty()),
        is_anonymous,
        now,
    )?;

    let context = TransferContext {
        giver_id: giver.id,
        author_id: author.id,
        trend_id: trend.id,
        reward_type_id: reward_type.id,
    };
    TrendQueries::save(&mut *tx, &trend)
        .await
        .map_err(context.failed("save_trend"))?;
    AccountQueries::save(&mut *tx, &giver)
        .await
        .map_err(context.failed("debit_giver"))?;
    AccountQueries::save(&mut *tx, &author)
        .await
        .map_err(context.failed("credit_author"))?;
    tx.commit().await.map_err(|e| context.failed("commit")(e.into()))?;

    state.metrics.record_reward(&reward_type.name, reward.amount);
    state.leaderboard_cache.invalidate().await;

    info!(
        giver_id = %giver.id,
        author_id = %author.id,
        trend_id = %trend.id,
        medal = %reward_type.name,
        amount = reward.amount,
        "Reward given"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": format!("{} given", reward_type.display_name),
            "data": {
                "reward": reward,
                "remaining_points": giver.reward_points,
                "medal_summary": trend.aggregates.medal_summary,
                "total_reward_value": trend.aggregates.total_reward_value
            }
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/trends/{id}/rewards",
    params(("id" = Uuid, Path, description = "Trend id")),
    responses(
        (status = 200, description = "Medal summary, breakdown and top contributors"),
        (status = 404, description = "Trend not found")
    ),
    tag = "rewards"
)]
pub async fn reward_summary(
    State(state): State<AppState>,
    Path(trend_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let trend = TrendQueries::find_by_id(state.database.pool(), trend_id)
        .await?
        .ok_or(RewardError::ContentNotFound)?;

    Ok(Json(json!({
        "data": rewards::reward_summary(&trend)
    })))
}

#[utoipa::path(
    get,
    path = "/api/rewards/stats",
    responses((status = 200, description = "Points, totals, per-medal stats and recent history")),
    tag = "rewards"
)]
pub async fn user_stats(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    let account = AccountQueries::find_by_id(state.database.pool(), user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(json!({
        "data": leaderboard::user_reward_stats(&account)
    })))
}

#[utoipa::path(
    get,
    path = "/api/rewards/leaderboard",
    params(
        ("type" = Option<String>, Query, description = "given or received"),
        ("medal" = Option<String>, Query, description = "Only accounts holding this medal"),
        ("limit" = Option<usize>, Query, description = "At most 100")
    ),
    responses((status = 200, description = "Accounts ranked by points received")),
    tag = "rewards"
)]
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(params): Query<LeaderboardParams>,
) -> Result<Json<serde_json::Value>> {
    let query = LeaderboardQuery::from_params(&params)?;

    if let Some(board) = state.leaderboard_cache.get(&query).await {
        state.metrics.record_cache_hit();
        return Ok(Json(json!({ "data": board })));
    }
    state.metrics.record_cache_miss();

    let candidates =
        AccountQueries::leaderboard_candidates(state.database.pool(), query.medal.as_deref(), query.limit)
            .await?;
    let board = leaderboard::build_leaderboard(&candidates, &query, Utc::now());
    state.leaderboard_cache.put(&query, &board).await;

    Ok(Json(json!({ "data": board })))
}
