use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    database::queries::{AccountQueries, CommentQueries, CommunityQueries, TrendQueries},
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::{
        Comment, CreateCommentRequest, CreateTrendRequest, Trend, TrendListParams, TrendResponse,
        VoteDirection, MAX_COMMENT_LENGTH, MAX_TREND_CONTENT, MAX_TREND_TITLE,
    },
    utils::validation,
};

#[utoipa::path(
    post,
    path = "/api/trends",
    request_body = CreateTrendRequest,
    responses(
        (status = 201, description = "Trend posted"),
        (status = 403, description = "Not a member of the community")
    ),
    tag = "trends"
)]
pub async fn create_trend(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateTrendRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let title = validation::require_text("Title", &request.title, MAX_TREND_TITLE)?;
    let content = validation::require_text("Content", &request.content, MAX_TREND_CONTENT)?;

    let mut tx = state.database.begin().await?;

    let mut community = CommunityQueries::find_by_id_for_update(&mut *tx, request.community_id)
        .await?
        .ok_or(AppError::NotFound("Community"))?;
    let account = AccountQueries::find_by_id(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if !community.is_member(account.id) && !account.has_joined(community.id) {
        return Err(AppError::Forbidden(
            "Join the community before posting in it".to_string(),
        ));
    }

    let trend = Trend::new(account.id, community.id, &title, &content, request.tags, Utc::now());
    TrendQueries::insert(&mut *tx, &trend).await?;

    community.trend_count += 1;
    CommunityQueries::save(&mut *tx, &community).await?;
    tx.commit().await?;

    info!(account_id = %account.id, trend_id = %trend.id, community_id = %community.id, "Trend created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Trend created",
            "data": TrendResponse::from(&trend)
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/trends",
    params(
        ("page" = Option<u32>, Query, description = "1-based page"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 50"),
        ("community" = Option<Uuid>, Query, description = "Only trends of this community"),
        ("sort_by" = Option<String>, Query, description = "hot, new or top")
    ),
    responses((status = 200, description = "A page of trends")),
    tag = "trends"
)]
pub async fn list_trends(
    State(state): State<AppState>,
    Query(params): Query<TrendListParams>,
) -> Result<Json<serde_json::Value>> {
    let (limit, offset) = validation::pagination(params.page, params.limit);
    let sort = params.sort_by.unwrap_or_default();

    let trends = TrendQueries::list(state.database.pool(), params.community, sort, limit, offset).await?;
    let total = TrendQueries::count(state.database.pool(), params.community).await?;
    let trends: Vec<TrendResponse> = trends.iter().map(TrendResponse::from).collect();

    Ok(Json(json!({
        "data": trends,
        "pagination": {
            "page": offset / limit + 1,
            "limit": limit,
            "total": total,
            "pages": (total + limit - 1) / limit
        }
    })))
}

#[utoipa::path(
    get,
    path = "/api/trends/{id}",
    params(("id" = Uuid, Path, description = "Trend id")),
    responses(
        (status = 200, description = "The trend with its top-level comments"),
        (status = 404, description = "Trend not found")
    ),
    tag = "trends"
)]
pub async fn get_trend(
    State(state): State<AppState>,
    Path(trend_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let mut trend = TrendQueries::find_by_id(state.database.pool(), trend_id)
        .await?
        .ok_or(AppError::NotFound("Trend"))?;

    TrendQueries::increment_views(state.database.pool(), trend.id).await?;
    trend.views += 1;

    let comments = CommentQueries::list_top_level(state.database.pool(), trend.id).await?;

    Ok(Json(json!({
        "data": {
            "trend": TrendResponse::from(&trend),
            "comments": comments
        }
    })))
}

async fn vote(
    state: &AppState,
    voter: Uuid,
    trend_id: Uuid,
    direction: VoteDirection,
) -> Result<Json<serde_json::Value>> {
    let mut tx = state.database.begin().await?;

    let mut trend = TrendQueries::find_by_id_for_update(&mut *tx, trend_id)
        .await?
        .ok_or(AppError::NotFound("Trend"))?;

    trend.toggle_vote(voter, direction);
    trend.updated_at = Utc::now();
    TrendQueries::save(&mut *tx, &trend).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "data": {
            "vote_score": trend.vote_score,
            "upvotes": trend.upvotes.len(),
            "downvotes": trend.downvotes.len(),
            "upvoted": trend.upvotes.contains(&voter),
            "downvoted": trend.downvotes.contains(&voter)
        }
    })))
}

#[utoipa::path(
    post,
    path = "/api/trends/{id}/upvote",
    params(("id" = Uuid, Path, description = "Trend id")),
    responses((status = 200, description = "Vote toggled")),
    tag = "trends"
)]
pub async fn upvote_trend(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(trend_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    vote(&state, user.id, trend_id, VoteDirection::Up).await
}

#[utoipa::path(
    post,
    path = "/api/trends/{id}/downvote",
    params(("id" = Uuid, Path, description = "Trend id")),
    responses((status = 200, description = "Vote toggled")),
    tag = "trends"
)]
pub async fn downvote_trend(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(trend_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    vote(&state, user.id, trend_id, VoteDirection::Down).await
}

#[utoipa::path(
    post,
    path = "/api/trends/{id}/comments",
    params(("id" = Uuid, Path, description = "Trend id")),
    request_body = CreateCommentRequest,
    responses(
        (status = 201, description = "Comment added"),
        (status = 400, description = "Replies nest one level only")
    ),
    tag = "trends"
)]
pub async fn add_comment(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(trend_id): Path<Uuid>,
    Json(request): Json<CreateCommentRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let content = validation::require_text("Comment", &request.content, MAX_COMMENT_LENGTH)?;

    let mut tx = state.database.begin().await?;

    let mut trend = TrendQueries::find_by_id_for_update(&mut *tx, trend_id)
        .await?
        .ok_or(AppError::NotFound("Trend"))?;

    let depth = match request.parent_id {
        Some(parent_id) => {
            let parent = CommentQueries::find_by_id(&mut *tx, parent_id)
                .await?
                .filter(|parent| parent.trend_id == trend.id)
                .ok_or(AppError::NotFound("Parent comment"))?;
            if parent.depth > 0 {
                return Err(AppError::Validation(
                    "Replies can only be one level deep".to_string(),
                ));
            }
            1
        }
        None => 0,
    };

    let now = Utc::now();
    let comment = Comment {
        id: Uuid::new_v4(),
        trend_id: trend.id,
        author_id: user.id,
        parent_id: request.parent_id,
        content,
        depth,
        vote_score: 0,
        created_at: now,
    };
    CommentQueries::insert(&mut *tx, &comment).await?;

    trend.comment_count += 1;
    trend.updated_at = now;
    TrendQueries::save(&mut *tx, &trend).await?;
    tx.commit().await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Comment added",
            "data": comment
        })),
    ))
}
