use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    database::queries::{is_unique_violation, AccountQueries, CommunityQueries},
    errors::{AppError, Result},
    handlers::{active_plan, AppState},
    middleware::{AuthenticatedUser, MaybeUser},
    models::{Community, CreateCommunityRequest, MAX_COMMUNITY_DESCRIPTION, MAX_COMMUNITY_NAME},
    services::entitlement,
    utils::validation,
};

#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[utoipa::path(
    post,
    path = "/api/communities",
    request_body = CreateCommunityRequest,
    responses(
        (status = 201, description = "Community created with the creator as first member"),
        (status = 402, description = "Community limit of the plan reached"),
        (status = 409, description = "Name already taken")
    ),
    tag = "communities"
)]
pub async fn create_community(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreateCommunityRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let name = validation::require_text("Community name", &request.name, MAX_COMMUNITY_NAME)?;
    let description = validation::require_text(
        "Community description",
        &request.description,
        MAX_COMMUNITY_DESCRIPTION,
    )?;

    let mut tx = state.database.begin().await?;

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let plan = active_plan(&mut *tx, &account).await?;

    // The creator joins, so the join limit applies.
    entitlement::can_join_community(plan.as_ref(), account.joined_communities.len())
        .into_result()
        .map_err(|denial| state.deny(account.id, denial))?;

    let now = Utc::now();
    let community = Community {
        id: Uuid::new_v4(),
        name,
        description,
        creator_id: account.id,
        members: vec![account.id],
        tags: request.tags,
        is_public: true,
        trend_count: 0,
        created_at: now,
    };

    CommunityQueries::insert(&mut *tx, &community)
        .await
        .map_err(|e| match e {
            AppError::Database(ref db) if is_unique_violation(db) => {
                AppError::Conflict("Community name already exists".to_string())
            }
            other => other,
        })?;

    account.joined_communities.push(community.id);
    account.updated_at = now;
    AccountQueries::save(&mut *tx, &account).await?;
    tx.commit().await?;

    info!(account_id = %account.id, community_id = %community.id, name = %community.name, "Community created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Community created",
            "data": community
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/communities/{id}",
    params(("id" = Uuid, Path, description = "Community id")),
    responses(
        (status = 200, description = "The community with its member count"),
        (status = 404, description = "Missing, or private and the viewer is not a member")
    ),
    tag = "communities"
)]
pub async fn get_community(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(community_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let viewer = user.id();
    let community = CommunityQueries::find_by_id(state.database.pool(), community_id)
        .await?
        .filter(|community| community.is_public || viewer.is_some_and(|id| community.is_member(id)))
        .ok_or(AppError::NotFound("Community"))?;

    Ok(Json(json!({
        "data": {
            "member_count": community.member_count(),
            "is_member": viewer.is_some_and(|id| community.is_member(id)),
            "community": community
        }
    })))
}

#[utoipa::path(
    post,
    path = "/api/communities/{id}/join",
    params(("id" = Uuid, Path, description = "Community id")),
    responses(
        (status = 200, description = "Joined"),
        (status = 402, description = "Community limit of the plan reached"),
        (status = 409, description = "Already a member")
    ),
    tag = "communities"
)]
pub async fn join_community(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(community_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let mut tx = state.database.begin().await?;

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let mut community = CommunityQueries::find_by_id_for_update(&mut *tx, community_id)
        .await?
        .ok_or(AppError::NotFound("Community"))?;

    if community.is_member(account.id) || account.has_joined(community.id) {
        return Err(AppError::Conflict("Already a member of this community".to_string()));
    }

    let plan = active_plan(&mut *tx, &account).await?;
    entitlement::can_join_community(plan.as_ref(), account.joined_communities.len())
        .into_result()
        .map_err(|denial| state.deny(account.id, denial))?;

    community.members.push(account.id);
    account.joined_communities.push(community.id);
    account.updated_at = Utc::now();

    CommunityQueries::save(&mut *tx, &community).await?;
    AccountQueries::save(&mut *tx, &account).await?;
    tx.commit().await?;

    info!(account_id = %account.id, community_id = %community.id, "Joined community");

    Ok(Json(json!({
        "message": format!("Joined {}", community.name),
        "data": { "member_count": community.member_count() }
    })))
}

#[utoipa::path(
    post,
    path = "/api/communities/{id}/leave",
    params(("id" = Uuid, Path, description = "Community id")),
    responses(
        (status = 200, description = "Left"),
        (status = 400, description = "Not a member")
    ),
    tag = "communities"
)]
pub async fn leave_community(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(community_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let mut tx = state.database.begin().await?;

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let mut community = CommunityQueries::find_by_id_for_update(&mut *tx, community_id)
        .await?
        .ok_or(AppError::NotFound("Community"))?;

    if !community.is_member(account.id) && !account.has_joined(community.id) {
        return Err(AppError::Validation("Not a member of this community".to_string()));
    }

    community.members.retain(|id| *id != account.id);
    account.joined_communities.retain(|id| *id != community.id);
    account.updated_at = Utc::now();

    CommunityQueries::save(&mut *tx, &community).await?;
    AccountQueries::save(&mut *tx, &account).await?;
    tx.commit().await?;

    info!(account_id = %account.id, community_id = %community.id, "Left community");

    Ok(Json(json!({
        "message": format!("Left {}", community.name),
        "data": { "member_count": community.member_count() }
    })))
}

#[utoipa::path(
    get,
    path = "/api/communities",
    params(
        ("page" = Option<u32>, Query, description = "1-based page"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 50")
    ),
    responses((status = 200, description = "Public communities, largest first")),
    tag = "communities"
)]
pub async fn list_communities(
    State(state): State<AppState>,
    Query(params): Query<PageParams>,
) -> Result<Json<serde_json::Value>> {
    let (limit, offset) = validation::pagination(params.page, params.limit);
    let communities = CommunityQueries::list(state.database.pool(), limit, offset).await?;

    Ok(Json(json!({
        "data": communities
    })))
}
