use axum::{
    extract::{Multipart, Path, Query, State},
    http::StatusCode,
    response::Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use sqlx::{Postgres, Transaction};
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    database::queries::{AccountQueries, PromptQueries},
    errors::{AppError, Result},
    handlers::{active_plan, AppState},
    middleware::{AuthenticatedUser, MaybeUser},
    models::{
        Account, AiTool, CreatePromptRequest, Level, Prompt, PromptCategory, PromptImage, PromptListParams,
        SubscriptionPlan, UpdatePromptRequest, VoteDirection,
        MAX_IMAGE_CAPTION, MAX_PROMPT_DESCRIPTION, MAX_PROMPT_TITLE,
    },
    services::entitlement::{self, Denial},
    storage::{ImageHost, UploadOptions},
    utils::{file, validation},
};

/// Removes hosted images after the database no longer references them.
async fn delete_hosted(host: &dyn ImageHost, public_ids: &[String]) {
    for public_id in public_ids {
        if let Err(e) = host.delete(public_id).await {
            warn!(public_id = %public_id, error = %e, "Failed to delete hosted image");
        }
    }
}

/// Plan checks for a new prompt, in order: monthly quota, required level,
/// private content, prompt length.
fn check_new_prompt(
    account: &mut Account,
    plan: Option<&SubscriptionPlan>,
    requires_level: Level,
    is_public: bool,
    prompt_length: usize,
    now: DateTime<Utc>,
) -> std::result::Result<(), Denial> {
    entitlement::can_create_content(&mut account.usage, plan, now).into_result()?;

    if let Some(plan) = plan {
        entitlement::check_level(account.level, requires_level)?;
        if !is_public {
            entitlement::check_private_content(plan)?;
        }
        entitlement::check_prompt_length(&plan.limits, prompt_length)?;
    }
    Ok(())
}

/// Plan checks for an edit. Only the gated fields that actually change are
/// checked, and any such change needs an active plan.
fn check_prompt_edit(
    account_level: Level,
    plan: Option<&SubscriptionPlan>,
    becomes_private: bool,
    new_prompt_length: Option<usize>,
    new_level: Option<Level>,
) -> std::result::Result<(), Denial> {
    if !becomes_private && new_prompt_length.is_none() && new_level.is_none() {
        return Ok(());
    }
    let plan = entitlement::require_plan(plan)?;

    if let Some(required) = new_level {
        entitlement::check_level(account_level, required)?;
    }
    if becomes_private {
        entitlement::check_private_content(plan)?;
    }
    if let Some(length) = new_prompt_length {
        entitlement::check_prompt_length(&plan.limits, length)?;
    }
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/prompts",
    request_body = CreatePromptRequest,
    responses(
        (status = 201, description = "Prompt created and counted against the monthly limit"),
        (status = 402, description = "Monthly limit reached"),
        (status = 403, description = "Level, privacy or length not permitted by the plan")
    ),
    tag = "prompts"
)]
pub async fn create_prompt(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<CreatePromptRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let title = validation::require_text("Title", &request.title, MAX_PROMPT_TITLE)?;
    let description =
        validation::require_text("Description", &request.description, MAX_PROMPT_DESCRIPTION)?;
    if request.prompt_text.trim().is_empty() {
        return Err(AppError::Validation("Prompt text is required".to_string()));
    }
    let ai_tool: AiTool = request.ai_tool.parse()?;
    let category = match request.category.as_deref() {
        Some(raw) => raw.parse()?,
        None => PromptCategory::Other,
    };
    let requires_level = match request.requires_level.as_deref() {
        Some(raw) => raw.parse()?,
        None => Level::Newbie,
    };
    let is_public = request.is_public.unwrap_or(true);

    let mut tx = state.database.begin().await?;

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let plan = active_plan(&mut *tx, &account).await?;
    let now = Utc::now();

    let last_reset = account.usage.last_reset;
    let checked = check_new_prompt(
        &mut account,
        plan.as_ref(),
        requires_level,
        is_public,
        request.prompt_text.chars().count(),
        now,
    );
    if let Err(denial) = checked {
        // A denied request still keeps a month rollover applied by the check.
        if account.usage.last_reset != last_reset {
            account.updated_at = now;
            AccountQueries::save(&mut *tx, &account).await?;
            tx.commit().await?;
        }
        return Err(state.deny(account.id, denial));
    }

    let prompt = Prompt {
        id: Uuid::new_v4(),
        author_id: account.id,
        title,
        description,
        prompt_text: request.prompt_text,
        result_text: request.result_text.filter(|text| !text.trim().is_empty()),
        ai_tool,
        category,
        tags: request.tags,
        images: sqlx::types::Json(Vec::new()),
        is_public,
        requires_level,
        upvoted_by: Vec::new(),
        downvoted_by: Vec::new(),
        views: 0,
        created_at: now,
        updated_at: now,
    };
    PromptQueries::insert(&mut *tx, &prompt).await?;

    account.usage.record_content_created();
    account.updated_at = now;
    AccountQueries::save(&mut *tx, &account).await?;
    tx.commit().await?;

    info!(account_id = %account.id, prompt_id = %prompt.id, "Prompt created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Prompt created",
            "data": prompt,
            "usage": {
                "prompts_this_month": account.usage.prompts_this_month,
                "prompts_limit": plan.as_ref().map(|plan| plan.limits.prompts_limit)
            }
        })),
    ))
}

#[utoipa::path(
    get,
    path = "/api/prompts",
    params(
        ("page" = Option<u32>, Query, description = "1-based page"),
        ("limit" = Option<u32>, Query, description = "Page size, at most 50"),
        ("category" = Option<String>, Query, description = "Category filter"),
        ("ai_tool" = Option<String>, Query, description = "AI tool filter")
    ),
    responses((status = 200, description = "A page of public prompts, newest first")),
    tag = "prompts"
)]
pub async fn list_prompts(
    State(state): State<AppState>,
    Query(params): Query<PromptListParams>,
) -> Result<Json<serde_json::Value>> {
    let category = params.category.as_deref().map(str::parse::<PromptCategory>).transpose()?;
    let ai_tool = params.ai_tool.as_deref().map(str::parse::<AiTool>).transpose()?;
    let (limit, offset) = validation::pagination(params.page, params.limit);

    let prompts =
        PromptQueries::list_public(state.database.pool(), category, ai_tool, limit, offset).await?;
    let total = PromptQueries::count_public(state.database.pool(), category, ai_tool).await?;

    Ok(Json(json!({
        "data": prompts,
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
    path = "/api/prompts/{id}",
    params(("id" = Uuid, Path, description = "Prompt id")),
    responses(
        (status = 200, description = "The prompt"),
        (status = 404, description = "Missing, or private to another account")
    ),
    tag = "prompts"
)]
pub async fn get_prompt(
    State(state): State<AppState>,
    user: MaybeUser,
    Path(prompt_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let mut prompt = PromptQueries::find_by_id(state.database.pool(), prompt_id)
        .await?
        .filter(|prompt| prompt.visible_to(user.id()))
        .ok_or(AppError::NotFound("Prompt"))?;

    PromptQueries::increment_views(state.database.pool(), prompt.id).await?;
    prompt.views += 1;

    Ok(Json(json!({
        "data": prompt
    })))
}

#[utoipa::path(
    put,
    path = "/api/prompts/{id}",
    params(("id" = Uuid, Path, description = "Prompt id")),
    request_body = UpdatePromptRequest,
    responses(
        (status = 200, description = "Prompt updated; storage of deleted images released"),
        (status = 403, description = "Not the author, or the change is not permitted by the plan"),
        (status = 404, description = "Missing prompt or image index")
    ),
    tag = "prompts"
)]
pub async fn update_prompt(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(prompt_id): Path<Uuid>,
    Json(request): Json<UpdatePromptRequest>,
) -> Result<Json<serde_json::Value>> {
    let title = request
        .title
        .as_deref()
        .map(|title| validation::require_text("Title", title, MAX_PROMPT_TITLE))
        .transpose()?;
    let description = request
        .description
        .as_deref()
        .map(|text| validation::require_text("Description", text, MAX_PROMPT_DESCRIPTION))
        .transpose()?;
    if request.prompt_text.as_deref().is_some_and(|text| text.trim().is_empty()) {
        return Err(AppError::Validation("Prompt text is required".to_string()));
    }
    let ai_tool = request.ai_tool.as_deref().map(str::parse::<AiTool>).transpose()?;
    let category = request.category.as_deref().map(str::parse::<PromptCategory>).transpose()?;
    let requires_level = request.requires_level.as_deref().map(str::parse::<Level>).transpose()?;

    let mut tx = state.database.begin().await?;

    let mut prompt = PromptQueries::find_by_id_for_update(&mut *tx, prompt_id)
        .await?
        .ok_or(AppError::NotFound("Prompt"))?;
    if prompt.author_id != user.id {
        return Err(AppError::Forbidden("Only the author can edit this prompt".to_string()));
    }

    let mut doomed = request.images_to_delete;
    doomed.sort_unstable_by(|a, b| b.cmp(a));
    doomed.dedup();
    if doomed.first().is_some_and(|index| *index >= prompt.images.len()) {
        return Err(AppError::NotFound("Image"));
    }

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let plan = active_plan(&mut *tx, &account).await?;

    let becomes_private = prompt.is_public && request.is_public == Some(false);
    let new_prompt_length = request
        .prompt_text
        .as_ref()
        .filter(|text| **text != prompt.prompt_text)
        .map(|text| text.chars().count());
    let new_level = requires_level.filter(|level| *level != prompt.requires_level);
    check_prompt_edit(account.level, plan.as_ref(), becomes_private, new_prompt_length, new_level)
        .map_err(|denial| state.deny(account.id, denial))?;

    if let Some(title) = title {
        prompt.title = title;
    }
    if let Some(description) = description {
        prompt.description = description;
    }
    if let Some(prompt_text) = request.prompt_text {
        prompt.prompt_text = prompt_text;
    }
    if let Some(result_text) = request.result_text {
        prompt.result_text = Some(result_text).filter(|text| !text.trim().is_empty());
    }
    if let Some(ai_tool) = ai_tool {
        prompt.ai_tool = ai_tool;
    }
    if let Some(category) = category {
        prompt.category = category;
    }
    if let Some(tags) = request.tags {
        prompt.tags = tags;
    }
    if let Some(is_public) = request.is_public {
        prompt.is_public = is_public;
    }
    if let Some(level) = requires_level {
        prompt.requires_level = level;
    }

    // Highest index first so earlier positions stay valid.
    let removed: Vec<PromptImage> =
        doomed.into_iter().filter_map(|index| prompt.detach_image(index)).collect();
    let released: u64 = removed.iter().map(|image| image.bytes).sum();

    let now = Utc::now();
    prompt.updated_at = now;
    PromptQueries::save(&mut *tx, &prompt).await?;
    if !removed.is_empty() {
        account.usage.release_image_storage(released);
        account.updated_at = now;
        AccountQueries::save(&mut *tx, &account).await?;
    }
    tx.commit().await?;

    let public_ids: Vec<String> = removed.into_iter().map(|image| image.public_id).collect();
    delete_hosted(state.image_host.as_ref(), &public_ids).await;

    info!(account_id = %account.id, prompt_id = %prompt.id, released_bytes = released, "Prompt updated");

    Ok(Json(json!({
        "message": "Prompt updated",
        "data": prompt,
        "storage_used": account.usage.storage_used
    })))
}

#[utoipa::path(
    delete,
    path = "/api/prompts/{id}",
    params(("id" = Uuid, Path, description = "Prompt id")),
    responses(
        (status = 200, description = "Deleted; image storage released"),
        (status = 403, description = "Not the author")
    ),
    tag = "prompts"
)]
pub async fn delete_prompt(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(prompt_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    let mut tx = state.database.begin().await?;

    let prompt = PromptQueries::find_by_id_for_update(&mut *tx, prompt_id)
        .await?
        .ok_or(AppError::NotFound("Prompt"))?;
    if prompt.author_id != user.id {
        return Err(AppError::Forbidden("Only the author can delete this prompt".to_string()));
    }

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let released = prompt.total_image_bytes();
    account.usage.release_image_storage(released);
    account.updated_at = Utc::now();

    PromptQueries::delete(&mut *tx, prompt.id).await?;
    AccountQueries::save(&mut *tx, &account).await?;
    tx.commit().await?;

    let public_ids: Vec<String> = prompt.images.iter().map(|image| image.public_id.clone()).collect();
    delete_hosted(state.image_host.as_ref(), &public_ids).await;

    info!(account_id = %account.id, prompt_id = %prompt.id, released_bytes = released, "Prompt deleted");

    Ok(Json(json!({
        "message": "Prompt deleted",
        "data": { "storage_used": account.usage.storage_used }
    })))
}

struct ImageUpload {
    data: Vec<u8>,
    mime_type: mime::Mime,
    caption: String,
}

async fn read_image_upload(multipart: &mut Multipart, allowed: &[String]) -> Result<ImageUpload> {
    let mut upload: Option<(Vec<u8>, mime::Mime)> = None;
    let mut caption = String::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("Invalid multipart body: {}", e)))?
    {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "image" | "file" => {
                let mime_type = file::resolve_mime_type(field.content_type(), field.file_name())
                    .ok_or_else(|| AppError::Validation("Missing content type".to_string()))?;
                file::validate_mime_type(&mime_type, allowed)?;
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| AppError::Validation(format!("Failed to read upload: {}", e)))?;
                upload = Some((data.to_vec(), mime_type));
            }
            "caption" => {
                let text = field
                    .text()
                    .await
                    .map_err(|e| AppError::Validation(format!("Invalid caption: {}", e)))?;
                caption = validation::optional_text("Caption", Some(&text), MAX_IMAGE_CAPTION)?;
            }
            _ => {}
        }
    }

    let (data, mime_type) = upload.ok_or_else(|| AppError::Validation("No image provided".to_string()))?;
    if data.is_empty() {
        return Err(AppError::Validation("Uploaded image is empty".to_string()));
    }

    Ok(ImageUpload {
        data,
        mime_type,
        caption,
    })
}

async fn persist_upload(
    mut tx: Transaction<'static, Postgres>,
    prompt: &Prompt,
    account: &Account,
) -> Result<()> {
    PromptQueries::save(&mut *tx, prompt).await?;
    AccountQueries::save(&mut *tx, account).await?;
    tx.commit().await?;
    Ok(())
}

#[utoipa::path(
    post,
    path = "/api/prompts/{id}/images",
    params(("id" = Uuid, Path, description = "Prompt id")),
    request_body(content = String, content_type = "multipart/form-data", description = "`image` file and optional `caption`"),
    responses(
        (status = 201, description = "Image stored and attached"),
        (status = 402, description = "Storage or image count limit reached"),
        (status = 403, description = "Image too large for the plan")
    ),
    tag = "prompts"
)]
pub async fn upload_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(prompt_id): Path<Uuid>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    let upload = read_image_upload(&mut multipart, &state.config.allowed_mime_types).await?;
    let size = upload.data.len() as u64;

    let mut tx = state.database.begin().await?;

    let mut prompt = PromptQueries::find_by_id_for_update(&mut *tx, prompt_id)
        .await?
        .ok_or(AppError::NotFound("Prompt"))?;
    if prompt.author_id != user.id {
        return Err(AppError::Forbidden("Only the author can add images".to_string()));
    }

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;
    let plan = active_plan(&mut *tx, &account).await?;

    if let Some(plan) = plan.as_ref() {
        file::validate_image_format(&upload.mime_type, &plan.limits.image_formats)?;
        entitlement::check_image_size(&plan.limits, size)
            .map_err(|denial| state.deny(account.id, denial))?;
        entitlement::check_image_count(&plan.limits, prompt.images.len())
            .map_err(|denial| state.deny(account.id, denial))?;
    }
    entitlement::can_upload_image(&account.usage, plan.as_ref(), size)
        .into_result()
        .map_err(|denial| state.deny(account.id, denial))?;

    let stored = state
        .image_host
        .upload(
            &upload.data,
            &UploadOptions {
                folder: format!("prompts/{}", prompt.id),
                fallback_extension: file::get_file_extension(&upload.mime_type).to_string(),
            },
        )
        .await?;

    let now = Utc::now();
    // The host's byte count is what storage accounting uses.
    account.usage.record_image_uploaded(stored.bytes);
    account.updated_at = now;
    prompt.attach_image(PromptImage {
        public_id: stored.public_id.clone(),
        url: stored.url.clone(),
        format: stored.format.clone(),
        width: stored.width,
        height: stored.height,
        bytes: stored.bytes,
        caption: upload.caption,
        is_primary: false,
        uploaded_at: now,
    });
    prompt.updated_at = now;

    if let Err(e) = persist_upload(tx, &prompt, &account).await {
        delete_hosted(state.image_host.as_ref(), &[stored.public_id]).await;
        return Err(e);
    }

    info!(
        account_id = %account.id,
        prompt_id = %prompt.id,
        public_id = %stored.public_id,
        bytes = stored.bytes,
        "Image uploaded"
    );

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Image uploaded",
            "data": {
                "image": stored,
                "images": prompt.images.len(),
                "storage": account.usage.storage_summary(plan.as_ref().map(|plan| &plan.limits.0))
            }
        })),
    ))
}

#[utoipa::path(
    delete,
    path = "/api/prompts/{id}/images/{index}",
    params(
        ("id" = Uuid, Path, description = "Prompt id"),
        ("index" = usize, Path, description = "Position of the image")
    ),
    responses(
        (status = 200, description = "Image removed; storage released"),
        (status = 404, description = "No image at that position")
    ),
    tag = "prompts"
)]
pub async fn remove_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((prompt_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<serde_json::Value>> {
    let mut tx = state.database.begin().await?;

    let mut prompt = PromptQueries::find_by_id_for_update(&mut *tx, prompt_id)
        .await?
        .ok_or(AppError::NotFound("Prompt"))?;
    if prompt.author_id != user.id {
        return Err(AppError::Forbidden("Only the author can remove images".to_string()));
    }

    let removed = prompt.detach_image(index).ok_or(AppError::NotFound("Image"))?;

    let mut account = AccountQueries::find_by_id_for_update(&mut *tx, user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let now = Utc::now();
    account.usage.release_image_storage(removed.bytes);
    account.updated_at = now;
    prompt.updated_at = now;

    PromptQueries::save(&mut *tx, &prompt).await?;
    AccountQueries::save(&mut *tx, &account).await?;
    tx.commit().await?;

    delete_hosted(state.image_host.as_ref(), &[removed.public_id.clone()]).await;

    Ok(Json(json!({
        "message": "Image removed",
        "data": {
            "released_bytes": removed.bytes,
            "storage_used": account.usage.storage_used
        }
    })))
}

#[utoipa::path(
    put,
    path = "/api/prompts/{id}/images/{index}/primary",
    params(
        ("id" = Uuid, Path, description = "Prompt id"),
        ("index" = usize, Path, description = "Position of the image")
    ),
    responses(
        (status = 200, description = "Primary image changed"),
        (status = 404, description = "No image at that position")
    ),
    tag = "prompts"
)]
pub async fn set_primary_image(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path((prompt_id, index)): Path<(Uuid, usize)>,
) -> Result<Json<serde_json::Value>> {
    let mut tx = state.database.begin().await?;

    let mut prompt = PromptQueries::find_by_id_for_update(&mut *tx, prompt_id)
        .await?
        .ok_or(AppError::NotFound("Prompt"))?;
    if prompt.author_id != user.id {
        return Err(AppError::Forbidden("Only the author can change images".to_string()));
    }
    if !prompt.set_primary_image(index) {
        return Err(AppError::NotFound("Image"));
    }

    prompt.updated_at = Utc::now();
    PromptQueries::save(&mut *tx, &prompt).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "message": "Primary image updated",
        "data": { "images": prompt.images.0 }
    })))
}

async fn vote(
    state: &AppState,
    voter: Uuid,
    prompt_id: Uuid,
    direction: VoteDirection,
) -> Result<Json<serde_json::Value>> {
    let mut tx = state.database.begin().await?;

    let mut prompt = PromptQueries::find_by_id_for_update(&mut *tx, prompt_id)
        .await?
        .filter(|prompt| prompt.visible_to(Some(voter)))
        .ok_or(AppError::NotFound("Prompt"))?;

    prompt.toggle_vote(voter, direction);
    prompt.updated_at = Utc::now();
    PromptQueries::save(&mut *tx, &prompt).await?;
    tx.commit().await?;

    Ok(Json(json!({
        "data": {
            "upvoted": prompt.upvoted_by.contains(&voter),
            "downvoted": prompt.downvoted_by.contains(&voter),
            "upvotes": prompt.upvoted_by.len(),
            "downvotes": prompt.downvoted_by.len()
        }
    })))
}

#[utoipa::path(
    post,
    path = "/api/prompts/{id}/upvote",
    params(("id" = Uuid, Path, description = "Prompt id")),
    responses((status = 200, description = "Upvote toggled")),
    tag = "prompts"
)]
pub async fn upvote_prompt(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(prompt_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    vote(&state, user.id, prompt_id, VoteDirection::Up).await
}

#[utoipa::path(
    post,
    path = "/api/prompts/{id}/downvote",
    params(("id" = Uuid, Path, description = "Prompt id")),
    responses((status = 200, description = "Downvote toggled; replaces an upvote")),
    tag = "prompts"
)]
pub async fn downvote_prompt(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Path(prompt_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>> {
    vote(&state, user.id, prompt_id, VoteDirection::Down).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Limit, PlanTier};
    use crate::services::entitlement::{tests::plan_with, DenialKind};
    use chrono::{Duration, TimeZone};

    fn basic() -> SubscriptionPlan {
        plan_with(PlanTier::Basic, Limit::Limited(20), Limit::Limited(100))
    }

    #[test]
    fn test_denied_new_prompt_keeps_month_rollover() {
        let now = Utc.with_ymd_and_hms(2024, 6, 3, 12, 0, 0).unwrap();
        let mut account = Account::new("newbie", "newbie@example.com", None, 100, now);
        account.usage.last_reset = now - Duration::days(30);
        account.usage.prompts_this_month = 20;
        let plan = basic();

        let denial = check_new_prompt(&mut account, Some(&plan), Level::Pro, true, 10, now).unwrap_err();

        assert_eq!(denial.kind, DenialKind::InsufficientLevel);
        assert_eq!(account.usage.prompts_this_month, 0);
        assert_eq!(account.usage.last_reset, now);
    }

    #[test]
    fn test_new_prompt_checks_run_in_order() {
        let now = Utc::now();
        let plan = basic();
        let mut account = Account::new("writer", "writer@example.com", None, 100, now);

        assert!(check_new_prompt(&mut account, Some(&plan), Level::Newbie, true, 10, now).is_ok());
        let denial = check_new_prompt(&mut account, Some(&plan), Level::Newbie, false, 5000, now).unwrap_err();
        assert_eq!(denial.kind, DenialKind::PrivateNotAllowed);
        let denial = check_new_prompt(&mut account, Some(&plan), Level::Newbie, true, 5000, now).unwrap_err();
        assert_eq!(denial.kind, DenialKind::PromptTooLong);
    }

    #[test]
    fn test_edit_checks_only_changed_fields() {
        let plan = basic();
        assert!(check_prompt_edit(Level::Newbie, None, false, None, None).is_ok());

        let denial = check_prompt_edit(Level::Newbie, None, false, Some(10), None).unwrap_err();
        assert_eq!(denial.kind, DenialKind::NoActivePlan);

        let denial = check_prompt_edit(Level::Newbie, Some(&plan), true, None, None).unwrap_err();
        assert_eq!(denial.kind, DenialKind::PrivateNotAllowed);

        let denial = check_prompt_edit(Level::Newbie, Some(&plan), false, None, Some(Level::Expert)).unwrap_err();
        assert_eq!(denial.kind, DenialKind::InsufficientLevel);

        assert!(check_prompt_edit(Level::Pro, Some(&plan), false, Some(1000), Some(Level::Pro)).is_ok());
        let denial = check_prompt_edit(Level::Pro, Some(&plan), false, Some(1001), None).unwrap_err();
        assert_eq!(denial.kind, DenialKind::PromptTooLong);
    }
}
