use axum::{extract::State, http::StatusCode, response::Json};
use chrono::Utc;
use serde_json::json;
use tracing::info;

use crate::{
    auth::{JwtService, OtpService, PasswordService},
    database::queries::{is_unique_violation, AccountQueries},
    errors::{AppError, Result},
    handlers::AppState,
    middleware::AuthenticatedUser,
    models::{
        Account, AuthResponse, CreateUserRequest, ForgotPasswordRequest, LoginRequest,
        RefreshRequest, ResendOtpRequest, ResetPasswordRequest, UpdateProfileRequest, UserResponse,
        VerifyOtpRequest,
    },
    services::{mailer, send_best_effort},
    utils::validation,
};

const VERIFY_SUBJECT: &str = "Verify your PromptVerse account";
const RESET_SUBJECT: &str = "Reset your PromptVerse password";

const MAX_NAME: usize = 50;
const MAX_BIO: usize = 500;
const MAX_PROFILE_FIELD: usize = 100;

fn auth_response(state: &AppState, account: &Account) -> Result<AuthResponse> {
    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let (access_token, refresh_token) = jwt_service.issue_pair(account)?;
    Ok(AuthResponse {
        access_token,
        refresh_token,
        user: UserResponse::from(account),
    })
}

/// Issues a fresh OTP on the account and mails it. Delivery is best effort.
async fn send_otp(state: &AppState, account: &mut Account, subject: &str) {
    let now = Utc::now();
    let code = OtpService::generate();
    account.otp_hash = Some(OtpService::hash(&code));
    account.otp_expires_at = Some(OtpService::expiry(now, state.config.otp_ttl_minutes));
    account.updated_at = now;

    send_best_effort(
        state.mailer.as_ref(),
        &account.email,
        subject,
        &mailer::otp_email(&code, state.config.otp_ttl_minutes),
    )
    .await;
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "Account created, verification code sent"),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Username or email taken")
    ),
    tag = "auth"
)]
pub async fn register(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<serde_json::Value>)> {
    validation::validate_username(&request.username)?;
    validation::validate_email(&request.email)?;
    PasswordService::validate_password_strength(&request.password)?;

    let username = request.username.trim();
    let email = request.email.trim().to_lowercase();

    if let Some(conflict) = AccountQueries::find_conflict(state.database.pool(), username, &email).await? {
        return Err(AppError::Conflict(conflict.to_string()));
    }

    let password_hash = PasswordService::hash_password(&request.password)?;
    let mut account = Account::new(
        username,
        &email,
        Some(password_hash),
        state.config.initial_reward_points,
        Utc::now(),
    );
    send_otp(&state, &mut account, VERIFY_SUBJECT).await;

    // A concurrent registration can still win the race past find_conflict.
    AccountQueries::insert(state.database.pool(), &account)
        .await
        .map_err(|e| match e {
            AppError::Database(ref db) if is_unique_violation(db) => {
                AppError::Conflict("Username or email already registered".to_string())
            }
            other => other,
        })?;

    info!(account_id = %account.id, username = %account.username, "Account registered");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Registration successful. Check your email for the verification code.",
            "data": UserResponse::from(&account)
        })),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/verify-otp",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "Account verified, tokens issued"),
        (status = 401, description = "Invalid or expired code")
    ),
    tag = "auth"
)]
pub async fn verify_otp(
    State(state): State<AppState>,
    Json(request): Json<VerifyOtpRequest>,
) -> Result<Json<serde_json::Value>> {
    let mut account = AccountQueries::find_by_email(state.database.pool(), &request.email)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if account.is_verified {
        return Err(AppError::Validation("Account is already verified".to_string()));
    }

    let now = Utc::now();
    if !OtpService::verify(
        &request.otp,
        account.otp_hash.as_deref(),
        account.otp_expires_at,
        now,
    ) {
        return Err(AppError::Auth("Invalid or expired verification code".to_string()));
    }

    account.is_verified = true;
    account.otp_hash = None;
    account.otp_expires_at = None;
    account.last_login = Some(now);
    account.updated_at = now;
    AccountQueries::save(state.database.pool(), &account).await?;

    info!(account_id = %account.id, "Account verified");

    send_best_effort(
        state.mailer.as_ref(),
        &account.email,
        "Welcome to PromptVerse",
        &mailer::welcome_email(&account.username),
    )
    .await;

    Ok(Json(json!({
        "message": "Account verified successfully",
        "data": auth_response(&state, &account)?
    })))
}

#[utoipa::path(
    post,
    path = "/api/auth/resend-otp",
    request_body = ResendOtpRequest,
    responses((status = 200, description = "A new code was sent")),
    tag = "auth"
)]
pub async fn resend_otp(
    State(state): State<AppState>,
    Json(request): Json<ResendOtpRequest>,
) -> Result<Json<serde_json::Value>> {
    let mut account = AccountQueries::find_by_email(state.database.pool(), &request.email)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    if account.is_verified {
        return Err(AppError::Validation("Account is already verified".to_string()));
    }

    send_otp(&state, &mut account, VERIFY_SUBJECT).await;
    AccountQueries::save(state.database.pool(), &account).await?;

    Ok(Json(json!({
        "message": "Verification code sent"
    })))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Tokens issued"),
        (status = 401, description = "Invalid credentials"),
        (status = 403, description = "Account blocked")
    ),
    tag = "auth"
)]
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<serde_json::Value>> {
    let mut account = AccountQueries::find_by_identifier(state.database.pool(), &request.identifier)
        .await?
        .ok_or_else(|| AppError::Auth("Invalid credentials".to_string()))?;

    let Some(password_hash) = account.password_hash.as_deref() else {
        return Err(AppError::Auth(
            "This account uses social sign-in. Please continue with Google".to_string(),
        ));
    };

    if !PasswordService::verify_password(&request.password, password_hash)? {
        return Err(AppError::Auth("Invalid credentials".to_string()));
    }

    if account.is_blocked {
        return Err(AppError::Forbidden("Account is blocked".to_string()));
    }

    if !account.is_verified {
        return Err(AppError::Auth(
            "Please verify your email before logging in".to_string(),
        ));
    }

    let now = Utc::now();
    account.last_login = Some(now);
    account.updated_at = now;
    AccountQueries::save(state.database.pool(), &account).await?;

    info!(account_id = %account.id, "Login");

    Ok(Json(json!({
        "message": "Login successful",
        "data": auth_response(&state, &account)?
    })))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 200, description = "New access token"),
        (status = 401, description = "Invalid refresh token")
    ),
    tag = "auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    Json(request): Json<RefreshRequest>,
) -> Result<Json<serde_json::Value>> {
    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let claims = jwt_service.verify_refresh_token(&request.refresh_token)?;

    let account = AccountQueries::find_by_id(state.database.pool(), claims.account_id()?)
        .await?
        .ok_or_else(|| AppError::Auth("User not found".to_string()))?;

    if account.is_blocked {
        return Err(AppError::Forbidden("Account is blocked".to_string()));
    }

    let access_token = jwt_service.generate_access_token(&account)?;

    Ok(Json(json!({
        "message": "Token refreshed successfully",
        "data": {
            "access_token": access_token,
            "user": UserResponse::from(&account)
        }
    })))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "The signed-in account"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    let account = AccountQueries::find_by_id(state.database.pool(), user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(json!({
        "data": UserResponse::from(&account)
    })))
}

#[utoipa::path(
    post,
    path = "/api/auth/forgot-password",
    request_body = ForgotPasswordRequest,
    responses(
        (status = 200, description = "A reset code was sent"),
        (status = 404, description = "No account with that email")
    ),
    tag = "auth"
)]
pub async fn forgot_password(
    State(state): State<AppState>,
    Json(request): Json<ForgotPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    let mut account = AccountQueries::find_by_email(state.database.pool(), &request.email)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    send_otp(&state, &mut account, RESET_SUBJECT).await;
    AccountQueries::save(state.database.pool(), &account).await?;

    info!(account_id = %account.id, "Password reset requested");

    Ok(Json(json!({
        "message": "Password reset code sent"
    })))
}

#[utoipa::path(
    post,
    path = "/api/auth/reset-password",
    request_body = ResetPasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Weak password"),
        (status = 401, description = "Invalid or expired code")
    ),
    tag = "auth"
)]
pub async fn reset_password(
    State(state): State<AppState>,
    Json(request): Json<ResetPasswordRequest>,
) -> Result<Json<serde_json::Value>> {
    PasswordService::validate_password_strength(&request.new_password)?;

    let mut account = AccountQueries::find_by_email(state.database.pool(), &request.email)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    let now = Utc::now();
    if !OtpService::verify(
        &request.otp,
        account.otp_hash.as_deref(),
        account.otp_expires_at,
        now,
    ) {
        return Err(AppError::Auth("Invalid or expired reset code".to_string()));
    }

    account.password_hash = Some(PasswordService::hash_password(&request.new_password)?);
    account.otp_hash = None;
    account.otp_expires_at = None;
    account.updated_at = now;
    AccountQueries::save(state.database.pool(), &account).await?;

    info!(account_id = %account.id, "Password reset");

    Ok(Json(json!({
        "message": "Password reset successfully"
    })))
}

#[utoipa::path(
    get,
    path = "/api/auth/profile",
    responses(
        (status = 200, description = "The signed-in account with its profile"),
        (status = 401, description = "Not authenticated")
    ),
    tag = "auth"
)]
pub async fn get_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
) -> Result<Json<serde_json::Value>> {
    let account = AccountQueries::find_by_id(state.database.pool(), user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    Ok(Json(json!({
        "data": UserResponse::from(&account)
    })))
}

/// Applies the fields present in `request`, trimmed and length-checked.
fn apply_profile_update(account: &mut Account, request: &UpdateProfileRequest) -> Result<()> {
    let text = |field: &str, value: &Option<String>, max: usize| -> Result<Option<String>> {
        value
            .as_deref()
            .map(|value| validation::optional_text(field, Some(value), max))
            .transpose()
    };
    let link = |field: &str, value: &Option<String>| -> Result<Option<String>> {
        let value = text(field, value, MAX_PROFILE_FIELD)?;
        if let Some(url) = value.as_deref() {
            validation::validate_url(field, url)?;
        }
        Ok(value)
    };

    let name = text("Name", &request.name, MAX_NAME)?;
    let bio = text("Bio", &request.bio, MAX_BIO)?;
    let profession = text("Profession", &request.profession, MAX_PROFILE_FIELD)?;
    let location = text("Location", &request.location, MAX_PROFILE_FIELD)?;
    let website = link("Website", &request.website)?;
    let twitter = text("Twitter", &request.twitter, MAX_PROFILE_FIELD)?;
    let github = text("GitHub", &request.github, MAX_PROFILE_FIELD)?;
    let linkedin = link("LinkedIn", &request.linkedin)?;

    if let Some(name) = name {
        account.name = name;
    }
    let profile = &mut account.profile.0;
    for (slot, value) in [
        (&mut profile.bio, bio),
        (&mut profile.profession, profession),
        (&mut profile.location, location),
        (&mut profile.website, website),
        (&mut profile.twitter, twitter),
        (&mut profile.github, github),
        (&mut profile.linkedin, linkedin),
    ] {
        if let Some(value) = value {
            *slot = value;
        }
    }
    Ok(())
}

#[utoipa::path(
    patch,
    path = "/api/auth/profile",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Profile updated"),
        (status = 400, description = "A field is too long or a link is malformed")
    ),
    tag = "auth"
)]
pub async fn update_profile(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    Json(request): Json<UpdateProfileRequest>,
) -> Result<Json<serde_json::Value>> {
    let mut account = AccountQueries::find_by_id(state.database.pool(), user.id)
        .await?
        .ok_or(AppError::NotFound("User"))?;

    apply_profile_update(&mut account, &request)?;
    account.updated_at = Utc::now();
    AccountQueries::save(state.database.pool(), &account).await?;

    info!(account_id = %account.id, "Profile updated");

    Ok(Json(json!({
        "message": "Profile updated",
        "data": UserResponse::from(&account)
    })))
}
