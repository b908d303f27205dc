use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use uuid::Uuid;

use crate::{
    auth::JwtService,
    database::queries::AccountQueries,
    errors::AppError,
    handlers::AppState,
    models::{Level, Role},
};

#[derive(Debug, Clone)]
pub struct AuthenticatedUser {
    pub id: Uuid,
    pub username: String,
    pub role: Role,
    pub level: Level,
}

/// An authenticated account holding the admin or superadmin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthenticatedUser);

/// Present when the request carries a bearer token, `None` for anonymous
/// callers. A malformed or expired token is still rejected.
#[derive(Debug, Clone)]
pub struct MaybeUser(pub Option<AuthenticatedUser>);

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|header| header.strip_prefix("Bearer "))
        .map(str::trim)
}

async fn authenticate(token: &str, state: &AppState) -> Result<AuthenticatedUser, AppError> {
    let jwt_service = JwtService::new(&state.config.jwt_secret);
    let claims = jwt_service
        .verify_access_token(token)
        .map_err(|_| AppError::Auth("Invalid or expired token".to_string()))?;
    let account_id = claims.account_id()?;

    // The account may have been blocked or removed since the token was issued.
    let account = AccountQueries::find_by_id(state.database.pool(), account_id)
        .await?
        .ok_or_else(|| AppError::Auth("User not found".to_string()))?;

    if account.is_blocked {
        return Err(AppError::Forbidden("Account is blocked".to_string()));
    }

    Ok(AuthenticatedUser {
        id: account.id,
        username: account.username,
        role: account.role,
        level: account.level,
    })
}

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => authenticate(token, state).await,
            None => Err(AppError::Auth("Authentication required".to_string())),
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AdminUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;
        if !user.role.is_admin() {
            return Err(AppError::Forbidden("Admin access required".to_string()));
        }
        Ok(AdminUser(user))
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        match bearer_token(parts) {
            Some(token) => Ok(MaybeUser(Some(authenticate(token, state).await?))),
            None => Ok(MaybeUser(None)),
        }
    }
}

impl MaybeUser {
    pub fn id(&self) -> Option<Uuid> {
        self.0.as_ref().map(|user| user.id)
    }
}
