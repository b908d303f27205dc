use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde_json::json;
use thiserror::Error;

use crate::models::ParseEnumError;
use crate::services::{entitlement::Denial, rewards::RewardError};

#[derive(Error, Debug)]
pub enum AppError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Quota exceeded: {reason}")]
    QuotaExceeded {
        kind: &'static str,
        reason: String,
        retry_after: Option<DateTime<Utc>>,
    },

    #[error("Not entitled: {reason}")]
    Entitlement { kind: &'static str, reason: String },

    #[error(transparent)]
    Reward(#[from] RewardError),

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Mail error: {0}")]
    Mail(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl From<Denial> for AppError {
    fn from(denial: Denial) -> Self {
        if denial.kind.is_quota() {
            AppError::QuotaExceeded {
                kind: denial.kind.as_str(),
                reason: denial.reason,
                retry_after: denial.retry_after,
            }
        } else {
            AppError::Entitlement {
                kind: denial.kind.as_str(),
                reason: denial.reason,
            }
        }
    }
}

impl From<ParseEnumError> for AppError {
    fn from(err: ParseEnumError) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Database(sqlx::Error::RowNotFound) => StatusCode::NOT_FOUND,
            AppError::Database(_)
            | AppError::Migration(_)
            | AppError::Redis(_)
            | AppError::Storage(_)
            | AppError::Mail(_)
            | AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Auth(_) => StatusCode::UNAUTHORIZED,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::QuotaExceeded { .. } => StatusCode::PAYMENT_REQUIRED,
            AppError::Entitlement { .. } | AppError::Forbidden(_) => StatusCode::FORBIDDEN,
            AppError::Reward(e) => match e {
                RewardError::ContentNotFound => StatusCode::NOT_FOUND,
                RewardError::DailyLimitReached { .. } | RewardError::CooldownActive { .. } => {
                    StatusCode::TOO_MANY_REQUESTS
                }
                RewardError::InvalidRewardType
                | RewardError::SelfRewardForbidden
                | RewardError::InsufficientPoints { .. } => StatusCode::BAD_REQUEST,
            },
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::Conflict(_) => StatusCode::CONFLICT,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        let error_message = match &self {
            AppError::Database(sqlx::Error::RowNotFound) => "Resource not found".to_string(),
            AppError::Database(e) => {
                tracing::error!("Database error: {}", e);
                "Database error".to_string()
            }
            AppError::Migration(e) => {
                tracing::error!("Migration error: {}", e);
                "Database error".to_string()
            }
            AppError::Redis(e) => {
                tracing::error!("Redis error: {}", e);
                "Cache error".to_string()
            }
            AppError::Storage(msg) => {
                tracing::error!("Storage error: {}", msg);
                "Storage error".to_string()
            }
            AppError::Mail(msg) => {
                tracing::error!("Mail error: {}", msg);
                "Mail delivery error".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                "Internal server error".to_string()
            }
            AppError::Auth(msg)
            | AppError::Validation(msg)
            | AppError::Forbidden(msg)
            | AppError::Conflict(msg) => msg.clone(),
            AppError::QuotaExceeded { reason, .. } | AppError::Entitlement { reason, .. } => {
                reason.clone()
            }
            AppError::Reward(e) => e.to_string(),
            AppError::NotFound(what) => format!("{} not found", what),
        };

        let mut body = json!({
            "error": error_message,
            "status": status.as_u16()
        });

        match &self {
            AppError::QuotaExceeded { kind, retry_after, .. } => {
                body["kind"] = json!(kind);
                if let Some(at) = retry_after {
                    body["retry_after"] = json!(at);
                }
            }
            AppError::Entitlement { kind, .. } => {
                body["kind"] = json!(kind);
            }
            AppError::Reward(e) => {
                if let Some(at) = e.retry_after() {
                    body["retry_after"] = json!(at);
                }
            }
            _ => {}
        }

        (status, Json(body)).into_response()
    }
}

pub type Result<T> = std::result::Result<T, AppError>;
