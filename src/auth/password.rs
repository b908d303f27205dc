use bcrypt::{hash, verify, DEFAULT_COST};

use crate::errors::{AppError, Result};

pub const MIN_PASSWORD_LENGTH: usize = 6;
/// bcrypt ignores input past 72 bytes.
pub const MAX_PASSWORD_LENGTH: usize = 72;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String> {
        hash(password, DEFAULT_COST)
            .map_err(|e| AppError::Auth(format!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool> {
        verify(password, hash)
            .map_err(|e| AppError::Auth(format!("Failed to verify password: {}", e)))
    }

    pub fn validate_password_strength(password: &str) -> Result<()> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at least {} characters long",
                MIN_PASSWORD_LENGTH
            )));
        }

        if password.len() > MAX_PASSWORD_LENGTH {
            return Err(AppError::Validation(format!(
                "Password must be at most {} bytes long",
                MAX_PASSWORD_LENGTH
            )));
        }

        if password.trim().is_empty() {
            return Err(AppError::Validation("Password cannot be blank".to_string()));
        }

        Ok(())
    }
}
