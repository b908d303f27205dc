use crate::errors::{AppError, Result};

pub const MIN_USERNAME_LENGTH: usize = 3;
pub const MAX_USERNAME_LENGTH: usize = 30;
pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 50;

pub fn validate_username(username: &str) -> Result<()> {
    let username = username.trim();
    let length = username.chars().count();
    if !(MIN_USERNAME_LENGTH..=MAX_USERNAME_LENGTH).contains(&length) {
        return Err(AppError::Validation(format!(
            "Username must be between {} and {} characters",
            MIN_USERNAME_LENGTH, MAX_USERNAME_LENGTH
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
    {
        return Err(AppError::Validation(
            "Username may only contain letters, numbers, '.', '_' and '-'".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_email(email: &str) -> Result<()> {
    let email = email.trim();
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    };
    if !valid {
        return Err(AppError::Validation("Please provide a valid email".to_string()));
    }
    Ok(())
}

/// Trims `value` and rejects it when empty or longer than `max` characters.
pub fn require_text(field: &str, value: &str, max: usize) -> Result<String> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AppError::Validation(format!("{} is required", field)));
    }
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} cannot exceed {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// Like [`require_text`] but allows an empty value.
pub fn optional_text(field: &str, value: Option<&str>, max: usize) -> Result<String> {
    let value = value.unwrap_or_default().trim();
    if value.chars().count() > max {
        return Err(AppError::Validation(format!(
            "{} cannot exceed {} characters",
            field, max
        )));
    }
    Ok(value.to_string())
}

/// Empty, or an absolute http(s) URL.
pub fn validate_url(field: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Ok(());
    }
    let rest = value
        .strip_prefix("https://")
        .or_else(|| value.strip_prefix("http://"));
    match rest {
        Some(rest) if !rest.is_empty() && !value.contains(char::is_whitespace) => Ok(()),
        _ => Err(AppError::Validation(format!("{} must be an http(s) URL", field))),
    }
}

/// Normalises page/limit query parameters into `(limit, offset)`.
pub fn pagination(page: Option<u32>, limit: Option<u32>) -> (i64, i64) {
    let page = page.unwrap_or(1).max(1);
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let limit = i64::from(limit);
    (limit, (i64::from(page) - 1) * limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_username_rules() {
        assert!(validate_username("bob").is_ok());
        assert!(validate_username("ab").is_err());
        assert!(validate_username(&"x".repeat(31)).is_err());
        assert!(validate_username("has space").is_err());
        assert!(validate_username("prompt_master-1").is_ok());
    }

    #[test]
    fn test_email_rules() {
        assert!(validate_email("alice@example.com").is_ok());
        assert!(validate_email("alice@localhost").is_err());
        assert!(validate_email("@example.com").is_err());
        assert!(validate_email("alice example@x.com").is_err());
    }

    #[test]
    fn test_text_limits() {
        assert_eq!(require_text("Title", "  hi  ", 10).unwrap(), "hi");
        assert!(require_text("Title", "   ", 10).is_err());
        assert!(require_text("Title", "abcdef", 5).is_err());
        assert_eq!(optional_text("Description", None, 5).unwrap(), "");
    }

    #[test]
    fn test_profile_links() {
        assert!(validate_url("Website", "").is_ok());
        assert!(validate_url("Website", "https://example.com/me").is_ok());
        assert!(validate_url("Website", "ftp://example.com").is_err());
        assert!(validate_url("Website", "https://").is_err());
        assert!(validate_url("Website", "https://exa mple.com").is_err());
    }

    #[test]
    fn test_pagination_bounds() {
        assert_eq!(pagination(None, None), (10, 0));
        assert_eq!(pagination(Some(3), Some(20)), (20, 40));
        assert_eq!(pagination(Some(0), Some(500)), (50, 0));
    }

    #[test]
    fn test_pagination_huge_page_does_not_overflow() {
        assert_eq!(pagination(Some(100_000_000), Some(50)), (50, 4_999_999_950));
        let (_, offset) = pagination(Some(u32::MAX), Some(u32::MAX));
        assert_eq!(offset, (i64::from(u32::MAX) - 1) * 50);
    }
}
