use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{AppError, Result};
use crate::models::{Account, Role};

#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // Account ID
    pub username: String,
    pub role: Role,
    pub exp: i64,
    pub iat: i64,
    pub token_type: TokenType,
}

impl Claims {
    pub fn account_id(&self) -> Result<Uuid> {
        Uuid::parse_str(&self.sub).map_err(|_| AppError::Auth("Invalid token subject".to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TokenType {
    Access,
    Refresh,
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_token_duration: Duration,
    refresh_token_duration: Duration,
}

impl JwtService {
    pub fn new(secret: &str) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_ref()),
            decoding_key: DecodingKey::from_secret(secret.as_ref()),
            access_token_duration: Duration::hours(1),
            refresh_token_duration: Duration::days(7),
        }
    }

    fn generate(&self, account: &Account, token_type: TokenType) -> Result<String> {
        let now = Utc::now();
        let lifetime = match token_type {
            TokenType::Access => self.access_token_duration,
            TokenType::Refresh => self.refresh_token_duration,
        };
        let claims = Claims {
            sub: account.id.to_string(),
            username: account.username.clone(),
            role: account.role,
            exp: (now + lifetime).timestamp(),
            iat: now.timestamp(),
            token_type,
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| AppError::Auth(format!("Failed to generate {:?} token: {}", token_type, e)))
    }

    pub fn generate_access_token(&self, account: &Account) -> Result<String> {
        self.generate(account, TokenType::Access)
    }

    pub fn generate_refresh_token(&self, account: &Account) -> Result<String> {
        self.generate(account, TokenType::Refresh)
    }

    /// Access and refresh token for the account.
    pub fn issue_pair(&self, account: &Account) -> Result<(String, String)> {
        Ok((
            self.generate_access_token(account)?,
            self.generate_refresh_token(account)?,
        ))
    }

    pub fn verify_token(&self, token: &str) -> Result<Claims> {
        let token_data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|e| AppError::Auth(format!("Invalid token: {}", e)))?;

        Ok(token_data.claims)
    }

    pub fn verify_access_token(&self, token: &str) -> Result<Claims> {
        let claims = self.verify_token(token)?;

        match claims.token_type {
            TokenType::Access => Ok(claims),
            TokenType::Refresh => Err(AppError::Auth("Expected access token, got refresh token".to_string())),
        }
    }

    pub fn verify_refresh_token(&self, token: &str) -> Result<Claims> {
        let claims = self.verify_token(token)?;

        match claims.token_type {
            TokenType::Refresh => Ok(claims),
            TokenType::Access => Err(AppError::Auth("Expected refresh token, got access token".to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_pair_round_trip() {
        let jwt_service = JwtService::new("test-secret");
        let account = Account::new("alice", "alice@example.com", None, 100, Utc::now());

        let (access_token, refresh_token) = jwt_service.issue_pair(&account).unwrap();

        let access_claims = jwt_service.verify_access_token(&access_token).unwrap();
        let refresh_claims = jwt_service.verify_refresh_token(&refresh_token).unwrap();

        assert_eq!(access_claims.account_id().unwrap(), account.id);
        assert_eq!(access_claims.username, "alice");
        assert_eq!(access_claims.role, Role::User);
        assert_eq!(refresh_claims.sub, account.id.to_string());
        assert!(refresh_claims.exp - access_claims.exp > 6 * 24 * 3600);
    }

    #[test]
    fn test_token_types_are_not_interchangeable() {
        let jwt_service = JwtService::new("test-secret");
        let account = Account::new("bob", "bob@example.com", None, 100, Utc::now());
        let (access_token, refresh_token) = jwt_service.issue_pair(&account).unwrap();

        assert!(jwt_service.verify_refresh_token(&access_token).is_err());
        assert!(jwt_service.verify_access_token(&refresh_token).is_err());
        assert!(JwtService::new("other-secret").verify_token(&access_token).is_err());
    }
}
