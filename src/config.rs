use anyhow::Result;
use serde::Deserialize;
use std::env;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub database_url: String,
    pub redis_url: Option<String>,
    pub port: u16,
    pub jwt_secret: String,
    pub max_file_size: usize,
    pub upload_dir: String,
    pub public_base_url: String,
    pub allowed_mime_types: Vec<String>,
    pub otp_ttl_minutes: i64,
    pub initial_reward_points: i64,
    pub mail_api_url: Option<String>,
    pub mail_api_key: Option<String>,
    pub mail_from: String,
    pub leaderboard_cache_seconds: u64,
    pub request_timeout_seconds: u64,
    pub max_concurrent_requests: usize,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();

        Ok(Config {
            database_url: env::var("DATABASE_URL")
                .unwrap_or_else(|_| "postgresql://localhost/promptverse".to_string()),
            redis_url: env::var("REDIS_URL").ok().filter(|url| !url.is_empty()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "3000".to_string())
                .parse()?,
            jwt_secret: env::var("JWT_SECRET")
                .unwrap_or_else(|_| "your-secret-key".to_string()),
            max_file_size: env::var("MAX_FILE_SIZE")
                .unwrap_or_else(|_| "20971520".to_string()) // 20MB, the largest plan image
                .parse()?,
            upload_dir: env::var("UPLOAD_DIR")
                .unwrap_or_else(|_| "./uploads".to_string()),
            public_base_url: env::var("PUBLIC_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:3000".to_string()),
            allowed_mime_types: env::var("ALLOWED_MIME_TYPES")
                .unwrap_or_else(|_| "image/jpeg,image/png,image/webp,image/gif".to_string())
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            otp_ttl_minutes: env::var("OTP_TTL_MINUTES")
                .unwrap_or_else(|_| "10".to_string())
                .parse()?,
            initial_reward_points: env::var("INITIAL_REWARD_POINTS")
                .unwrap_or_else(|_| "100".to_string())
                .parse()?,
            mail_api_url: env::var("MAIL_API_URL").ok().filter(|url| !url.is_empty()),
            mail_api_key: env::var("MAIL_API_KEY").ok().filter(|key| !key.is_empty()),
            mail_from: env::var("MAIL_FROM")
                .unwrap_or_else(|_| "PromptVerse <noreply@promptverse.dev>".to_string()),
            leaderboard_cache_seconds: env::var("LEADERBOARD_CACHE_SECONDS")
                .unwrap_or_else(|_| "60".to_string())
                .parse()?,
            request_timeout_seconds: env::var("REQUEST_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            max_concurrent_requests: env::var("MAX_CONCURRENT_REQUESTS")
                .unwrap_or_else(|_| "512".to_string())
                .parse()?,
        })
    }

    /// Settings for tests and local tooling; never reads the environment.
    pub fn for_tests() -> Self {
        Config {
            database_url: "postgresql://localhost/promptverse_test".to_string(),
            redis_url: None,
            port: 0,
            jwt_secret: "test-secret".to_string(),
            max_file_size: 20 * 1024 * 1024,
            upload_dir: std::env::temp_dir()
                .join("promptverse-uploads")
                .to_string_lossy()
                .into_owned(),
            public_base_url: "http://localhost:3000".to_string(),
            allowed_mime_types: vec![
                "image/jpeg".to_string(),
                "image/png".to_string(),
                "image/webp".to_string(),
                "image/gif".to_string(),
            ],
            otp_ttl_minutes: 10,
            initial_reward_points: 100,
            mail_api_url: None,
            mail_api_key: None,
            mail_from: "PromptVerse <noreply@promptverse.dev>".to_string(),
            leaderboard_cache_seconds: 60,
            request_timeout_seconds: 30,
            max_concurrent_requests: 64,
        }
    }
}
