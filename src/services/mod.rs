pub mod cache;
pub mod catalog;
pub mod entitlement;
pub mod leaderboard;
pub mod mailer;
pub mod metrics;
pub mod redis;
pub mod rewards;
pub mod usage;

pub use cache::LeaderboardCache;
pub use mailer::{Mailer, send_best_effort};
pub use metrics::MetricsService;
pub use redis::RedisService;
