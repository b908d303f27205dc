use std::time::Duration;

use tracing::warn;

use crate::services::{
    leaderboard::{Leaderboard, LeaderboardQuery},
    redis::RedisService,
};

const LEADERBOARD_PATTERN: &str = "leaderboard:*";

/// Read-through cache for leaderboards. Every failure is logged and treated
/// as a miss so callers fall back to the database.
#[derive(Clone)]
pub struct LeaderboardCache {
    redis: Option<RedisService>,
    ttl: Duration,
}

impl LeaderboardCache {
    pub fn new(redis: Option<RedisService>, ttl: Duration) -> Self {
        Self { redis, ttl }
    }

    pub fn disabled() -> Self {
        Self::new(None, Duration::ZERO)
    }

    fn backend(&self) -> Option<&RedisService> {
        self.redis.as_ref().filter(|_| !self.ttl.is_zero())
    }

    pub async fn get(&self, query: &LeaderboardQuery) -> Option<Leaderboard> {
        let redis = self.backend()?;
        match redis.get_json(&query.cache_key()).await {
            Ok(hit) => hit,
            Err(e) => {
                warn!(error = %e, "Leaderboard cache read failed");
                None
            }
        }
    }

    pub async fn put(&self, query: &LeaderboardQuery, board: &Leaderboard) {
        let Some(redis) = self.backend() else {
            return;
        };
        if let Err(e) = redis
            .set_json(&query.cache_key(), board, self.ttl.as_secs())
            .await
        {
            warn!(error = %e, "Leaderboard cache write failed");
        }
    }

    /// Drops cached boards after points move.
    pub async fn invalidate(&self) {
        let Some(redis) = self.backend() else {
            return;
        };
        if let Err(e) = redis.invalidate(LEADERBOARD_PATTERN).await {
            warn!(error = %e, "Leaderboard cache invalidation failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = LeaderboardCache::disabled();
        let query = LeaderboardQuery::default();
        assert!(cache.get(&query).await.is_none());
        cache.invalidate().await;
    }
}
