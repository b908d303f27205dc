use std::sync::Arc;
use std::time::Duration;

use sqlx::PgExecutor;
use tracing::debug;

use crate::{
    config::Config,
    database::{queries::PlanQueries, Database},
    errors::{AppError, Result},
    models::{Account, SubscriptionPlan},
    services::{entitlement::Denial, mailer, LeaderboardCache, Mailer, MetricsService, RedisService},
    storage::{self, ImageHost},
};

pub mod admin;
pub mod auth;
pub mod communities;
pub mod docs;
pub mod health;
pub mod metrics;
pub mod prompts;
pub mod rewards;
pub mod subscriptions;
pub mod trends;

#[derive(Clone)]
pub struct AppState {
    pub database: Database,
    pub redis: Option<RedisService>,
    pub config: Arc<Config>,
    pub metrics: Arc<MetricsService>,
    pub image_host: Arc<dyn ImageHost>,
    pub mailer: Arc<dyn Mailer>,
    pub leaderboard_cache: LeaderboardCache,
}

impl AppState {
    /// Wires the collaborators named in `config` around an open database.
    pub fn new(config: Config, database: Database, redis: Option<RedisService>) -> Result<Self> {
        let image_host: Arc<dyn ImageHost> = Arc::from(storage::create_image_host(&config)?);
        let mailer: Arc<dyn Mailer> = Arc::from(mailer::create_mailer(&config)?);
        let leaderboard_cache = LeaderboardCache::new(
            redis.clone(),
            Duration::from_secs(config.leaderboard_cache_seconds),
        );

        Ok(Self {
            database,
            redis,
            config: Arc::new(config),
            metrics: Arc::new(MetricsService::new()?),
            image_host,
            mailer,
            leaderboard_cache,
        })
    }

    /// Counts the denial and turns it into the matching error response.
    pub fn deny(&self, account_id: uuid::Uuid, denial: Denial) -> AppError {
        debug!(account_id = %account_id, kind = denial.kind.as_str(), reason = %denial.reason, "Entitlement denied");
        self.metrics.record_denial(denial.kind.as_str());
        AppError::from(denial)
    }
}

/// The account's current plan. A dangling or deactivated plan reference
/// counts as no plan.
pub async fn active_plan<'e, E: PgExecutor<'e>>(
    executor: E,
    account: &Account,
) -> Result<Option<SubscriptionPlan>> {
    let Some(plan_id) = account.plan_id else {
        return Ok(None);
    };
    let plan = PlanQueries::find_by_id(executor, plan_id).await?;
    Ok(plan.filter(|plan| plan.is_active))
}
