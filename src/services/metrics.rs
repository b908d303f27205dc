use std::time::Instant;

use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use crate::errors::{AppError, Result};

/// Prometheus collectors for the service, registered on a private registry.
#[derive(Clone)]
pub struct MetricsService {
    registry: Registry,
    rewards_given: IntCounterVec,
    reward_points_transferred: IntCounter,
    entitlement_denials: IntCounterVec,
    http_errors: IntCounterVec,
    request_duration: HistogramVec,
    cache_lookups: IntCounterVec,
}

impl MetricsService {
    pub fn new() -> Result<Self> {
        let registry = Registry::new_custom(Some("promptverse".to_string()), None)
            .map_err(metrics_error)?;

        let rewards_given = IntCounterVec::new(
            Opts::new("rewards_given_total", "Rewards given, by medal"),
            &["medal"],
        )
        .map_err(metrics_error)?;
        let reward_points_transferred = IntCounter::new(
            "reward_points_transferred_total",
            "Reward points moved from givers to authors",
        )
        .map_err(metrics_error)?;
        let entitlement_denials = IntCounterVec::new(
            Opts::new("entitlement_denials_total", "Plan checks that denied an action"),
            &["kind"],
        )
        .map_err(metrics_error)?;
        let http_errors = IntCounterVec::new(
            Opts::new("http_errors_total", "Error responses, by class"),
            &["class"],
        )
        .map_err(metrics_error)?;
        let request_duration = HistogramVec::new(
            HistogramOpts::new("request_duration_seconds", "Request latency"),
            &["method", "route"],
        )
        .map_err(metrics_error)?;
        let cache_lookups = IntCounterVec::new(
            Opts::new("cache_lookups_total", "Leaderboard cache lookups"),
            &["result"],
        )
        .map_err(metrics_error)?;

        registry.register(Box::new(rewards_given.clone())).map_err(metrics_error)?;
        registry
            .register(Box::new(reward_points_transferred.clone()))
            .map_err(metrics_error)?;
        registry
            .register(Box::new(entitlement_denials.clone()))
            .map_err(metrics_error)?;
        registry.register(Box::new(http_errors.clone())).map_err(metrics_error)?;
        registry
            .register(Box::new(request_duration.clone()))
            .map_err(metrics_error)?;
        registry.register(Box::new(cache_lookups.clone())).map_err(metrics_error)?;

        Ok(Self {
            registry,
            rewards_given,
            reward_points_transferred,
            entitlement_denials,
            http_errors,
            request_duration,
            cache_lookups,
        })
    }

    pub fn record_reward(&self, medal: &str, amount: i64) {
        self.rewards_given.with_label_values(&[medal]).inc();
        self.reward_points_transferred.inc_by(amount.max(0) as u64);
    }

    pub fn record_denial(&self, kind: &str) {
        self.entitlement_denials.with_label_values(&[kind]).inc();
    }

    pub fn record_error(&self, class: &str) {
        self.http_errors.with_label_values(&[class]).inc();
    }

    pub fn record_cache_hit(&self) {
        self.cache_lookups.with_label_values(&["hit"]).inc();
    }

    pub fn record_cache_miss(&self) {
        self.cache_lookups.with_label_values(&["miss"]).inc();
    }

    pub fn start_timer(&self, method: &str, route: &str) -> RequestTimer {
        RequestTimer {
            start: Instant::now(),
            histogram: self.request_duration.clone(),
            labels: [method.to_string(), route.to_string()],
        }
    }

    /// Text exposition format.
    pub fn render(&self) -> Result<String> {
        let mut buffer = Vec::new();
        TextEncoder::new()
            .encode(&self.registry.gather(), &mut buffer)
            .map_err(metrics_error)?;
        String::from_utf8(buffer).map_err(|e| AppError::Internal(e.into()))
    }
}

fn metrics_error(err: prometheus::Error) -> AppError {
    AppError::Internal(err.into())
}

/// Records the elapsed time into the latency histogram when dropped.
pub struct RequestTimer {
    start: Instant,
    histogram: HistogramVec,
    labels: [String; 2],
}

impl Drop for RequestTimer {
    fn drop(&mut self) {
        self.histogram
            .with_label_values(&[self.labels[0].as_str(), self.labels[1].as_str()])
            .observe(self.start.elapsed().as_secs_f64());
    }
}
