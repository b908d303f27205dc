use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::Serialize;

use crate::models::{PlanLimits, UsageLedger};

/// Storage budget assumed for accounts without a plan.
pub const DEFAULT_STORAGE_LIMIT_BYTES: u64 = 100 * 1024 * 1024;

const MB: f64 = 1024.0 * 1024.0;

impl UsageLedger {
    /// Zeroes the monthly counters when `now` falls in a different calendar
    /// month than the last reset. Returns true when a reset happened.
    pub fn reset_if_new_month(&mut self, now: DateTime<Utc>) -> bool {
        if self.last_reset.year() == now.year() && self.last_reset.month() == now.month() {
            return false;
        }

        self.prompts_this_month = 0;
        self.images_uploaded = 0;
        self.api_calls = 0;
        self.last_reset = now;
        true
    }

    /// Forces a new billing period, e.g. when a plan is activated.
    pub fn reset_period(&mut self, now: DateTime<Utc>) {
        self.prompts_this_month = 0;
        self.images_uploaded = 0;
        self.api_calls = 0;
        self.last_reset = now;
    }

    pub fn record_content_created(&mut self) {
        self.prompts_created += 1;
        self.prompts_this_month += 1;
    }

    pub fn record_image_uploaded(&mut self, bytes: u64) {
        self.storage_used = self.storage_used.saturating_add(bytes);
        self.images_uploaded += 1;
    }

    /// Never takes storage below zero.
    pub fn release_image_storage(&mut self, bytes: u64) {
        self.storage_used = self.storage_used.saturating_sub(bytes);
    }

    pub fn storage_summary(&self, limits: Option<&PlanLimits>) -> StorageSummary {
        let limit = match limits {
            Some(limits) => limits.storage_limit_bytes(),
            None => Some(DEFAULT_STORAGE_LIMIT_BYTES),
        };

        match limit {
            Some(limit) => {
                let remaining = limit.saturating_sub(self.storage_used);
                StorageSummary {
                    used: self.storage_used,
                    limit: Some(limit),
                    used_percentage: round1(self.storage_used as f64 / limit as f64 * 100.0),
                    remaining: Some(remaining),
                    formatted: FormattedStorage {
                        used: format!("{:.2}MB", self.storage_used as f64 / MB),
                        limit: format!("{:.0}MB", limit as f64 / MB),
                        remaining: format!("{:.2}MB", remaining as f64 / MB),
                    },
                }
            }
            None => StorageSummary {
                used: self.storage_used,
                limit: None,
                used_percentage: 0.0,
                remaining: None,
                formatted: FormattedStorage {
                    used: format!("{:.2}MB", self.storage_used as f64 / MB),
                    limit: "unlimited".to_string(),
                    remaining: "unlimited".to_string(),
                },
            },
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct StorageSummary {
    pub used: u64,
    pub limit: Option<u64>,
    pub used_percentage: f64,
    pub remaining: Option<u64>,
    pub formatted: FormattedStorage,
}

#[derive(Debug, Clone, Serialize)]
pub struct FormattedStorage {
    pub used: String,
    pub limit: String,
    pub remaining: String,
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// Midnight UTC on the first day of the month after `now`.
pub fn next_month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    let (year, month) = if now.month() == 12 {
        (now.year() + 1, 1)
    } else {
        (now.year(), now.month() + 1)
    };

    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
        .unwrap_or(now)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_reset_happens_once_per_month() {
        let mut ledger = UsageLedger::new(at(2024, 1, 31));
        ledger.prompts_this_month = 7;
        ledger.images_uploaded = 3;
        ledger.api_calls = 40;
        ledger.prompts_created = 9;
        ledger.storage_used = 1024;

        let now = at(2024, 2, 1);
        assert!(ledger.reset_if_new_month(now));
        let after_first = ledger.clone();
        assert!(!ledger.reset_if_new_month(now + chrono::Duration::hours(3)));
        assert_eq!(ledger, after_first);

        assert_eq!(ledger.prompts_this_month, 0);
        assert_eq!(ledger.images_uploaded, 0);
        assert_eq!(ledger.api_calls, 0);
        assert_eq!(ledger.prompts_created, 9);
        assert_eq!(ledger.storage_used, 1024);
        assert_eq!(ledger.last_reset, now);
    }

    #[test]
    fn test_same_month_next_year_still_resets() {
        let mut ledger = UsageLedger::new(at(2023, 3, 10));
        ledger.prompts_this_month = 5;
        assert!(ledger.reset_if_new_month(at(2024, 3, 10)));
        assert_eq!(ledger.prompts_this_month, 0);
    }

    #[test]
    fn test_storage_is_floored_at_zero() {
        let mut ledger = UsageLedger::new(Utc::now());
        ledger.record_image_uploaded(500);
        ledger.release_image_storage(300);
        ledger.release_image_storage(300);
        ledger.release_image_storage(10_000);
        assert_eq!(ledger.storage_used, 0);
        assert_eq!(ledger.images_uploaded, 1);
    }

    #[test]
    fn test_content_created_bumps_both_counters() {
        let mut ledger = UsageLedger::new(Utc::now());
        ledger.record_content_created();
        ledger.record_content_created();
        assert_eq!(ledger.prompts_created, 2);
        assert_eq!(ledger.prompts_this_month, 2);
    }

    #[test]
    fn test_next_month_start_rolls_year() {
        assert_eq!(
            next_month_start(at(2024, 12, 15)),
            Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap()
        );
        assert_eq!(
            next_month_start(at(2024, 2, 29)),
            Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn test_storage_summary_without_plan_uses_default_budget() {
        let mut ledger = UsageLedger::new(Utc::now());
        ledger.record_image_uploaded(50 * 1024 * 1024);
        let summary = ledger.storage_summary(None);
        assert_eq!(summary.limit, Some(DEFAULT_STORAGE_LIMIT_BYTES));
        assert_eq!(summary.used_percentage, 50.0);
        assert_eq!(summary.formatted.limit, "100MB");
    }
}
