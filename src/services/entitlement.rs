//! Plan entitlement checks.
//!
//! Every check compares a requested action against the account's active plan
//! and its usage ledger and returns a [`Decision`]. Only
//! [`can_create_content`] touches state: it applies the lazy monthly reset
//! to the ledger it is given.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{Level, PlanLimits, Remaining, SubscriptionPlan, UsageLedger};
use crate::services::usage::next_month_start;

const MB: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DenialKind {
    NoActivePlan,
    MonthlyLimit,
    StorageLimit,
    ImageTooLarge,
    TooManyImages,
    InsufficientLevel,
    PrivateNotAllowed,
    PromptTooLong,
    CommunityLimit,
}

impl DenialKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoActivePlan => "no_active_plan",
            Self::MonthlyLimit => "monthly_limit",
            Self::StorageLimit => "storage_limit",
            Self::ImageTooLarge => "image_too_large",
            Self::TooManyImages => "too_many_images",
            Self::InsufficientLevel => "insufficient_level",
            Self::PrivateNotAllowed => "private_not_allowed",
            Self::PromptTooLong => "prompt_too_long",
            Self::CommunityLimit => "community_limit",
        }
    }

    /// Denials that an upgrade or the passage of time resolves.
    pub fn is_quota(&self) -> bool {
        matches!(
            self,
            Self::MonthlyLimit | Self::StorageLimit | Self::TooManyImages | Self::CommunityLimit
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Denial {
    pub kind: DenialKind,
    pub reason: String,
    pub retry_after: Option<DateTime<Utc>>,
}

impl Denial {
    fn new(kind: DenialKind, reason: impl Into<String>) -> Self {
        Self {
            kind,
            reason: reason.into(),
            retry_after: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Allowance {
    pub remaining: Remaining,
    pub current_usage: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    Allowed(Allowance),
    Denied(Denial),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allowed(_))
    }

    pub fn into_result(self) -> Result<Allowance, Denial> {
        match self {
            Decision::Allowed(allowance) => Ok(allowance),
            Decision::Denied(denial) => Err(denial),
        }
    }
}

fn no_plan() -> Decision {
    Decision::Denied(Denial::new(DenialKind::NoActivePlan, "No active subscription plan"))
}

/// The plan-gated checks that take a plan directly need one to exist.
pub fn require_plan(plan: Option<&SubscriptionPlan>) -> Result<&SubscriptionPlan, Denial> {
    plan.ok_or_else(|| Denial::new(DenialKind::NoActivePlan, "No active subscription plan"))
}

/// May the account create one more piece of content this month?
pub fn can_create_content(
    ledger: &mut UsageLedger,
    plan: Option<&SubscriptionPlan>,
    now: DateTime<Utc>,
) -> Decision {
    let Some(plan) = plan else {
        return no_plan();
    };

    ledger.reset_if_new_month(now);

    let limit = plan.limits.prompts_limit;
    let current = ledger.prompts_this_month;

    if !limit.admits(current) {
        return Decision::Denied(Denial {
            kind: DenialKind::MonthlyLimit,
            reason: format!(
                "Monthly limit reached: {} prompts per month on the {} plan",
                limit.as_wire(),
                plan.display_name
            ),
            retry_after: Some(next_month_start(now)),
        });
    }

    Decision::Allowed(Allowance {
        remaining: limit.remaining(current),
        current_usage: current,
    })
}

/// Does an image of `bytes` fit in what is left of the storage budget?
pub fn can_upload_image(
    ledger: &UsageLedger,
    plan: Option<&SubscriptionPlan>,
    bytes: u64,
) -> Decision {
    let Some(plan) = plan else {
        return no_plan();
    };

    let used = ledger.storage_used;
    let Some(limit_bytes) = plan.limits.storage_limit_bytes() else {
        return Decision::Allowed(Allowance {
            remaining: Remaining::Unlimited,
            current_usage: used,
        });
    };

    if used.saturating_add(bytes) > limit_bytes {
        let remaining_mb = limit_bytes.saturating_sub(used).div_ceil(MB);
        return Decision::Denied(Denial::new(
            DenialKind::StorageLimit,
            format!("Storage limit exceeded. {}MB remaining", remaining_mb),
        ));
    }

    Decision::Allowed(Allowance {
        remaining: Remaining::Count(limit_bytes - used),
        current_usage: used,
    })
}

pub fn can_create_private_content(plan: &SubscriptionPlan) -> bool {
    plan.limits.can_create_private
}

pub fn level_meets(account_level: Level, required: Level) -> bool {
    account_level >= required
}

pub fn check_level(account_level: Level, required: Level) -> Result<(), Denial> {
    if level_meets(account_level, required) {
        Ok(())
    } else {
        Err(Denial::new(
            DenialKind::InsufficientLevel,
            format!(
                "Your level ({}) is insufficient. Required: {}",
                account_level, required
            ),
        ))
    }
}

pub fn check_private_content(plan: &SubscriptionPlan) -> Result<(), Denial> {
    if can_create_private_content(plan) {
        Ok(())
    } else {
        Err(Denial::new(
            DenialKind::PrivateNotAllowed,
            "Your plan does not allow creating private prompts",
        ))
    }
}

pub fn check_prompt_length(limits: &PlanLimits, length: usize) -> Result<(), Denial> {
    if length > limits.max_prompt_length as usize {
        return Err(Denial::new(
            DenialKind::PromptTooLong,
            format!(
                "Prompt text is {} characters; your plan allows {}",
                length, limits.max_prompt_length
            ),
        ));
    }
    Ok(())
}

pub fn check_image_size(limits: &PlanLimits, bytes: u64) -> Result<(), Denial> {
    if bytes > limits.max_image_size_bytes() {
        return Err(Denial::new(
            DenialKind::ImageTooLarge,
            format!(
                "Image exceeds the {}MB per-image limit of your plan",
                limits.max_image_size_mb
            ),
        ));
    }
    Ok(())
}

pub fn check_image_count(limits: &PlanLimits, current: usize) -> Result<(), Denial> {
    if current >= limits.max_images_per_prompt as usize {
        return Err(Denial::new(
            DenialKind::TooManyImages,
            format!(
                "Your plan allows {} images per prompt",
                limits.max_images_per_prompt
            ),
        ));
    }
    Ok(())
}

pub fn can_join_community(plan: Option<&SubscriptionPlan>, joined: usize) -> Decision {
    let limit = match plan {
        Some(plan) => plan.limits.max_communities,
        None => return no_plan(),
    };

    let current = joined as u64;
    if !limit.admits(current) {
        return Decision::Denied(Denial::new(
            DenialKind::CommunityLimit,
            format!(
                "Community limit reached: your plan allows {} communities",
                limit.as_wire()
            ),
        ));
    }

    Decision::Allowed(Allowance {
        remaining: limit.remaining(current),
        current_usage: current,
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::{default_image_formats, Limit, PlanFeature, PlanTier, Pricing};
    use chrono::TimeZone;
    use sqlx::types::Json;
    use uuid::Uuid;

    pub(crate) fn plan_with(tier: PlanTier, prompts: Limit, storage_mb: Limit) -> SubscriptionPlan {
        SubscriptionPlan {
            id: Uuid::new_v4(),
            name: tier,
            display_name: format!("{} plan", tier),
            description: String::new(),
            tier: tier.rank(),
            pricing: Json(Pricing::default()),
            limits: Json(PlanLimits {
                prompts_limit: prompts,
                api_calls_limit: Limit::Limited(100),
                storage_limit_mb: storage_mb,
                max_image_size_mb: 5,
                max_images_per_prompt: 2,
                max_communities: Limit::Limited(2),
                can_create_private: tier != PlanTier::Basic,
                can_export: false,
                max_prompt_length: 1000,
                image_formats: default_image_formats(),
            }),
            features: Json(Vec::<PlanFeature>::new()),
            is_active: true,
            is_free: true,
            badge_color: "#6B7280".to_string(),
            level_required: Level::Newbie,
            created_at: Utc::now(),
        }
    }

    fn mid_month() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, 9, 30, 0).unwrap()
    }

    #[test]
    fn test_no_plan_denies() {
        let mut ledger = UsageLedger::new(mid_month());
        match can_create_content(&mut ledger, None, mid_month()) {
            Decision::Denied(denial) => {
                assert_eq!(denial.kind, DenialKind::NoActivePlan);
                assert_eq!(denial.reason, "No active subscription plan");
            }
            other => panic!("expected denial, got {:?}", other),
        }
        assert!(!can_upload_image(&ledger, None, 1).is_allowed());
        assert_eq!(require_plan(None).unwrap_err().kind, DenialKind::NoActivePlan);

        let plan = plan_with(PlanTier::Basic, Limit::Limited(3), Limit::Limited(100));
        assert_eq!(require_plan(Some(&plan)).unwrap().id, plan.id);
    }

    #[test]
    fn test_quota_never_exceeded() {
        let plan = plan_with(PlanTier::Basic, Limit::Limited(3), Limit::Limited(100));
        let now = mid_month();
        let mut ledger = UsageLedger::new(now);

        for expected in 0..3 {
            let decision = can_create_content(&mut ledger, Some(&plan), now);
            assert!(decision.is_allowed());
            assert_eq!(ledger.prompts_this_month, expected);
            ledger.record_content_created();
            assert_eq!(ledger.prompts_this_month, expected + 1);
        }

        assert!(!can_create_content(&mut ledger, Some(&plan), now).is_allowed());
        ledger.prompts_this_month = 10;
        assert!(!can_create_content(&mut ledger, Some(&plan), now).is_allowed());
    }

    #[test]
    fn test_check_applies_monthly_reset() {
        let plan = plan_with(PlanTier::Basic, Limit::Limited(20), Limit::Limited(100));
        let mut ledger = UsageLedger::new(Utc.with_ymd_and_hms(2024, 4, 30, 23, 0, 0).unwrap());
        ledger.prompts_this_month = 20;

        let decision = can_create_content(&mut ledger, Some(&plan), mid_month());
        assert_eq!(
            decision,
            Decision::Allowed(Allowance {
                remaining: Remaining::Count(20),
                current_usage: 0,
            })
        );
    }

    #[test]
    fn test_monthly_limit_then_upgrade_to_unlimited() {
        let now = mid_month();
        let basic = plan_with(PlanTier::Basic, Limit::Limited(20), Limit::Limited(100));
        let premium = plan_with(PlanTier::Premium, Limit::Unlimited, Limit::Limited(5120));
        let mut ledger = UsageLedger::new(now);
        ledger.prompts_this_month = 20;

        let denial = can_create_content(&mut ledger, Some(&basic), now)
            .into_result()
            .unwrap_err();
        assert!(denial.reason.to_lowercase().contains("monthly limit"));
        assert_eq!(
            denial.retry_after,
            Some(Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap())
        );

        let allowance = can_create_content(&mut ledger, Some(&premium), now)
            .into_result()
            .unwrap();
        assert_eq!(allowance.remaining, Remaining::Unlimited);
        assert_eq!(
            serde_json::to_value(&allowance).unwrap()["remaining"],
            "unlimited"
        );
    }

    #[test]
    fn test_storage_limit_reports_remaining_mb_rounded_up() {
        let plan = plan_with(PlanTier::Basic, Limit::Limited(20), Limit::Limited(10));
        let mut ledger = UsageLedger::new(mid_month());
        ledger.storage_used = 8 * MB + 1;

        let denial = can_upload_image(&ledger, Some(&plan), 3 * MB)
            .into_result()
            .unwrap_err();
        assert_eq!(denial.kind, DenialKind::StorageLimit);
        assert_eq!(denial.reason, "Storage limit exceeded. 2MB remaining");

        let allowance = can_upload_image(&ledger, Some(&plan), MB)
            .into_result()
            .unwrap();
        assert_eq!(allowance.remaining, Remaining::Count(2 * MB - 1));
    }

    #[test]
    fn test_exact_fit_is_allowed_and_zero_budget_is_uncapped() {
        let plan = plan_with(PlanTier::Basic, Limit::Limited(20), Limit::Limited(1));
        let mut ledger = UsageLedger::new(mid_month());
        ledger.storage_used = MB / 2;
        assert!(can_upload_image(&ledger, Some(&plan), MB / 2).is_allowed());
        assert!(!can_upload_image(&ledger, Some(&plan), MB / 2 + 1).is_allowed());

        let uncapped = plan_with(PlanTier::Basic, Limit::Limited(20), Limit::Limited(0));
        ledger.storage_used = 50 * MB;
        assert!(can_upload_image(&ledger, Some(&uncapped), 500 * MB).is_allowed());
    }

    #[test]
    fn test_level_gating() {
        assert!(!level_meets(Level::Contributor, Level::Pro));
        assert!(level_meets(Level::Pro, Level::Contributor));
        assert!(level_meets(Level::Expert, Level::Expert));
        assert_eq!(
            check_level(Level::Newbie, Level::Pro).unwrap_err().kind,
            DenialKind::InsufficientLevel
        );
    }

    #[test]
    fn test_private_content_follows_plan_flag() {
        let basic = plan_with(PlanTier::Basic, Limit::Limited(20), Limit::Limited(100));
        let standard = plan_with(PlanTier::Standard, Limit::Limited(100), Limit::Limited(1024));
        assert!(!can_create_private_content(&basic));
        assert!(can_create_private_content(&standard));
        assert!(check_private_content(&basic).is_err());
    }

    #[test]
    fn test_per_prompt_image_rules() {
        let plan = plan_with(PlanTier::Basic, Limit::Limited(20), Limit::Limited(100));
        assert!(check_image_size(&plan.limits, 5 * MB).is_ok());
        assert!(check_image_size(&plan.limits, 5 * MB + 1).is_err());
        assert!(check_image_count(&plan.limits, 1).is_ok());
        assert_eq!(
            check_image_count(&plan.limits, 2).unwrap_err().kind,
            DenialKind::TooManyImages
        );
        assert!(check_prompt_length(&plan.limits, 1001).is_err());
    }

    #[test]
    fn test_community_limit() {
        let plan = plan_with(PlanTier::Basic, Limit::Limited(20), Limit::Limited(100));
        assert!(can_join_community(Some(&plan), 1).is_allowed());
        assert!(!can_join_community(Some(&plan), 2).is_allowed());

        let mut premium = plan_with(PlanTier::Premium, Limit::Unlimited, Limit::Limited(5120));
        premium.limits.max_communities = Limit::Unlimited;
        assert!(can_join_community(Some(&premium), 500).is_allowed());
    }
}
