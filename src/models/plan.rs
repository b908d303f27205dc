use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::models::{Currency, Level};

/// A count-style plan limit. Stored and sent as `-1` when unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Limit {
    Limited(u64),
    Unlimited,
}

impl Limit {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, Limit::Unlimited)
    }

    /// True when `current` is still below the limit.
    pub fn admits(&self, current: u64) -> bool {
        match self {
            Limit::Unlimited => true,
            Limit::Limited(max) => current < *max,
        }
    }

    pub fn remaining(&self, current: u64) -> Remaining {
        match self {
            Limit::Unlimited => Remaining::Unlimited,
            Limit::Limited(max) => Remaining::Count(max.saturating_sub(current)),
        }
    }

    pub fn as_wire(&self) -> i64 {
        match self {
            Limit::Unlimited => -1,
            Limit::Limited(max) => *max as i64,
        }
    }
}

impl From<i64> for Limit {
    fn from(value: i64) -> Self {
        if value < 0 {
            Limit::Unlimited
        } else {
            Limit::Limited(value as u64)
        }
    }
}

impl Serialize for Limit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_wire())
    }
}

impl<'de> Deserialize<'de> for Limit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Ok(Limit::from(i64::deserialize(deserializer)?))
    }
}

/// What is left under a limit, `"unlimited"` on the wire when uncapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Remaining {
    Count(u64),
    Unlimited,
}

impl Serialize for Remaining {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Remaining::Count(n) => serializer.serialize_u64(*n),
            Remaining::Unlimited => serializer.serialize_str("unlimited"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanTier {
    Basic,
    Standard,
    Premium,
}

text_enum!(PlanTier, "plan tier", {
    Basic => "basic",
    Standard => "standard",
    Premium => "premium",
});

impl PlanTier {
    pub const fn rank(&self) -> i16 {
        match self {
            Self::Basic => 1,
            Self::Standard => 2,
            Self::Premium => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub prompts_limit: Limit,
    pub api_calls_limit: Limit,
    pub storage_limit_mb: Limit,
    pub max_image_size_mb: u64,
    pub max_images_per_prompt: u32,
    pub max_communities: Limit,
    pub can_create_private: bool,
    pub can_export: bool,
    pub max_prompt_length: u32,
    #[serde(default = "default_image_formats")]
    pub image_formats: Vec<String>,
}

pub fn default_image_formats() -> Vec<String> {
    ["jpg", "jpeg", "png", "gif", "webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl PlanLimits {
    /// Storage budget in bytes, `None` when the plan sets no positive budget.
    pub fn storage_limit_bytes(&self) -> Option<u64> {
        match self.storage_limit_mb {
            Limit::Limited(mb) if mb > 0 => Some(mb * 1024 * 1024),
            _ => None,
        }
    }

    pub fn max_image_size_bytes(&self) -> u64 {
        self.max_image_size_mb * 1024 * 1024
    }
}

/// Prices in minor units (cents / kobo).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PriceSet {
    pub monthly: i64,
    pub yearly: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Pricing {
    pub usd: PriceSet,
    pub ngn: PriceSet,
}

impl Pricing {
    pub fn for_currency(&self, currency: Currency) -> PriceSet {
        match currency {
            Currency::Usd => self.usd,
            Currency::Ngn => self.ngn,
        }
    }
}

pub fn format_price(amount: i64, currency: Currency) -> String {
    let symbol = match currency {
        Currency::Usd => "$",
        Currency::Ngn => "\u{20a6}",
    };
    format!("{}{}.{:02}", symbol, amount / 100, (amount % 100).abs())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanFeature {
    pub name: String,
    pub included: bool,
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    #[sqlx(try_from = "String")]
    pub name: PlanTier,
    pub display_name: String,
    pub description: String,
    pub tier: i16,
    pub pricing: Json<Pricing>,
    pub limits: Json<PlanLimits>,
    pub features: Json<Vec<PlanFeature>>,
    pub is_active: bool,
    pub is_free: bool,
    pub badge_color: String,
    #[sqlx(try_from = "String")]
    pub level_required: Level,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct PlanPricingView {
    pub currency: Currency,
    pub monthly: i64,
    pub yearly: i64,
    pub monthly_formatted: String,
    pub yearly_formatted: String,
}

#[derive(Debug, Serialize)]
pub struct PlanResponse {
    pub id: Uuid,
    pub name: PlanTier,
    pub display_name: String,
    pub description: String,
    pub tier: i16,
    pub is_free: bool,
    pub badge_color: String,
    pub level_required: Level,
    pub limits: PlanLimits,
    pub features: Vec<PlanFeature>,
    pub pricing: PlanPricingView,
}

impl PlanResponse {
    pub fn project(plan: &SubscriptionPlan, currency: Currency) -> Self {
        let prices = plan.pricing.for_currency(currency);
        Self {
            id: plan.id,
            name: plan.name,
            display_name: plan.display_name.clone(),
            description: plan.description.clone(),
            tier: plan.tier,
            is_free: plan.is_free,
            badge_color: plan.badge_color.clone(),
            level_required: plan.level_required,
            limits: plan.limits.0.clone(),
            features: plan.features.0.clone(),
            pricing: PlanPricingView {
                currency,
                monthly: prices.monthly,
                yearly: prices.yearly,
                monthly_formatted: format_price(prices.monthly, currency),
                yearly_formatted: format_price(prices.yearly, currency),
            },
        }
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct AssignPlanRequest {
    /// basic, standard or premium
    pub tier: String,
    pub status: Option<String>,
}
