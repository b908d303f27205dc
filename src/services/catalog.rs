use chrono::{DateTime, Utc};
use sqlx::types::Json;
use tracing::info;
use uuid::Uuid;

use crate::database::{queries::*, Database};
use crate::errors::Result;
use crate::models::*;

fn features(export: bool) -> Vec<PlanFeature> {
    [
        ("Create Public Prompts", true),
        ("Join Communities", true),
        ("Image Uploads", true),
        ("Private Prompts", true),
        ("Export Features", export),
    ]
    .into_iter()
    .map(|(name, included)| PlanFeature {
        name: name.to_string(),
        included,
    })
    .collect()
}

/// The three subscription tiers.
pub fn plan_catalog(now: DateTime<Utc>) -> Vec<SubscriptionPlan> {
    let plan = |name: PlanTier,
                display_name: &str,
                description: &str,
                is_free: bool,
                pricing: Pricing,
                level_required: Level,
                badge_color: &str,
                limits: PlanLimits| SubscriptionPlan {
        id: Uuid::new_v4(),
        name,
        display_name: display_name.to_string(),
        description: description.to_string(),
        tier: name.rank(),
        pricing: Json(pricing),
        features: Json(features(limits.can_export)),
        limits: Json(limits),
        is_active: true,
        is_free,
        badge_color: badge_color.to_string(),
        level_required,
        created_at: now,
    };

    vec![
        plan(
            PlanTier::Basic,
            "Starter Plan",
            "Perfect for beginners starting with AI prompts",
            true,
            Pricing::default(),
            Level::Newbie,
            "#6B7280",
            PlanLimits {
                prompts_limit: Limit::Limited(20),
                api_calls_limit: Limit::Limited(100),
                storage_limit_mb: Limit::Limited(100),
                max_image_size_mb: 5,
                max_images_per_prompt: 5,
                max_communities: Limit::Limited(2),
                can_create_private: true,
                can_export: false,
                max_prompt_length: 1000,
                image_formats: default_image_formats(),
            },
        ),
        plan(
            PlanTier::Standard,
            "Creator Plan",
            "For content creators and regular users",
            false,
            Pricing {
                usd: PriceSet { monthly: 999, yearly: 9999 },
                ngn: PriceSet { monthly: 14985, yearly: 149850 },
            },
            Level::Contributor,
            "#3B82F6",
            PlanLimits {
                prompts_limit: Limit::Limited(100),
                api_calls_limit: Limit::Limited(1000),
                storage_limit_mb: Limit::Limited(1024),
                max_image_size_mb: 10,
                max_images_per_prompt: 10,
                max_communities: Limit::Limited(5),
                can_create_private: true,
                can_export: true,
                max_prompt_length: 5000,
                image_formats: default_image_formats(),
            },
        ),
        plan(
            PlanTier::Premium,
            "Pro Plan",
            "For professionals and power users",
            false,
            Pricing {
                usd: PriceSet { monthly: 1999, yearly: 19999 },
                ngn: PriceSet { monthly: 29985, yearly: 299850 },
            },
            Level::Pro,
            "#F59E0B",
            PlanLimits {
                prompts_limit: Limit::Unlimited,
                api_calls_limit: Limit::Limited(10000),
                storage_limit_mb: Limit::Limited(5120),
                max_image_size_mb: 20,
                max_images_per_prompt: 20,
                max_communities: Limit::Unlimited,
                can_create_private: true,
                can_export: true,
                max_prompt_length: 10000,
                image_formats: default_image_formats(),
            },
        ),
    ]
}

/// The medal catalog: (name, display name, tier, value, color, icon, description, daily limit, cooldown).
const MEDALS: &[(&str, &str, MedalTier, i64, &str, &str, &str, i32, i32)] = &[
    ("gold", "Gold Medal", MedalTier::Legendary, 100, "#FFD700", "\u{1F947}", "Exceptional content that stands out", 3, 60),
    ("platinum", "Platinum Medal", MedalTier::Legendary, 200, "#E5E4E2", "\u{1F48E}", "Once-in-a-lifetime amazing content", 1, 1440),
    ("silver", "Silver Medal", MedalTier::Epic, 50, "#C0C0C0", "\u{1F948}", "High quality and valuable content", 10, 30),
    ("diamond", "Diamond Award", MedalTier::Epic, 75, "#B9F2FF", "\u{1F537}", "Brilliant and insightful content", 5, 120),
    ("bronze", "Bronze Medal", MedalTier::Rare, 25, "#CD7F32", "\u{1F949}", "Good effort and solid content", 20, 15),
    ("copper", "Copper Star", MedalTier::Rare, 15, "#B87333", "\u{1F536}", "Appreciated contribution", 30, 10),
    ("applause", "Round of Applause", MedalTier::Common, 5, "#10B981", "\u{1F44F}", "Well done!", 50, 5),
    ("thanks", "Thank You", MedalTier::Common, 2, "#3B82F6", "\u{1F64F}", "Simple appreciation", 100, 2),
    ("creative", "Creative Spark", MedalTier::Common, 8, "#8B5CF6", "\u{2728}", "Creative and original thinking", 25, 10),
    ("helpful", "Helpful Hand", MedalTier::Common, 6, "#06B6D4", "\u{1F91D}", "Very helpful and informative", 40, 8),
];

pub fn reward_type_catalog(now: DateTime<Utc>) -> Vec<RewardType> {
    MEDALS
        .iter()
        .map(
            |&(name, display_name, tier, value, color, icon, description, daily_limit, cooldown)| {
                RewardType {
                    id: Uuid::new_v4(),
                    name: name.to_string(),
                    display_name: display_name.to_string(),
                    tier,
                    value,
                    color: color.to_string(),
                    icon: icon.to_string(),
                    description: description.to_string(),
                    is_active: true,
                    daily_limit: Some(daily_limit),
                    cooldown_minutes: cooldown,
                    created_at: now,
                }
            },
        )
        .collect()
}

/// Upserts both catalogs by name. Safe to run on every start.
pub async fn seed(database: &Database) -> Result<()> {
    let now = Utc::now();
    let mut tx = database.begin().await?;

    let plans = plan_catalog(now);
    for plan in &plans {
        PlanQueries::upsert(&mut *tx, plan).await?;
    }

    let medals = reward_type_catalog(now);
    for medal in &medals {
        RewardTypeQueries::upsert(&mut *tx, medal).await?;
    }

    tx.commit().await?;
    info!(plans = plans.len(), reward_types = medals.len(), "Catalogs seeded");
    Ok(())
}
