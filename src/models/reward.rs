use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MedalTier {
    Common,
    Rare,
    Epic,
    Legendary,
}

text_enum!(MedalTier, "medal tier", {
    Common => "common",
    Rare => "rare",
    Epic => "epic",
    Legendary => "legendary",
});

/// Catalog entry for one kind of medal.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RewardType {
    pub id: Uuid,
    pub name: String,
    pub display_name: String,
    #[sqlx(try_from = "String")]
    pub tier: MedalTier,
    pub value: i64,
    pub color: String,
    pub icon: String,
    pub description: String,
    pub is_active: bool,
    /// Per giver, per trend, per UTC day.
    pub daily_limit: Option<i32>,
    pub cooldown_minutes: i32,
    pub created_at: DateTime<Utc>,
}

impl RewardType {
    pub fn snapshot(&self) -> MedalSnapshot {
        MedalSnapshot {
            name: self.name.clone(),
            tier: self.tier,
            color: self.color.clone(),
            icon: self.icon.clone(),
        }
    }
}

/// Denormalized medal details stored with every reward.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedalSnapshot {
    pub name: String,
    pub tier: MedalTier,
    pub color: String,
    pub icon: String,
}

/// One point transfer, embedded in the trend it was given on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reward {
    pub id: Uuid,
    pub giver_id: Uuid,
    pub reward_type_id: Uuid,
    pub amount: i64,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub is_anonymous: bool,
    pub medal: MedalSnapshot,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MedalSummary {
    pub gold: u32,
    pub silver: u32,
    pub bronze: u32,
    pub platinum: u32,
    pub diamond: u32,
    pub other: u32,
}

impl MedalSummary {
    pub fn bump(&mut self, medal_name: &str) {
        match medal_name.to_lowercase().as_str() {
            "gold" => self.gold += 1,
            "silver" => self.silver += 1,
            "bronze" => self.bronze += 1,
            "platinum" => self.platinum += 1,
            "diamond" => self.diamond += 1,
            _ => self.other += 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopReward {
    pub giver_id: Uuid,
    pub amount: i64,
    /// Medal of this giver's single highest-value reward.
    pub medal: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeaturedMedal {
    pub reward_type_id: Uuid,
    pub count: u32,
    pub last_given: DateTime<Utc>,
}

/// Values derived from a trend's reward list, always recomputed from the full list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardAggregates {
    pub medal_summary: MedalSummary,
    pub total_reward_value: i64,
    pub reward_count: u32,
    pub top_rewards: Vec<TopReward>,
    pub featured_medals: Vec<FeaturedMedal>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct GiveRewardRequest {
    pub reward_type_id: Uuid,
    pub message: Option<String>,
    pub is_anonymous: Option<bool>,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardParams {
    /// `given` or `received`
    #[serde(rename = "type")]
    pub direction: Option<String>,
    pub medal: Option<String>,
    pub limit: Option<usize>,
}
