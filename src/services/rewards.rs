//! Medal-giving ledger on trends.
//!
//! [`give_reward`] validates a transfer and applies it to the in-memory trend,
//! giver and author. Callers load all three under row locks and persist them
//! in one transaction, so either every change lands or none does.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Duration, NaiveTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    Account, FeaturedMedal, MedalSummary, Reward, RewardAggregates, RewardDirection,
    RewardHistoryEntry, RewardType, TopReward, Trend,
};

pub const MAX_REWARD_MESSAGE: usize = 200;
pub const TOP_REWARDS: usize = 5;
pub const FEATURED_MEDALS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RewardError {
    #[error("Invalid reward type")]
    InvalidRewardType,

    #[error("Trend not found")]
    ContentNotFound,

    #[error("Cannot reward your own trend")]
    SelfRewardForbidden,

    #[error("Daily limit reached for {medal} ({limit} per day)")]
    DailyLimitReached { medal: String, limit: u32 },

    #[error("Please wait {remaining_minutes} minutes before giving another {medal}")]
    CooldownActive {
        medal: String,
        remaining_minutes: i64,
        available_at: DateTime<Utc>,
    },

    #[error("Insufficient points. Need {needed} but have {available}")]
    InsufficientPoints { needed: i64, available: i64 },
}

impl RewardError {
    pub fn retry_after(&self) -> Option<DateTime<Utc>> {
        match self {
            RewardError::CooldownActive { available_at, .. } => Some(*available_at),
            _ => None,
        }
    }
}

/// Start of the UTC day containing `now`.
pub fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive().and_time(NaiveTime::MIN).and_utc()
}

/// Runs the giving rules in order and stops at the first failure.
pub fn validate_reward(
    trend: &Trend,
    giver: &Account,
    reward_type: &RewardType,
    now: DateTime<Utc>,
) -> Result<(), RewardError> {
    if !reward_type.is_active {
        return Err(RewardError::InvalidRewardType);
    }

    if giver.id == trend.author_id {
        return Err(RewardError::SelfRewardForbidden);
    }

    let since = day_start(now);
    let today: Vec<&Reward> = trend
        .rewards
        .iter()
        .filter(|r| {
            r.giver_id == giver.id && r.reward_type_id == reward_type.id && r.created_at >= since
        })
        .collect();

    if let Some(limit) = reward_type.daily_limit.filter(|l| *l > 0) {
        if today.len() >= limit as usize {
            return Err(RewardError::DailyLimitReached {
                medal: reward_type.display_name.clone(),
                limit: limit as u32,
            });
        }
    }

    if reward_type.cooldown_minutes > 0 {
        if let Some(last) = today.iter().map(|r| r.created_at).max() {
            let available_at = last + Duration::minutes(reward_type.cooldown_minutes as i64);
            if now < available_at {
                let wait = available_at - now;
                let remaining_minutes = (wait.num_seconds() + 59) / 60;
                return Err(RewardError::CooldownActive {
                    medal: reward_type.display_name.clone(),
                    remaining_minutes: remaining_minutes.max(1),
                    available_at,
                });
            }
        }
    }

    if giver.reward_points < reward_type.value {
        return Err(RewardError::InsufficientPoints {
            needed: reward_type.value,
            available: giver.reward_points,
        });
    }

    Ok(())
}

/// Validates and applies one reward. On error nothing is modified.
pub fn give_reward(
    trend: &mut Trend,
    giver: &mut Account,
    author: &mut Account,
    reward_type: &RewardType,
    message: Option<String>,
    is_anonymous: bool,
    now: DateTime<Utc>,
) -> Result<Reward, RewardError> {
    validate_reward(trend, giver, reward_type, now)?;

    let amount = reward_type.value;
    let reward = Reward {
        id: Uuid::new_v4(),
        giver_id: giver.id,
        reward_type_id: reward_type.id,
        amount,
        message: message.unwrap_or_default(),
        is_anonymous,
        medal: reward_type.snapshot(),
        created_at: now,
    };

    trend.rewards.push(reward.clone());
    trend.aggregates.0 = recompute_aggregates(&trend.rewards);
    trend.last_reward_at = Some(now);
    trend.updated_at = now;

    giver.reward_points -= amount;
    giver.total_rewards_given += amount;
    giver
        .reward_history
        .push(history_entry(trend.id, &reward, RewardDirection::Given));
    giver.updated_at = now;

    author.reward_points += amount;
    author.total_rewards_received += amount;
    author
        .reward_history
        .push(history_entry(trend.id, &reward, RewardDirection::Received));
    author.updated_at = now;

    Ok(reward)
}

fn history_entry(trend_id: Uuid, reward: &Reward, direction: RewardDirection) -> RewardHistoryEntry {
    RewardHistoryEntry {
        trend_id,
        amount: reward.amount,
        direction,
        reward_type_id: reward.reward_type_id,
        medal: reward.medal.name.clone(),
        date: reward.created_at,
    }
}

/// Folds the complete reward list into the trend's derived values.
pub fn recompute_aggregates(rewards: &[Reward]) -> RewardAggregates {
    let mut medal_summary = MedalSummary::default();
    let mut total_reward_value = 0;

    // Per giver: (cumulative amount, best single amount, medal of best)
    let mut givers: Vec<(Uuid, i64, i64, String)> = Vec::new();
    let mut giver_index: HashMap<Uuid, usize> = HashMap::new();

    let mut medals: Vec<FeaturedMedal> = Vec::new();
    let mut medal_index: HashMap<Uuid, usize> = HashMap::new();

    for reward in rewards {
        medal_summary.bump(&reward.medal.name);
        total_reward_value += reward.amount;

        match giver_index.get(&reward.giver_id).copied() {
            Some(i) => {
                let entry = &mut givers[i];
                entry.1 += reward.amount;
                if reward.amount > entry.2 {
                    entry.2 = reward.amount;
                    entry.3 = reward.medal.name.clone();
                }
            }
            None => {
                giver_index.insert(reward.giver_id, givers.len());
                givers.push((
                    reward.giver_id,
                    reward.amount,
                    reward.amount,
                    reward.medal.name.clone(),
                ));
            }
        }

        match medal_index.get(&reward.reward_type_id).copied() {
            Some(i) => {
                let entry = &mut medals[i];
                entry.count += 1;
                entry.last_given = entry.last_given.max(reward.created_at);
            }
            None => {
                medal_index.insert(reward.reward_type_id, medals.len());
                medals.push(FeaturedMedal {
                    reward_type_id: reward.reward_type_id,
                    count: 1,
                    last_given: reward.created_at,
                });
            }
        }
    }

    // Stable sorts: ties keep first-seen order.
    givers.sort_by(|a, b| b.1.cmp(&a.1));
    let top_rewards = givers
        .into_iter()
        .take(TOP_REWARDS)
        .map(|(giver_id, amount, _, medal)| TopReward {
            giver_id,
            amount,
            medal,
        })
        .collect();

    medals.sort_by(|a, b| b.count.cmp(&a.count));
    medals.truncate(FEATURED_MEDALS);

    RewardAggregates {
        medal_summary,
        total_reward_value,
        reward_count: rewards.len() as u32,
        top_rewards,
        featured_medals: medals,
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TypeBreakdown {
    pub reward_type_id: Uuid,
    pub count: u32,
    pub total_value: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct Contributor {
    /// `None` when the giver rewarded anonymously.
    pub giver_id: Option<Uuid>,
    pub is_anonymous: bool,
    pub amount: i64,
    pub medal: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RewardSummary {
    pub summary: MedalSummary,
    pub total_value: i64,
    pub total_count: u32,
    pub breakdown: BTreeMap<String, TypeBreakdown>,
    pub featured_medals: Vec<FeaturedMedal>,
    pub top_contributors: Vec<Contributor>,
}

/// Public view of a trend's rewards. A contributor who gave any anonymous
/// reward on the trend is shown without an id.
pub fn reward_summary(trend: &Trend) -> RewardSummary {
    let mut breakdown: BTreeMap<String, TypeBreakdown> = BTreeMap::new();
    for reward in trend.rewards.iter() {
        let entry = breakdown
            .entry(reward.medal.name.clone())
            .or_insert_with(|| TypeBreakdown {
                reward_type_id: reward.reward_type_id,
                count: 0,
                total_value: 0,
            });
        entry.count += 1;
        entry.total_value += reward.amount;
    }

    let aggregates = &trend.aggregates;
    let top_contributors = aggregates
        .top_rewards
        .iter()
        .map(|top| {
            let anonymous = trend
                .rewards
                .iter()
                .any(|r| r.giver_id == top.giver_id && r.is_anonymous);
            Contributor {
                giver_id: (!anonymous).then_some(top.giver_id),
                is_anonymous: anonymous,
                amount: top.amount,
                medal: top.medal.clone(),
            }
        })
        .collect();

    RewardSummary {
        summary: aggregates.medal_summary,
        total_value: aggregates.total_reward_value,
        total_count: aggregates.reward_count,
        breakdown,
        featured_medals: aggregates.featured_medals.clone(),
        top_contributors,
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::models::MedalTier;
    use chrono::TimeZone;

    pub(crate) fn reward_type(name: &str, value: i64, daily_limit: Option<i32>, cooldown: i32) -> RewardType {
        RewardType {
            id: Uuid::new_v4(),
            name: name.to_string(),
            display_name: format!("{} Medal", name),
            tier: MedalTier::Common,
            value,
            color: "#FFD700".to_string(),
            icon: "medal".to_string(),
            description: String::new(),
            is_active: true,
            daily_limit,
            cooldown_minutes: cooldown,
            created_at: Utc::now(),
        }
    }

    fn account(points: i64) -> Account {
        Account::new(&Uuid::new_v4().simple().to_string()[..12], "a@example.com", None, points, Utc::now())
    }

    fn setup(points: i64) -> (Trend, Account, Account) {
        let giver = account(points);
        let author = account(0);
        let trend = Trend::new(author.id, Uuid::new_v4(), "title", "content", vec![], Utc::now());
        (trend, giver, author)
    }

    fn morning() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 14, 8, 0, 0).unwrap()
    }

    fn reward_by(giver: Uuid, rt: &RewardType, at: DateTime<Utc>) -> Reward {
        Reward {
            id: Uuid::new_v4(),
            giver_id: giver,
            reward_type_id: rt.id,
            amount: rt.value,
            message: String::new(),
            is_anonymous: false,
            medal: rt.snapshot(),
            created_at: at,
        }
    }

    #[test]
    fn test_self_reward_changes_nothing() {
        let (mut trend, giver, _) = setup(500);
        trend.author_id = giver.id;
        let mut giver = giver;
        let mut author = giver.clone();
        let gold = reward_type("gold", 100, Some(3), 60);

        let err = give_reward(&mut trend, &mut giver, &mut author, &gold, None, false, morning())
            .unwrap_err();
        assert_eq!(err, RewardError::SelfRewardForbidden);
        assert!(trend.rewards.is_empty());
        assert_eq!(giver.reward_points, 500);
        assert!(giver.reward_history.is_empty());
        assert!(author.reward_history.is_empty());
    }

    #[test]
    fn test_inactive_type_is_rejected_first() {
        let (mut trend, mut giver, mut author) = setup(0);
        trend.author_id = giver.id;
        let mut gold = reward_type("gold", 100, None, 0);
        gold.is_active = false;
        let err = give_reward(&mut trend, &mut giver, &mut author, &gold, None, false, morning())
            .unwrap_err();
        assert_eq!(err, RewardError::InvalidRewardType);
    }

    #[test]
    fn test_daily_limit_resets_next_day() {
        let (mut trend, mut giver, mut author) = setup(1000);
        let silver = reward_type("silver", 10, Some(3), 0);
        let now = morning();

        for i in 0..3 {
            give_reward(&mut trend, &mut giver, &mut author, &silver, None, false, now + Duration::minutes(i))
                .unwrap();
        }
        let err = give_reward(&mut trend, &mut giver, &mut author, &silver, None, false, now + Duration::hours(2))
            .unwrap_err();
        assert!(matches!(err, RewardError::DailyLimitReached { limit: 3, .. }));

        let tomorrow = now + Duration::days(1);
        assert!(give_reward(&mut trend, &mut giver, &mut author, &silver, None, false, tomorrow).is_ok());
        assert_eq!(trend.rewards.len(), 4);
    }

    #[test]
    fn test_daily_limit_is_per_giver() {
        let (mut trend, mut giver, mut author) = setup(1000);
        let mut other = account(1000);
        let platinum = reward_type("platinum", 200, Some(1), 0);
        give_reward(&mut trend, &mut giver, &mut author, &platinum, None, false, morning()).unwrap();
        assert!(give_reward(&mut trend, &mut other, &mut author, &platinum, None, false, morning()).is_ok());
    }

    #[test]
    fn test_cooldown_window() {
        let (mut trend, mut giver, mut author) = setup(1000);
        let gold = reward_type("gold", 100, Some(3), 60);
        let first = morning();
        give_reward(&mut trend, &mut giver, &mut author, &gold, None, false, first).unwrap();

        let err = give_reward(&mut trend, &mut giver, &mut author, &gold, None, false, first + Duration::minutes(59))
            .unwrap_err();
        match err {
            RewardError::CooldownActive { remaining_minutes, available_at, .. } => {
                assert_eq!(remaining_minutes, 1);
                assert_eq!(available_at, first + Duration::minutes(60));
            }
            other => panic!("expected cooldown, got {:?}", other),
        }

        assert!(give_reward(&mut trend, &mut giver, &mut author, &gold, None, false, first + Duration::minutes(61)).is_ok());
    }

    #[test]
    fn test_cooldown_rounds_wait_up() {
        let (mut trend, giver, _) = setup(1000);
        let gold = reward_type("gold", 100, None, 60);
        trend.rewards.push(reward_by(giver.id, &gold, morning()));
        let err = validate_reward(&trend, &giver, &gold, morning() + Duration::seconds(30)).unwrap_err();
        assert!(matches!(err, RewardError::CooldownActive { remaining_minutes: 60, .. }));
    }

    #[test]
    fn test_insufficient_points() {
        let (mut trend, mut giver, mut author) = setup(99);
        let gold = reward_type("gold", 100, None, 0);
        let err = give_reward(&mut trend, &mut giver, &mut author, &gold, None, false, morning())
            .unwrap_err();
        assert_eq!(err, RewardError::InsufficientPoints { needed: 100, available: 99 });
        assert_eq!(giver.reward_points, 99);
    }

    #[test]
    fn test_points_are_conserved() {
        let (mut trend, mut giver, mut author) = setup(300);
        author.reward_points = 40;
        let gold = reward_type("gold", 100, None, 0);

        let reward = give_reward(
            &mut trend,
            &mut giver,
            &mut author,
            &gold,
            Some("great".to_string()),
            false,
            morning(),
        )
        .unwrap();

        assert_eq!(reward.amount, 100);
        assert_eq!(giver.reward_points, 200);
        assert_eq!(author.reward_points, 140);
        assert_eq!(giver.total_rewards_given, 100);
        assert_eq!(author.total_rewards_received, 100);
        assert_eq!(giver.reward_history[0].direction, RewardDirection::Given);
        assert_eq!(author.reward_history[0].direction, RewardDirection::Received);
        assert_eq!(trend.last_reward_at, Some(morning()));
        assert_eq!(trend.aggregates.reward_count, 1);
        assert_eq!(reward.medal.name, "gold");
    }

    #[test]
    fn test_aggregates_from_full_list() {
        let gold = reward_type("gold", 10, None, 0);
        let silver = reward_type("silver", 5, None, 0);
        let giver = Uuid::new_v4();
        let rewards = vec![
            reward_by(giver, &gold, morning()),
            reward_by(giver, &gold, morning()),
            reward_by(giver, &silver, morning()),
        ];

        let aggregates = recompute_aggregates(&rewards);
        assert_eq!(aggregates.medal_summary.gold, 2);
        assert_eq!(aggregates.medal_summary.silver, 1);
        assert_eq!(aggregates.total_reward_value, 25);
        assert_eq!(aggregates.reward_count, 3);
        assert_eq!(aggregates.featured_medals[0].reward_type_id, gold.id);
        assert_eq!(aggregates.featured_medals[0].count, 2);
    }

    #[test]
    fn test_top_rewards_ranking() {
        let bronze = reward_type("bronze", 10, None, 0);
        let gold = reward_type("gold", 50, None, 0);
        let (a, b, c) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let t = morning();
        let rewards = vec![
            reward_by(a, &bronze, t),
            reward_by(a, &bronze, t),
            reward_by(a, &bronze, t),
            reward_by(b, &gold, t),
            reward_by(c, &bronze, t),
        ];

        let aggregates = recompute_aggregates(&rewards);
        let amounts: Vec<i64> = aggregates.top_rewards.iter().map(|t| t.amount).collect();
        assert_eq!(amounts, vec![50, 30, 10]);
        assert_eq!(aggregates.top_rewards[0].giver_id, b);
        assert_eq!(aggregates.top_rewards[0].medal, "gold");
    }

    #[test]
    fn test_top_reward_medal_is_highest_single_reward() {
        let applause = reward_type("applause", 5, None, 0);
        let silver = reward_type("silver", 50, None, 0);
        let giver = Uuid::new_v4();
        let t = morning();
        let rewards = vec![
            reward_by(giver, &silver, t),
            reward_by(giver, &applause, t),
            reward_by(giver, &applause, t),
            reward_by(giver, &applause, t),
        ];
        let aggregates = recompute_aggregates(&rewards);
        assert_eq!(aggregates.top_rewards[0].medal, "silver");
        assert_eq!(aggregates.featured_medals[0].reward_type_id, applause.id);
    }

    #[test]
    fn test_top_lists_are_truncated() {
        let thanks = reward_type("thanks", 2, None, 0);
        let rewards: Vec<Reward> = (0..8)
            .map(|_| reward_by(Uuid::new_v4(), &reward_type("x", 1, None, 0), morning()))
            .chain(std::iter::once(reward_by(Uuid::new_v4(), &thanks, morning())))
            .collect();
        let aggregates = recompute_aggregates(&rewards);
        assert_eq!(aggregates.top_rewards.len(), TOP_REWARDS);
        assert_eq!(aggregates.featured_medals.len(), FEATURED_MEDALS);
        assert_eq!(aggregates.medal_summary.other, 9);
    }

    #[test]
    fn test_summary_redacts_anonymous_givers() {
        let (mut trend, mut giver, mut author) = setup(1000);
        let mut public_giver = account(1000);
        let gold = reward_type("gold", 100, None, 0);
        give_reward(&mut trend, &mut giver, &mut author, &gold, None, true, morning()).unwrap();
        give_reward(&mut trend, &mut public_giver, &mut author, &gold, None, false, morning()).unwrap();

        let summary = reward_summary(&trend);
        assert_eq!(summary.total_value, 200);
        assert_eq!(summary.breakdown["gold"].count, 2);
        let hidden = summary
            .top_contributors
            .iter()
            .filter(|c| c.giver_id.is_none())
            .count();
        assert_eq!(hidden, 1);
        assert!(summary
            .top_contributors
            .iter()
            .any(|c| c.giver_id == Some(public_giver.id)));
    }

    #[test]
    fn test_day_start_is_utc_midnight() {
        let now = Utc.with_ymd_and_hms(2024, 5, 14, 23, 59, 59).unwrap();
        assert_eq!(day_start(now), Utc.with_ymd_and_hms(2024, 5, 14, 0, 0, 0).unwrap());
    }
}
