use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{
    Account, LeaderboardParams, ParseEnumError, RewardDirection, RewardHistoryEntry,
};

pub const DEFAULT_LEADERBOARD_SIZE: usize = 20;
pub const MAX_LEADERBOARD_SIZE: usize = 100;
pub const RECENT_HISTORY: usize = 10;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MedalStat {
    pub count: u32,
    pub total_value: i64,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct MedalStats {
    pub given: BTreeMap<String, MedalStat>,
    pub received: BTreeMap<String, MedalStat>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserRewardStats {
    pub account_id: Uuid,
    pub username: String,
    pub avatar: String,
    pub points: i64,
    pub total_given: i64,
    pub total_received: i64,
    pub medal_stats: MedalStats,
    /// Most recent first.
    pub recent_history: Vec<RewardHistoryEntry>,
}

pub fn user_reward_stats(account: &Account) -> UserRewardStats {
    let mut medal_stats = MedalStats::default();

    for entry in account.reward_history.iter() {
        let bucket = match entry.direction {
            RewardDirection::Given => &mut medal_stats.given,
            RewardDirection::Received => &mut medal_stats.received,
        };
        let stat = bucket.entry(entry.medal.clone()).or_default();
        stat.count += 1;
        stat.total_value += entry.amount;
    }

    let recent_history = account
        .reward_history
        .iter()
        .rev()
        .take(RECENT_HISTORY)
        .cloned()
        .collect();

    UserRewardStats {
        account_id: account.id,
        username: account.username.clone(),
        avatar: account.avatar.clone(),
        points: account.reward_points,
        total_given: account.total_rewards_given,
        total_received: account.total_rewards_received,
        medal_stats,
        recent_history,
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaderboardQuery {
    pub direction: RewardDirection,
    pub medal: Option<String>,
    pub limit: usize,
}

impl Default for LeaderboardQuery {
    fn default() -> Self {
        Self {
            direction: RewardDirection::Received,
            medal: None,
            limit: DEFAULT_LEADERBOARD_SIZE,
        }
    }
}

impl LeaderboardQuery {
    pub fn from_params(params: &LeaderboardParams) -> Result<Self, ParseEnumError> {
        let direction = match params.direction.as_deref() {
            Some(raw) => raw.parse()?,
            None => RewardDirection::Received,
        };
        let medal = params
            .medal
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty())
            .map(str::to_lowercase);
        let limit = params
            .limit
            .filter(|l| *l > 0)
            .unwrap_or(DEFAULT_LEADERBOARD_SIZE)
            .min(MAX_LEADERBOARD_SIZE);

        Ok(Self {
            direction,
            medal,
            limit,
        })
    }

    pub fn cache_key(&self) -> String {
        format!(
            "leaderboard:{}:{}:{}",
            self.direction,
            self.medal.as_deref().unwrap_or("*"),
            self.limit
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopMedal {
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    pub account_id: Uuid,
    pub username: String,
    pub avatar: String,
    pub total_rewards_received: i64,
    pub total_rewards_given: i64,
    pub medal_counts: BTreeMap<String, u32>,
    pub top_medal: Option<TopMedal>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Leaderboard {
    pub leaderboard: Vec<LeaderboardEntry>,
    #[serde(rename = "type")]
    pub direction: RewardDirection,
    pub medal: Option<String>,
    pub updated_at: DateTime<Utc>,
}

fn has_medal(account: &Account, medal: &str) -> bool {
    account
        .reward_history
        .iter()
        .any(|entry| entry.medal.eq_ignore_ascii_case(medal))
}

/// Ranks accounts by points received. `direction` only selects which half of
/// each account's history the medal counts are drawn from.
pub fn build_leaderboard(
    accounts: &[Account],
    query: &LeaderboardQuery,
    now: DateTime<Utc>,
) -> Leaderboard {
    let mut ranked: Vec<&Account> = accounts
        .iter()
        .filter(|a| a.total_rewards_received > 0)
        .filter(|a| query.medal.as_deref().map_or(true, |m| has_medal(a, m)))
        .collect();
    ranked.sort_by(|a, b| b.total_rewards_received.cmp(&a.total_rewards_received));
    ranked.truncate(query.limit);

    let leaderboard = ranked
        .into_iter()
        .map(|account| leaderboard_entry(account, query.direction))
        .collect();

    Leaderboard {
        leaderboard,
        direction: query.direction,
        medal: query.medal.clone(),
        updated_at: now,
    }
}

fn leaderboard_entry(account: &Account, direction: RewardDirection) -> LeaderboardEntry {
    // First-seen order decides ties for the top medal.
    let mut counts: Vec<(String, u32)> = Vec::new();
    for entry in account
        .reward_history
        .iter()
        .filter(|e| e.direction == direction)
    {
        match counts.iter_mut().find(|(name, _)| *name == entry.medal) {
            Some((_, count)) => *count += 1,
            None => counts.push((entry.medal.clone(), 1)),
        }
    }

    let top_medal = counts
        .iter()
        .fold(None::<&(String, u32)>, |best, current| match best {
            Some(b) if b.1 >= current.1 => Some(b),
            _ => Some(current),
        })
        .map(|(name, count)| TopMedal {
            name: name.clone(),
            count: *count,
        });

    LeaderboardEntry {
        account_id: account.id,
        username: account.username.clone(),
        avatar: account.avatar.clone(),
        total_rewards_received: account.total_rewards_received,
        total_rewards_given: account.total_rewards_given,
        medal_counts: counts.into_iter().collect(),
        top_medal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn entry(direction: RewardDirection, medal: &str, amount: i64, minutes: i64) -> RewardHistoryEntry {
        RewardHistoryEntry {
            trend_id: Uuid::new_v4(),
            amount,
            direction,
            reward_type_id: Uuid::new_v4(),
            medal: medal.to_string(),
            date: Utc::now() + Duration::minutes(minutes),
        }
    }

    fn account(name: &str, received: i64, history: Vec<RewardHistoryEntry>) -> Account {
        let mut account = Account::new(name, &format!("{}@example.com", name), None, 100, Utc::now());
        account.total_rewards_received = received;
        account.reward_history.0 = history;
        account
    }

    #[test]
    fn test_user_stats_fold_history() {
        let history: Vec<_> = (0..12)
            .map(|i| entry(RewardDirection::Given, "applause", 5, i))
            .chain(std::iter::once(entry(RewardDirection::Received, "gold", 100, 20)))
            .collect();
        let account = account("alice", 100, history);

        let stats = user_reward_stats(&account);
        assert_eq!(stats.medal_stats.given["applause"], MedalStat { count: 12, total_value: 60 });
        assert_eq!(stats.medal_stats.received["gold"].total_value, 100);
        assert_eq!(stats.recent_history.len(), RECENT_HISTORY);
        assert_eq!(stats.recent_history[0].medal, "gold");
    }

    #[test]
    fn test_leaderboard_sorts_filters_and_truncates() {
        let accounts = vec![
            account("low", 10, vec![entry(RewardDirection::Received, "bronze", 10, 0)]),
            account("none", 0, vec![]),
            account("high", 300, vec![
                entry(RewardDirection::Received, "gold", 100, 0),
                entry(RewardDirection::Received, "silver", 50, 1),
                entry(RewardDirection::Received, "silver", 50, 2),
                entry(RewardDirection::Given, "gold", 100, 3),
            ]),
            account("mid", 50, vec![entry(RewardDirection::Received, "silver", 50, 0)]),
        ];

        let board = build_leaderboard(&accounts, &LeaderboardQuery::default(), Utc::now());
        let names: Vec<&str> = board.leaderboard.iter().map(|e| e.username.as_str()).collect();
        assert_eq!(names, vec!["high", "mid", "low"]);
        assert_eq!(board.leaderboard[0].medal_counts["silver"], 2);
        assert_eq!(board.leaderboard[0].medal_counts["gold"], 1);
        assert_eq!(board.leaderboard[0].top_medal.as_ref().unwrap().name, "silver");

        let query = LeaderboardQuery {
            medal: Some("silver".to_string()),
            limit: 1,
            ..LeaderboardQuery::default()
        };
        let board = build_leaderboard(&accounts, &query, Utc::now());
        assert_eq!(board.leaderboard.len(), 1);
        assert_eq!(board.leaderboard[0].username, "high");
    }

    #[test]
    fn test_top_medal_ties_keep_first_seen() {
        let account = account("tie", 20, vec![
            entry(RewardDirection::Received, "thanks", 2, 0),
            entry(RewardDirection::Received, "helpful", 6, 1),
        ]);
        let board = build_leaderboard(&[account], &LeaderboardQuery::default(), Utc::now());
        assert_eq!(board.leaderboard[0].top_medal.as_ref().unwrap().name, "thanks");
    }

    #[test]
    fn test_query_from_params() {
        let params = LeaderboardParams {
            direction: Some("given".to_string()),
            medal: Some(" Gold ".to_string()),
            limit: Some(1000),
        };
        let query = LeaderboardQuery::from_params(&params).unwrap();
        assert_eq!(query.direction, RewardDirection::Given);
        assert_eq!(query.medal.as_deref(), Some("gold"));
        assert_eq!(query.limit, MAX_LEADERBOARD_SIZE);
        assert_eq!(query.cache_key(), "leaderboard:given:gold:100");

        let bad = LeaderboardParams {
            direction: Some("sideways".to_string()),
            medal: None,
            limit: None,
        };
        assert!(LeaderboardQuery::from_params(&bad).is_err());
    }
}
