use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

use crate::models::{MedalSummary, Reward, RewardAggregates};

pub const MAX_TREND_TITLE: usize = 300;
pub const MAX_TREND_CONTENT: usize = 40_000;
pub const MAX_COMMENT_LENGTH: usize = 10_000;
pub const MAX_COMMUNITY_NAME: usize = 50;
pub const MAX_COMMUNITY_DESCRIPTION: usize = 500;

/// A community post; the content item rewards are given on.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Trend {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub author_id: Uuid,
    pub community_id: Uuid,
    pub upvotes: Vec<Uuid>,
    pub downvotes: Vec<Uuid>,
    pub vote_score: i64,
    pub comment_count: i64,
    /// Raw rewards name anonymous givers; exposed only through the reward summary.
    #[serde(skip_serializing)]
    pub rewards: Json<Vec<Reward>>,
    #[serde(skip_serializing)]
    pub aggregates: Json<RewardAggregates>,
    pub tags: Vec<String>,
    pub is_active: bool,
    pub views: i64,
    pub last_reward_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A trend as returned to clients: reward totals without giver identities.
#[derive(Debug, Serialize)]
pub struct TrendResponse<'a> {
    #[serde(flatten)]
    pub trend: &'a Trend,
    pub medal_summary: MedalSummary,
    pub total_reward_value: i64,
    pub reward_count: u32,
}

impl<'a> From<&'a Trend> for TrendResponse<'a> {
    fn from(trend: &'a Trend) -> Self {
        Self {
            trend,
            medal_summary: trend.aggregates.medal_summary,
            total_reward_value: trend.aggregates.total_reward_value,
            reward_count: trend.aggregates.reward_count,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoteDirection {
    Up,
    Down,
}

impl Trend {
    pub fn new(
        author_id: Uuid,
        community_id: Uuid,
        title: &str,
        content: &str,
        tags: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            title: title.trim().to_string(),
            content: content.to_string(),
            author_id,
            community_id,
            upvotes: Vec::new(),
            downvotes: Vec::new(),
            vote_score: 0,
            comment_count: 0,
            rewards: Json(Vec::new()),
            aggregates: Json(RewardAggregates::default()),
            tags,
            is_active: true,
            views: 0,
            last_reward_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Toggles a vote. Voting the same way twice removes the vote; voting the
    /// other way moves it.
    pub fn toggle_vote(&mut self, voter: Uuid, direction: VoteDirection) {
        let (same, opposite) = match direction {
            VoteDirection::Up => (&mut self.upvotes, &mut self.downvotes),
            VoteDirection::Down => (&mut self.downvotes, &mut self.upvotes),
        };

        if let Some(pos) = same.iter().position(|id| *id == voter) {
            same.remove(pos);
        } else {
            opposite.retain(|id| *id != voter);
            same.push(voter);
        }

        self.vote_score = self.upvotes.len() as i64 - self.downvotes.len() as i64;
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Community {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub creator_id: Uuid,
    pub members: Vec<Uuid>,
    pub tags: Vec<String>,
    pub is_public: bool,
    pub trend_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Community {
    pub fn is_member(&self, account_id: Uuid) -> bool {
        self.members.contains(&account_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Comment {
    pub id: Uuid,
    pub trend_id: Uuid,
    pub author_id: Uuid,
    pub parent_id: Option<Uuid>,
    pub content: String,
    /// 0 for top-level comments, 1 for replies.
    pub depth: i16,
    pub vote_score: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendSort {
    #[default]
    Hot,
    New,
    Top,
}

impl TrendSort {
    pub fn order_by(&self) -> &'static str {
        match self {
            TrendSort::Hot => "vote_score DESC, created_at DESC",
            TrendSort::New => "created_at DESC",
            TrendSort::Top => "vote_score DESC",
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct TrendListParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
    pub community: Option<Uuid>,
    pub sort_by: Option<TrendSort>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateTrendRequest {
    pub title: String,
    pub content: String,
    pub community_id: Uuid,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCommentRequest {
    pub content: String,
    pub parent_id: Option<Uuid>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateCommunityRequest {
    pub name: String,
    pub description: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn trend() -> Trend {
        Trend::new(Uuid::new_v4(), Uuid::new_v4(), "t", "c", vec![], Utc::now())
    }

    #[test]
    fn test_upvote_toggles_off() {
        let mut t = trend();
        let voter = Uuid::new_v4();
        t.toggle_vote(voter, VoteDirection::Up);
        assert_eq!(t.vote_score, 1);
        t.toggle_vote(voter, VoteDirection::Up);
        assert_eq!(t.vote_score, 0);
        assert!(t.upvotes.is_empty());
    }

    #[test]
    fn test_switching_vote_moves_it() {
        let mut t = trend();
        let voter = Uuid::new_v4();
        t.toggle_vote(voter, VoteDirection::Up);
        t.toggle_vote(Uuid::new_v4(), VoteDirection::Up);
        t.toggle_vote(voter, VoteDirection::Down);
        assert_eq!(t.upvotes.len(), 1);
        assert_eq!(t.downvotes, vec![voter]);
        assert_eq!(t.vote_score, 0);
    }

    #[test]
    fn test_sort_defaults_to_hot() {
        assert_eq!(TrendSort::default(), TrendSort::Hot);
        let sort: TrendSort = serde_json::from_str("\"top\"").unwrap();
        assert_eq!(sort.order_by(), "vote_score DESC");
    }

    #[test]
    fn test_response_hides_raw_rewards() {
        let mut t = trend();
        t.aggregates.total_reward_value = 25;
        t.aggregates.reward_count = 1;
        let value = serde_json::to_value(TrendResponse::from(&t)).unwrap();
        assert!(value.get("rewards").is_none());
        assert!(value.get("aggregates").is_none());
        assert_eq!(value["total_reward_value"], 25);
        assert_eq!(value["title"], "t");
    }
}
