use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{types::Json, FromRow};
use uuid::Uuid;

/// Community standing. Variant order is the gating order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Newbie,
    Contributor,
    Pro,
    Expert,
}

text_enum!(Level, "level", {
    Newbie => "Newbie",
    Contributor => "Contributor",
    Pro => "Pro",
    Expert => "Expert",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    User,
    PromptCreator,
    Admin,
    Superadmin,
}

text_enum!(Role, "role", {
    User => "user",
    PromptCreator => "prompt-creator",
    Admin => "admin",
    Superadmin => "superadmin",
});

impl Role {
    pub fn is_admin(&self) -> bool {
        matches!(self, Role::Admin | Role::Superadmin)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Canceled,
    PastDue,
    Inactive,
    Trial,
}

text_enum!(SubscriptionStatus, "subscription status", {
    Active => "active",
    Canceled => "canceled",
    PastDue => "past_due",
    Inactive => "inactive",
    Trial => "trial",
});

impl SubscriptionStatus {
    pub fn is_current(&self) -> bool {
        matches!(self, SubscriptionStatus::Active | SubscriptionStatus::Trial)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Currency {
    Usd,
    Ngn,
}

text_enum!(Currency, "currency", {
    Usd => "USD",
    Ngn => "NGN",
});

/// Rolling per-account counters. Monthly counters are zeroed lazily, see
/// `UsageLedger::reset_if_new_month`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageLedger {
    pub prompts_created: u64,
    pub prompts_this_month: u64,
    pub api_calls: u64,
    pub storage_used: u64,
    pub images_uploaded: u64,
    pub last_reset: DateTime<Utc>,
}

impl UsageLedger {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            prompts_created: 0,
            prompts_this_month: 0,
            api_calls: 0,
            storage_used: 0,
            images_uploaded: 0,
            last_reset: now,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RewardDirection {
    Given,
    Received,
}

text_enum!(RewardDirection, "reward direction", {
    Given => "given",
    Received => "received",
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardHistoryEntry {
    pub trend_id: Uuid,
    pub amount: i64,
    #[serde(rename = "type")]
    pub direction: RewardDirection,
    pub reward_type_id: Uuid,
    pub medal: String,
    pub date: DateTime<Utc>,
}

/// Optional public profile details shown next to an account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, utoipa::ToSchema)]
#[serde(default)]
pub struct Profile {
    pub bio: String,
    pub profession: String,
    pub location: String,
    pub website: String,
    pub twitter: String,
    pub github: String,
    pub linkedin: String,
}

#[derive(Debug, Clone, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
    pub profile: Json<Profile>,
    pub password_hash: Option<String>,
    pub google_id: Option<String>,
    pub is_verified: bool,
    pub is_blocked: bool,
    #[sqlx(try_from = "String")]
    pub role: Role,
    #[sqlx(try_from = "String")]
    pub level: Level,
    #[sqlx(try_from = "String")]
    pub currency_preference: Currency,
    pub plan_id: Option<Uuid>,
    #[sqlx(try_from = "String")]
    pub subscription_status: SubscriptionStatus,
    pub current_period_start: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub usage: Json<UsageLedger>,
    pub reward_points: i64,
    pub total_rewards_given: i64,
    pub total_rewards_received: i64,
    pub reward_history: Json<Vec<RewardHistoryEntry>>,
    pub joined_communities: Vec<Uuid>,
    pub otp_hash: Option<String>,
    pub otp_expires_at: Option<DateTime<Utc>>,
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    /// A freshly registered, unverified account.
    pub fn new(
        username: &str,
        email: &str,
        password_hash: Option<String>,
        reward_points: i64,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.trim().to_string(),
            email: email.trim().to_lowercase(),
            name: String::new(),
            avatar: String::new(),
            profile: Json(Profile::default()),
            password_hash,
            google_id: None,
            is_verified: false,
            is_blocked: false,
            role: Role::User,
            level: Level::Newbie,
            currency_preference: Currency::Usd,
            plan_id: None,
            subscription_status: SubscriptionStatus::Inactive,
            current_period_start: None,
            current_period_end: None,
            trial_ends_at: None,
            usage: Json(UsageLedger::new(now)),
            reward_points,
            total_rewards_given: 0,
            total_rewards_received: 0,
            reward_history: Json(Vec::new()),
            joined_communities: Vec::new(),
            otp_hash: None,
            otp_expires_at: None,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn has_joined(&self, community_id: Uuid) -> bool {
        self.joined_communities.contains(&community_id)
    }
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct CreateUserRequest {
    pub username: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    /// Email address or username
    pub identifier: String,
    pub password: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResendOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

/// Fields left out (or null) keep their current value; an empty string clears one.
#[derive(Debug, Default, Deserialize, utoipa::ToSchema)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub bio: Option<String>,
    pub profession: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
    pub twitter: Option<String>,
    pub github: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct RefreshRequest {
    pub refresh_token: String,
}

#[derive(Debug, Deserialize, utoipa::ToSchema)]
pub struct SetLevelRequest {
    /// Newbie, Contributor, Pro or Expert
    pub level: String,
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub name: String,
    pub avatar: String,
    pub profile: Profile,
    pub role: Role,
    pub level: Level,
    pub is_verified: bool,
    pub plan_id: Option<Uuid>,
    pub subscription_status: SubscriptionStatus,
    pub reward_points: i64,
    pub total_rewards_given: i64,
    pub total_rewards_received: i64,
    pub created_at: DateTime<Utc>,
}

impl From<&Account> for UserResponse {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            username: account.username.clone(),
            email: account.email.clone(),
            name: account.name.clone(),
            avatar: account.avatar.clone(),
            profile: account.profile.0.clone(),
            role: account.role,
            level: account.level,
            is_verified: account.is_verified,
            plan_id: account.plan_id,
            subscription_status: account.subscription_status,
            reward_points: account.reward_points,
            total_rewards_given: account.total_rewards_given,
            total_rewards_received: account.total_rewards_received,
            created_at: account.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub access_token: String,
    pub refresh_token: String,
    pub user: UserResponse,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_order_follows_progression() {
        assert!(Level::Newbie < Level::Contributor);
        assert!(Level::Contributor < Level::Pro);
        assert!(Level::Pro < Level::Expert);
    }

    #[test]
    fn test_text_enums_parse_stored_values() {
        assert_eq!("Pro".parse::<Level>().unwrap(), Level::Pro);
        assert_eq!("prompt-creator".parse::<Role>().unwrap(), Role::PromptCreator);
        assert_eq!("past_due".parse::<SubscriptionStatus>().unwrap(), SubscriptionStatus::PastDue);
        assert_eq!("ngn".parse::<Currency>().unwrap(), Currency::Ngn);
        assert!("Guru".parse::<Level>().is_err());
    }

    #[test]
    fn test_new_account_defaults() {
        let now = Utc::now();
        let account = Account::new(" alice ", "Alice@Example.com", None, 100, now);
        assert_eq!(account.username, "alice");
        assert_eq!(account.email, "alice@example.com");
        assert_eq!(account.level, Level::Newbie);
        assert!(!account.is_verified);
        assert_eq!(account.usage.last_reset, now);
        assert_eq!(account.reward_points, 100);
        assert_eq!(account.profile.0, Profile::default());
    }

    #[test]
    fn test_profile_reads_partial_documents() {
        let profile: Profile = serde_json::from_value(serde_json::json!({ "bio": "hi" })).unwrap();
        assert_eq!(profile.bio, "hi");
        assert!(profile.github.is_empty());
    }

    #[test]
    fn test_history_entry_uses_type_key() {
        let entry = RewardHistoryEntry {
            trend_id: Uuid::nil(),
            amount: 5,
            direction: RewardDirection::Given,
            reward_type_id: Uuid::nil(),
            medal: "applause".to_string(),
            date: Utc::now(),
        };
        let value = serde_json::to_value(&entry).unwrap();
        assert_eq!(value["type"], "given");
    }
}
