use sqlx::{PgExecutor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::errors::Result;
use crate::models::*;

/// True when the error is a unique constraint violation.
pub fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some("23505"))
}

pub struct AccountQueries;

impl AccountQueries {
    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO users (
                id, username, email, name, avatar, password_hash, google_id, is_verified,
                is_blocked, role, level, currency_preference, plan_id, subscription_status,
                current_period_start, current_period_end, trial_ends_at, usage, reward_points,
                total_rewards_given, total_rewards_received, reward_history, joined_communities,
                otp_hash, otp_expires_at, last_login, created_at, updated_at, profile
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17,
                    $18, $19, $20, $21, $22, $23, $24, $25, $26, $27, $28, $29)
            "#,
        )
        .bind(account.id)
        .bind(&account.username)
        .bind(&account.email)
        .bind(&account.name)
        .bind(&account.avatar)
        .bind(&account.password_hash)
        .bind(&account.google_id)
        .bind(account.is_verified)
        .bind(account.is_blocked)
        .bind(account.role.as_str())
        .bind(account.level.as_str())
        .bind(account.currency_preference.as_str())
        .bind(account.plan_id)
        .bind(account.subscription_status.as_str())
        .bind(account.current_period_start)
        .bind(account.current_period_end)
        .bind(account.trial_ends_at)
        .bind(&account.usage)
        .bind(account.reward_points)
        .bind(account.total_rewards_given)
        .bind(account.total_rewards_received)
        .bind(&account.reward_history)
        .bind(&account.joined_communities)
        .bind(&account.otp_hash)
        .bind(account.otp_expires_at)
        .bind(account.last_login)
        .bind(account.created_at)
        .bind(account.updated_at)
        .bind(&account.profile)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// Writes back every mutable column of the account.
    pub async fn save<'e, E: PgExecutor<'e>>(executor: E, account: &Account) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE users SET
                name = $2, avatar = $3, password_hash = $4, is_verified = $5, is_blocked = $6,
                role = $7, level = $8, currency_preference = $9, plan_id = $10,
                subscription_status = $11, current_period_start = $12, current_period_end = $13,
                trial_ends_at = $14, usage = $15, reward_points = $16, total_rewards_given = $17,
                total_rewards_received = $18, reward_history = $19, joined_communities = $20,
                otp_hash = $21, otp_expires_at = $22, last_login = $23, updated_at = $24,
                profile = $25
            WHERE id = $1
            "#,
        )
        .bind(account.id)
        .bind(&account.name)
        .bind(&account.avatar)
        .bind(&account.password_hash)
        .bind(account.is_verified)
        .bind(account.is_blocked)
        .bind(account.role.as_str())
        .bind(account.level.as_str())
        .bind(account.currency_preference.as_str())
        .bind(account.plan_id)
        .bind(account.subscription_status.as_str())
        .bind(account.current_period_start)
        .bind(account.current_period_end)
        .bind(account.trial_ends_at)
        .bind(&account.usage)
        .bind(account.reward_points)
        .bind(account.total_rewards_given)
        .bind(account.total_rewards_received)
        .bind(&account.reward_history)
        .bind(&account.joined_communities)
        .bind(&account.otp_hash)
        .bind(account.otp_expires_at)
        .bind(account.last_login)
        .bind(account.updated_at)
        .bind(&account.profile)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(account)
    }

    /// Locks the row until the surrounding transaction ends.
    pub async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(account)
    }

    pub async fn find_by_email<'e, E: PgExecutor<'e>>(
        executor: E,
        email: &str,
    ) -> Result<Option<Account>> {
        let account = sqlx::query_as::<_, Account>("SELECT * FROM users WHERE email = $1")
            .bind(email.trim().to_lowercase())
            .fetch_optional(executor)
            .await?;

        Ok(account)
    }

    /// Looks an account up by email or username.
    pub async fn find_by_identifier<'e, E: PgExecutor<'e>>(
        executor: E,
        identifier: &str,
    ) -> Result<Option<Account>> {
        let identifier = identifier.trim();
        let account = sqlx::query_as::<_, Account>(
            "SELECT * FROM users WHERE email = $1 OR username = $2 LIMIT 1",
        )
        .bind(identifier.to_lowercase())
        .bind(identifier)
        .fetch_optional(executor)
        .await?;

        Ok(account)
    }

    /// Which of the two identities is already taken, if any.
    pub async fn find_conflict<'e, E: PgExecutor<'e>>(
        executor: E,
        username: &str,
        email: &str,
    ) -> Result<Option<&'static str>> {
        let existing: Option<(String, String)> = sqlx::query_as(
            "SELECT username, email FROM users WHERE username = $1 OR email = $2 LIMIT 1",
        )
        .bind(username)
        .bind(email)
        .fetch_optional(executor)
        .await?;

        Ok(existing.map(|(taken_username, _)| {
            if taken_username == username {
                "Username already taken"
            } else {
                "Email already registered"
            }
        }))
    }

    /// Accounts that have received rewards, best first.
    pub async fn leaderboard_candidates<'e, E: PgExecutor<'e>>(
        executor: E,
        medal: Option<&str>,
        limit: usize,
    ) -> Result<Vec<Account>> {
        let filter = medal.map(|m| serde_json::json!([{ "medal": m }]));
        let accounts = sqlx::query_as::<_, Account>(
            r#"
            SELECT * FROM users
            WHERE total_rewards_received > 0
              AND ($1::jsonb IS NULL OR reward_history @> $1::jsonb)
            ORDER BY total_rewards_received DESC
            LIMIT $2
            "#,
        )
        .bind(filter)
        .bind(limit as i64)
        .fetch_all(executor)
        .await?;

        Ok(accounts)
    }
}

pub struct PlanQueries;

impl PlanQueries {
    /// Inserts the plan or refreshes the existing row with the same tier name.
    pub async fn upsert<'e, E: PgExecutor<'e>>(executor: E, plan: &SubscriptionPlan) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO subscription_plans (
                id, name, display_name, description, tier, pricing, limits, features,
                is_active, is_free, badge_color, level_required, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                description = EXCLUDED.description,
                tier = EXCLUDED.tier,
                pricing = EXCLUDED.pricing,
                limits = EXCLUDED.limits,
                features = EXCLUDED.features,
                is_free = EXCLUDED.is_free,
                badge_color = EXCLUDED.badge_color,
                level_required = EXCLUDED.level_required
            "#,
        )
        .bind(plan.id)
        .bind(plan.name.as_str())
        .bind(&plan.display_name)
        .bind(&plan.description)
        .bind(plan.tier)
        .bind(&plan.pricing)
        .bind(&plan.limits)
        .bind(&plan.features)
        .bind(plan.is_active)
        .bind(plan.is_free)
        .bind(&plan.badge_color)
        .bind(plan.level_required.as_str())
        .bind(plan.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn list_active<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<SubscriptionPlan>> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE is_active ORDER BY tier",
        )
        .fetch_all(executor)
        .await?;

        Ok(plans)
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<SubscriptionPlan>> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>("SELECT * FROM subscription_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(plan)
    }

    pub async fn find_by_tier<'e, E: PgExecutor<'e>>(
        executor: E,
        tier: PlanTier,
    ) -> Result<Option<SubscriptionPlan>> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE name = $1",
        )
        .bind(tier.as_str())
        .fetch_optional(executor)
        .await?;

        Ok(plan)
    }
}

pub struct RewardTypeQueries;

impl RewardTypeQueries {
    /// Inserts the medal or refreshes the existing row with the same name.
    pub async fn upsert<'e, E: PgExecutor<'e>>(executor: E, reward_type: &RewardType) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO reward_types (
                id, name, display_name, tier, value, color, icon, description,
                is_active, daily_limit, cooldown_minutes, created_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            ON CONFLICT (name) DO UPDATE SET
                display_name = EXCLUDED.display_name,
                tier = EXCLUDED.tier,
                value = EXCLUDED.value,
                color = EXCLUDED.color,
                icon = EXCLUDED.icon,
                description = EXCLUDED.description,
                daily_limit = EXCLUDED.daily_limit,
                cooldown_minutes = EXCLUDED.cooldown_minutes
            "#,
        )
        .bind(reward_type.id)
        .bind(&reward_type.name)
        .bind(&reward_type.display_name)
        .bind(reward_type.tier.as_str())
        .bind(reward_type.value)
        .bind(&reward_type.color)
        .bind(&reward_type.icon)
        .bind(&reward_type.description)
        .bind(reward_type.is_active)
        .bind(reward_type.daily_limit)
        .bind(reward_type.cooldown_minutes)
        .bind(reward_type.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn list_active<'e, E: PgExecutor<'e>>(executor: E) -> Result<Vec<RewardType>> {
        let types = sqlx::query_as::<_, RewardType>(
            "SELECT * FROM reward_types WHERE is_active ORDER BY value DESC",
        )
        .fetch_all(executor)
        .await?;

        Ok(types)
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<RewardType>> {
        let reward_type = sqlx::query_as::<_, RewardType>("SELECT * FROM reward_types WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(reward_type)
    }
}

pub struct CommunityQueries;

impl CommunityQueries {
    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, community: &Community) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO communities (id, name, description, creator_id, members, tags, is_public, trend_count, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(community.id)
        .bind(&community.name)
        .bind(&community.description)
        .bind(community.creator_id)
        .bind(&community.members)
        .bind(&community.tags)
        .bind(community.is_public)
        .bind(community.trend_count)
        .bind(community.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn save<'e, E: PgExecutor<'e>>(executor: E, community: &Community) -> Result<()> {
        sqlx::query(
            "UPDATE communities SET description = $2, members = $3, tags = $4, is_public = $5, trend_count = $6 WHERE id = $1",
        )
        .bind(community.id)
        .bind(&community.description)
        .bind(&community.members)
        .bind(&community.tags)
        .bind(community.is_public)
        .bind(community.trend_count)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Community>> {
        let community = sqlx::query_as::<_, Community>("SELECT * FROM communities WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(community)
    }

    pub async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Community>> {
        let community =
            sqlx::query_as::<_, Community>("SELECT * FROM communities WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(executor)
                .await?;

        Ok(community)
    }

    pub async fn list<'e, E: PgExecutor<'e>>(executor: E, limit: i64, offset: i64) -> Result<Vec<Community>> {
        let communities = sqlx::query_as::<_, Community>(
            "SELECT * FROM communities WHERE is_public ORDER BY cardinality(members) DESC, created_at DESC LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(communities)
    }
}

pub struct TrendQueries;

impl TrendQueries {
    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, trend: &Trend) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO trends (
                id, title, content, author_id, community_id, upvotes, downvotes, vote_score,
                comment_count, rewards, aggregates, tags, is_active, views, last_reward_at,
                created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(trend.id)
        .bind(&trend.title)
        .bind(&trend.content)
        .bind(trend.author_id)
        .bind(trend.community_id)
        .bind(&trend.upvotes)
        .bind(&trend.downvotes)
        .bind(trend.vote_score)
        .bind(trend.comment_count)
        .bind(&trend.rewards)
        .bind(&trend.aggregates)
        .bind(&trend.tags)
        .bind(trend.is_active)
        .bind(trend.views)
        .bind(trend.last_reward_at)
        .bind(trend.created_at)
        .bind(trend.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn save<'e, E: PgExecutor<'e>>(executor: E, trend: &Trend) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE trends SET
                title = $2, content = $3, upvotes = $4, downvotes = $5, vote_score = $6,
                comment_count = $7, rewards = $8, aggregates = $9, tags = $10, is_active = $11,
                views = $12, last_reward_at = $13, updated_at = $14
            WHERE id = $1
            "#,
        )
        .bind(trend.id)
        .bind(&trend.title)
        .bind(&trend.content)
        .bind(&trend.upvotes)
        .bind(&trend.downvotes)
        .bind(trend.vote_score)
        .bind(trend.comment_count)
        .bind(&trend.rewards)
        .bind(&trend.aggregates)
        .bind(&trend.tags)
        .bind(trend.is_active)
        .bind(trend.views)
        .bind(trend.last_reward_at)
        .bind(trend.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Trend>> {
        let trend = sqlx::query_as::<_, Trend>("SELECT * FROM trends WHERE id = $1 AND is_active")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(trend)
    }

    pub async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Trend>> {
        let trend = sqlx::query_as::<_, Trend>(
            "SELECT * FROM trends WHERE id = $1 AND is_active FOR UPDATE",
        )
        .bind(id)
        .fetch_optional(executor)
        .await?;

        Ok(trend)
    }

    pub async fn increment_views<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE trends SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn list<'e, E: PgExecutor<'e>>(
        executor: E,
        community: Option<Uuid>,
        sort: TrendSort,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Trend>> {
        let mut builder: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT * FROM trends WHERE is_active");
        if let Some(community) = community {
            builder.push(" AND community_id = ").push_bind(community);
        }
        builder.push(" ORDER BY ").push(sort.order_by());
        builder.push(" LIMIT ").push_bind(limit);
        builder.push(" OFFSET ").push_bind(offset);

        let trends = builder.build_query_as::<Trend>().fetch_all(executor).await?;
        Ok(trends)
    }

    pub async fn count<'e, E: PgExecutor<'e>>(executor: E, community: Option<Uuid>) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM trends WHERE is_active AND ($1::uuid IS NULL OR community_id = $1)",
        )
        .bind(community)
        .fetch_one(executor)
        .await?;

        Ok(total)
    }
}

pub struct CommentQueries;

impl CommentQueries {
    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, comment: &Comment) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO comments (id, trend_id, author_id, parent_id, content, depth, vote_score, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(comment.id)
        .bind(comment.trend_id)
        .bind(comment.author_id)
        .bind(comment.parent_id)
        .bind(&comment.content)
        .bind(comment.depth)
        .bind(comment.vote_score)
        .bind(comment.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Comment>> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(comment)
    }

    pub async fn list_top_level<'e, E: PgExecutor<'e>>(executor: E, trend_id: Uuid) -> Result<Vec<Comment>> {
        let comments = sqlx::query_as::<_, Comment>(
            "SELECT * FROM comments WHERE trend_id = $1 AND parent_id IS NULL ORDER BY vote_score DESC, created_at DESC",
        )
        .bind(trend_id)
        .fetch_all(executor)
        .await?;

        Ok(comments)
    }
}

pub struct PromptQueries;

impl PromptQueries {
    pub async fn insert<'e, E: PgExecutor<'e>>(executor: E, prompt: &Prompt) -> Result<()> {
        sqlx::query(
            r#"
            INSERT INTO prompts (
                id, author_id, title, description, prompt_text, result_text, ai_tool, category,
                tags, images, is_public, requires_level, upvoted_by, downvoted_by, views, created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17)
            "#,
        )
        .bind(prompt.id)
        .bind(prompt.author_id)
        .bind(&prompt.title)
        .bind(&prompt.description)
        .bind(&prompt.prompt_text)
        .bind(&prompt.result_text)
        .bind(prompt.ai_tool.as_str())
        .bind(prompt.category.as_str())
        .bind(&prompt.tags)
        .bind(&prompt.images)
        .bind(prompt.is_public)
        .bind(prompt.requires_level.as_str())
        .bind(&prompt.upvoted_by)
        .bind(&prompt.downvoted_by)
        .bind(prompt.views)
        .bind(prompt.created_at)
        .bind(prompt.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn save<'e, E: PgExecutor<'e>>(executor: E, prompt: &Prompt) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE prompts SET
                title = $2, description = $3, prompt_text = $4, result_text = $5, tags = $6,
                images = $7, is_public = $8, upvoted_by = $9, downvoted_by = $10, views = $11,
                ai_tool = $12, category = $13, requires_level = $14, updated_at = $15
            WHERE id = $1
            "#,
        )
        .bind(prompt.id)
        .bind(&prompt.title)
        .bind(&prompt.description)
        .bind(&prompt.prompt_text)
        .bind(&prompt.result_text)
        .bind(&prompt.tags)
        .bind(&prompt.images)
        .bind(prompt.is_public)
        .bind(&prompt.upvoted_by)
        .bind(&prompt.downvoted_by)
        .bind(prompt.views)
        .bind(prompt.ai_tool.as_str())
        .bind(prompt.category.as_str())
        .bind(prompt.requires_level.as_str())
        .bind(prompt.updated_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    pub async fn delete<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
        sqlx::query("DELETE FROM prompts WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn find_by_id<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<Option<Prompt>> {
        let prompt = sqlx::query_as::<_, Prompt>("SELECT * FROM prompts WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(prompt)
    }

    pub async fn find_by_id_for_update<'e, E: PgExecutor<'e>>(
        executor: E,
        id: Uuid,
    ) -> Result<Option<Prompt>> {
        let prompt = sqlx::query_as::<_, Prompt>("SELECT * FROM prompts WHERE id = $1 FOR UPDATE")
            .bind(id)
            .fetch_optional(executor)
            .await?;

        Ok(prompt)
    }

    pub async fn increment_views<'e, E: PgExecutor<'e>>(executor: E, id: Uuid) -> Result<()> {
        sqlx::query("UPDATE prompts SET views = views + 1 WHERE id = $1")
            .bind(id)
            .execute(executor)
            .await?;

        Ok(())
    }

    pub async fn list_public<'e, E: PgExecutor<'e>>(
        executor: E,
        category: Option<PromptCategory>,
        ai_tool: Option<AiTool>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Prompt>> {
        let prompts = sqlx::query_as::<_, Prompt>(
            r#"
            SELECT * FROM prompts
            WHERE is_public
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR ai_tool = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(category.map(|c| c.as_str()))
        .bind(ai_tool.map(|t| t.as_str()))
        .bind(limit)
        .bind(offset)
        .fetch_all(executor)
        .await?;

        Ok(prompts)
    }

    pub async fn count_public<'e, E: PgExecutor<'e>>(
        executor: E,
        category: Option<PromptCategory>,
        ai_tool: Option<AiTool>,
    ) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM prompts
            WHERE is_public
              AND ($1::text IS NULL OR category = $1)
              AND ($2::text IS NULL OR ai_tool = $2)
            "#,
        )
        .bind(category.map(|c| c.as_str()))
        .bind(ai_tool.map(|t| t.as_str()))
        .fetch_one(executor)
        .await?;

        Ok(total)
    }
}
