//! 积分与徽章仓储
//!
//! 排行榜只做增量更新；徽章授予依赖 (user_id, badge_id) 唯一约束防止重复

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::AchievementRepositoryTrait;
use crate::error::Result;
use crate::models::{BadgeRow, LeaderboardEntry, UserBadge};

/// 积分与徽章仓储
pub struct AchievementRepository {
    pool: PgPool,
}

impl AchievementRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 排行榜 ====================

    /// 原子增加积分
    ///
    /// 单条 upsert 完成"不存在则创建、存在则累加"，避免读改写并发丢失更新
    pub async fn increment_points(&self, user_id: i64, delta: i64) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO leaderboard (user_id, total_points, updated_at)
            VALUES ($1, $2, NOW())
            ON CONFLICT (user_id) DO UPDATE SET
                total_points = leaderboard.total_points + EXCLUDED.total_points,
                updated_at = NOW()
            RETURNING total_points
            "#,
        )
        .bind(user_id)
        .bind(delta)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    pub async fn get_points(&self, user_id: i64) -> Result<Option<i64>> {
        let points: Option<i64> =
            sqlx::query_scalar("SELECT total_points FROM leaderboard WHERE user_id = $1")
                .bind(user_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(points)
    }

    pub async fn top_entries(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let entries = sqlx::query_as::<_, LeaderboardEntry>(
            r#"
            SELECT user_id, total_points, updated_at
            FROM leaderboard
            ORDER BY total_points DESC, updated_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }

    pub async fn count_entries_above(&self, points: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM leaderboard WHERE total_points > $1")
                .bind(points)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    pub async fn count_entries_at_or_below(&self, points: i64) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM leaderboard WHERE total_points <= $1")
                .bind(points)
                .fetch_one(&self.pool)
                .await?;

        Ok(count)
    }

    pub async fn count_entries(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM leaderboard")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // ==================== 徽章 ====================

    pub async fn list_badges_in_scope(&self, course_id: Option<i64>) -> Result<Vec<BadgeRow>> {
        let badges = sqlx::query_as::<_, BadgeRow>(
            r#"
            SELECT id, name, description, criteria, course_id, creator_id, created_at
            FROM badges
            WHERE course_id IS NULL
               OR ($1::BIGINT IS NOT NULL AND course_id = $1)
            ORDER BY id ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(badges)
    }

    pub async fn has_user_badge(&self, user_id: i64, badge_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM user_badges WHERE user_id = $1 AND badge_id = $2)",
        )
        .bind(user_id)
        .bind(badge_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    /// 授予徽章
    ///
    /// 存在性预检查与插入不是原子的，并发评估时由唯一约束兜底
    pub async fn insert_user_badge(&self, user_id: i64, badge_id: i64) -> Result<bool> {
        let affected = sqlx::query(
            r#"
            INSERT INTO user_badges (user_id, badge_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, badge_id) DO NOTHING
            "#,
        )
        .bind(user_id)
        .bind(badge_id)
        .execute(&self.pool)
        .await?
        .rows_affected();

        Ok(affected > 0)
    }

    pub async fn list_user_badges(&self, user_id: i64) -> Result<Vec<UserBadge>> {
        let badges = sqlx::query_as::<_, UserBadge>(
            r#"
            SELECT id, user_id, badge_id, awarded_at
            FROM user_badges
            WHERE user_id = $1
            ORDER BY awarded_at DESC, id DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(badges)
    }
}

#[async_trait]
impl AchievementRepositoryTrait for AchievementRepository {
    async fn increment_points(&self, user_id: i64, delta: i64) -> Result<i64> {
        self.increment_points(user_id, delta).await
    }

    async fn get_points(&self, user_id: i64) -> Result<Option<i64>> {
        self.get_points(user_id).await
    }

    async fn top_entries(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        self.top_entries(limit).await
    }

    async fn count_entries_above(&self, points: i64) -> Result<i64> {
        self.count_entries_above(points).await
    }

    async fn count_entries_at_or_below(&self, points: i64) -> Result<i64> {
        self.count_entries_at_or_below(points).await
    }

    async fn count_entries(&self) -> Result<i64> {
        self.count_entries().await
    }

    async fn list_badges_in_scope(&self, course_id: Option<i64>) -> Result<Vec<BadgeRow>> {
        self.list_badges_in_scope(course_id).await
    }

    async fn has_user_badge(&self, user_id: i64, badge_id: i64) -> Result<bool> {
        self.has_user_badge(user_id, badge_id).await
    }

    async fn insert_user_badge(&self, user_id: i64, badge_id: i64) -> Result<bool> {
        self.insert_user_badge(user_id, badge_id).await
    }

    async fn list_user_badges(&self, user_id: i64) -> Result<Vec<UserBadge>> {
        self.list_user_badges(user_id).await
    }
}
