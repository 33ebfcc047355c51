//! 积分与徽章实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::achievement::BadgeCriteria;

/// 排行榜条目
///
/// 每个用户一条，total_points 只通过增量更新，不会减少
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardEntry {
    pub user_id: i64,
    pub total_points: i64,
    pub updated_at: DateTime<Utc>,
}

/// 徽章数据库行（criteria 为原始字符串）
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BadgeRow {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub criteria: String,
    pub course_id: Option<i64>,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
}

/// 徽章定义
///
/// 加载时即把 criteria 字符串解析为 `BadgeCriteria`，评估阶段不再做字符串匹配。
/// `course_id` 为空表示全局徽章，否则计数只统计该课程
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Badge {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub criteria: BadgeCriteria,
    pub course_id: Option<i64>,
    pub creator_id: i64,
    pub created_at: DateTime<Utc>,
}

impl Badge {
    pub fn is_global(&self) -> bool {
        self.course_id.is_none()
    }
}

impl From<BadgeRow> for Badge {
    fn from(row: BadgeRow) -> Self {
        Self {
            id: row.id,
            name: row.name,
            description: row.description,
            criteria: BadgeCriteria::parse(&row.criteria),
            course_id: row.course_id,
            creator_id: row.creator_id,
            created_at: row.created_at,
        }
    }
}

/// 用户已获得的徽章
///
/// (user_id, badge_id) 唯一，只追加
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct UserBadge {
    pub id: i64,
    pub user_id: i64,
    pub badge_id: i64,
    pub awarded_at: DateTime<Utc>,
}
