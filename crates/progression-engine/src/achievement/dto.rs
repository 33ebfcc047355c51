//! 排行榜与成就统计 DTO

use serde::{Deserialize, Serialize};

use crate::models::UserBadge;

/// 排行榜中的一名学员
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RankedLearner {
    /// 从 1 开始的名次（按位置标注）
    pub rank: i64,
    pub user_id: i64,
    pub total_points: i64,
}

/// 学员成就统计
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AchievementStats {
    pub user_id: i64,
    pub total_points: i64,
    /// 积分严格高于自己的人数 + 1
    pub rank: i64,
    /// 积分不高于自己的条目占比 × 100，四舍五入保留两位小数（2/3 为 66.67）
    pub percentile: f64,
    /// 已获得徽章，最近获得的在前
    pub badges: Vec<UserBadge>,
}

/// 排行榜概况
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaderboardSnapshot {
    pub entries: i64,
    /// 排行榜为空时为 0
    pub top_points: i64,
}

/// 计算百分位
///
/// 返回 `at_or_below / total * 100` 四舍五入到两位小数的值。
/// 仅有一个条目时固定为 100，没有条目时为 0
pub fn percentile(at_or_below: i64, total: i64) -> f64 {
    match total {
        t if t <= 0 => 0.0,
        1 => 100.0,
        t => {
            let raw = at_or_below as f64 / t as f64 * 100.0;
            (raw * 100.0).round() / 100.0
        }
    }
}
