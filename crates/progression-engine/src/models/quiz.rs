//! 测验实体定义

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 测验（每个课时最多一个）
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Quiz {
    pub id: i64,
    pub lesson_id: i64,
    pub created_at: DateTime<Utc>,
}

/// 测验题目
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct QuizQuestion {
    pub id: i64,
    pub quiz_id: i64,
    pub prompt: String,
    /// 选项文本列表（JSON 数组）
    pub options: serde_json::Value,
    /// 正确选项下标（从 0 开始）
    pub correct_option: i32,
}

/// 学员作答
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizAnswer {
    pub question_id: i64,
    pub selected_option: i32,
}

impl QuizAnswer {
    pub fn new(question_id: i64, selected_option: i32) -> Self {
        Self {
            question_id,
            selected_option,
        }
    }
}
