//! 服务层数据传输对象

use serde::{Deserialize, Serialize};

use crate::models::Progress;

/// 课程学习进度
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseProgress {
    pub course_id: i64,
    /// 完成百分比，两位小数
    pub percentage: f64,
    pub completed: i64,
    pub total: i64,
    /// 完成记录，最近完成的在前
    pub items: Vec<Progress>,
}

/// 测验结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuizResult {
    pub lesson_id: i64,
    pub passed: bool,
    /// 答对题数
    pub score: i64,
    /// 题目总数
    pub total: i64,
    /// 本次是否新记录了课时完成
    pub recorded: bool,
}

impl QuizResult {
    /// 正确率（0.0 ~ 1.0），无题目时为 0
    pub fn ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.score as f64 / self.total as f64
        }
    }
}

/// 完成百分比，保留两位小数；总数为 0 时为 0
pub fn completion_percentage(completed: i64, total: i64) -> f64 {
    if total <= 0 {
        return 0.0;
    }
    let raw = completed as f64 / total as f64 * 100.0;
    (raw * 100.0).round() / 100.0
}
