//! 报名与学习进度实体定义
//!
//! 区分两类完成记录：
//! - `CompletedLessons`：已通过测验的课时集合，只用于顺序锁定判断
//! - `Progress`：学员显式标记完成的课时，只用于完成度统计

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 报名记录
///
/// (user_id, course_id) 唯一，`is_finished` 只能从 false 变为 true
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Enrollment {
    pub id: i64,
    pub user_id: i64,
    pub course_id: i64,
    pub enrolled_at: DateTime<Utc>,
    pub is_finished: bool,
}

/// 课时完成记录
///
/// (enrollment_id, lesson_id) 唯一，只追加不覆盖
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub id: i64,
    pub enrollment_id: i64,
    pub lesson_id: i64,
    pub completed_at: DateTime<Utc>,
}

/// 已通过测验的课时集合
///
/// 按通过顺序排列的只增集合，不提供删除操作
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletedLessons(Vec<i64>);

impl CompletedLessons {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, lesson_id: i64) -> bool {
        self.0.contains(&lesson_id)
    }

    /// 追加课时，已存在时返回 false
    pub fn insert(&mut self, lesson_id: i64) -> bool {
        if self.contains(lesson_id) {
            return false;
        }
        self.0.push(lesson_id);
        true
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &i64> {
        self.0.iter()
    }
}

impl FromIterator<i64> for CompletedLessons {
    fn from_iter<I: IntoIterator<Item = i64>>(iter: I) -> Self {
        let mut set = Self::default();
        for id in iter {
            set.insert(id);
        }
        set
    }
}

/// 测验通过后的落库结果
#[derive(Debug, Clone, Default)]
pub struct QuizPassRecord {
    /// 本次是否首次把课时加入已通过集合
    pub newly_completed: bool,
    /// 本次新建的完成记录（已存在时为 None）
    pub progress: Option<Progress>,
}
