//! 课程结构实体定义
//!
//! 课程 -> 章节 -> 课时，章节和课时均按 order 字段升序排列

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 课程
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    pub id: i64,
    /// 课程所属讲师
    pub owner_id: i64,
    pub title: String,
    pub published: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Course {
    pub fn is_owned_by(&self, user_id: i64) -> bool {
        self.owner_id == user_id
    }
}

/// 章节
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Section {
    pub id: i64,
    pub course_id: i64,
    pub title: String,
    /// 课程内的排序键
    #[sqlx(rename = "sort_order")]
    pub order: i32,
}

/// 课时
///
/// `has_quiz` 由查询派生（存在引用该课时的测验即为 true），
/// `course_id` 仅在查询时关联了章节表才会填充
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Lesson {
    pub id: i64,
    pub section_id: i64,
    pub title: String,
    /// 章节内的排序键
    #[sqlx(rename = "sort_order")]
    pub order: i32,
    /// 试看课时：跳过报名检查与顺序锁定
    pub is_preview: bool,
    #[sqlx(default)]
    pub body: Option<String>,
    #[sqlx(default)]
    pub video_url: Option<String>,
    #[sqlx(default)]
    pub has_quiz: bool,
    #[sqlx(default)]
    pub course_id: Option<i64>,
}

/// 大纲替换请求中的章节
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSection {
    pub title: String,
    pub order: i32,
    pub lessons: Vec<NewLesson>,
}

/// 大纲替换请求中的课时
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewLesson {
    pub title: String,
    pub order: i32,
    #[serde(default)]
    pub is_preview: bool,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub video_url: Option<String>,
}
