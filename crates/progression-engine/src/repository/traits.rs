//! 仓储 Trait 定义
//!
//! 定义仓储接口，便于服务层依赖抽象而非具体实现，支持 mock 测试。
//!
//! 可能并发冲突的写入统一约定：唯一约束冲突不作为错误返回，
//! 而是以 `None` / `false` 表示"记录已存在"，由服务层翻译为对应的业务结果。

use async_trait::async_trait;

use crate::error::Result;
use crate::models::{
    BadgeRow, Certificate, Course, Enrollment, LeaderboardEntry, LearnerProfile, Lesson,
    NewCertificate, NewSection, Progress, Quiz, QuizPassRecord, QuizQuestion, Section, UserBadge,
};

/// 课程结构仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CourseRepositoryTrait: Send + Sync {
    async fn get_course(&self, course_id: i64) -> Result<Option<Course>>;
    async fn get_section(&self, section_id: i64) -> Result<Option<Section>>;

    /// 获取课时（附带 has_quiz 与 course_id）
    async fn get_lesson(&self, lesson_id: i64) -> Result<Option<Lesson>>;

    async fn list_sections(&self, course_id: i64) -> Result<Vec<Section>>;

    /// 列出课程下全部课时（附带 has_quiz 与 course_id，不保证顺序）
    async fn list_course_lessons(&self, course_id: i64) -> Result<Vec<Lesson>>;

    async fn count_lessons(&self, course_id: i64) -> Result<i64>;

    /// 课程是否已有任何学员学习记录
    async fn has_learner_progress(&self, course_id: i64) -> Result<bool>;

    /// 在单个事务内整体替换课程大纲
    async fn replace_curriculum(&self, course_id: i64, sections: &[NewSection]) -> Result<()>;
}

/// 报名与进度仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EnrollmentRepositoryTrait: Send + Sync {
    async fn get_enrollment(&self, user_id: i64, course_id: i64) -> Result<Option<Enrollment>>;

    /// 创建报名记录，已存在时返回原记录
    async fn create_enrollment(&self, user_id: i64, course_id: i64) -> Result<Enrollment>;

    /// 已通过测验的课时 ID（按通过顺序）
    async fn list_completed_lessons(&self, enrollment_id: i64) -> Result<Vec<i64>>;

    /// 写入完成记录，(enrollment_id, lesson_id) 已存在时返回 None
    async fn insert_progress(&self, enrollment_id: i64, lesson_id: i64)
    -> Result<Option<Progress>>;

    /// 完成记录，按完成时间倒序
    async fn list_progress(&self, enrollment_id: i64) -> Result<Vec<Progress>>;

    async fn count_progress(&self, enrollment_id: i64) -> Result<i64>;

    /// 在单个事务内记录测验通过：加入已通过集合，并在缺失时补写完成记录
    async fn record_quiz_pass(&self, enrollment_id: i64, lesson_id: i64)
    -> Result<QuizPassRecord>;

    /// 标记结业（单向，已结业时不做任何修改）
    async fn mark_finished(&self, enrollment_id: i64) -> Result<()>;

    /// 用户完成记录总数，course_id 为 Some 时只统计该课程
    async fn count_user_progress(&self, user_id: i64, course_id: Option<i64>) -> Result<i64>;

    /// 用户已结业课程数，course_id 为 Some 时只统计该课程
    async fn count_finished_enrollments(&self, user_id: i64, course_id: Option<i64>)
    -> Result<i64>;
}

/// 测验仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepositoryTrait: Send + Sync {
    async fn get_quiz_by_lesson(&self, lesson_id: i64) -> Result<Option<Quiz>>;
    async fn list_questions(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>>;
}

/// 证书仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CertificateRepositoryTrait: Send + Sync {
    async fn get_certificate(&self, user_id: i64, course_id: i64) -> Result<Option<Certificate>>;
    async fn get_by_code(&self, code: &str) -> Result<Option<Certificate>>;

    /// 写入证书
    ///
    /// (user_id, course_id) 已存在时返回 None；
    /// 证书编号冲突时返回 `ProgressionError::CertificateCodeConflict`
    async fn insert_certificate(&self, certificate: &NewCertificate)
    -> Result<Option<Certificate>>;

    async fn list_user_certificates(&self, user_id: i64) -> Result<Vec<Certificate>>;
}

/// 积分与徽章仓储接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AchievementRepositoryTrait: Send + Sync {
    /// 原子增加积分（不存在时以 delta 创建），返回新的总积分
    async fn increment_points(&self, user_id: i64, delta: i64) -> Result<i64>;

    async fn get_points(&self, user_id: i64) -> Result<Option<i64>>;

    /// 按总积分倒序
    async fn top_entries(&self, limit: i64) -> Result<Vec<LeaderboardEntry>>;

    /// 积分严格大于 points 的条目数
    async fn count_entries_above(&self, points: i64) -> Result<i64>;

    /// 积分小于等于 points 的条目数
    async fn count_entries_at_or_below(&self, points: i64) -> Result<i64>;

    async fn count_entries(&self) -> Result<i64>;

    /// 作用域内可见的徽章：全局徽章，以及 course_id 为 Some 时该课程的徽章
    async fn list_badges_in_scope(&self, course_id: Option<i64>) -> Result<Vec<BadgeRow>>;

    async fn has_user_badge(&self, user_id: i64, badge_id: i64) -> Result<bool>;

    /// 授予徽章，已持有时返回 false
    async fn insert_user_badge(&self, user_id: i64, badge_id: i64) -> Result<bool>;

    /// 用户已获得的徽章，按获得时间倒序
    async fn list_user_badges(&self, user_id: i64) -> Result<Vec<UserBadge>>;
}

/// 学员资料查询接口
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LearnerDirectoryTrait: Send + Sync {
    async fn get_learner(&self, user_id: i64) -> Result<Option<LearnerProfile>>;
}
