//! 学习进度引擎错误类型
//!
//! 定义服务层的业务错误和系统错误。
//! 访问判定（可见性、锁定）从不返回错误，失败一律按拒绝处理；
//! 只有变更类操作（完成课时、领取证书、提交测验等）才会返回以下错误。

use thiserror::Error;

/// 学习进度引擎错误类型
#[derive(Debug, Error)]
pub enum ProgressionError {
    // === 学习状态相关错误 ===
    #[error("未报名该课程: user_id={user_id}, course_id={course_id}")]
    NotEnrolled { user_id: i64, course_id: i64 },

    #[error("课时已锁定，请先通过上一课时的测验: lesson_id={lesson_id}, 前置课时={prerequisite_lesson_id}")]
    LessonLocked {
        lesson_id: i64,
        prerequisite_lesson_id: i64,
    },

    #[error("课时已完成，不能重复提交: lesson_id={0}")]
    AlreadyCompleted(i64),

    #[error("课程尚未学完，无法领取证书: 已完成 {completed}/{total}")]
    CourseIncomplete { completed: i64, total: i64 },

    #[error("该课时没有测验: lesson_id={0}")]
    QuizNotFound(i64),

    // === 身份相关错误 ===
    #[error("未授权的操作")]
    Unauthorized,

    // === 资源相关错误 ===
    #[error("课时不存在: {0}")]
    LessonNotFound(i64),

    #[error("课程不存在: {0}")]
    CourseNotFound(i64),

    // === 系统错误 ===
    #[error("证书编号冲突，需要重新生成")]
    CertificateCodeConflict,

    #[error("外部服务错误: {0}")]
    Collaborator(String),

    #[error("数据库错误: {0}")]
    Database(#[from] sqlx::Error),

    #[error("JSON 序列化错误: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("内部错误: {0}")]
    Internal(String),
}

/// 学习进度引擎 Result 类型别名
pub type Result<T> = std::result::Result<T, ProgressionError>;

impl ProgressionError {
    /// 检查是否为可重试的错误
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Database(_) | Self::CertificateCodeConflict | Self::Collaborator(_)
        )
    }

    /// 检查是否为业务错误（非系统错误）
    pub fn is_business_error(&self) -> bool {
        matches!(
            self,
            Self::NotEnrolled { .. }
                | Self::LessonLocked { .. }
                | Self::AlreadyCompleted(_)
                | Self::CourseIncomplete { .. }
                | Self::QuizNotFound(_)
                | Self::Unauthorized
                | Self::LessonNotFound(_)
                | Self::CourseNotFound(_)
                | Self::Validation(_)
        )
    }

    /// 获取错误码（用于 API 响应）
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotEnrolled { .. } => "NOT_ENROLLED",
            Self::LessonLocked { .. } => "LESSON_LOCKED",
            Self::AlreadyCompleted(_) => "ALREADY_COMPLETED",
            Self::CourseIncomplete { .. } => "COURSE_INCOMPLETE",
            Self::QuizNotFound(_) => "QUIZ_NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::LessonNotFound(_) => "LESSON_NOT_FOUND",
            Self::CourseNotFound(_) => "COURSE_NOT_FOUND",
            Self::CertificateCodeConflict => "CERTIFICATE_CODE_CONFLICT",
            Self::Collaborator(_) => "COLLABORATOR_ERROR",
            Self::Database(_) => "DATABASE_ERROR",
            Self::Serialization(_) => "SERIALIZATION_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}
