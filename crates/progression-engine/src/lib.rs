//! 课程学习进度引擎
//!
//! 决定学员能否查看课时内容、课时是否被前置测验锁定，
//! 记录学习进度与结业证书，维护积分排行榜与徽章。
//!
//! ## 核心功能
//!
//! - **访问控制**：试看、报名、讲师归属、管理员四类放行规则，请求内缓存课程级结果
//! - **顺序锁定**：上一课时带测验且未通过时锁定当前课时（只看上一课时）
//! - **学习进度**：课时完成、完成度统计、幂等的结业证书领取
//! - **测验判分**：包含边界的通过门槛，通过后记录课时并入账积分
//! - **积分徽章**：积分只增不减，每次变动后按固定条件词表评估徽章
//!
//! ## 模块结构
//!
//! - `models`: 领域模型定义
//! - `error`: 错误类型定义
//! - `repository`: 数据库仓储层
//! - `topology`: 课程结构读取
//! - `access`: 可见性与锁定判定
//! - `achievement`: 积分与徽章引擎
//! - `service`: 业务服务层
//! - `artifact`: 证书文件生成接口
//! - `notification`: 证书通知
//! - `cli`: 运维命令行

pub mod access;
pub mod achievement;
pub mod artifact;
pub mod cli;
pub mod error;
pub mod models;
pub mod notification;
pub mod repository;
pub mod service;
pub mod topology;

pub use access::{
    AccessResolver, LessonContentService, LessonView, LockEvaluator, Prerequisite, RequestContext,
};
pub use achievement::{
    AchievementEngine, AchievementStats, BadgeCriteria, LeaderboardSnapshot, RankedLearner,
};
pub use artifact::{ArtifactRequest, CertificateArtifactGenerator, UrlCertificateGenerator};
pub use error::{ProgressionError, Result};
pub use models::*;
pub use notification::{
    CertificateEmail, CertificateMailer, CertificateNotifier, LogCertificateMailer,
};
pub use repository::{
    AchievementRepository, CertificateRepository, CourseRepository, EnrollmentRepository,
    LearnerRepository, QuizRepository,
};
pub use service::{
    Collaborators, CourseProgress, CurriculumService, ProgressService, ProgressionServices,
    QuizResult, QuizService, Repositories, dto,
};
pub use topology::{CourseOutline, CourseTopology};
