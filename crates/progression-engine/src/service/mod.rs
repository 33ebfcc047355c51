//! 业务服务层
//!
//! 编排仓储、访问控制与积分引擎，实现对外的变更与查询操作。

mod curriculum_service;
pub mod dto;
mod progress_service;
mod quiz_service;

use std::sync::Arc;

use sqlx::PgPool;

use learning_shared::config::LearningConfig;

use crate::access::LessonContentService;
use crate::achievement::AchievementEngine;
use crate::artifact::{CertificateArtifactGenerator, UrlCertificateGenerator};
use crate::notification::{CertificateMailer, CertificateNotifier, LogCertificateMailer};
use crate::repository::{
    AchievementRepository, AchievementRepositoryTrait, CertificateRepository,
    CertificateRepositoryTrait, CourseRepository, CourseRepositoryTrait, EnrollmentRepository,
    EnrollmentRepositoryTrait, LearnerDirectoryTrait, LearnerRepository, QuizRepository,
    QuizRepositoryTrait,
};

pub use curriculum_service::{CurriculumService, validate_curriculum};
pub use dto::{CourseProgress, QuizResult, completion_percentage};
pub use progress_service::ProgressService;
pub use quiz_service::{QuizService, grade, is_passing};

/// 服务依赖的全部仓储
#[derive(Clone)]
pub struct Repositories {
    pub courses: Arc<dyn CourseRepositoryTrait>,
    pub enrollments: Arc<dyn EnrollmentRepositoryTrait>,
    pub quizzes: Arc<dyn QuizRepositoryTrait>,
    pub certificates: Arc<dyn CertificateRepositoryTrait>,
    pub achievements: Arc<dyn AchievementRepositoryTrait>,
    pub learners: Arc<dyn LearnerDirectoryTrait>,
}

impl Repositories {
    /// 基于 PostgreSQL 连接池创建全部仓储
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            courses: Arc::new(CourseRepository::new(pool.clone())),
            enrollments: Arc::new(EnrollmentRepository::new(pool.clone())),
            quizzes: Arc::new(QuizRepository::new(pool.clone())),
            certificates: Arc::new(CertificateRepository::new(pool.clone())),
            achievements: Arc::new(AchievementRepository::new(pool.clone())),
            learners: Arc::new(LearnerRepository::new(pool)),
        }
    }
}

/// 外部协作方
#[derive(Clone)]
pub struct Collaborators {
    pub artifacts: Arc<dyn CertificateArtifactGenerator>,
    pub mailer: Arc<dyn CertificateMailer>,
}

impl Collaborators {
    /// 默认实现：按配置前缀拼接证书 URL，邮件只写日志
    pub fn defaults(config: &LearningConfig) -> Self {
        Self {
            artifacts: Arc::new(UrlCertificateGenerator::new(
                config.certificate_base_url.clone(),
            )),
            mailer: Arc::new(LogCertificateMailer),
        }
    }
}

/// 已装配的全部服务
pub struct ProgressionServices {
    pub content: LessonContentService,
    pub progress: ProgressService,
    pub quizzes: QuizService,
    pub curriculum: CurriculumService,
    pub achievements: AchievementEngine,
    pub enrollments: Arc<dyn EnrollmentRepositoryTrait>,
}

impl ProgressionServices {
    pub fn new(repos: Repositories, collaborators: Collaborators, config: &LearningConfig) -> Self {
        let achievements =
            AchievementEngine::new(repos.achievements.clone(), repos.enrollments.clone());
        let notifier = CertificateNotifier::new(collaborators.mailer);

        Self {
            content: LessonContentService::new(repos.courses.clone(), repos.enrollments.clone()),
            progress: ProgressService::new(
                &repos,
                achievements.clone(),
                collaborators.artifacts,
                notifier,
                config,
            ),
            quizzes: QuizService::new(&repos, achievements.clone(), config),
            curriculum: CurriculumService::new(&repos),
            achievements,
            enrollments: repos.enrollments,
        }
    }
}
