//! 学习进度服务
//!
//! 处理课时完成、进度查询与结业证书领取：
//! - 完成课时前重新校验报名与前置测验，不信任客户端展示的锁定状态
//! - 完成记录只追加，重复提交返回 `AlreadyCompleted`
//! - 证书领取幂等，重复领取返回同一张证书
//!
//! ## 证书领取流程
//!
//! 1. 报名检查 -> 2. 完成度检查 -> 3. 标记结业 -> 4. 已有证书直接返回
//!    -> 5. 生成编号与证书文件 -> 6. 写入（编号冲突时重试）
//!    -> 7. 邮件通知（异步，失败不影响领取）

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

use learning_shared::config::LearningConfig;
use learning_shared::observability::metrics;

use super::Repositories;
use super::dto::{CourseProgress, completion_percentage};
use crate::access::{LockEvaluator, Prerequisite};
use crate::achievement::AchievementEngine;
use crate::artifact::{ArtifactRequest, CertificateArtifactGenerator};
use crate::error::{ProgressionError, Result};
use crate::models::{
    Certificate, Enrollment, NewCertificate, Progress, generate_certificate_code,
};
use crate::notification::{CertificateEmail, CertificateNotifier};
use crate::repository::{
    CertificateRepositoryTrait, CourseRepositoryTrait, EnrollmentRepositoryTrait,
    LearnerDirectoryTrait,
};
use crate::topology::CourseTopology;

/// 证书编号冲突时的最大生成次数
const MAX_CODE_ATTEMPTS: usize = 3;

/// 学习进度服务
pub struct ProgressService {
    course_repo: Arc<dyn CourseRepositoryTrait>,
    enrollment_repo: Arc<dyn EnrollmentRepositoryTrait>,
    certificate_repo: Arc<dyn CertificateRepositoryTrait>,
    learners: Arc<dyn LearnerDirectoryTrait>,
    topology: CourseTopology,
    lock_evaluator: LockEvaluator,
    achievements: AchievementEngine,
    artifacts: Arc<dyn CertificateArtifactGenerator>,
    notifier: CertificateNotifier,
    points_per_lesson: i64,
}

impl ProgressService {
    pub fn new(
        repos: &Repositories,
        achievements: AchievementEngine,
        artifacts: Arc<dyn CertificateArtifactGenerator>,
        notifier: CertificateNotifier,
        config: &LearningConfig,
    ) -> Self {
        Self {
            course_repo: repos.courses.clone(),
            enrollment_repo: repos.enrollments.clone(),
            certificate_repo: repos.certificates.clone(),
            learners: repos.learners.clone(),
            topology: CourseTopology::new(repos.courses.clone()),
            lock_evaluator: LockEvaluator::new(repos.courses.clone(), repos.enrollments.clone()),
            achievements,
            artifacts,
            notifier,
            points_per_lesson: config.points_per_lesson,
        }
    }

    // ==================== 课时完成 ====================

    /// 标记课时完成
    ///
    /// 成功后为学员增加积分；积分入账失败只记录警告，不回滚完成记录
    #[instrument(skip(self))]
    pub async fn mark_complete(&self, user_id: i64, lesson_id: i64) -> Result<Progress> {
        let result = self.mark_complete_inner(user_id, lesson_id).await;

        match &result {
            Ok(_) => metrics::record_lesson_completion("completed"),
            Err(e) => metrics::record_lesson_completion(e.error_code()),
        }

        result
    }

    async fn mark_complete_inner(&self, user_id: i64, lesson_id: i64) -> Result<Progress> {
        let lesson = self
            .course_repo
            .get_lesson(lesson_id)
            .await?
            .ok_or(ProgressionError::LessonNotFound(lesson_id))?;

        let course_id = self
            .topology
            .resolve_course_id(&lesson)
            .await?
            .ok_or(ProgressionError::LessonNotFound(lesson_id))?;

        let enrollment = self.require_enrollment(user_id, course_id).await?;

        if !lesson.is_preview {
            match self
                .lock_evaluator
                .check_prerequisite(&enrollment, lesson_id)
                .await?
            {
                p if p.is_satisfied() => {}
                Prerequisite::Pending { previous_lesson_id } => {
                    return Err(ProgressionError::LessonLocked {
                        lesson_id,
                        prerequisite_lesson_id: previous_lesson_id,
                    });
                }
                _ => return Err(ProgressionError::LessonNotFound(lesson_id)),
            }
        }

        let progress = self
            .enrollment_repo
            .insert_progress(enrollment.id, lesson_id)
            .await?
            .ok_or(ProgressionError::AlreadyCompleted(lesson_id))?;

        info!(user_id, lesson_id, course_id, "课时已完成");

        self.credit_lesson_points(user_id, course_id).await;

        Ok(progress)
    }

    /// 为新完成的课时入账积分（尽力而为）
    pub(crate) async fn credit_lesson_points(&self, user_id: i64, course_id: i64) {
        if let Err(e) = self
            .achievements
            .add_points_in_course(user_id, self.points_per_lesson, Some(course_id))
            .await
        {
            warn!(user_id, course_id, error = %e, "课时积分入账失败");
        }
    }

    // ==================== 进度查询 ====================

    /// 查询课程学习进度
    #[instrument(skip(self))]
    pub async fn get_progress(&self, user_id: i64, course_id: i64) -> Result<CourseProgress> {
        let enrollment = self.require_enrollment(user_id, course_id).await?;

        let (total, completed, items) = futures::try_join!(
            self.course_repo.count_lessons(course_id),
            self.enrollment_repo.count_progress(enrollment.id),
            self.enrollment_repo.list_progress(enrollment.id),
        )?;

        Ok(CourseProgress {
            course_id,
            percentage: completion_percentage(completed, total),
            completed,
            total,
            items,
        })
    }

    // ==================== 证书 ====================

    /// 领取结业证书
    #[instrument(skip(self))]
    pub async fn claim_certificate(&self, user_id: i64, course_id: i64) -> Result<Certificate> {
        let result = self.claim_certificate_inner(user_id, course_id).await;

        if let Err(e) = &result {
            metrics::record_certificate_claim(e.error_code());
        }

        result
    }

    async fn claim_certificate_inner(&self, user_id: i64, course_id: i64) -> Result<Certificate> {
        let enrollment = self.require_enrollment(user_id, course_id).await?;

        let (total, completed) = futures::try_join!(
            self.course_repo.count_lessons(course_id),
            self.enrollment_repo.count_progress(enrollment.id),
        )?;

        if total == 0 || completed < total {
            return Err(ProgressionError::CourseIncomplete { completed, total });
        }

        if !enrollment.is_finished {
            self.finish_enrollment(&enrollment).await?;
        }

        if let Some(existing) = self
            .certificate_repo
            .get_certificate(user_id, course_id)
            .await?
        {
            debug!(user_id, course_id, certificate_id = existing.id, "证书已存在，直接返回");
            metrics::record_certificate_claim("existing");
            return Ok(existing);
        }

        self.issue_certificate(user_id, course_id).await
    }

    /// 标记结业，并在课程上下文中评估徽章（尽力而为）
    async fn finish_enrollment(&self, enrollment: &Enrollment) -> Result<()> {
        self.enrollment_repo.mark_finished(enrollment.id).await?;
        info!(
            user_id = enrollment.user_id,
            course_id = enrollment.course_id,
            "报名已结业"
        );

        if let Err(e) = self
            .achievements
            .evaluate_badges(enrollment.user_id, Some(enrollment.course_id))
            .await
        {
            warn!(user_id = enrollment.user_id, error = %e, "结业后的徽章评估失败");
        }

        Ok(())
    }

    async fn issue_certificate(&self, user_id: i64, course_id: i64) -> Result<Certificate> {
        let course = self
            .course_repo
            .get_course(course_id)
            .await?
            .ok_or(ProgressionError::CourseNotFound(course_id))?;

        let learner = self.learners.get_learner(user_id).await?;
        let learner_name = learner
            .as_ref()
            .map(|l| l.name.clone())
            .unwrap_or_else(|| format!("Learner #{}", user_id));
        let issue_date = Utc::now();

        for attempt in 1..=MAX_CODE_ATTEMPTS {
            let certificate_code = generate_certificate_code();
            let certificate_url = self
                .artifacts
                .generate(&ArtifactRequest {
                    learner_name: learner_name.clone(),
                    course_title: course.title.clone(),
                    issue_date,
                    certificate_code: certificate_code.clone(),
                })
                .await?;

            let new_certificate = NewCertificate {
                user_id,
                course_id,
                certificate_code,
                course_name_at_issue: course.title.clone(),
                certificate_url,
                issue_date,
            };

            match self.certificate_repo.insert_certificate(&new_certificate).await {
                Ok(Some(certificate)) => {
                    info!(
                        user_id,
                        course_id,
                        certificate_code = %certificate.certificate_code,
                        "证书已签发"
                    );
                    metrics::record_certificate_claim("issued");

                    match learner {
                        Some(learner) => self.notifier.send_certificate_issued(CertificateEmail {
                            to: learner.email,
                            learner_name,
                            course_title: certificate.course_name_at_issue.clone(),
                            certificate_code: certificate.certificate_code.clone(),
                            certificate_url: certificate.certificate_url.clone(),
                            issue_date: certificate.issue_date,
                        }),
                        None => debug!(user_id, "学员资料缺失，跳过证书邮件"),
                    }

                    return Ok(certificate);
                }
                Ok(None) => {
                    // 并发领取的另一方已写入，以数据库中的记录为准
                    metrics::record_certificate_claim("existing");
                    return self
                        .certificate_repo
                        .get_certificate(user_id, course_id)
                        .await?
                        .ok_or_else(|| {
                            ProgressionError::Internal(format!(
                                "证书写入冲突后未找到已有记录: user_id={}, course_id={}",
                                user_id, course_id
                            ))
                        });
                }
                Err(ProgressionError::CertificateCodeConflict) => {
                    warn!(user_id, course_id, attempt, "证书编号冲突，重新生成");
                }
                Err(e) => return Err(e),
            }
        }

        Err(ProgressionError::Internal(format!(
            "证书编号连续 {} 次冲突",
            MAX_CODE_ATTEMPTS
        )))
    }

    /// 按编号查询证书
    pub async fn verify_certificate(&self, code: &str) -> Result<Option<Certificate>> {
        self.certificate_repo
            .get_by_code(&code.trim().to_uppercase())
            .await
    }

    /// 学员的全部证书
    pub async fn list_certificates(&self, user_id: i64) -> Result<Vec<Certificate>> {
        self.certificate_repo.list_user_certificates(user_id).await
    }

    async fn require_enrollment(&self, user_id: i64, course_id: i64) -> Result<Enrollment> {
        self.enrollment_repo
            .get_enrollment(user_id, course_id)
            .await?
            .ok_or(ProgressionError::NotEnrolled { user_id, course_id })
    }
}
