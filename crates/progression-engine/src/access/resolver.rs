//! 课时可见性判定
//!
//! ## 判定顺序
//!
//! 1. 试看课时 -> 允许（包括匿名调用方）
//! 2. 匿名 -> 拒绝
//! 3. 管理员 -> 允许
//! 4. 解析课时所属课程，失败则拒绝
//! 5. 命中请求内缓存 -> 直接返回
//! 6. 讲师且拥有该课程 -> 允许并缓存
//! 7. 否则以是否报名为准，并缓存结果

use std::sync::Arc;

use tracing::{debug, warn};

use learning_shared::observability::metrics;

use super::context::RequestContext;
use crate::error::Result;
use crate::models::{Lesson, Principal, Role};
use crate::repository::{CourseRepositoryTrait, EnrollmentRepositoryTrait};
use crate::topology::CourseTopology;

/// 课时可见性判定器
#[derive(Clone)]
pub struct AccessResolver {
    topology: CourseTopology,
    course_repo: Arc<dyn CourseRepositoryTrait>,
    enrollment_repo: Arc<dyn EnrollmentRepositoryTrait>,
}

impl AccessResolver {
    pub fn new(
        course_repo: Arc<dyn CourseRepositoryTrait>,
        enrollment_repo: Arc<dyn EnrollmentRepositoryTrait>,
    ) -> Self {
        Self {
            topology: CourseTopology::new(course_repo.clone()),
            course_repo,
            enrollment_repo,
        }
    }

    /// 调用方能否查看课时正文与视频
    pub async fn can_view_content(&self, ctx: &mut RequestContext, lesson: &Lesson) -> bool {
        if lesson.is_preview {
            return true;
        }

        let Some(principal) = ctx.principal().copied() else {
            metrics::record_access_denied("anonymous");
            return false;
        };

        if principal.is_admin() {
            return true;
        }

        let course_id = match self.topology.resolve_course_id(lesson).await {
            Ok(Some(course_id)) => course_id,
            Ok(None) => {
                debug!(lesson_id = lesson.id, "课时所属章节不存在，拒绝访问");
                metrics::record_access_denied("unresolved_course");
                return false;
            }
            Err(e) => {
                warn!(lesson_id = lesson.id, error = %e, "解析课时所属课程失败，拒绝访问");
                metrics::record_access_denied("lookup_failed");
                return false;
            }
        };

        if let Some(allowed) = ctx.cached_access(course_id) {
            return allowed;
        }

        // 查询失败不写入缓存，同一请求内后续课时会重新查询
        match self.resolve_course_access(&principal, course_id).await {
            Ok(allowed) => {
                ctx.remember_access(course_id, allowed);
                if !allowed {
                    metrics::record_access_denied("not_enrolled");
                }
                allowed
            }
            Err(e) => {
                warn!(
                    user_id = principal.id,
                    course_id,
                    error = %e,
                    "查询课程访问权限失败，拒绝访问"
                );
                metrics::record_access_denied("lookup_failed");
                false
            }
        }
    }

    async fn resolve_course_access(&self, principal: &Principal, course_id: i64) -> Result<bool> {
        if principal.role == Role::Instructor
            && let Some(course) = self.course_repo.get_course(course_id).await?
            && course.is_owned_by(principal.id)
        {
            return Ok(true);
        }

        let enrollment = self
            .enrollment_repo
            .get_enrollment(principal.id, course_id)
            .await?;
        Ok(enrollment.is_some())
    }
}
