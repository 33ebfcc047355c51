//! 顺序锁定判定
//!
//! 只检查线性序列中紧邻的上一课时：上一课时带测验且未通过时锁定。
//! 不做全前缀校验，每次判定最多涉及一个前置课时。
//!
//! 失败一律按锁定处理：未报名、课程无法解析、大纲加载失败均视为锁定；
//! 已通过集合读取失败时按空集合处理。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::Result;
use crate::models::{CompletedLessons, Enrollment, Lesson, Principal};
use crate::repository::{CourseRepositoryTrait, EnrollmentRepositoryTrait};
use crate::topology::{CourseOutline, CourseTopology};

/// 前置条件判定结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Prerequisite {
    /// 课程首个课时
    FirstLesson,
    /// 上一课时没有测验
    Ungated { previous_lesson_id: i64 },
    /// 上一课时的测验已通过
    Passed { previous_lesson_id: i64 },
    /// 上一课时的测验尚未通过
    Pending { previous_lesson_id: i64 },
    /// 课时不在该课程的大纲中
    NotInCourse,
}

impl Prerequisite {
    pub fn is_satisfied(&self) -> bool {
        matches!(
            self,
            Self::FirstLesson | Self::Ungated { .. } | Self::Passed { .. }
        )
    }
}

/// 判定课时的前置条件（纯函数）
pub fn evaluate_prerequisite(
    outline: &CourseOutline,
    lesson_id: i64,
    completed: &CompletedLessons,
) -> Prerequisite {
    let Some(index) = outline.position(lesson_id) else {
        return Prerequisite::NotInCourse;
    };
    if index == 0 {
        return Prerequisite::FirstLesson;
    }

    let Some(previous) = outline.previous(lesson_id) else {
        return Prerequisite::NotInCourse;
    };
    let previous_lesson_id = previous.id;

    if !previous.has_quiz {
        Prerequisite::Ungated { previous_lesson_id }
    } else if completed.contains(previous_lesson_id) {
        Prerequisite::Passed { previous_lesson_id }
    } else {
        Prerequisite::Pending { previous_lesson_id }
    }
}

/// 顺序锁定判定器
#[derive(Clone)]
pub struct LockEvaluator {
    topology: CourseTopology,
    enrollment_repo: Arc<dyn EnrollmentRepositoryTrait>,
}

impl LockEvaluator {
    pub fn new(
        course_repo: Arc<dyn CourseRepositoryTrait>,
        enrollment_repo: Arc<dyn EnrollmentRepositoryTrait>,
    ) -> Self {
        Self {
            topology: CourseTopology::new(course_repo),
            enrollment_repo,
        }
    }

    /// 课时对调用方是否处于锁定状态
    ///
    /// 试看课时、匿名调用方、讲师与管理员永不锁定
    pub async fn is_locked(&self, principal: Option<&Principal>, lesson: &Lesson) -> bool {
        if lesson.is_preview {
            return false;
        }
        let Some(principal) = principal.filter(|p| p.is_student()) else {
            return false;
        };

        match self.prerequisite_for_learner(principal.id, lesson).await {
            Ok(Some(prerequisite)) => !prerequisite.is_satisfied(),
            Ok(None) => true,
            Err(e) => {
                warn!(
                    user_id = principal.id,
                    lesson_id = lesson.id,
                    error = %e,
                    "锁定判定失败，按锁定处理"
                );
                true
            }
        }
    }

    /// 一次性判定课程内全部课时的锁定状态（lesson_id -> 是否锁定）
    ///
    /// 大纲由调用方提供，整门课程只查询一次报名与已通过集合
    pub async fn lock_map(
        &self,
        principal: Option<&Principal>,
        course_id: i64,
        outline: &CourseOutline,
    ) -> HashMap<i64, bool> {
        let Some(principal) = principal.filter(|p| p.is_student()) else {
            return outline.linearize().map(|l| (l.id, false)).collect();
        };

        let completed = match self.enrollment_repo.get_enrollment(principal.id, course_id).await {
            Ok(Some(enrollment)) => Some(self.load_completed(&enrollment).await),
            Ok(None) => None,
            Err(e) => {
                warn!(user_id = principal.id, course_id, error = %e, "查询报名失败，按锁定处理");
                None
            }
        };

        outline
            .linearize()
            .map(|lesson| {
                let locked = if lesson.is_preview {
                    false
                } else {
                    match &completed {
                        Some(completed) => {
                            !evaluate_prerequisite(outline, lesson.id, completed).is_satisfied()
                        }
                        None => true,
                    }
                };
                (lesson.id, locked)
            })
            .collect()
    }

    /// 在已知报名记录时判定课时前置条件
    ///
    /// 供变更类操作复用，大纲加载失败时返回错误而不是默认锁定
    pub async fn check_prerequisite(
        &self,
        enrollment: &Enrollment,
        lesson_id: i64,
    ) -> Result<Prerequisite> {
        let outline = self.topology.outline(enrollment.course_id).await?;
        let completed = self.load_completed(enrollment).await;
        Ok(evaluate_prerequisite(&outline, lesson_id, &completed))
    }

    /// 学员视角的前置条件；未报名或课程无法解析时返回 None
    async fn prerequisite_for_learner(
        &self,
        user_id: i64,
        lesson: &Lesson,
    ) -> Result<Option<Prerequisite>> {
        let Some(course_id) = self.topology.resolve_course_id(lesson).await? else {
            debug!(lesson_id = lesson.id, "课时所属课程无法解析");
            return Ok(None);
        };

        let Some(enrollment) = self.enrollment_repo.get_enrollment(user_id, course_id).await?
        else {
            debug!(user_id, course_id, "未报名，课时锁定");
            return Ok(None);
        };

        self.check_prerequisite(&enrollment, lesson.id).await.map(Some)
    }

    async fn load_completed(&self, enrollment: &Enrollment) -> CompletedLessons {
        match self.enrollment_repo.list_completed_lessons(enrollment.id).await {
            Ok(ids) => ids.into_iter().collect(),
            Err(e) => {
                warn!(
                    enrollment_id = enrollment.id,
                    error = %e,
                    "读取已通过课时失败，按空集合处理"
                );
                CompletedLessons::new()
            }
        }
    }
}
