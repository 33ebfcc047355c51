//! 课时内容展示
//!
//! 序列化课时给调用方时，正文与视频只在"可见且未锁定"时返回，
//! 否则置空而不是报错。

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::instrument;

use super::context::RequestContext;
use super::lock::LockEvaluator;
use super::resolver::AccessResolver;
use crate::error::Result;
use crate::models::Lesson;
use crate::repository::{CourseRepositoryTrait, EnrollmentRepositoryTrait};
use crate::topology::CourseTopology;

/// 面向调用方的课时视图
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LessonView {
    pub id: i64,
    pub section_id: i64,
    pub title: String,
    pub order: i32,
    pub is_preview: bool,
    pub has_quiz: bool,
    /// 是否因前置测验未通过而锁定
    pub locked: bool,
    /// 调用方是否有权查看内容
    pub accessible: bool,
    pub body: Option<String>,
    pub video_url: Option<String>,
}

impl LessonView {
    fn from_lesson(lesson: &Lesson, accessible: bool, locked: bool) -> Self {
        let reveal = accessible && !locked;
        Self {
            id: lesson.id,
            section_id: lesson.section_id,
            title: lesson.title.clone(),
            order: lesson.order,
            is_preview: lesson.is_preview,
            has_quiz: lesson.has_quiz,
            locked,
            accessible,
            body: lesson.body.clone().filter(|_| reveal),
            video_url: lesson.video_url.clone().filter(|_| reveal),
        }
    }
}

/// 课时内容展示服务
pub struct LessonContentService {
    topology: CourseTopology,
    resolver: AccessResolver,
    lock_evaluator: LockEvaluator,
}

impl LessonContentService {
    pub fn new(
        course_repo: Arc<dyn CourseRepositoryTrait>,
        enrollment_repo: Arc<dyn EnrollmentRepositoryTrait>,
    ) -> Self {
        Self {
            topology: CourseTopology::new(course_repo.clone()),
            resolver: AccessResolver::new(course_repo.clone(), enrollment_repo.clone()),
            lock_evaluator: LockEvaluator::new(course_repo, enrollment_repo),
        }
    }

    pub fn resolver(&self) -> &AccessResolver {
        &self.resolver
    }

    pub fn lock_evaluator(&self) -> &LockEvaluator {
        &self.lock_evaluator
    }

    /// 展示单个课时
    pub async fn present(&self, ctx: &mut RequestContext, lesson: &Lesson) -> LessonView {
        let accessible = self.resolver.can_view_content(ctx, lesson).await;
        let locked = self.lock_evaluator.is_locked(ctx.principal(), lesson).await;
        LessonView::from_lesson(lesson, accessible, locked)
    }

    /// 按大纲顺序展示整门课程
    ///
    /// 可见性经由请求上下文缓存，整门课程只查询一次报名或归属
    #[instrument(skip(self, ctx))]
    pub async fn present_course(
        &self,
        ctx: &mut RequestContext,
        course_id: i64,
    ) -> Result<Vec<LessonView>> {
        let outline = self.topology.outline(course_id).await?;
        let locks = self
            .lock_evaluator
            .lock_map(ctx.principal(), course_id, &outline)
            .await;

        let mut views = Vec::with_capacity(outline.total_lessons());
        for lesson in outline.linearize() {
            let accessible = self.resolver.can_view_content(ctx, lesson).await;
            let locked = locks.get(&lesson.id).copied().unwrap_or(!lesson.is_preview);
            views.push(LessonView::from_lesson(lesson, accessible, locked));
        }

        Ok(views)
    }
}
