//! 课程大纲服务

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{info, instrument};

use super::Repositories;
use crate::error::{ProgressionError, Result};
use crate::models::{NewSection, Principal, Role};
use crate::repository::CourseRepositoryTrait;

/// 课程大纲服务
pub struct CurriculumService {
    course_repo: Arc<dyn CourseRepositoryTrait>,
}

impl CurriculumService {
    pub fn new(repos: &Repositories) -> Self {
        Self {
            course_repo: repos.courses.clone(),
        }
    }

    /// 整体替换课程大纲
    ///
    /// 仅课程所属讲师或管理员可调用；已有学员学习记录的课程不允许替换，
    /// 避免级联删除完成记录
    #[instrument(skip(self, sections), fields(user_id = principal.id, sections = sections.len()))]
    pub async fn replace_curriculum(
        &self,
        principal: &Principal,
        course_id: i64,
        sections: Vec<NewSection>,
    ) -> Result<()> {
        let course = self
            .course_repo
            .get_course(course_id)
            .await?
            .ok_or(ProgressionError::CourseNotFound(course_id))?;

        let is_owner = principal.role == Role::Instructor && course.is_owned_by(principal.id);
        if !principal.is_admin() && !is_owner {
            return Err(ProgressionError::Unauthorized);
        }

        validate_curriculum(&sections)?;

        if self.course_repo.has_learner_progress(course_id).await? {
            return Err(ProgressionError::Validation(
                "课程已有学员学习记录，不能整体替换大纲".to_string(),
            ));
        }

        self.course_repo
            .replace_curriculum(course_id, &sections)
            .await?;

        info!(
            course_id,
            sections = sections.len(),
            lessons = sections.iter().map(|s| s.lessons.len()).sum::<usize>(),
            "课程大纲已替换"
        );
        Ok(())
    }
}

/// 校验大纲：标题非空，章节 order 唯一，章节内课时 order 唯一
pub fn validate_curriculum(sections: &[NewSection]) -> Result<()> {
    let mut section_orders = HashSet::new();

    for section in sections {
        if section.title.trim().is_empty() {
            return Err(ProgressionError::Validation("章节标题不能为空".to_string()));
        }
        if !section_orders.insert(section.order) {
            return Err(ProgressionError::Validation(format!(
                "章节排序重复: {}",
                section.order
            )));
        }

        let mut lesson_orders = HashSet::new();
        for lesson in &section.lessons {
            if lesson.title.trim().is_empty() {
                return Err(ProgressionError::Validation(format!(
                    "章节《{}》中存在空标题课时",
                    section.title
                )));
            }
            if !lesson_orders.insert(lesson.order) {
                return Err(ProgressionError::Validation(format!(
                    "章节《{}》中课时排序重复: {}",
                    section.title, lesson.order
                )));
            }
        }
    }

    Ok(())
}
