//! 课程结构读取
//!
//! 把课程的章节与课时按 order 升序展开成一条线性序列，
//! 作为顺序锁定中"上一课时"的唯一依据。这里不做任何权限判断。
//!
//! order 出现重复时保持输入顺序（稳定排序），不再额外定义次级排序键。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::error::Result;
use crate::models::{Lesson, Section};
use crate::repository::CourseRepositoryTrait;

/// 大纲中的一个章节及其有序课时
#[derive(Debug, Clone)]
pub struct OutlineSection {
    pub section: Section,
    pub lessons: Vec<Lesson>,
}

/// 课程大纲（已排序）
#[derive(Debug, Clone, Default)]
pub struct CourseOutline {
    sections: Vec<OutlineSection>,
}

impl CourseOutline {
    /// 由章节与课时构建大纲
    ///
    /// 章节按 order 稳定排序；课时先按所属章节分组（保持输入顺序），
    /// 再在组内按 order 稳定排序。不属于任何给定章节的课时被丢弃。
    pub fn build(mut sections: Vec<Section>, lessons: Vec<Lesson>) -> Self {
        sections.sort_by_key(|s| s.order);

        let mut grouped: HashMap<i64, Vec<Lesson>> = HashMap::new();
        for lesson in lessons {
            grouped.entry(lesson.section_id).or_default().push(lesson);
        }

        let sections = sections
            .into_iter()
            .map(|section| {
                let mut lessons = grouped.remove(&section.id).unwrap_or_default();
                lessons.sort_by_key(|l| l.order);
                OutlineSection { section, lessons }
            })
            .collect();

        Self { sections }
    }

    pub fn sections(&self) -> &[OutlineSection] {
        &self.sections
    }

    /// 全课程线性课时序列
    pub fn linearize(&self) -> impl Iterator<Item = &Lesson> {
        self.sections.iter().flat_map(|s| s.lessons.iter())
    }

    pub fn lesson_ids(&self) -> Vec<i64> {
        self.linearize().map(|l| l.id).collect()
    }

    pub fn total_lessons(&self) -> usize {
        self.sections.iter().map(|s| s.lessons.len()).sum()
    }

    /// 课时在线性序列中的下标
    pub fn position(&self, lesson_id: i64) -> Option<usize> {
        self.linearize().position(|l| l.id == lesson_id)
    }

    /// 线性序列中紧邻的上一课时；首个课时或不在课程内时为 None
    pub fn previous(&self, lesson_id: i64) -> Option<&Lesson> {
        let index = self.position(lesson_id)?;
        if index == 0 {
            return None;
        }
        self.linearize().nth(index - 1)
    }

    pub fn is_empty(&self) -> bool {
        self.total_lessons() == 0
    }
}

/// 课程结构读取器
#[derive(Clone)]
pub struct CourseTopology {
    course_repo: Arc<dyn CourseRepositoryTrait>,
}

impl CourseTopology {
    pub fn new(course_repo: Arc<dyn CourseRepositoryTrait>) -> Self {
        Self { course_repo }
    }

    /// 读取课程大纲
    pub async fn outline(&self, course_id: i64) -> Result<CourseOutline> {
        let (sections, lessons) = futures::try_join!(
            self.course_repo.list_sections(course_id),
            self.course_repo.list_course_lessons(course_id),
        )?;

        debug!(
            course_id,
            sections = sections.len(),
            lessons = lessons.len(),
            "课程大纲已加载"
        );

        Ok(CourseOutline::build(sections, lessons))
    }

    /// 解析课时所属课程
    ///
    /// 课时已携带 course_id 时直接返回，否则通过章节查询一次；
    /// 章节不存在时返回 None
    pub async fn resolve_course_id(&self, lesson: &Lesson) -> Result<Option<i64>> {
        if let Some(course_id) = lesson.course_id {
            return Ok(Some(course_id));
        }

        let section = self.course_repo.get_section(lesson.section_id).await?;
        Ok(section.map(|s| s.course_id))
    }
}
