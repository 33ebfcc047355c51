//! 课程结构仓储
//!
//! 课程、章节、课时的只读查询，以及事务内的大纲整体替换

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};

use super::traits::CourseRepositoryTrait;
use crate::error::Result;
use crate::models::{Course, Lesson, NewSection, Section};

/// 课程结构仓储
pub struct CourseRepository {
    pool: PgPool,
}

impl CourseRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 查询操作 ====================

    pub async fn get_course(&self, course_id: i64) -> Result<Option<Course>> {
        let course = sqlx::query_as::<_, Course>(
            r#"
            SELECT id, owner_id, title, published, is_active, created_at, updated_at
            FROM courses
            WHERE id = $1
            "#,
        )
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(course)
    }

    pub async fn get_section(&self, section_id: i64) -> Result<Option<Section>> {
        let section = sqlx::query_as::<_, Section>(
            r#"
            SELECT id, course_id, title, sort_order
            FROM sections
            WHERE id = $1
            "#,
        )
        .bind(section_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(section)
    }

    /// 获取课时，关联章节得到 course_id，并派生 has_quiz
    pub async fn get_lesson(&self, lesson_id: i64) -> Result<Option<Lesson>> {
        let lesson = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT l.id, l.section_id, l.title, l.sort_order, l.is_preview, l.body, l.video_url,
                   EXISTS (SELECT 1 FROM quizzes q WHERE q.lesson_id = l.id) AS has_quiz,
                   s.course_id
            FROM lessons l
            JOIN sections s ON s.id = l.section_id
            WHERE l.id = $1
            "#,
        )
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(lesson)
    }

    pub async fn list_sections(&self, course_id: i64) -> Result<Vec<Section>> {
        let sections = sqlx::query_as::<_, Section>(
            r#"
            SELECT id, course_id, title, sort_order
            FROM sections
            WHERE course_id = $1
            ORDER BY sort_order ASC, id ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(sections)
    }

    pub async fn list_course_lessons(&self, course_id: i64) -> Result<Vec<Lesson>> {
        let lessons = sqlx::query_as::<_, Lesson>(
            r#"
            SELECT l.id, l.section_id, l.title, l.sort_order, l.is_preview, l.body, l.video_url,
                   EXISTS (SELECT 1 FROM quizzes q WHERE q.lesson_id = l.id) AS has_quiz,
                   s.course_id
            FROM lessons l
            JOIN sections s ON s.id = l.section_id
            WHERE s.course_id = $1
            ORDER BY l.sort_order ASC, l.id ASC
            "#,
        )
        .bind(course_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lessons)
    }

    pub async fn count_lessons(&self, course_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM lessons l
            JOIN sections s ON s.id = l.section_id
            WHERE s.course_id = $1
            "#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn has_learner_progress(&self, course_id: i64) -> Result<bool> {
        let exists: bool = sqlx::query_scalar(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM enrollments e
                WHERE e.course_id = $1
                  AND (EXISTS (SELECT 1 FROM progress p WHERE p.enrollment_id = e.id)
                       OR EXISTS (SELECT 1 FROM enrollment_completed_lessons c
                                  WHERE c.enrollment_id = e.id))
            )
            "#,
        )
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(exists)
    }

    // ==================== 事务操作 ====================

    /// 整体替换课程大纲
    ///
    /// 删除旧章节（课时随外键级联删除）后按请求重建，任一步失败整体回滚，
    /// 不会出现章节已建而课时缺失的中间状态
    pub async fn replace_curriculum(&self, course_id: i64, sections: &[NewSection]) -> Result<()> {
        let mut tx = self.pool.begin().await?;

        // 锁定课程行，串行化同一课程的并发替换
        sqlx::query("SELECT id FROM courses WHERE id = $1 FOR UPDATE")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        sqlx::query("DELETE FROM sections WHERE course_id = $1")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        for section in sections {
            Self::insert_section_in_tx(&mut *tx, course_id, section).await?;
        }

        sqlx::query("UPDATE courses SET updated_at = NOW() WHERE id = $1")
            .bind(course_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn insert_section_in_tx(
        tx: &mut PgConnection,
        course_id: i64,
        section: &NewSection,
    ) -> Result<()> {
        let section_id: i64 = sqlx::query_scalar(
            r#"
            INSERT INTO sections (course_id, title, sort_order)
            VALUES ($1, $2, $3)
            RETURNING id
            "#,
        )
        .bind(course_id)
        .bind(&section.title)
        .bind(section.order)
        .fetch_one(&mut *tx)
        .await?;

        for lesson in &section.lessons {
            sqlx::query(
                r#"
                INSERT INTO lessons (section_id, title, sort_order, is_preview, body, video_url)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(section_id)
            .bind(&lesson.title)
            .bind(lesson.order)
            .bind(lesson.is_preview)
            .bind(&lesson.body)
            .bind(&lesson.video_url)
            .execute(&mut *tx)
            .await?;
        }

        Ok(())
    }
}

#[async_trait]
impl CourseRepositoryTrait for CourseRepository {
    async fn get_course(&self, course_id: i64) -> Result<Option<Course>> {
        self.get_course(course_id).await
    }

    async fn get_section(&self, section_id: i64) -> Result<Option<Section>> {
        self.get_section(section_id).await
    }

    async fn get_lesson(&self, lesson_id: i64) -> Result<Option<Lesson>> {
        self.get_lesson(lesson_id).await
    }

    async fn list_sections(&self, course_id: i64) -> Result<Vec<Section>> {
        self.list_sections(course_id).await
    }

    async fn list_course_lessons(&self, course_id: i64) -> Result<Vec<Lesson>> {
        self.list_course_lessons(course_id).await
    }

    async fn count_lessons(&self, course_id: i64) -> Result<i64> {
        self.count_lessons(course_id).await
    }

    async fn has_learner_progress(&self, course_id: i64) -> Result<bool> {
        self.has_learner_progress(course_id).await
    }

    async fn replace_curriculum(&self, course_id: i64, sections: &[NewSection]) -> Result<()> {
        self.replace_curriculum(course_id, sections).await
    }
}
