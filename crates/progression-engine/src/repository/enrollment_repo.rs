//! 报名与进度仓储
//!
//! 报名记录、已通过测验的课时集合、课时完成记录的数据访问。
//! 完成记录与已通过集合均只追加，重复写入依靠唯一约束拦截

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::EnrollmentRepositoryTrait;
use crate::error::Result;
use crate::models::{Enrollment, Progress, QuizPassRecord};

/// 报名与进度仓储
pub struct EnrollmentRepository {
    pool: PgPool,
}

impl EnrollmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    // ==================== 报名 ====================

    pub async fn get_enrollment(&self, user_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
        let enrollment = sqlx::query_as::<_, Enrollment>(
            r#"
            SELECT id, user_id, course_id, enrolled_at, is_finished
            FROM enrollments
            WHERE user_id = $1 AND course_id = $2
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(enrollment)
    }

    /// 创建报名记录
    ///
    /// 使用 ON CONFLICT DO NOTHING 保证幂等，冲突时读取已有记录
    pub async fn create_enrollment(&self, user_id: i64, course_id: i64) -> Result<Enrollment> {
        let inserted = sqlx::query_as::<_, Enrollment>(
            r#"
            INSERT INTO enrollments (user_id, course_id)
            VALUES ($1, $2)
            ON CONFLICT (user_id, course_id) DO NOTHING
            RETURNING id, user_id, course_id, enrolled_at, is_finished
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_optional(&self.pool)
        .await?;

        match inserted {
            Some(enrollment) => Ok(enrollment),
            None => {
                let existing = sqlx::query_as::<_, Enrollment>(
                    r#"
                    SELECT id, user_id, course_id, enrolled_at, is_finished
                    FROM enrollments
                    WHERE user_id = $1 AND course_id = $2
                    "#,
                )
                .bind(user_id)
                .bind(course_id)
                .fetch_one(&self.pool)
                .await?;
                Ok(existing)
            }
        }
    }

    pub async fn mark_finished(&self, enrollment_id: i64) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE enrollments
            SET is_finished = TRUE
            WHERE id = $1 AND is_finished = FALSE
            "#,
        )
        .bind(enrollment_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    // ==================== 已通过测验集合 ====================

    pub async fn list_completed_lessons(&self, enrollment_id: i64) -> Result<Vec<i64>> {
        let ids: Vec<i64> = sqlx::query_scalar(
            r#"
            SELECT lesson_id
            FROM enrollment_completed_lessons
            WHERE enrollment_id = $1
            ORDER BY seq ASC
            "#,
        )
        .bind(enrollment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(ids)
    }

    // ==================== 完成记录 ====================

    pub async fn insert_progress(
        &self,
        enrollment_id: i64,
        lesson_id: i64,
    ) -> Result<Option<Progress>> {
        let progress = sqlx::query_as::<_, Progress>(
            r#"
            INSERT INTO progress (enrollment_id, lesson_id)
            VALUES ($1, $2)
            ON CONFLICT (enrollment_id, lesson_id) DO NOTHING
            RETURNING id, enrollment_id, lesson_id, completed_at
            "#,
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(progress)
    }

    pub async fn list_progress(&self, enrollment_id: i64) -> Result<Vec<Progress>> {
        let items = sqlx::query_as::<_, Progress>(
            r#"
            SELECT id, enrollment_id, lesson_id, completed_at
            FROM progress
            WHERE enrollment_id = $1
            ORDER BY completed_at DESC, id DESC
            "#,
        )
        .bind(enrollment_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(items)
    }

    pub async fn count_progress(&self, enrollment_id: i64) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM progress WHERE enrollment_id = $1")
            .bind(enrollment_id)
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    /// 记录测验通过
    ///
    /// 已通过集合与完成记录在同一事务内写入，两者都使用 ON CONFLICT DO NOTHING，
    /// 重复提交不会报错，也不会产生重复行
    pub async fn record_quiz_pass(
        &self,
        enrollment_id: i64,
        lesson_id: i64,
    ) -> Result<QuizPassRecord> {
        let mut tx = self.pool.begin().await?;

        let appended = sqlx::query(
            r#"
            INSERT INTO enrollment_completed_lessons (enrollment_id, lesson_id)
            VALUES ($1, $2)
            ON CONFLICT (enrollment_id, lesson_id) DO NOTHING
            "#,
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let progress = sqlx::query_as::<_, Progress>(
            r#"
            INSERT INTO progress (enrollment_id, lesson_id)
            VALUES ($1, $2)
            ON CONFLICT (enrollment_id, lesson_id) DO NOTHING
            RETURNING id, enrollment_id, lesson_id, completed_at
            "#,
        )
        .bind(enrollment_id)
        .bind(lesson_id)
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;

        Ok(QuizPassRecord {
            newly_completed: appended > 0,
            progress,
        })
    }

    // ==================== 徽章统计 ====================

    pub async fn count_user_progress(&self, user_id: i64, course_id: Option<i64>) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM progress p
            JOIN enrollments e ON e.id = p.enrollment_id
            WHERE e.user_id = $1
              AND ($2::BIGINT IS NULL OR e.course_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    pub async fn count_finished_enrollments(
        &self,
        user_id: i64,
        course_id: Option<i64>,
    ) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*)
            FROM enrollments
            WHERE user_id = $1
              AND is_finished = TRUE
              AND ($2::BIGINT IS NULL OR course_id = $2)
            "#,
        )
        .bind(user_id)
        .bind(course_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }
}

#[async_trait]
impl EnrollmentRepositoryTrait for EnrollmentRepository {
    async fn get_enrollment(&self, user_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
        self.get_enrollment(user_id, course_id).await
    }

    async fn create_enrollment(&self, user_id: i64, course_id: i64) -> Result<Enrollment> {
        self.create_enrollment(user_id, course_id).await
    }

    async fn list_completed_lessons(&self, enrollment_id: i64) -> Result<Vec<i64>> {
        self.list_completed_lessons(enrollment_id).await
    }

    async fn insert_progress(
        &self,
        enrollment_id: i64,
        lesson_id: i64,
    ) -> Result<Option<Progress>> {
        self.insert_progress(enrollment_id, lesson_id).await
    }

    async fn list_progress(&self, enrollment_id: i64) -> Result<Vec<Progress>> {
        self.list_progress(enrollment_id).await
    }

    async fn count_progress(&self, enrollment_id: i64) -> Result<i64> {
        self.count_progress(enrollment_id).await
    }

    async fn record_quiz_pass(
        &self,
        enrollment_id: i64,
        lesson_id: i64,
    ) -> Result<QuizPassRecord> {
        self.record_quiz_pass(enrollment_id, lesson_id).await
    }

    async fn mark_finished(&self, enrollment_id: i64) -> Result<()> {
        self.mark_finished(enrollment_id).await
    }

    async fn count_user_progress(&self, user_id: i64, course_id: Option<i64>) -> Result<i64> {
        self.count_user_progress(user_id, course_id).await
    }

    async fn count_finished_enrollments(
        &self,
        user_id: i64,
        course_id: Option<i64>,
    ) -> Result<i64> {
        self.count_finished_enrollments(user_id, course_id).await
    }
}
