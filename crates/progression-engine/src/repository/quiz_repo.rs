//! 测验仓储

use async_trait::async_trait;
use sqlx::PgPool;

use super::traits::QuizRepositoryTrait;
use crate::error::Result;
use crate::models::{Quiz, QuizQuestion};

/// 测验仓储
///
/// 只读取已持久化的测验与题目，题目生成由外部内容服务负责
pub struct QuizRepository {
    pool: PgPool,
}

impl QuizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_quiz_by_lesson(&self, lesson_id: i64) -> Result<Option<Quiz>> {
        let quiz = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT id, lesson_id, created_at
            FROM quizzes
            WHERE lesson_id = $1
            "#,
        )
        .bind(lesson_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(quiz)
    }

    pub async fn list_questions(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>> {
        let questions = sqlx::query_as::<_, QuizQuestion>(
            r#"
            SELECT id, quiz_id, prompt, options, correct_option
            FROM quiz_questions
            WHERE quiz_id = $1
            ORDER BY sort_order ASC, id ASC
            "#,
        )
        .bind(quiz_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(questions)
    }
}

#[async_trait]
impl QuizRepositoryTrait for QuizRepository {
    async fn get_quiz_by_lesson(&self, lesson_id: i64) -> Result<Option<Quiz>> {
        self.get_quiz_by_lesson(lesson_id).await
    }

    async fn list_questions(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>> {
        self.list_questions(quiz_id).await
    }
}
