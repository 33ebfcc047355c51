//! 测验提交服务
//!
//! 判分只依据已持久化的题目；未作答的题目按答错计算。
//! 通过门槛为包含边界的正确率（默认 0.8，即 4/5 通过）。
//!
//! 通过且已报名时，在同一事务内把课时加入已通过集合并补写完成记录；
//! 新建完成记录时入账课时积分并在课程上下文中评估徽章。
//! 未报名的学员照常判分，但不记录任何状态。

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, instrument, warn};

use learning_shared::config::LearningConfig;
use learning_shared::observability::metrics;

use super::Repositories;
use super::dto::QuizResult;
use crate::achievement::AchievementEngine;
use crate::error::{ProgressionError, Result};
use crate::models::{QuizAnswer, QuizQuestion};
use crate::repository::{CourseRepositoryTrait, EnrollmentRepositoryTrait, QuizRepositoryTrait};
use crate::topology::CourseTopology;

/// 判分：返回 (答对题数, 题目总数)
///
/// 同一题目多次作答时以最后一次为准；不属于该测验的作答被忽略
pub fn grade(questions: &[QuizQuestion], answers: &[QuizAnswer]) -> (i64, i64) {
    let selected: HashMap<i64, i32> = answers
        .iter()
        .map(|a| (a.question_id, a.selected_option))
        .collect();

    let score = questions
        .iter()
        .filter(|q| selected.get(&q.id) == Some(&q.correct_option))
        .count() as i64;

    (score, questions.len() as i64)
}

/// 是否达到通过门槛（包含边界）；没有题目的测验永远不通过
pub fn is_passing(score: i64, total: i64, threshold: f64) -> bool {
    total > 0 && score as f64 / total as f64 >= threshold
}

/// 测验提交服务
pub struct QuizService {
    quiz_repo: Arc<dyn QuizRepositoryTrait>,
    course_repo: Arc<dyn CourseRepositoryTrait>,
    enrollment_repo: Arc<dyn EnrollmentRepositoryTrait>,
    topology: CourseTopology,
    achievements: AchievementEngine,
    pass_threshold: f64,
    points_per_lesson: i64,
}

impl QuizService {
    pub fn new(
        repos: &Repositories,
        achievements: AchievementEngine,
        config: &LearningConfig,
    ) -> Self {
        Self {
            quiz_repo: repos.quizzes.clone(),
            course_repo: repos.courses.clone(),
            enrollment_repo: repos.enrollments.clone(),
            topology: CourseTopology::new(repos.courses.clone()),
            achievements,
            pass_threshold: config.quiz_pass_threshold,
            points_per_lesson: config.points_per_lesson,
        }
    }

    /// 提交测验
    #[instrument(skip(self, answers), fields(answers = answers.len()))]
    pub async fn submit_quiz(
        &self,
        user_id: i64,
        lesson_id: i64,
        answers: &[QuizAnswer],
    ) -> Result<QuizResult> {
        let quiz = self
            .quiz_repo
            .get_quiz_by_lesson(lesson_id)
            .await?
            .ok_or(ProgressionError::QuizNotFound(lesson_id))?;

        let questions = self.quiz_repo.list_questions(quiz.id).await?;
        let (score, total) = grade(&questions, answers);
        let passed = is_passing(score, total, self.pass_threshold);

        metrics::record_quiz_submission(passed);
        info!(user_id, lesson_id, score, total, passed, "测验已判分");

        let recorded = if passed {
            self.record_pass(user_id, lesson_id).await?
        } else {
            false
        };

        Ok(QuizResult {
            lesson_id,
            passed,
            score,
            total,
            recorded,
        })
    }

    /// 记录测验通过，返回是否有新的状态写入
    async fn record_pass(&self, user_id: i64, lesson_id: i64) -> Result<bool> {
        let Some(lesson) = self.course_repo.get_lesson(lesson_id).await? else {
            return Err(ProgressionError::LessonNotFound(lesson_id));
        };
        let Some(course_id) = self.topology.resolve_course_id(&lesson).await? else {
            return Err(ProgressionError::LessonNotFound(lesson_id));
        };

        let Some(enrollment) = self
            .enrollment_repo
            .get_enrollment(user_id, course_id)
            .await?
        else {
            debug!(user_id, course_id, "未报名，测验通过不做记录");
            return Ok(false);
        };

        let record = self
            .enrollment_repo
            .record_quiz_pass(enrollment.id, lesson_id)
            .await?;

        if record.progress.is_some() {
            if let Err(e) = self
                .achievements
                .add_points_in_course(user_id, self.points_per_lesson, Some(course_id))
                .await
            {
                warn!(user_id, course_id, error = %e, "测验通过积分入账失败");
            }
        }

        Ok(record.newly_completed || record.progress.is_some())
    }
}
