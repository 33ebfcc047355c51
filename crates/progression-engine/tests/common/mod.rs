//! 集成测试公共设施
//!
//! 用内存实现全部仓储接口，服务层在无外部依赖的情况下端到端运行。
//! 唯一约束与数据库保持一致：冲突以 None / false 表示。

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use serde_json::json;
use tokio::sync::{Mutex, RwLock};

use learning_shared::config::LearningConfig;
use learning_shared::observability;
use progression::error::{ProgressionError, Result};
use progression::models::*;
use progression::notification::{CertificateEmail, CertificateMailer};
use progression::repository::*;
use progression::service::{Collaborators, ProgressionServices, Repositories};
use progression::{CertificateArtifactGenerator, UrlCertificateGenerator};

// ==================== 内存存储 ====================

#[derive(Default)]
struct State {
    next_id: i64,
    courses: HashMap<i64, Course>,
    sections: Vec<Section>,
    lessons: Vec<Lesson>,
    quizzes: Vec<Quiz>,
    questions: Vec<QuizQuestion>,
    enrollments: Vec<Enrollment>,
    completed: Vec<(i64, i64)>,
    progress: Vec<Progress>,
    certificates: Vec<Certificate>,
    leaderboard: HashMap<i64, LeaderboardEntry>,
    badges: Vec<BadgeRow>,
    user_badges: Vec<UserBadge>,
    learners: HashMap<i64, LearnerProfile>,
}

impl State {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn hydrate(&self, lesson: &Lesson) -> Lesson {
        let mut lesson = lesson.clone();
        lesson.has_quiz = self.quizzes.iter().any(|q| q.lesson_id == lesson.id);
        lesson.course_id = self
            .sections
            .iter()
            .find(|s| s.id == lesson.section_id)
            .map(|s| s.course_id);
        lesson
    }

    fn enrollment(&self, enrollment_id: i64) -> Option<&Enrollment> {
        self.enrollments.iter().find(|e| e.id == enrollment_id)
    }

    fn course_lesson_ids(&self, course_id: i64) -> Vec<i64> {
        let section_ids: Vec<i64> = self
            .sections
            .iter()
            .filter(|s| s.course_id == course_id)
            .map(|s| s.id)
            .collect();
        self.lessons
            .iter()
            .filter(|l| section_ids.contains(&l.section_id))
            .map(|l| l.id)
            .collect()
    }
}

/// 内存仓储，实现全部仓储接口
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<State>,
    /// 读取已通过集合时模拟损坏
    pub corrupt_completed_lessons: RwLock<bool>,
    /// 接下来若干次证书写入模拟编号冲突
    pub forced_code_conflicts: RwLock<usize>,
}

impl InMemoryStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    // ---------- 测试数据构造 ----------

    pub async fn add_course(&self, owner_id: i64, title: &str) -> i64 {
        let mut state = self.state.write().await;
        let id = state.next_id();
        state.courses.insert(
            id,
            Course {
                id,
                owner_id,
                title: title.to_string(),
                published: true,
                is_active: true,
                created_at: Utc::now(),
                updated_at: Utc::now(),
            },
        );
        id
    }

    pub async fn rename_course(&self, course_id: i64, title: &str) {
        let mut state = self.state.write().await;
        if let Some(course) = state.courses.get_mut(&course_id) {
            course.title = title.to_string();
        }
    }

    pub async fn add_section(&self, course_id: i64, order: i32) -> i64 {
        let mut state = self.state.write().await;
        let id = state.next_id();
        state.sections.push(Section {
            id,
            course_id,
            title: format!("Section {}", order),
            order,
        });
        id
    }

    pub async fn add_lesson(&self, section_id: i64, order: i32, is_preview: bool) -> i64 {
        let mut state = self.state.write().await;
        let id = state.next_id();
        state.lessons.push(Lesson {
            id,
            section_id,
            title: format!("Lesson {}", id),
            order,
            is_preview,
            body: Some(format!("body of lesson {}", id)),
            video_url: Some(format!("https://cdn.example/{}.mp4", id)),
            has_quiz: false,
            course_id: None,
        });
        id
    }

    /// 为课时添加测验，返回各题目 ID（正确选项均为 0）
    pub async fn add_quiz(&self, lesson_id: i64, question_count: usize) -> Vec<i64> {
        let mut state = self.state.write().await;
        let quiz_id = state.next_id();
        state.quizzes.push(Quiz {
            id: quiz_id,
            lesson_id,
            created_at: Utc::now(),
        });

        (0..question_count)
            .map(|i| {
                let id = state.next_id();
                state.questions.push(QuizQuestion {
                    id,
                    quiz_id,
                    prompt: format!("Question {}", i + 1),
                    options: json!(["right", "wrong", "also wrong"]),
                    correct_option: 0,
                });
                id
            })
            .collect()
    }

    pub async fn add_badge(&self, name: &str, criteria: &str, course_id: Option<i64>) -> i64 {
        let mut state = self.state.write().await;
        let id = state.next_id();
        state.badges.push(BadgeRow {
            id,
            name: name.to_string(),
            description: None,
            criteria: criteria.to_string(),
            course_id,
            creator_id: 1,
            created_at: Utc::now(),
        });
        id
    }

    pub async fn add_learner(&self, id: i64, name: &str, email: &str) {
        self.state.write().await.learners.insert(
            id,
            LearnerProfile {
                id,
                name: name.to_string(),
                email: email.to_string(),
            },
        );
    }

    pub async fn set_points(&self, user_id: i64, total_points: i64) {
        self.state.write().await.leaderboard.insert(
            user_id,
            LeaderboardEntry {
                user_id,
                total_points,
                updated_at: Utc::now(),
            },
        );
    }

    pub async fn lesson(&self, lesson_id: i64) -> Lesson {
        let state = self.state.read().await;
        let lesson = state
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .expect("lesson exists");
        state.hydrate(lesson)
    }

    pub async fn user_badge_count(&self, user_id: i64) -> usize {
        self.state
            .read()
            .await
            .user_badges
            .iter()
            .filter(|b| b.user_id == user_id)
            .count()
    }

    pub async fn certificate_count(&self) -> usize {
        self.state.read().await.certificates.len()
    }
}

#[async_trait]
impl CourseRepositoryTrait for InMemoryStore {
    async fn get_course(&self, course_id: i64) -> Result<Option<Course>> {
        Ok(self.state.read().await.courses.get(&course_id).cloned())
    }

    async fn get_section(&self, section_id: i64) -> Result<Option<Section>> {
        let state = self.state.read().await;
        Ok(state.sections.iter().find(|s| s.id == section_id).cloned())
    }

    async fn get_lesson(&self, lesson_id: i64) -> Result<Option<Lesson>> {
        let state = self.state.read().await;
        Ok(state
            .lessons
            .iter()
            .find(|l| l.id == lesson_id)
            .map(|l| state.hydrate(l)))
    }

    async fn list_sections(&self, course_id: i64) -> Result<Vec<Section>> {
        let state = self.state.read().await;
        Ok(state
            .sections
            .iter()
            .filter(|s| s.course_id == course_id)
            .cloned()
            .collect())
    }

    async fn list_course_lessons(&self, course_id: i64) -> Result<Vec<Lesson>> {
        let state = self.state.read().await;
        let ids = state.course_lesson_ids(course_id);
        Ok(state
            .lessons
            .iter()
            .filter(|l| ids.contains(&l.id))
            .map(|l| state.hydrate(l))
            .collect())
    }

    async fn count_lessons(&self, course_id: i64) -> Result<i64> {
        Ok(self.state.read().await.course_lesson_ids(course_id).len() as i64)
    }

    async fn has_learner_progress(&self, course_id: i64) -> Result<bool> {
        let state = self.state.read().await;
        let enrollment_ids: Vec<i64> = state
            .enrollments
            .iter()
            .filter(|e| e.course_id == course_id)
            .map(|e| e.id)
            .collect();
        Ok(state
            .progress
            .iter()
            .any(|p| enrollment_ids.contains(&p.enrollment_id))
            || state
                .completed
                .iter()
                .any(|(e, _)| enrollment_ids.contains(e)))
    }

    async fn replace_curriculum(&self, course_id: i64, sections: &[NewSection]) -> Result<()> {
        let mut state = self.state.write().await;
        let old_sections: Vec<i64> = state
            .sections
            .iter()
            .filter(|s| s.course_id == course_id)
            .map(|s| s.id)
            .collect();
        state.sections.retain(|s| s.course_id != course_id);
        state.lessons.retain(|l| !old_sections.contains(&l.section_id));

        for section in sections {
            let section_id = state.next_id();
            state.sections.push(Section {
                id: section_id,
                course_id,
                title: section.title.clone(),
                order: section.order,
            });
            for lesson in &section.lessons {
                let id = state.next_id();
                state.lessons.push(Lesson {
                    id,
                    section_id,
                    title: lesson.title.clone(),
                    order: lesson.order,
                    is_preview: lesson.is_preview,
                    body: lesson.body.clone(),
                    video_url: lesson.video_url.clone(),
                    has_quiz: false,
                    course_id: None,
                });
            }
        }
        Ok(())
    }
}

#[async_trait]
impl EnrollmentRepositoryTrait for InMemoryStore {
    async fn get_enrollment(&self, user_id: i64, course_id: i64) -> Result<Option<Enrollment>> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .iter()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
            .cloned())
    }

    async fn create_enrollment(&self, user_id: i64, course_id: i64) -> Result<Enrollment> {
        let mut state = self.state.write().await;
        if let Some(existing) = state
            .enrollments
            .iter()
            .find(|e| e.user_id == user_id && e.course_id == course_id)
        {
            return Ok(existing.clone());
        }
        let enrollment = Enrollment {
            id: state.next_id(),
            user_id,
            course_id,
            enrolled_at: Utc::now(),
            is_finished: false,
        };
        state.enrollments.push(enrollment.clone());
        Ok(enrollment)
    }

    async fn list_completed_lessons(&self, enrollment_id: i64) -> Result<Vec<i64>> {
        if *self.corrupt_completed_lessons.read().await {
            return Err(ProgressionError::Internal("completed set unreadable".to_string()));
        }
        let state = self.state.read().await;
        Ok(state
            .completed
            .iter()
            .filter(|(e, _)| *e == enrollment_id)
            .map(|(_, l)| *l)
            .collect())
    }

    async fn insert_progress(&self, enrollment_id: i64, lesson_id: i64) -> Result<Option<Progress>> {
        let mut state = self.state.write().await;
        if state
            .progress
            .iter()
            .any(|p| p.enrollment_id == enrollment_id && p.lesson_id == lesson_id)
        {
            return Ok(None);
        }
        let progress = Progress {
            id: state.next_id(),
            enrollment_id,
            lesson_id,
            completed_at: Utc::now(),
        };
        state.progress.push(progress.clone());
        Ok(Some(progress))
    }

    async fn list_progress(&self, enrollment_id: i64) -> Result<Vec<Progress>> {
        let state = self.state.read().await;
        let mut items: Vec<Progress> = state
            .progress
            .iter()
            .filter(|p| p.enrollment_id == enrollment_id)
            .cloned()
            .collect();
        items.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(b.id.cmp(&a.id)));
        Ok(items)
    }

    async fn count_progress(&self, enrollment_id: i64) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .progress
            .iter()
            .filter(|p| p.enrollment_id == enrollment_id)
            .count() as i64)
    }

    async fn record_quiz_pass(&self, enrollment_id: i64, lesson_id: i64) -> Result<QuizPassRecord> {
        let newly_completed = {
            let mut state = self.state.write().await;
            if state.completed.contains(&(enrollment_id, lesson_id)) {
                false
            } else {
                state.completed.push((enrollment_id, lesson_id));
                true
            }
        };
        let progress = self.insert_progress(enrollment_id, lesson_id).await?;
        Ok(QuizPassRecord {
            newly_completed,
            progress,
        })
    }

    async fn mark_finished(&self, enrollment_id: i64) -> Result<()> {
        let mut state = self.state.write().await;
        if let Some(e) = state.enrollments.iter_mut().find(|e| e.id == enrollment_id) {
            e.is_finished = true;
        }
        Ok(())
    }

    async fn count_user_progress(&self, user_id: i64, course_id: Option<i64>) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .progress
            .iter()
            .filter(|p| {
                state.enrollment(p.enrollment_id).is_some_and(|e| {
                    e.user_id == user_id && course_id.is_none_or(|c| e.course_id == c)
                })
            })
            .count() as i64)
    }

    async fn count_finished_enrollments(&self, user_id: i64, course_id: Option<i64>) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .enrollments
            .iter()
            .filter(|e| {
                e.user_id == user_id
                    && e.is_finished
                    && course_id.is_none_or(|c| e.course_id == c)
            })
            .count() as i64)
    }
}

#[async_trait]
impl QuizRepositoryTrait for InMemoryStore {
    async fn get_quiz_by_lesson(&self, lesson_id: i64) -> Result<Option<Quiz>> {
        let state = self.state.read().await;
        Ok(state.quizzes.iter().find(|q| q.lesson_id == lesson_id).cloned())
    }

    async fn list_questions(&self, quiz_id: i64) -> Result<Vec<QuizQuestion>> {
        let state = self.state.read().await;
        Ok(state
            .questions
            .iter()
            .filter(|q| q.quiz_id == quiz_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CertificateRepositoryTrait for InMemoryStore {
    async fn get_certificate(&self, user_id: i64, course_id: i64) -> Result<Option<Certificate>> {
        let state = self.state.read().await;
        Ok(state
            .certificates
            .iter()
            .find(|c| c.user_id == user_id && c.course_id == course_id)
            .cloned())
    }

    async fn get_by_code(&self, code: &str) -> Result<Option<Certificate>> {
        let state = self.state.read().await;
        Ok(state
            .certificates
            .iter()
            .find(|c| c.certificate_code == code)
            .cloned())
    }

    async fn insert_certificate(&self, new: &NewCertificate) -> Result<Option<Certificate>> {
        {
            let mut conflicts = self.forced_code_conflicts.write().await;
            if *conflicts > 0 {
                *conflicts -= 1;
                return Err(ProgressionError::CertificateCodeConflict);
            }
        }

        let mut state = self.state.write().await;
        if state
            .certificates
            .iter()
            .any(|c| c.user_id == new.user_id && c.course_id == new.course_id)
        {
            return Ok(None);
        }
        if state
            .certificates
            .iter()
            .any(|c| c.certificate_code == new.certificate_code)
        {
            return Err(ProgressionError::CertificateCodeConflict);
        }

        let certificate = Certificate {
            id: state.next_id(),
            user_id: new.user_id,
            course_id: new.course_id,
            certificate_code: new.certificate_code.clone(),
            course_name_at_issue: new.course_name_at_issue.clone(),
            certificate_url: new.certificate_url.clone(),
            issue_date: new.issue_date,
        };
        state.certificates.push(certificate.clone());
        Ok(Some(certificate))
    }

    async fn list_user_certificates(&self, user_id: i64) -> Result<Vec<Certificate>> {
        let state = self.state.read().await;
        Ok(state
            .certificates
            .iter()
            .filter(|c| c.user_id == user_id)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AchievementRepositoryTrait for InMemoryStore {
    async fn increment_points(&self, user_id: i64, delta: i64) -> Result<i64> {
        let mut state = self.state.write().await;
        let entry = state
            .leaderboard
            .entry(user_id)
            .or_insert_with(|| LeaderboardEntry {
                user_id,
                total_points: 0,
                updated_at: Utc::now(),
            });
        entry.total_points += delta;
        entry.updated_at = Utc::now();
        Ok(entry.total_points)
    }

    async fn get_points(&self, user_id: i64) -> Result<Option<i64>> {
        let state = self.state.read().await;
        Ok(state.leaderboard.get(&user_id).map(|e| e.total_points))
    }

    async fn top_entries(&self, limit: i64) -> Result<Vec<LeaderboardEntry>> {
        let state = self.state.read().await;
        let mut entries: Vec<LeaderboardEntry> = state.leaderboard.values().cloned().collect();
        entries.sort_by(|a, b| {
            b.total_points
                .cmp(&a.total_points)
                .then(a.updated_at.cmp(&b.updated_at))
        });
        entries.truncate(limit.max(0) as usize);
        Ok(entries)
    }

    async fn count_entries_above(&self, points: i64) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .leaderboard
            .values()
            .filter(|e| e.total_points > points)
            .count() as i64)
    }

    async fn count_entries_at_or_below(&self, points: i64) -> Result<i64> {
        let state = self.state.read().await;
        Ok(state
            .leaderboard
            .values()
            .filter(|e| e.total_points <= points)
            .count() as i64)
    }

    async fn count_entries(&self) -> Result<i64> {
        Ok(self.state.read().await.leaderboard.len() as i64)
    }

    async fn list_badges_in_scope(&self, course_id: Option<i64>) -> Result<Vec<BadgeRow>> {
        let state = self.state.read().await;
        Ok(state
            .badges
            .iter()
            .filter(|b| b.course_id.is_none() || (course_id.is_some() && b.course_id == course_id))
            .cloned()
            .collect())
    }

    async fn has_user_badge(&self, user_id: i64, badge_id: i64) -> Result<bool> {
        let state = self.state.read().await;
        Ok(state
            .user_badges
            .iter()
            .any(|b| b.user_id == user_id && b.badge_id == badge_id))
    }

    async fn insert_user_badge(&self, user_id: i64, badge_id: i64) -> Result<bool> {
        let mut state = self.state.write().await;
        if state
            .user_badges
            .iter()
            .any(|b| b.user_id == user_id && b.badge_id == badge_id)
        {
            return Ok(false);
        }
        let id = state.next_id();
        state.user_badges.push(UserBadge {
            id,
            user_id,
            badge_id,
            awarded_at: Utc::now(),
        });
        Ok(true)
    }

    async fn list_user_badges(&self, user_id: i64) -> Result<Vec<UserBadge>> {
        let state = self.state.read().await;
        let mut badges: Vec<UserBadge> = state
            .user_badges
            .iter()
            .filter(|b| b.user_id == user_id)
            .cloned()
            .collect();
        badges.sort_by(|a, b| b.awarded_at.cmp(&a.awarded_at).then(b.id.cmp(&a.id)));
        Ok(badges)
    }
}

#[async_trait]
impl LearnerDirectoryTrait for InMemoryStore {
    async fn get_learner(&self, user_id: i64) -> Result<Option<LearnerProfile>> {
        Ok(self.state.read().await.learners.get(&user_id).cloned())
    }
}

// ==================== 协作方 ====================

/// 记录已发送邮件的邮件发送器，可配置为始终失败
#[derive(Default)]
pub struct RecordingMailer {
    pub sent: Mutex<Vec<CertificateEmail>>,
    pub fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    /// 等待后台发送任务完成
    pub async fn wait_for(&self, count: usize) -> Vec<CertificateEmail> {
        for _ in 0..50 {
            {
                let sent = self.sent.lock().await;
                if sent.len() >= count {
                    return sent.clone();
                }
            }
            tokio::time::sleep(tokio::time::Duration::from_millis(10)).await;
        }
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl CertificateMailer for RecordingMailer {
    async fn send_certificate(&self, email: &CertificateEmail) -> Result<()> {
        if self.fail {
            return Err(ProgressionError::Collaborator("smtp unavailable".to_string()));
        }
        self.sent.lock().await.push(email.clone());
        Ok(())
    }
}

// ==================== 服务装配 ====================

pub struct Harness {
    pub store: Arc<InMemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    pub services: ProgressionServices,
}

pub fn repositories(store: &Arc<InMemoryStore>) -> Repositories {
    Repositories {
        courses: store.clone(),
        enrollments: store.clone(),
        quizzes: store.clone(),
        certificates: store.clone(),
        achievements: store.clone(),
        learners: store.clone(),
    }
}

pub fn harness() -> Harness {
    harness_with_mailer(RecordingMailer::default())
}

pub fn harness_with_mailer(mailer: RecordingMailer) -> Harness {
    observability::tracing::init_for_tests();

    let store = InMemoryStore::new();
    let mailer = Arc::new(mailer);
    let config = LearningConfig::default();
    let artifacts: Arc<dyn CertificateArtifactGenerator> =
        Arc::new(UrlCertificateGenerator::new(config.certificate_base_url.clone()));

    let services = ProgressionServices::new(
        repositories(&store),
        Collaborators {
            artifacts,
            mailer: mailer.clone(),
        },
        &config,
    );

    Harness {
        store,
        mailer,
        services,
    }
}

/// 单章节课程：返回 (course_id, 按顺序的 lesson_id)
pub async fn linear_course(store: &InMemoryStore, owner_id: i64, lessons: usize) -> (i64, Vec<i64>) {
    let course_id = store.add_course(owner_id, "Rust 101").await;
    let section_id = store.add_section(course_id, 1).await;
    let mut ids = Vec::with_capacity(lessons);
    for order in 1..=lessons {
        ids.push(store.add_lesson(section_id, order as i32, false).await);
    }
    (course_id, ids)
}

/// 全部答对
pub fn correct_answers(question_ids: &[i64]) -> Vec<QuizAnswer> {
    question_ids.iter().map(|id| QuizAnswer::new(*id, 0)).collect()
}
