//! 积分与徽章引擎
//!
//! ## 徽章评估流程
//!
//! 1. 加载作用域内徽章（全局徽章 + 指定课程的徽章）
//! 2. 跳过已持有的徽章
//! 3. 按条件类型取得实际数值（课时数、结业课程数、总积分）
//! 4. 满足条件则写入用户徽章
//!
//! 存在性预检查与写入之间没有事务隔离，
//! 并发评估同一用户时由 (user_id, badge_id) 唯一约束保证不重复授予。

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, info, instrument, warn};

use learning_shared::observability::metrics;

use super::criteria::BadgeCriteria;
use super::dto::{AchievementStats, LeaderboardSnapshot, RankedLearner, percentile};
use crate::error::{ProgressionError, Result};
use crate::models::Badge;
use crate::repository::{AchievementRepositoryTrait, EnrollmentRepositoryTrait};

/// 单次评估内的统计值缓存
///
/// 同一作用域的同类计数在一次评估中只查询一次
#[derive(Default)]
struct MetricCache {
    lesson_counts: HashMap<Option<i64>, i64>,
    course_counts: HashMap<Option<i64>, i64>,
    points: Option<i64>,
}

/// 积分与徽章引擎
#[derive(Clone)]
pub struct AchievementEngine {
    achievement_repo: Arc<dyn AchievementRepositoryTrait>,
    enrollment_repo: Arc<dyn EnrollmentRepositoryTrait>,
}

impl AchievementEngine {
    pub fn new(
        achievement_repo: Arc<dyn AchievementRepositoryTrait>,
        enrollment_repo: Arc<dyn EnrollmentRepositoryTrait>,
    ) -> Self {
        Self {
            achievement_repo,
            enrollment_repo,
        }
    }

    /// 增加积分并评估全局徽章
    pub async fn add_points(&self, user_id: i64, delta: i64) -> Result<i64> {
        self.add_points_in_course(user_id, delta, None).await
    }

    /// 增加积分，并在给定课程上下文中评估徽章
    ///
    /// 积分只增不减，delta 必须为正数；
    /// 积分写入失败返回错误；徽章评估失败只记录警告，不影响已入账的积分
    #[instrument(skip(self))]
    pub async fn add_points_in_course(
        &self,
        user_id: i64,
        delta: i64,
        course_id: Option<i64>,
    ) -> Result<i64> {
        if delta <= 0 {
            return Err(ProgressionError::Validation(format!(
                "积分增量必须为正数: {}",
                delta
            )));
        }

        let total = self.achievement_repo.increment_points(user_id, delta).await?;
        metrics::record_points_credited(delta);

        info!(user_id, delta, total, "积分已入账");

        if let Err(e) = self.evaluate_badges(user_id, course_id).await {
            warn!(user_id, error = %e, "积分变动后的徽章评估失败");
        }

        Ok(total)
    }

    /// 评估并授予徽章，返回本次新授予的徽章 ID
    #[instrument(skip(self))]
    pub async fn evaluate_badges(&self, user_id: i64, course_id: Option<i64>) -> Result<Vec<i64>> {
        let started = Instant::now();
        let badges: Vec<Badge> = self
            .achievement_repo
            .list_badges_in_scope(course_id)
            .await?
            .into_iter()
            .map(Badge::from)
            .collect();

        let mut cache = MetricCache::default();
        let mut awarded = Vec::new();

        for badge in badges {
            if !badge.criteria.is_recognized() {
                debug!(badge_id = badge.id, criteria = %badge.criteria, "无法识别的徽章条件，跳过");
                continue;
            }

            if self
                .achievement_repo
                .has_user_badge(user_id, badge.id)
                .await?
            {
                continue;
            }

            let actual = self.metric_for(user_id, &badge, &mut cache).await?;
            if !badge.criteria.is_met_by(actual) {
                continue;
            }

            if self
                .achievement_repo
                .insert_user_badge(user_id, badge.id)
                .await?
            {
                info!(user_id, badge_id = badge.id, badge = %badge.name, "徽章已授予");
                awarded.push(badge.id);
            } else {
                debug!(user_id, badge_id = badge.id, "徽章已被并发评估授予");
            }
        }

        metrics::record_badge_evaluation(awarded.len(), started.elapsed().as_secs_f64());
        Ok(awarded)
    }

    async fn metric_for(
        &self,
        user_id: i64,
        badge: &Badge,
        cache: &mut MetricCache,
    ) -> Result<i64> {
        // 积分门槛始终按全局积分判断，忽略徽章所属课程
        let scope = badge.course_id;
        let value = match &badge.criteria {
            BadgeCriteria::LessonCount { .. } => match cache.lesson_counts.get(&scope) {
                Some(v) => *v,
                None => {
                    let v = self.enrollment_repo.count_user_progress(user_id, scope).await?;
                    cache.lesson_counts.insert(scope, v);
                    v
                }
            },
            BadgeCriteria::CourseCount { .. } => match cache.course_counts.get(&scope) {
                Some(v) => *v,
                None => {
                    let v = self
                        .enrollment_repo
                        .count_finished_enrollments(user_id, scope)
                        .await?;
                    cache.course_counts.insert(scope, v);
                    v
                }
            },
            BadgeCriteria::PointsThreshold { .. } => match cache.points {
                Some(v) => v,
                None => {
                    let v = self
                        .achievement_repo
                        .get_points(user_id)
                        .await?
                        .unwrap_or(0);
                    cache.points = Some(v);
                    v
                }
            },
            BadgeCriteria::Unrecognized { .. } => 0,
        };
        Ok(value)
    }

    /// 积分排行榜前 N 名
    pub async fn top_learners(&self, limit: i64) -> Result<Vec<RankedLearner>> {
        let entries = self.achievement_repo.top_entries(limit.max(0)).await?;

        Ok(entries
            .into_iter()
            .enumerate()
            .map(|(i, entry)| RankedLearner {
                rank: i as i64 + 1,
                user_id: entry.user_id,
                total_points: entry.total_points,
            })
            .collect())
    }

    /// 排行榜概况：条目数与最高积分
    pub async fn leaderboard_snapshot(&self) -> Result<LeaderboardSnapshot> {
        let (entries, top) = futures::try_join!(
            self.achievement_repo.count_entries(),
            self.achievement_repo.top_entries(1),
        )?;

        Ok(LeaderboardSnapshot {
            entries,
            top_points: top.first().map(|e| e.total_points).unwrap_or(0),
        })
    }

    /// 学员成就统计（没有排行榜记录的学员按 0 分处理）
    #[instrument(skip(self))]
    pub async fn achievement_stats(&self, user_id: i64) -> Result<AchievementStats> {
        let total_points = self
            .achievement_repo
            .get_points(user_id)
            .await?
            .unwrap_or(0);

        let (above, at_or_below, total, badges) = futures::try_join!(
            self.achievement_repo.count_entries_above(total_points),
            self.achievement_repo.count_entries_at_or_below(total_points),
            self.achievement_repo.count_entries(),
            self.achievement_repo.list_user_badges(user_id),
        )?;

        Ok(AchievementStats {
            user_id,
            total_points,
            rank: above + 1,
            percentile: percentile(at_or_below, total),
            badges,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{BadgeRow, LeaderboardEntry, UserBadge};
    use crate::repository::{MockAchievementRepositoryTrait, MockEnrollmentRepositoryTrait};
    use chrono::Utc;
    use mockall::predicate::eq;

    fn badge_row(id: i64, criteria: &str, course_id: Option<i64>) -> BadgeRow {
        BadgeRow {
            id,
            name: format!("badge-{}", id),
            description: None,
            criteria: criteria.to_string(),
            course_id,
            creator_id: 1,
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_points_threshold_awarded_once() {
        let mut repo = MockAchievementRepositoryTrait::new();
        repo.expect_list_badges_in_scope()
            .returning(|_| Ok(vec![badge_row(1, "REACH_100_POINTS", None)]));
        repo.expect_has_user_badge().returning(|_, _| Ok(false));
        repo.expect_get_points().returning(|_| Ok(Some(100)));
        repo.expect_insert_user_badge()
            .with(eq(9), eq(1))
            .times(1)
            .returning(|_, _| Ok(true));

        let engine = AchievementEngine::new(
            Arc::new(repo),
            Arc::new(MockEnrollmentRepositoryTrait::new()),
        );

        assert_eq!(engine.evaluate_badges(9, None).await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_held_badges_are_skipped() {
        let mut repo = MockAchievementRepositoryTrait::new();
        repo.expect_list_badges_in_scope()
            .returning(|_| Ok(vec![badge_row(1, "REACH_1_POINTS", None)]));
        repo.expect_has_user_badge().returning(|_, _| Ok(true));
        repo.expect_get_points().never();
        repo.expect_insert_user_badge().never();

        let engine = AchievementEngine::new(
            Arc::new(repo),
            Arc::new(MockEnrollmentRepositoryTrait::new()),
        );

        assert!(engine.evaluate_badges(9, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_course_scoped_lesson_count() {
        let mut repo = MockAchievementRepositoryTrait::new();
        repo.expect_list_badges_in_scope()
            .with(eq(Some(7)))
            .returning(|_| {
                Ok(vec![
                    badge_row(1, "COMPLETE_3_LESSONS", Some(7)),
                    badge_row(2, "COMPLETE_2_LESSON", Some(7)),
                    badge_row(3, "COMPLETE_10_LESSONS", None),
                ])
            });
        repo.expect_has_user_badge().returning(|_, _| Ok(false));
        repo.expect_insert_user_badge().returning(|_, _| Ok(true));

        let mut enrollment_repo = MockEnrollmentRepositoryTrait::new();
        // 课程内计数只查询一次
        enrollment_repo
            .expect_count_user_progress()
            .with(eq(9), eq(Some(7)))
            .times(1)
            .returning(|_, _| Ok(2));
        enrollment_repo
            .expect_count_user_progress()
            .with(eq(9), eq(None))
            .times(1)
            .returning(|_, _| Ok(12));

        let engine = AchievementEngine::new(Arc::new(repo), Arc::new(enrollment_repo));

        assert_eq!(engine.evaluate_badges(9, Some(7)).await.unwrap(), vec![2, 3]);
    }

    #[tokio::test]
    async fn test_unrecognized_criteria_never_qualify() {
        let mut repo = MockAchievementRepositoryTrait::new();
        repo.expect_list_badges_in_scope()
            .returning(|_| Ok(vec![badge_row(1, "LOGIN_7_DAYS", None)]));
        repo.expect_has_user_badge().never();
        repo.expect_insert_user_badge().never();

        let engine = AchievementEngine::new(
            Arc::new(repo),
            Arc::new(MockEnrollmentRepositoryTrait::new()),
        );

        assert!(engine.evaluate_badges(9, None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_points_survives_badge_failure() {
        let mut repo = MockAchievementRepositoryTrait::new();
        repo.expect_increment_points()
            .with(eq(9), eq(5))
            .returning(|_, _| Ok(15));
        repo.expect_list_badges_in_scope()
            .returning(|_| Err(ProgressionError::Database(sqlx::Error::PoolTimedOut)));

        let engine = AchievementEngine::new(
            Arc::new(repo),
            Arc::new(MockEnrollmentRepositoryTrait::new()),
        );

        assert_eq!(engine.add_points(9, 5).await.unwrap(), 15);
    }

    #[tokio::test]
    async fn test_non_positive_delta_is_rejected() {
        let mut repo = MockAchievementRepositoryTrait::new();
        repo.expect_increment_points().never();
        repo.expect_list_badges_in_scope().never();

        let engine = AchievementEngine::new(
            Arc::new(repo),
            Arc::new(MockEnrollmentRepositoryTrait::new()),
        );

        for delta in [0, -60] {
            let err = engine.add_points_in_course(9, delta, Some(1)).await.unwrap_err();
            assert!(matches!(err, ProgressionError::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_top_learners_are_ranked_by_position() {
        let mut repo = MockAchievementRepositoryTrait::new();
        repo.expect_top_entries().with(eq(2)).returning(|_| {
            Ok(vec![
                LeaderboardEntry {
                    user_id: 3,
                    total_points: 50,
                    updated_at: Utc::now(),
                },
                LeaderboardEntry {
                    user_id: 1,
                    total_points: 50,
                    updated_at: Utc::now(),
                },
            ])
        });

        let engine = AchievementEngine::new(
            Arc::new(repo),
            Arc::new(MockEnrollmentRepositoryTrait::new()),
        );
        let ranked = engine.top_learners(2).await.unwrap();

        assert_eq!(ranked[0].rank, 1);
        assert_eq!(ranked[1].rank, 2);
        assert_eq!(ranked[1].user_id, 1);
    }

    #[tokio::test]
    async fn test_stats_for_learner_without_points() {
        let mut repo = MockAchievementRepositoryTrait::new();
        repo.expect_get_points().returning(|_| Ok(None));
        repo.expect_count_entries_above()
            .with(eq(0))
            .returning(|_| Ok(4));
        repo.expect_count_entries_at_or_below().returning(|_| Ok(0));
        repo.expect_count_entries().returning(|| Ok(4));
        repo.expect_list_user_badges().returning(|user_id| {
            Ok(vec![UserBadge {
                id: 1,
                user_id,
                badge_id: 2,
                awarded_at: Utc::now(),
            }])
        });

        let engine = AchievementEngine::new(
            Arc::new(repo),
            Arc::new(MockEnrollmentRepositoryTrait::new()),
        );
        let stats = engine.achievement_stats(9).await.unwrap();

        assert_eq!(stats.total_points, 0);
        assert_eq!(stats.rank, 5);
        assert_eq!(stats.percentile, 0.0);
        assert_eq!(stats.badges.len(), 1);
    }

    #[tokio::test]
    async fn test_leaderboard_snapshot() {
        let mut repo = MockAchievementRepositoryTrait::new();
        repo.expect_count_entries().returning(|| Ok(3));
        repo.expect_top_entries().with(eq(1)).returning(|_| {
            Ok(vec![LeaderboardEntry {
                user_id: 8,
                total_points: 420,
                updated_at: Utc::now(),
            }])
        });

        let engine = AchievementEngine::new(
            Arc::new(repo),
            Arc::new(MockEnrollmentRepositoryTrait::new()),
        );
        let snapshot = engine.leaderboard_snapshot().await.unwrap();
        assert_eq!(
            snapshot,
            LeaderboardSnapshot {
                entries: 3,
                top_points: 420
            }
        );
    }

    #[tokio::test]
    async fn test_empty_leaderboard_snapshot() {
        let mut repo = MockAchievementRepositoryTrait::new();
        repo.expect_count_entries().returning(|| Ok(0));
        repo.expect_top_entries().returning(|_| Ok(vec![]));

        let engine = AchievementEngine::new(
            Arc::new(repo),
            Arc::new(MockEnrollmentRepositoryTrait::new()),
        );
        let snapshot = engine.leaderboard_snapshot().await.unwrap();
        assert_eq!(snapshot.entries, 0);
        assert_eq!(snapshot.top_points, 0);
    }
}
