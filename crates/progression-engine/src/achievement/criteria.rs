//! 徽章条件语法
//!
//! 封闭的固定词表，不是通用表达式语言：
//!
//! | 写法 | 含义 |
//! |---|---|
//! | `COMPLETE_<N>_LESSON` / `COMPLETE_<N>_LESSONS` | 完成课时数 >= N |
//! | `COMPLETE_<N>_COURSE` / `COMPLETE_<N>_COURSES` | 已结业课程数 >= N |
//! | `REACH_<N>_POINTS` | 总积分 >= N（始终全局统计） |
//!
//! 其他任何写法都解析为 `Unrecognized`，评估结果恒为不满足。

use std::fmt;

use serde::{Deserialize, Serialize};

/// 徽章条件
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BadgeCriteria {
    /// 完成课时数达到 n
    LessonCount { n: i64 },
    /// 结业课程数达到 n
    CourseCount { n: i64 },
    /// 总积分达到 n
    PointsThreshold { n: i64 },
    /// 无法识别的写法
    Unrecognized { raw: String },
}

impl BadgeCriteria {
    /// 解析条件字符串，无法识别时返回 `Unrecognized` 而不是错误
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        let parts: Vec<&str> = trimmed.split('_').collect();

        let parsed = match parts.as_slice() {
            ["COMPLETE", n, "LESSON" | "LESSONS"] => {
                parse_count(n).map(|n| Self::LessonCount { n })
            }
            ["COMPLETE", n, "COURSE" | "COURSES"] => {
                parse_count(n).map(|n| Self::CourseCount { n })
            }
            ["REACH", n, "POINTS"] => parse_count(n).map(|n| Self::PointsThreshold { n }),
            _ => None,
        };

        parsed.unwrap_or_else(|| Self::Unrecognized {
            raw: raw.to_string(),
        })
    }

    /// 计数是否按徽章所属课程收窄
    ///
    /// 积分门槛始终按全局积分判断
    pub fn is_course_scoped(&self) -> bool {
        matches!(self, Self::LessonCount { .. } | Self::CourseCount { .. })
    }

    /// 给定实际数值时是否满足
    pub fn is_met_by(&self, actual: i64) -> bool {
        match self {
            Self::LessonCount { n } | Self::CourseCount { n } | Self::PointsThreshold { n } => {
                actual >= *n
            }
            Self::Unrecognized { .. } => false,
        }
    }

    pub fn is_recognized(&self) -> bool {
        !matches!(self, Self::Unrecognized { .. })
    }
}

fn parse_count(raw: &str) -> Option<i64> {
    if raw.is_empty() || !raw.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    raw.parse().ok()
}

impl fmt::Display for BadgeCriteria {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LessonCount { n } => write!(f, "COMPLETE_{}_LESSONS", n),
            Self::CourseCount { n } => write!(f, "COMPLETE_{}_COURSES", n),
            Self::PointsThreshold { n } => write!(f, "REACH_{}_POINTS", n),
            Self::Unrecognized { raw } => f.write_str(raw),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_lesson_count_singular_and_plural() {
        assert_eq!(
            BadgeCriteria::parse("COMPLETE_1_LESSON"),
            BadgeCriteria::LessonCount { n: 1 }
        );
        assert_eq!(
            BadgeCriteria::parse("COMPLETE_10_LESSONS"),
            BadgeCriteria::LessonCount { n: 10 }
        );
    }

    #[test]
    fn test_parse_course_count() {
        assert_eq!(
            BadgeCriteria::parse("COMPLETE_1_COURSE"),
            BadgeCriteria::CourseCount { n: 1 }
        );
        assert_eq!(
            BadgeCriteria::parse("COMPLETE_3_COURSES"),
            BadgeCriteria::CourseCount { n: 3 }
        );
    }

    #[test]
    fn test_parse_points_threshold() {
        assert_eq!(
            BadgeCriteria::parse("REACH_100_POINTS"),
            BadgeCriteria::PointsThreshold { n: 100 }
        );
        assert!(!BadgeCriteria::parse("REACH_100_POINTS").is_course_scoped());
    }

    #[test]
    fn test_unrecognized_patterns_never_qualify() {
        for raw in [
            "",
            "COMPLETE_X_LESSONS",
            "COMPLETE_-1_LESSONS",
            "COMPLETE_5_QUIZZES",
            "REACH_100_POINT",
            "complete_5_lessons",
            "LOGIN_7_DAYS",
        ] {
            let criteria = BadgeCriteria::parse(raw);
            assert!(!criteria.is_recognized(), "{raw} should be unrecognized");
            assert!(!criteria.is_met_by(i64::MAX));
        }
    }

    #[test]
    fn test_threshold_is_inclusive() {
        let criteria = BadgeCriteria::PointsThreshold { n: 100 };
        assert!(!criteria.is_met_by(99));
        assert!(criteria.is_met_by(100));
        assert!(criteria.is_met_by(101));
    }

    #[test]
    fn test_display_uses_canonical_form() {
        assert_eq!(
            BadgeCriteria::parse("COMPLETE_2_LESSON").to_string(),
            "COMPLETE_2_LESSONS"
        );
        assert_eq!(BadgeCriteria::parse("whatever").to_string(), "whatever");
    }
}
