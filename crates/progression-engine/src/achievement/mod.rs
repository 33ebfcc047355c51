//! 积分与徽章
//!
//! 积分只增不减；每次积分变动后同步评估徽章。
//! 徽章条件是封闭词表（见 [`criteria`]），在加载时解析为 [`BadgeCriteria`]。

pub mod criteria;
mod dto;
mod engine;

pub use criteria::BadgeCriteria;
pub use dto::{AchievementStats, LeaderboardSnapshot, RankedLearner, percentile};
pub use engine::AchievementEngine;
