//! 运维命令行
//!
//! `progression-admin` 直接在数据库上执行引擎操作，输出 JSON：
//!
//! ```bash
//! # 执行迁移
//! progression-admin migrate
//!
//! # 报名并标记课时完成
//! progression-admin enroll -u 1 -c 7
//! progression-admin mark-complete -u 1 -l 12
//!
//! # 提交测验（题目ID:选项下标）
//! progression-admin submit-quiz -u 1 -l 12 -a 31:0 -a 32:2
//!
//! # 领取证书、查看排行榜
//! progression-admin claim-certificate -u 1 -c 7
//! progression-admin leaderboard --limit 20
//!
//! # 常驻运行，在 9464 端口暴露 /metrics
//! progression-admin serve --port 9464
//! ```

pub mod commands;
pub mod runner;

pub use commands::{ActorRole, Cli, Commands, parse_answer};
pub use runner::CommandRunner;
