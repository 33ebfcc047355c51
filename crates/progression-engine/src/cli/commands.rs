//! CLI 命令定义

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use crate::models::{Principal, QuizAnswer, Role};

/// 学习进度引擎运维工具
#[derive(Parser, Debug)]
#[command(name = "progression-admin")]
#[command(version, about = "课程学习进度引擎运维工具")]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 调用方角色
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActorRole {
    Student,
    Instructor,
    Admin,
}

impl ActorRole {
    pub fn principal(self, id: i64) -> Principal {
        let role = match self {
            Self::Student => Role::Student,
            Self::Instructor => Role::Instructor,
            Self::Admin => Role::Admin,
        };
        Principal::new(id, role)
    }
}

/// 子命令
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// 执行数据库迁移
    Migrate,

    /// 为学员报名课程（已报名时返回原记录）
    Enroll {
        #[arg(short, long)]
        user_id: i64,

        #[arg(short, long)]
        course_id: i64,
    },

    /// 查询课程学习进度
    Progress {
        #[arg(short, long)]
        user_id: i64,

        #[arg(short, long)]
        course_id: i64,
    },

    /// 以指定身份查看课程课时（受保护字段按权限置空）
    Lessons {
        #[arg(short, long)]
        course_id: i64,

        /// 调用方 ID，不填为匿名
        #[arg(short, long)]
        user_id: Option<i64>,

        #[arg(short, long, value_enum, default_value = "student")]
        role: ActorRole,
    },

    /// 标记课时完成
    MarkComplete {
        #[arg(short, long)]
        user_id: i64,

        #[arg(short, long)]
        lesson_id: i64,
    },

    /// 提交测验
    SubmitQuiz {
        #[arg(short, long)]
        user_id: i64,

        #[arg(short, long)]
        lesson_id: i64,

        /// 作答，格式 `题目ID:选项下标`，可重复
        #[arg(short, long = "answer", value_parser = parse_answer)]
        answers: Vec<QuizAnswer>,
    },

    /// 领取结业证书
    ClaimCertificate {
        #[arg(short, long)]
        user_id: i64,

        #[arg(short, long)]
        course_id: i64,
    },

    /// 按编号查询证书
    VerifyCertificate {
        code: String,
    },

    /// 列出学员的证书
    Certificates {
        #[arg(short, long)]
        user_id: i64,
    },

    /// 用 JSON 文件整体替换课程大纲
    ReplaceCurriculum {
        #[arg(short, long)]
        course_id: i64,

        /// 操作者 ID
        #[arg(long)]
        actor: i64,

        #[arg(long, value_enum, default_value = "instructor")]
        role: ActorRole,

        /// 大纲文件（章节数组）
        #[arg(short, long)]
        file: PathBuf,
    },

    /// 增加积分并评估徽章
    AddPoints {
        #[arg(short, long)]
        user_id: i64,

        #[arg(short, long, value_parser = clap::value_parser!(i64).range(1..))]
        delta: i64,

        /// 课程上下文（评估该课程的徽章）
        #[arg(short, long)]
        course_id: Option<i64>,
    },

    /// 评估徽章
    EvaluateBadges {
        #[arg(short, long)]
        user_id: i64,

        #[arg(short, long)]
        course_id: Option<i64>,
    },

    /// 积分排行榜
    Leaderboard {
        /// 返回条数，默认取配置
        #[arg(short, long)]
        limit: Option<i64>,
    },

    /// 学员成就统计
    Stats {
        #[arg(short, long)]
        user_id: i64,
    },

    /// 常驻运行：暴露 Prometheus 指标并定期刷新排行榜概况，Ctrl-C 退出
    Serve {
        /// 指标端口，默认取配置
        #[arg(short, long)]
        port: Option<u16>,

        /// 排行榜指标刷新间隔（秒）
        #[arg(long, default_value = "30", value_parser = clap::value_parser!(u64).range(1..))]
        refresh_secs: u64,
    },
}


/// 解析 `题目ID:选项下标`
pub fn parse_answer(raw: &str) -> Result<QuizAnswer, String> {
    let (question, option) = raw
        .split_once(':')
        .ok_or_else(|| format!("作答格式应为 题目ID:选项下标，实际为 {}", raw))?;

    let question_id = question
        .trim()
        .parse::<i64>()
        .map_err(|e| format!("题目ID无效 {}: {}", question, e))?;
    let selected_option = option
        .trim()
        .parse::<i32>()
        .map_err(|e| format!("选项下标无效 {}: {}", option, e))?;

    Ok(QuizAnswer::new(question_id, selected_option))
}
