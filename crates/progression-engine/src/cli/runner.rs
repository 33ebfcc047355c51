//! 命令执行器
//!
//! 把 CLI 子命令转化为服务调用，结果以格式化 JSON 输出到标准输出。

use std::fs;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Serialize;
use tracing::{info, warn};

use learning_shared::config::LearningConfig;
use learning_shared::database::Database;
use learning_shared::observability::metrics;

use super::commands::Commands;
use crate::access::RequestContext;
use crate::models::NewSection;
use crate::service::{Collaborators, ProgressionServices, Repositories};

/// 命令执行器
pub struct CommandRunner {
    database: Database,
    services: ProgressionServices,
    leaderboard_default_limit: i64,
}

impl CommandRunner {
    /// 使用默认协作方（URL 证书生成、日志邮件）装配服务
    pub fn new(database: Database, config: &LearningConfig) -> Self {
        let services = ProgressionServices::new(
            Repositories::postgres(database.pool().clone()),
            Collaborators::defaults(config),
            config,
        );

        Self {
            database,
            services,
            leaderboard_default_limit: config.leaderboard_default_limit,
        }
    }

    /// 执行子命令
    pub async fn run(&self, command: Commands) -> Result<()> {
        match command {
            Commands::Migrate => {
                let version = self.database.run_migrations().await?;
                print_json(&serde_json::json!({ "schemaVersion": version }))?;
            }
            Commands::Enroll { user_id, course_id } => {
                let enrollment = self
                    .services
                    .enrollments
                    .create_enrollment(user_id, course_id)
                    .await?;
                print_json(&enrollment)?;
            }
            Commands::Progress { user_id, course_id } => {
                let progress = self.services.progress.get_progress(user_id, course_id).await?;
                print_json(&progress)?;
            }
            Commands::Lessons {
                course_id,
                user_id,
                role,
            } => {
                let mut ctx = match user_id {
                    Some(id) => RequestContext::for_principal(role.principal(id)),
                    None => RequestContext::anonymous(),
                };
                let views = self
                    .services
                    .content
                    .present_course(&mut ctx, course_id)
                    .await?;
                print_json(&views)?;
            }
            Commands::MarkComplete { user_id, lesson_id } => {
                let progress = self
                    .services
                    .progress
                    .mark_complete(user_id, lesson_id)
                    .await?;
                print_json(&progress)?;
            }
            Commands::SubmitQuiz {
                user_id,
                lesson_id,
                answers,
            } => {
                let result = self
                    .services
                    .quizzes
                    .submit_quiz(user_id, lesson_id, &answers)
                    .await?;
                print_json(&result)?;
            }
            Commands::ClaimCertificate { user_id, course_id } => {
                let certificate = self
                    .services
                    .progress
                    .claim_certificate(user_id, course_id)
                    .await?;
                print_json(&certificate)?;
            }
            Commands::VerifyCertificate { code } => {
                let certificate = self.services.progress.verify_certificate(&code).await?;
                print_json(&certificate)?;
            }
            Commands::Certificates { user_id } => {
                let certificates = self.services.progress.list_certificates(user_id).await?;
                print_json(&certificates)?;
            }
            Commands::ReplaceCurriculum {
                course_id,
                actor,
                role,
                file,
            } => {
                let content = fs::read_to_string(&file)
                    .with_context(|| format!("读取大纲文件失败: {}", file.display()))?;
                let sections: Vec<NewSection> =
                    serde_json::from_str(&content).context("解析大纲文件失败")?;

                self.services
                    .curriculum
                    .replace_curriculum(&role.principal(actor), course_id, sections)
                    .await?;
                info!(course_id, "大纲替换完成");
            }
            Commands::AddPoints {
                user_id,
                delta,
                course_id,
            } => {
                let total = self
                    .services
                    .achievements
                    .add_points_in_course(user_id, delta, course_id)
                    .await?;
                print_json(&serde_json::json!({ "userId": user_id, "totalPoints": total }))?;
            }
            Commands::EvaluateBadges { user_id, course_id } => {
                let awarded = self
                    .services
                    .achievements
                    .evaluate_badges(user_id, course_id)
                    .await?;
                print_json(&serde_json::json!({ "userId": user_id, "awardedBadgeIds": awarded }))?;
            }
            Commands::Leaderboard { limit } => {
                let limit = limit.unwrap_or(self.leaderboard_default_limit);
                let ranked = self.services.achievements.top_learners(limit).await?;
                print_json(&ranked)?;
            }
            Commands::Stats { user_id } => {
                let stats = self.services.achievements.achievement_stats(user_id).await?;
                print_json(&stats)?;
            }
            Commands::Serve { refresh_secs, .. } => {
                self.serve(Duration::from_secs(refresh_secs)).await;
            }
        }

        Ok(())
    }

    /// 常驻循环：按间隔刷新排行榜指标，收到关闭信号后返回
    ///
    /// 单次刷新失败只记录日志，下一轮重试。
    async fn serve(&self, refresh: Duration) {
        info!(refresh_secs = refresh.as_secs(), "进入常驻模式");

        let mut ticker = tokio::time::interval(refresh);
        let shutdown = shutdown_signal();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => break,
                _ = ticker.tick() => {
                    match self.services.achievements.leaderboard_snapshot().await {
                        Ok(snapshot) => {
                            metrics::set_leaderboard_gauges(snapshot.entries, snapshot.top_points);
                        }
                        Err(e) => warn!(error = %e, "刷新排行榜指标失败"),
                    }
                }
            }
        }

        info!("常驻模式已停止");
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "安装 CTRL+C 信号处理器失败");
        // 无法监听信号时保持运行，由进程管理器终止
        std::future::pending::<()>().await;
    }
    info!("收到关闭信号，正在停止服务...");
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
