//! 学习进度引擎运维工具
//!
//! 加载配置、初始化日志并连接数据库后执行单个子命令；`serve` 常驻并暴露指标。

use anyhow::Result;
use clap::Parser;
use learning_shared::{config::AppConfig, database::Database, observability};
use tracing::info;

use progression::cli::{Cli, CommandRunner, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. 加载配置：config/default.toml -> {env}.toml -> progression-admin.toml -> LEARN_ 环境变量
    let config = AppConfig::load("progression-admin").unwrap_or_else(|e| {
        eprintln!("Failed to load config, using defaults: {}", e);
        AppConfig::default()
    });

    // 2. 初始化日志；只有常驻命令启动指标服务
    let obs_config = config
        .observability
        .clone()
        .with_service_name(&config.service_name);
    let obs_config = match &cli.command {
        Commands::Serve { port, .. } => obs_config.with_metrics_port(*port),
        _ => obs_config.without_metrics(),
    };
    let _guard = observability::init(&obs_config).await?;

    info!(environment = %config.environment, "progression-admin 启动");

    // 3. 连接数据库并执行命令
    let database = Database::connect(&config.database).await?;
    database.health_check().await?;
    let runner = CommandRunner::new(database.clone(), &config.learning);
    let result = runner.run(cli.command).await;

    database.close().await;
    result
}
