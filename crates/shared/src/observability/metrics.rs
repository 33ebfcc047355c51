//! Prometheus 指标模块
//!
//! 基于 metrics crate 和 metrics-exporter-prometheus 实现指标收集与导出。
//! 指标通过独立的 HTTP 端口暴露，供 Prometheus 抓取。

use anyhow::Result;
use axum::{Router, routing::get};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use super::ObservabilityConfig;

/// Metrics 资源守卫，drop 时停止指标服务
pub struct MetricsHandle {
    server_handle: tokio::task::JoinHandle<()>,
}

impl Drop for MetricsHandle {
    fn drop(&mut self) {
        self.server_handle.abort();
    }
}

/// 初始化 Prometheus 指标导出
///
/// 安装全局 recorder 并在 `metrics_port` 上暴露 `/metrics` 与 `/health`。
pub async fn init(config: &ObservabilityConfig) -> Result<MetricsHandle> {
    let handle = PrometheusBuilder::new().install_recorder()?;

    register_common_metrics(&config.service_name);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.metrics_port));
    let listener = TcpListener::bind(addr).await?;
    info!("Metrics server listening on {}", addr);

    Ok(MetricsHandle {
        server_handle: spawn_server(listener, metrics_router(handle)),
    })
}

/// 注册业务指标描述
fn register_common_metrics(service_name: &str) {
    metrics::describe_counter!(
        "lesson_completions_total",
        "Total number of lesson completion attempts"
    );
    metrics::describe_counter!("quiz_submissions_total", "Total number of quiz submissions");
    metrics::describe_counter!(
        "certificate_claims_total",
        "Total number of certificate claims"
    );
    metrics::describe_counter!("points_credited_total", "Total number of points credited");
    metrics::describe_counter!("badges_awarded_total", "Total number of badges awarded");
    metrics::describe_counter!(
        "lesson_access_denied_total",
        "Total number of lesson content access denials"
    );
    metrics::describe_histogram!(
        "badge_evaluation_duration_seconds",
        "Badge evaluation duration in seconds"
    );
    metrics::describe_gauge!("leaderboard_entries", "Number of learners on the leaderboard");
    metrics::describe_gauge!("leaderboard_top_points", "Highest point total on the leaderboard");

    metrics::counter!("service_starts_total", "service" => service_name.to_string()).increment(1);
}

/// 指标路由：`/metrics` 渲染 Prometheus 文本，`/health` 固定返回 OK
pub fn metrics_router(handle: PrometheusHandle) -> Router {
    Router::new()
        .route("/metrics", get(move || std::future::ready(handle.render())))
        .route("/health", get(|| async { "OK" }))
}

fn spawn_server(listener: TcpListener, app: Router) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            error!("Metrics server error: {}", e);
        }
    })
}

// ============================================================================
// 便捷的指标记录函数
// ============================================================================

/// 记录课时完成（status: completed，失败时为错误码，如 ALREADY_COMPLETED、LESSON_LOCKED）
#[inline]
pub fn record_lesson_completion(status: &str) {
    metrics::counter!("lesson_completions_total", "status" => status.to_string()).increment(1);
}

/// 记录测验提交
#[inline]
pub fn record_quiz_submission(passed: bool) {
    metrics::counter!("quiz_submissions_total", "passed" => passed.to_string()).increment(1);
}

/// 记录证书领取（status: issued / existing，失败时为错误码，如 COURSE_INCOMPLETE）
#[inline]
pub fn record_certificate_claim(status: &str) {
    metrics::counter!("certificate_claims_total", "status" => status.to_string()).increment(1);
}

/// 记录积分发放（调用方已保证 delta 为正）
#[inline]
pub fn record_points_credited(delta: i64) {
    metrics::counter!("points_credited_total").increment(delta.unsigned_abs());
}

/// 记录徽章评估
#[inline]
pub fn record_badge_evaluation(awarded: usize, duration_secs: f64) {
    metrics::counter!("badges_awarded_total").increment(awarded as u64);
    metrics::histogram!("badge_evaluation_duration_seconds").record(duration_secs);
}

/// 记录课时内容访问拒绝（reason: anonymous / unresolved_course / not_enrolled / lookup_failed）
#[inline]
pub fn record_access_denied(reason: &str) {
    metrics::counter!("lesson_access_denied_total", "reason" => reason.to_string()).increment(1);
}

/// 刷新排行榜快照指标
#[inline]
pub fn set_leaderboard_gauges(entries: i64, top_points: i64) {
    metrics::gauge!("leaderboard_entries").set(entries as f64);
    metrics::gauge!("leaderboard_top_points").set(top_points as f64);
}
