//! 视图统计信息刷新工具
//!
//! 单次运行，完成后退出：
//! - 读取需要维护的虚拟数据库列表
//! - 检查每个视图的统计信息是否过期
//! - 对过期视图调用统计信息重算过程

mod checker;
mod executor;
mod orchestrator;
mod refresh;

use std::process::ExitCode;

use anyhow::Context;
use common::config::{load_databases, load_dotenv, AppConfig, LogFormat};
use common::models::{DatabaseConfig, RunSummary};
use executor::VdpExecutor;
use orchestrator::Orchestrator;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const SERVICE_NAME: &str = "stats-refresher";

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file (if present) before anything else
    load_dotenv();

    // 加载配置
    let config = AppConfig::load_with_service(SERVICE_NAME);

    // 初始化日志追踪
    init_tracing(config.log_format);

    info!(service = SERVICE_NAME, config = %config.statistics_config_path, "启动统计刷新");

    match run(&config).await {
        Ok(summary) => {
            info!(refreshed = summary.refreshed, views = summary.views_checked, "统计刷新完成");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %format!("{:#}", e), "统计刷新失败");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing(format: LogFormat) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Text => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn run(config: &AppConfig) -> anyhow::Result<RunSummary> {
    let databases = load_databases(&config.statistics_config_path);

    // 连接在第一条语句执行时建立，配置为空时不会发起任何连接
    let executor = VdpExecutor::connect_lazy(config);
    let result = refresh_all(&executor, &databases).await;
    executor.close().await;

    result.with_context(|| {
        format!(
            "refresh run against {}:{} failed",
            config.vdp_host, config.vdp_port
        )
    })
}

async fn refresh_all(
    executor: &VdpExecutor,
    databases: &[DatabaseConfig],
) -> common::errors::AppResult<RunSummary> {
    // 启动时检查连通性
    if !databases.is_empty() {
        executor.ping().await?;
    }
    Orchestrator::new(executor).run(databases).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use common::errors::AppError;

    #[tokio::test]
    async fn test_empty_config_skips_connectivity_check() {
        let config = AppConfig::from_lookup(SERVICE_NAME, |_| None);
        let executor = VdpExecutor::connect_lazy(&config);

        let err = refresh_all(&executor, &[]).await.unwrap_err();
        assert!(matches!(err, AppError::NoDatabasesConfigured));
        executor.close().await;
    }
}
