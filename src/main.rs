//! # SD Monitor 主程序
//!
//! 接收代理上报的备份与故障转移状态，并为仪表板提供查询接口

use clap::Parser;
use sd_monitor::{
    Result,
    app::AppContext,
    config::ConfigManager,
    database, lerror, linfo,
    logging::{self, LogComponent, LogStage},
    management::{ManagementServer, handlers::system},
};
use std::path::PathBuf;
use std::sync::Arc;

/// 命令行参数
#[derive(Debug, Parser)]
#[command(name = "sd-monitor", version, about = "Backup and VM failover status dashboard backend")]
struct Cli {
    /// 配置文件路径
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// 日志级别，覆盖配置文件
    #[arg(long, value_name = "LEVEL")]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_manager = ConfigManager::load(cli.config.as_deref())?;
    let config = config_manager.get_config();

    logging::init_optimized_logging(Some(cli.log_level.as_deref().unwrap_or(&config.logging.level)));
    system::init_start_time();

    if let Some(source) = config_manager.source() {
        linfo!(
            "system",
            LogStage::Startup,
            LogComponent::Config,
            "config_loaded",
            &format!("已加载配置文件: {}", source.display())
        );
    }

    let context = match run_data_initialization(config).await {
        Ok(context) => context,
        Err(e) => {
            lerror!(
                "system",
                LogStage::Startup,
                LogComponent::Main,
                "data_init_failed",
                &format!("数据初始化失败: {e:#}")
            );
            std::process::exit(1);
        }
    };

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Main,
        "service_starting",
        "服务启动"
    );
    if let Err(e) = ManagementServer::new(Arc::new(context)).serve().await {
        lerror!(
            "system",
            LogStage::Startup,
            LogComponent::Main,
            "service_start_failed",
            &format!("服务启动失败: {e:?}")
        );
        std::process::exit(1);
    }

    linfo!(
        "system",
        LogStage::Shutdown,
        LogComponent::Main,
        "service_shutdown",
        "服务正常关闭"
    );
    Ok(())
}

/// 建立连接、引导表结构并写入默认设置
async fn run_data_initialization(
    config: Arc<sd_monitor::AppConfig>,
) -> anyhow::Result<AppContext> {
    let context = AppContext::connect(config)
        .await
        .map_err(|e| anyhow::anyhow!("数据库连接失败: {e}"))?;

    database::ensure_schema(&context.writer)
        .await
        .map_err(|e| anyhow::anyhow!("表结构初始化失败: {e}"))?;

    database::ensure_default_settings(&context.writer)
        .await
        .map_err(|e| anyhow::anyhow!("默认设置初始化失败: {e}"))?;

    linfo!(
        "system",
        LogStage::Startup,
        LogComponent::Database,
        "data_init_complete",
        "数据初始化完成"
    );
    Ok(context)
}
