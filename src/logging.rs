//! # 日志配置模块
//!
//! 初始化 tracing 订阅器，并提供带请求上下文的结构化日志宏

use std::env;
use std::fmt;
use tracing_subscriber::{EnvFilter, fmt as tracing_fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::error::MonitorError;

/// 日志所处的处理阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogStage {
    Startup,
    Shutdown,
    Authentication,
    Validation,
    Ingestion,
    Query,
    Database,
}

impl fmt::Display for LogStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Startup => "startup",
            Self::Shutdown => "shutdown",
            Self::Authentication => "authentication",
            Self::Validation => "validation",
            Self::Ingestion => "ingestion",
            Self::Query => "query",
            Self::Database => "database",
        };
        f.write_str(name)
    }
}

/// 产生日志的组件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogComponent {
    Main,
    Config,
    Database,
    ServerSetup,
    Auth,
    Ingest,
    Monitor,
    IngestionLogs,
    Settings,
    Health,
}

impl fmt::Display for LogComponent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Main => "main",
            Self::Config => "config",
            Self::Database => "database",
            Self::ServerSetup => "server_setup",
            Self::Auth => "auth",
            Self::Ingest => "ingest",
            Self::Monitor => "monitor",
            Self::IngestionLogs => "ingestion_logs",
            Self::Settings => "settings",
            Self::Health => "health",
        };
        f.write_str(name)
    }
}

/// 信息级结构化日志
///
/// `linfo!(request_id, LogStage, LogComponent, "operation", "message")`
#[macro_export]
macro_rules! linfo {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::info!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
}

/// 调试级结构化日志
#[macro_export]
macro_rules! ldebug {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::debug!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
}

/// 警告级结构化日志
#[macro_export]
macro_rules! lwarn {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::warn!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
}

/// 错误级结构化日志
#[macro_export]
macro_rules! lerror {
    ($request_id:expr, $stage:expr, $component:expr, $operation:expr, $message:expr $(,)?) => {
        ::tracing::error!(
            request_id = %$request_id,
            stage = %$stage,
            component = %$component,
            operation = $operation,
            "{}",
            $message
        )
    };
}

/// 记录管理接口处理失败
///
/// 客户端错误记为 warn，服务端错误记为 error。
pub fn log_management_error(
    request_id: impl fmt::Display,
    stage: LogStage,
    component: LogComponent,
    operation: &str,
    message: &str,
    err: &MonitorError,
) {
    let full = format!("{message}: {err}");
    match err.category() {
        crate::error::ErrorCategory::Client => {
            lwarn!(request_id, stage, component, operation, &full);
        }
        crate::error::ErrorCategory::Server => {
            lerror!(request_id, stage, component, operation, &full);
        }
    }
}

/// 默认过滤规则：关闭 SQL 语句级日志
fn default_filter(level: &str) -> String {
    format!("{level},sqlx::query=off,sea_orm::query=warn,sqlx=warn")
}

/// 初始化优化的日志系统
///
/// `RUST_LOG` 优先于配置中的级别。
pub fn init_optimized_logging(log_level: Option<&str>) {
    let level = log_level.unwrap_or("info");
    let log_filter = env::var("RUST_LOG").unwrap_or_else(|_| default_filter(level));

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| log_filter.into()))
        .with(
            tracing_fmt::layer()
                .with_target(true)
                .with_level(true)
                .with_thread_ids(false)
                .with_thread_names(false)
                .with_file(false)
                .with_line_number(false)
                .compact(),
        )
        .init();

    if env::var("RUST_LOG").is_ok_and(|v| {
        v.contains("sqlx::query=info") || v.contains("sqlx::query=debug")
    }) {
        tracing::info!("SQLx database query logging enabled");
    } else {
        tracing::info!("SQLx database query logging disabled");
    }
}
