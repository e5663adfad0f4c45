//! # 配置管理模块
//!
//! 处理应用配置加载、验证和管理

mod app_config;
mod database;
mod manager;

pub use app_config::{AppConfig, AuthConfig, LoggingConfig, ServerConfig};
pub use database::{DatabaseConfig, is_memory_database, is_sqlite};
pub use manager::{CONFIG_PATH_ENV, ConfigManager, ENV_PREFIX};

/// 验证配置有效性
fn validate_config(config: &AppConfig) -> crate::error::Result<()> {
    config.validate().map_err(crate::error::MonitorError::config)
}
