//! # 数据库配置
//!
//! 两级凭据：`url` 为写入端（服务角色），`read_url` 为只读端，缺省时复用写入端连接。

use crate::error::{MonitorError, Result};
use crate::{linfo, logging::{LogComponent, LogStage}};
use sea_orm::ConnectOptions;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// 写入端数据库URL
    pub url: String,
    /// 只读端数据库URL
    #[serde(skip_serializing_if = "Option::is_none")]
    pub read_url: Option<String>,
    /// 最大连接数
    pub max_connections: u32,
    /// 连接超时时间（秒）
    pub connect_timeout: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: "sqlite://./data/sd_monitor.db?mode=rwc".to_string(),
            read_url: None,
            max_connections: 10,
            connect_timeout: 30,
        }
    }
}

impl DatabaseConfig {
    /// 确保数据库路径存在（仅对SQLite文件数据库）
    pub fn ensure_database_path(url: &str) -> Result<()> {
        if !is_sqlite(url) || is_memory_database(url) {
            return Ok(());
        }

        let path_str = url
            .strip_prefix("sqlite://")
            .or_else(|| url.strip_prefix("sqlite:"))
            .unwrap_or(url);
        let path_str = path_str.split('?').next().unwrap_or(path_str);
        let db_path = Path::new(path_str);

        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    MonitorError::config_with_source(
                        format!("无法创建数据库目录: {}", parent.display()),
                        e,
                    )
                })?;

                linfo!(
                    "system",
                    LogStage::Startup,
                    LogComponent::Database,
                    "create_db_dir",
                    &format!("创建数据库目录: {}", parent.display())
                );
            }
        }

        Ok(())
    }

    /// 写入端连接参数
    #[must_use]
    pub fn writer_options(&self) -> ConnectOptions {
        self.options_for(&self.url)
    }

    /// 只读端连接参数，未配置时返回 `None`
    #[must_use]
    pub fn reader_options(&self) -> Option<ConnectOptions> {
        self.read_url.as_deref().map(|url| self.options_for(url))
    }

    fn options_for(&self, url: &str) -> ConnectOptions {
        let mut options = ConnectOptions::new(url.to_string());
        options
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout))
            .sqlx_logging(false);
        options
    }
}

/// 检查是否为内存数据库
#[must_use]
pub fn is_memory_database(url: &str) -> bool {
    url.contains(":memory:")
}

/// 检查是否为SQLite数据库
#[must_use]
pub fn is_sqlite(url: &str) -> bool {
    url.starts_with("sqlite:")
}
