//! # 配置管理器
//!
//! 加载 TOML 配置文件并应用 `SD_MONITOR_` 前缀的环境变量覆盖

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::AppConfig;
use crate::ensure_config;
use crate::error::{Context, MonitorError, Result};

/// 环境变量前缀
pub const ENV_PREFIX: &str = "SD_MONITOR_";
/// 指定配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "SD_MONITOR_CONFIG_PATH";

/// 配置管理器
///
/// 配置在启动时构建一次，之后以只读方式共享。
pub struct ConfigManager {
    config: Arc<AppConfig>,
    source: Option<PathBuf>,
}

impl ConfigManager {
    /// 创建配置管理器
    ///
    /// 显式路径必须存在；否则依次尝试 `SD_MONITOR_CONFIG_PATH` 与
    /// `config/config.{RUST_ENV}.toml`，文件缺失时使用默认配置。
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit_path {
            return Self::from_file(path);
        }

        let config_file = env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| {
            let env = env::var("RUST_ENV").unwrap_or_else(|_| "dev".to_string());
            format!("config/config.{env}.toml")
        });

        if Path::new(&config_file).exists() {
            Self::from_file(config_file)
        } else {
            warn!("配置文件不存在: {}，使用默认配置", config_file);
            Self::from_config(AppConfig::default(), env::vars())
        }
    }

    /// 从指定文件创建配置管理器
    pub fn from_file(config_path: impl AsRef<Path>) -> Result<Self> {
        let config_path = config_path.as_ref();
        let config = Self::load_config_file(config_path)?;
        let mut manager = Self::from_config(config, env::vars())?;
        manager.source = Some(config_path.to_path_buf());
        Ok(manager)
    }

    /// 在给定配置上应用环境变量覆盖并校验
    pub fn from_config(
        mut config: AppConfig,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let env_overrides = Self::build_env_overrides(vars);
        Self::apply_env_overrides(&mut config, &env_overrides)?;
        super::validate_config(&config)?;

        info!("配置管理器初始化完成");
        info!("- 环境变量覆盖: {} 个", env_overrides.len());

        Ok(Self {
            config: Arc::new(config),
            source: None,
        })
    }

    /// 获取当前配置
    #[must_use]
    pub fn get_config(&self) -> Arc<AppConfig> {
        Arc::clone(&self.config)
    }

    /// 配置来源文件
    #[must_use]
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// 加载配置文件
    fn load_config_file(path: &Path) -> Result<AppConfig> {
        ensure_config!(path.exists(), "配置文件不存在: {}", path.display());

        let config_content = std::fs::read_to_string(path)
            .with_context(|| format!("读取配置文件失败: {}", path.display()))?;

        toml::from_str(&config_content).map_err(|e| {
            MonitorError::config_with_source(
                format!("TOML解析失败 - 配置文件: {}, 详细错误: {e}", path.display()),
                e,
            )
        })
    }

    /// 构建环境变量覆盖映射
    ///
    /// `SD_MONITOR_SERVER_PORT` -> `server.port`
    fn build_env_overrides(
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> HashMap<String, String> {
        let mut overrides = HashMap::new();

        for (key, value) in vars {
            if key == CONFIG_PATH_ENV {
                continue;
            }
            if let Some(config_key) = key.strip_prefix(ENV_PREFIX) {
                let config_path = config_key.to_lowercase().replace('_', ".");
                overrides.insert(config_path, value);
            }
        }

        debug!("发现 {} 个环境变量覆盖", overrides.len());
        overrides
    }

    /// 应用环境变量覆盖
    fn apply_env_overrides(
        config: &mut AppConfig,
        overrides: &HashMap<String, String>,
    ) -> Result<()> {
        for (path, value) in overrides {
            debug!(
                "应用环境变量覆盖: {} = {}",
                path,
                if path.contains("key") || path.contains("url") {
                    "***"
                } else {
                    value
                }
            );

            Self::apply_override_to_config(config, path, value)?;
        }
        Ok(())
    }

    /// 将环境变量覆盖应用到配置对象
    fn apply_override_to_config(config: &mut AppConfig, path: &str, value: &str) -> Result<()> {
        let parts: Vec<&str> = path.split('.').collect();

        match parts.as_slice() {
            ["server", "host"] => config.server.host = value.to_string(),
            ["server", "port"] => {
                config.server.port = parse_value(value, "无效的端口号")?;
            }
            ["server", "api", "prefix"] => config.server.api_prefix = value.to_string(),
            ["server", "enable", "cors"] => {
                config.server.enable_cors = parse_value(value, "无效的CORS开关")?;
            }
            ["server", "cors", "origins"] => {
                config.server.cors_origins = value
                    .split(',')
                    .map(str::trim)
                    .filter(|origin| !origin.is_empty())
                    .map(ToString::to_string)
                    .collect();
            }
            ["server", "max", "request", "size"] => {
                config.server.max_request_size = parse_value(value, "无效的请求体大小")?;
            }
            ["server", "static", "dir"] => config.server.static_dir = Some(value.to_string()),
            ["database", "url"] => config.database.url = value.to_string(),
            ["database", "read", "url"] => config.database.read_url = Some(value.to_string()),
            ["database", "max", "connections"] => {
                config.database.max_connections = parse_value(value, "无效的最大连接数")?;
            }
            ["database", "connect", "timeout"] => {
                config.database.connect_timeout = parse_value(value, "无效的连接超时")?;
            }
            ["auth", "service", "role", "key"] => {
                config.auth.service_role_key = value.to_string();
            }
            ["logging", "level"] => config.logging.level = value.to_string(),
            _ => {
                warn!("未知的配置路径，忽略环境变量覆盖: {}", path);
            }
        }

        Ok(())
    }
}

fn parse_value<T>(value: &str, message: &str) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    value
        .parse()
        .map_err(|e| MonitorError::config_with_source(format!("{message}: {value}"), e))
}
