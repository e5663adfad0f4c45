//! # 应用配置结构定义

use serde::{Deserialize, Serialize};

/// 应用主配置结构
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// HTTP 服务配置
    pub server: ServerConfig,
    /// 数据库配置
    pub database: super::DatabaseConfig,
    /// 共享密钥配置
    pub auth: AuthConfig,
    /// 日志配置
    pub logging: LoggingConfig,
}

/// HTTP 服务配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 监听地址
    pub host: String,
    /// 监听端口
    pub port: u16,
    /// API前缀
    pub api_prefix: String,
    /// 是否启用CORS
    pub enable_cors: bool,
    /// 允许的CORS源地址
    pub cors_origins: Vec<String>,
    /// 最大请求体大小（字节）
    pub max_request_size: usize,
    /// 仪表板静态文件目录
    #[serde(skip_serializing_if = "Option::is_none")]
    pub static_dir: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            api_prefix: "/api".to_string(),
            enable_cors: true,
            cors_origins: vec!["*".to_string()],
            max_request_size: 1024 * 1024,
            static_dir: None,
        }
    }
}

/// 共享密钥配置
///
/// 接入接口与设置写入接口要求 `Authorization: Bearer <service_role_key>`。
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub service_role_key: String,
}

impl AuthConfig {
    /// 期望的完整 `Authorization` 头
    #[must_use]
    pub fn expected_header(&self) -> String {
        format!("Bearer {}", self.service_role_key)
    }
}

/// 日志配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// 验证配置的有效性
    pub fn validate(&self) -> Result<(), String> {
        if self.server.port == 0 {
            return Err("Server port must be greater than 0".to_string());
        }
        if !self.server.api_prefix.starts_with('/') {
            return Err(format!(
                "server.api_prefix must start with '/': {}",
                self.server.api_prefix
            ));
        }
        if self.server.max_request_size == 0 {
            return Err("server.max_request_size must be greater than 0".to_string());
        }

        if self.database.url.is_empty() {
            return Err("Database URL cannot be empty".to_string());
        }
        if self.database.read_url.as_deref().is_some_and(str::is_empty) {
            return Err("database.read_url cannot be empty when set".to_string());
        }
        if self.database.max_connections == 0 {
            return Err("Database max_connections must be greater than 0".to_string());
        }

        if self.auth.service_role_key.trim().is_empty() {
            return Err("auth.service_role_key must be provided".to_string());
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.service_role_key = "secret".to_string();
        config
    }

    #[test]
    fn test_defaults_need_only_a_secret() {
        assert!(valid().validate().is_ok());
        assert!(AppConfig::default().validate().is_err());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: AppConfig = toml::from_str(
            r#"
            [server]
            port = 8088

            [auth]
            service_role_key = "abc"
            "#,
        )
        .unwrap();

        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.api_prefix, "/api");
        assert_eq!(config.database.max_connections, 10);
        assert_eq!(config.auth.expected_header(), "Bearer abc");
    }

    #[test]
    fn test_rejects_bad_values() {
        let mut config = valid();
        config.server.api_prefix = "api".to_string();
        assert!(config.validate().is_err());

        let mut config = valid();
        config.database.read_url = Some(String::new());
        assert!(config.validate().is_err());

        let mut config = valid();
        config.database.max_connections = 0;
        assert!(config.validate().is_err());
    }
}
