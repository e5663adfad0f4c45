//! 应用上下文
//!
//! 统一持有配置与两级数据库连接，构建后传入路由，处理器不再读取环境变量。

use std::sync::Arc;

use crate::config::AppConfig;
use crate::error::Result;
use sea_orm::DatabaseConnection;

#[derive(Clone)]
pub struct AppContext {
    pub config: Arc<AppConfig>,
    /// 服务角色连接，用于写入
    pub writer: Arc<DatabaseConnection>,
    /// 只读连接，用于仪表板查询
    pub reader: Arc<DatabaseConnection>,
}

impl AppContext {
    #[must_use]
    pub const fn new(
        config: Arc<AppConfig>,
        writer: Arc<DatabaseConnection>,
        reader: Arc<DatabaseConnection>,
    ) -> Self {
        Self {
            config,
            writer,
            reader,
        }
    }

    /// 读写共用同一连接
    #[must_use]
    pub fn with_shared_connection(config: Arc<AppConfig>, db: Arc<DatabaseConnection>) -> Self {
        Self::new(config, Arc::clone(&db), db)
    }

    /// 按配置建立写入端与只读端连接
    pub async fn connect(config: Arc<AppConfig>) -> Result<Self> {
        let writer = Arc::new(crate::database::init_database(config.database.writer_options()).await?);

        let reader = match config.database.reader_options() {
            Some(options) => Arc::new(crate::database::init_database(options).await?),
            None => Arc::clone(&writer),
        };

        Ok(Self::new(config, writer, reader))
    }
}
