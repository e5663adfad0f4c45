//! # 数据库模块
//!
//! 数据库连接、表结构引导与默认数据初始化

use crate::config::DatabaseConfig;
use crate::error::{MonitorError, Result};
use chrono::Utc;
use entity::{AppSettings, BackupReports, IngestionLogs, VmFailoverReports, app_settings};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ConnectOptions, ConnectionTrait, Database, DatabaseConnection, EntityTrait, Schema, Set,
};
use tracing::{debug, info};

/// 默认刷新间隔（秒）
pub const DEFAULT_REFRESH_INTERVAL_SECONDS: u64 = 60;
/// 默认数据保留天数
pub const DEFAULT_DATA_RETENTION_DAYS: u64 = 90;

/// 初始化数据库连接
pub async fn init_database(options: ConnectOptions) -> Result<DatabaseConnection> {
    let url = options.get_url().to_string();
    info!("正在连接数据库: {}", redact_url(&url));

    DatabaseConfig::ensure_database_path(&url)?;

    let db = Database::connect(options).await.map_err(|e| {
        MonitorError::database_with_source(format!("数据库连接失败: {}", redact_url(&url)), e)
    })?;

    info!("数据库连接成功");
    Ok(db)
}

/// 按实体定义创建缺失的表与索引
///
/// 只做 `IF NOT EXISTS` 创建，不处理表结构变更。
pub async fn ensure_schema(db: &DatabaseConnection) -> Result<()> {
    create_table(db, IngestionLogs).await?;
    create_table(db, BackupReports).await?;
    create_table(db, VmFailoverReports).await?;
    create_table(db, AppSettings).await?;
    info!("数据表检查完成");
    Ok(())
}

async fn create_table<E: EntityTrait>(db: &DatabaseConnection, entity: E) -> Result<()> {
    let backend = db.get_database_backend();
    let schema = Schema::new(backend);

    let mut table = schema.create_table_from_entity(entity);
    table.if_not_exists();
    db.execute(backend.build(&table)).await.map_err(|e| {
        MonitorError::database_with_source(format!("创建数据表失败: {}", entity.table_name()), e)
    })?;

    for mut index in schema.create_index_from_entity(entity) {
        index.if_not_exists();
        db.execute(backend.build(&index)).await?;
    }

    debug!("数据表就绪: {}", entity.table_name());
    Ok(())
}

/// 写入缺失的默认设置，已有值保持不变
pub async fn ensure_default_settings(db: &DatabaseConnection) -> Result<()> {
    let now = Utc::now();
    let defaults = [
        (
            "refresh_interval",
            serde_json::json!({ "seconds": DEFAULT_REFRESH_INTERVAL_SECONDS }),
        ),
        (
            "data_retention_days",
            serde_json::json!({ "days": DEFAULT_DATA_RETENTION_DAYS }),
        ),
    ];

    let models = defaults.into_iter().map(|(key, value)| app_settings::ActiveModel {
        key: Set(key.to_string()),
        value: Set(value),
        updated_at: Set(now),
    });

    let inserted = AppSettings::insert_many(models)
        .on_conflict(
            OnConflict::column(app_settings::Column::Key)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    if inserted > 0 {
        info!("已写入 {} 项默认设置", inserted);
    }
    Ok(())
}

/// 检查数据库连通性
pub async fn ping(db: &DatabaseConnection) -> Result<()> {
    db.ping()
        .await
        .map_err(|e| MonitorError::database_with_source("数据库不可用", e))
}

/// 隐藏连接串中的凭据
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***{}", &url[..scheme_end], &url[at..])
        }
        _ => url.to_string(),
    }
}
