//! # 应用设置服务
//!
//! 读取时把所有设置行展开为一个对象；写入时所有键在同一个事务内由多行
//! `INSERT ... ON CONFLICT (key) DO UPDATE` 分段完成，要么全部生效要么全部失败。

use chrono::Utc;
use entity::{AppSettings, app_settings};
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, DbErr, EntityTrait, QueryOrder, Set, TransactionTrait};
use serde_json::{Map, Value};

use crate::database::DEFAULT_REFRESH_INTERVAL_SECONDS;
use crate::error::{MonitorError, Result};
use crate::management::server::AppState;
use crate::validation_error;

/// 写入成功的提示
pub const SETTINGS_UPDATED_MESSAGE: &str = "Settings updated";

/// 单条 upsert 的最大行数
const UPSERT_CHUNK_ROWS: usize = 256;

/// 解析设置更新请求体，要求是 JSON 对象
pub fn parse_update(body: &[u8]) -> Result<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body)? {
        Value::Object(map) => Ok(map),
        _ => Err(validation_error!(
            "Invalid settings format. Expected a JSON object"
        )),
    }
}

pub struct SettingsService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> SettingsService<'a> {
    /// 读取使用只读端连接
    #[must_use]
    pub fn reader(state: &'a AppState) -> Self {
        Self {
            db: state.reader.as_ref(),
        }
    }

    /// 写入使用写入端连接
    #[must_use]
    pub fn writer(state: &'a AppState) -> Self {
        Self {
            db: state.writer.as_ref(),
        }
    }

    #[must_use]
    pub const fn with_connection(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// 全部设置，键到值的扁平对象
    pub async fn get_all(&self) -> Result<Map<String, Value>> {
        let rows = AppSettings::find()
            .order_by_asc(app_settings::Column::Key)
            .all(self.db)
            .await?;

        Ok(rows.into_iter().map(|row| (row.key, row.value)).collect())
    }

    /// 批量写入设置，返回写入的键数量
    pub async fn update(&self, settings: Map<String, Value>) -> Result<usize> {
        if settings.is_empty() {
            return Ok(0);
        }

        let count = settings.len();
        let now = Utc::now();
        let rows: Vec<app_settings::ActiveModel> = settings
            .into_iter()
            .map(|(key, value)| app_settings::ActiveModel {
                key: Set(key),
                value: Set(value),
                updated_at: Set(now),
            })
            .collect();

        upsert_all(self.db, rows)
            .await
            .map_err(|e| MonitorError::store_write_with_source("Failed to update settings", e))?;

        Ok(count)
    }

    /// 仪表板刷新间隔
    pub async fn refresh_interval_seconds(&self) -> Result<u64> {
        let row = AppSettings::find_by_id("refresh_interval".to_string())
            .one(self.db)
            .await?;
        Ok(row.map_or(DEFAULT_REFRESH_INTERVAL_SECONDS, |row| {
            refresh_interval_from(&row.value)
        }))
    }
}

/// 单事务分段 upsert，任一分段失败则全部回滚
async fn upsert_all(
    db: &DatabaseConnection,
    rows: Vec<app_settings::ActiveModel>,
) -> std::result::Result<(), DbErr> {
    let txn = db.begin().await?;
    for chunk in rows.chunks(UPSERT_CHUNK_ROWS) {
        AppSettings::insert_many(chunk.iter().cloned())
            .on_conflict(
                OnConflict::column(app_settings::Column::Key)
                    .update_columns([app_settings::Column::Value, app_settings::Column::UpdatedAt])
                    .to_owned(),
            )
            .exec_without_returning(&txn)
            .await?;
    }
    txn.commit().await
}

/// `{"seconds": n}` 中的正整数，否则使用默认值
#[must_use]
pub fn refresh_interval_from(value: &Value) -> u64 {
    value
        .get("seconds")
        .and_then(Value::as_u64)
        .filter(|seconds| *seconds > 0)
        .unwrap_or(DEFAULT_REFRESH_INTERVAL_SECONDS)
}
