//! # 数据接入服务
//!
//! 一次接入的完整流程：
//! 1. 解析并校验批次，`data` 必须是非空数组；
//! 2. 写入一条乐观标记为 `success` 的接入日志；
//! 3. 在一个事务内按固定行数分段批量写入报告行；
//! 4. 批量写入失败时把接入日志改为 `error` 并记录驱动错误。
//!
//! 不做自动重试。

use chrono::{DateTime, Utc};
use entity::{
    BackupReports, IngestionLogs, VmFailoverReports, backup_reports, ingestion_logs,
    vm_failover_reports,
};
use sea_orm::sea_query::Expr;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
    TransactionTrait,
};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use uuid::Uuid;

use crate::error::{MonitorError, Result};
use crate::logging::{LogComponent, LogStage};
use crate::management::server::AppState;
use crate::types::{IngestionSource, IngestionStatus};
use crate::{ensure_valid, ldebug, lerror, linfo};

/// `data` 缺失、为空或不是数组时的提示
pub const INVALID_FORMAT_MESSAGE: &str = "Invalid data format. Expected { data: [...] }";

/// 单条 INSERT 的最大行数
///
/// 备份行每行 7 个绑定参数，128 行低于 SQLite 旧版本 999 个参数的上限。
pub const INSERT_CHUNK_ROWS: usize = 128;

/// 备份状态记录
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupRecord {
    pub computer_name: String,
    pub backup_status: String,
    #[serde(default, deserialize_with = "deserialize_file_age")]
    pub file_age: Option<i32>,
    #[serde(default)]
    pub modified_time: Option<String>,
}

/// 虚拟机故障转移状态记录
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmRecord {
    pub computer_name: String,
    pub failover_status: String,
    #[serde(default)]
    pub vm_name: Option<String>,
}

/// 一批待写入的报告
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportBatch {
    Backup(Vec<BackupRecord>),
    Vm(Vec<VmRecord>),
}

#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    data: Option<Value>,
}

impl ReportBatch {
    /// 从原始请求体解析批次
    ///
    /// 非 JSON、缺少 `data`、空数组与记录字段不符都归为输入错误。
    pub fn parse(source: IngestionSource, body: &[u8]) -> Result<Self> {
        let envelope: Envelope = serde_json::from_slice(body)?;
        let items = match envelope.data {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        };
        ensure_valid!(!items.is_empty(), INVALID_FORMAT_MESSAGE);

        let batch = match source {
            IngestionSource::Backup => Self::Backup(parse_records(items)?),
            IngestionSource::VmFailover => Self::Vm(parse_records(items)?),
        };
        Ok(batch)
    }

    #[must_use]
    pub const fn source(&self) -> IngestionSource {
        match self {
            Self::Backup(_) => IngestionSource::Backup,
            Self::Vm(_) => IngestionSource::VmFailover,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Backup(records) => records.len(),
            Self::Vm(records) => records.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 成功提示文本
    #[must_use]
    pub fn success_message(&self) -> String {
        match self {
            Self::Backup(records) => {
                format!("Successfully ingested {} backup records", records.len())
            }
            Self::Vm(records) => {
                format!("Successfully ingested {} VM failover records", records.len())
            }
        }
    }

    /// 分段写入整批记录，每行关联接入日志ID，返回执行的语句数
    ///
    /// 调用方负责把所有分段包在同一个事务里。
    async fn insert<C: ConnectionTrait>(
        &self,
        db: &C,
        ingestion_id: Uuid,
        now: DateTime<Utc>,
    ) -> std::result::Result<usize, DbErr> {
        let mut statements = 0;
        match self {
            Self::Backup(records) => {
                for chunk in records.chunks(INSERT_CHUNK_ROWS) {
                    let rows = chunk.iter().map(|record| backup_reports::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        computer_name: Set(record.computer_name.clone()),
                        backup_status: Set(record.backup_status.clone()),
                        file_age: Set(record.file_age),
                        modified_time: Set(record.modified_time.clone()),
                        ingestion_id: Set(Some(ingestion_id)),
                        created_at: Set(now),
                    });
                    BackupReports::insert_many(rows)
                        .exec_without_returning(db)
                        .await?;
                    statements += 1;
                }
            }
            Self::Vm(records) => {
                for chunk in records.chunks(INSERT_CHUNK_ROWS) {
                    let rows = chunk.iter().map(|record| vm_failover_reports::ActiveModel {
                        id: Set(Uuid::new_v4()),
                        computer_name: Set(record.computer_name.clone()),
                        failover_status: Set(record.failover_status.clone()),
                        vm_name: Set(record.vm_name.clone()),
                        ingestion_id: Set(Some(ingestion_id)),
                        created_at: Set(now),
                    });
                    VmFailoverReports::insert_many(rows)
                        .exec_without_returning(db)
                        .await?;
                    statements += 1;
                }
            }
        }
        Ok(statements)
    }
}

fn parse_records<T: serde::de::DeserializeOwned>(items: Vec<Value>) -> Result<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(index, item)| {
            serde_json::from_value(item).map_err(|e| {
                MonitorError::validation_field(format!("Invalid record at index {index}: {e}"), "data")
            })
        })
        .collect()
}

/// `fileAge` 可以是数字或数字字符串
///
/// 小数向零截断；无法解析的字符串与超出范围的值记为空。
fn deserialize_file_age<'de, D>(deserializer: D) -> std::result::Result<Option<i32>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(number)) => Ok(number_to_days(&number)),
        Some(Value::String(text)) => Ok(text
            .trim()
            .parse::<serde_json::Number>()
            .ok()
            .and_then(|number| number_to_days(&number))),
        Some(other) => Err(serde::de::Error::custom(format!(
            "fileAge must be a number or numeric string, got {other}"
        ))),
    }
}

#[allow(clippy::cast_possible_truncation)]
fn number_to_days(number: &serde_json::Number) -> Option<i32> {
    if let Some(whole) = number.as_i64() {
        return i32::try_from(whole).ok();
    }
    let float = number.as_f64()?.trunc();
    if float.is_finite() && float >= f64::from(i32::MIN) && float <= f64::from(i32::MAX) {
        Some(float as i32)
    } else {
        None
    }
}

/// 接入成功响应
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestResponse {
    pub success: bool,
    pub ingestion_id: Uuid,
    pub records_count: usize,
    pub message: String,
}

/// 数据接入服务
pub struct IngestionService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> IngestionService<'a> {
    /// 使用写入端连接
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            db: state.writer.as_ref(),
        }
    }

    #[must_use]
    pub const fn with_connection(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// 执行一次接入
    pub async fn ingest(
        &self,
        request_id: &str,
        batch: &ReportBatch,
        source_ip: &str,
    ) -> Result<IngestResponse> {
        let source = batch.source();
        let records_count = batch.len();
        let ingestion_id = Uuid::new_v4();
        let now = Utc::now();

        let log = ingestion_logs::ActiveModel {
            id: Set(ingestion_id),
            source_type: Set(source.as_str().to_string()),
            status: Set(IngestionStatus::Success.as_str().to_string()),
            records_count: Set(i32::try_from(records_count).unwrap_or(i32::MAX)),
            error_message: Set(None),
            source_ip: Set(Some(source_ip.to_string())),
            created_at: Set(now),
        };

        IngestionLogs::insert(log)
            .exec_without_returning(self.db)
            .await
            .map_err(|e| {
                lerror!(
                    request_id,
                    LogStage::Database,
                    LogComponent::Ingest,
                    "create_ingestion_log_fail",
                    &format!("创建接入日志失败 ({source}): {e}")
                );
                MonitorError::store_write_with_source("Failed to create ingestion log", e)
            })?;

        if let Err(insert_err) = self.write_batch(request_id, batch, ingestion_id, now).await {
            let detail = insert_err.to_string();
            lerror!(
                request_id,
                LogStage::Database,
                LogComponent::Ingest,
                "insert_reports_fail",
                &format!("批量写入失败 ingestion_id={ingestion_id} ({source}): {detail}")
            );
            self.mark_failed(request_id, ingestion_id, &detail).await;
            return Err(MonitorError::store_write_with_source(
                "Failed to insert records",
                insert_err,
            ));
        }

        linfo!(
            request_id,
            LogStage::Ingestion,
            LogComponent::Ingest,
            "ingest_success",
            &format!(
                "接入完成 ingestion_id={ingestion_id} source={source} records={records_count} from={source_ip}"
            )
        );

        Ok(IngestResponse {
            success: true,
            ingestion_id,
            records_count,
            message: batch.success_message(),
        })
    }

    /// 在一个事务内写入整批记录，任一分段失败则整批回滚
    async fn write_batch(
        &self,
        request_id: &str,
        batch: &ReportBatch,
        ingestion_id: Uuid,
        now: DateTime<Utc>,
    ) -> std::result::Result<(), DbErr> {
        let txn = self.db.begin().await?;

        match batch.insert(&txn, ingestion_id, now).await {
            Ok(statements) => {
                txn.commit().await?;
                ldebug!(
                    request_id,
                    LogStage::Database,
                    LogComponent::Ingest,
                    "batch_written",
                    &format!(
                        "批次写入完成 ingestion_id={ingestion_id} rows={} statements={statements}",
                        batch.len()
                    )
                );
                Ok(())
            }
            Err(insert_err) => {
                if let Err(rollback_err) = txn.rollback().await {
                    lerror!(
                        request_id,
                        LogStage::Database,
                        LogComponent::Ingest,
                        "batch_rollback_fail",
                        &format!("批次回滚失败 ingestion_id={ingestion_id}: {rollback_err}")
                    );
                }
                Err(insert_err)
            }
        }
    }

    /// 将接入日志改为失败状态；更新本身失败时只记录日志
    async fn mark_failed(&self, request_id: &str, ingestion_id: Uuid, detail: &str) {
        let result = IngestionLogs::update_many()
            .col_expr(
                ingestion_logs::Column::Status,
                Expr::value(IngestionStatus::Error.as_str()),
            )
            .col_expr(
                ingestion_logs::Column::ErrorMessage,
                Expr::value(detail.to_string()),
            )
            .filter(ingestion_logs::Column::Id.eq(ingestion_id))
            .exec(self.db)
            .await;

        if let Err(e) = result {
            lerror!(
                request_id,
                LogStage::Database,
                LogComponent::Ingest,
                "mark_ingestion_failed_fail",
                &format!("接入日志状态修正失败 ingestion_id={ingestion_id}: {e}")
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[test]
    fn test_parse_backup_batch() {
        let body = br#"{"data":[{"computerName":"SRV-DC01","backupStatus":"Success","fileAge":1,"modifiedTime":"2024-05-01T02:00:00Z"}]}"#;
        let batch = ReportBatch::parse(IngestionSource::Backup, body).unwrap();

        assert_eq!(
            batch,
            ReportBatch::Backup(vec![BackupRecord {
                computer_name: "SRV-DC01".to_string(),
                backup_status: "Success".to_string(),
                file_age: Some(1),
                modified_time: Some("2024-05-01T02:00:00Z".to_string()),
            }])
        );
        assert_eq!(batch.success_message(), "Successfully ingested 1 backup records");
    }

    #[test]
    fn test_parse_vm_batch_defaults_vm_name() {
        let body = br#"{"data":[{"computerName":"HV-01","failoverStatus":"Active"}]}"#;
        let batch = ReportBatch::parse(IngestionSource::VmFailover, body).unwrap();

        assert_eq!(batch.source(), IngestionSource::VmFailover);
        assert_eq!(
            batch,
            ReportBatch::Vm(vec![VmRecord {
                computer_name: "HV-01".to_string(),
                failover_status: "Active".to_string(),
                vm_name: None,
            }])
        );
        assert_eq!(batch.success_message(), "Successfully ingested 1 VM failover records");
    }

    #[rstest]
    #[case(br#"{"data":[]}"#.as_slice())]
    #[case(br#"{}"#.as_slice())]
    #[case(br#"{"data":null}"#.as_slice())]
    #[case(br#"{"data":{"computerName":"x"}}"#.as_slice())]
    fn test_invalid_format(#[case] body: &[u8]) {
        let err = ReportBatch::parse(IngestionSource::Backup, body).unwrap_err();
        assert_eq!(err.to_string(), INVALID_FORMAT_MESSAGE);
    }

    #[rstest]
    #[case(b"not json".as_slice())]
    #[case(br#"[1,2]"#.as_slice())]
    #[case(br#"{"data":[{"backupStatus":"Success"}]}"#.as_slice())]
    fn test_malformed_bodies_are_client_errors(#[case] body: &[u8]) {
        let err = ReportBatch::parse(IngestionSource::Backup, body).unwrap_err();
        assert_eq!(err.to_http_response_parts().1, "INVALID_INPUT");
    }

    #[rstest]
    #[case(r"3", Some(3))]
    #[case(r"2.9", Some(2))]
    #[case(r#""14""#, Some(14))]
    #[case(r#"" 7 ""#, Some(7))]
    #[case(r#""1.5""#, Some(1))]
    #[case(r#""n/a""#, None)]
    #[case(r"null", None)]
    #[case(r"99999999999", None)]
    fn test_file_age_forms(#[case] raw: &str, #[case] expected: Option<i32>) {
        let body = format!(
            r#"{{"data":[{{"computerName":"A","backupStatus":"Success","fileAge":{raw}}}]}}"#
        );
        let ReportBatch::Backup(records) =
            ReportBatch::parse(IngestionSource::Backup, body.as_bytes()).unwrap()
        else {
            panic!("expected backup batch");
        };
        assert_eq!(records[0].file_age, expected);
    }

    #[test]
    fn test_file_age_rejects_booleans() {
        let body = br#"{"data":[{"computerName":"A","backupStatus":"Success","fileAge":true}]}"#;
        assert!(ReportBatch::parse(IngestionSource::Backup, body).is_err());
    }

    #[tokio::test]
    async fn test_vm_batch_is_split_into_chunks() {
        let db = sea_orm::Database::connect("sqlite::memory:").await.unwrap();
        crate::database::ensure_schema(&db).await.unwrap();

        let records = (0..=INSERT_CHUNK_ROWS * 2)
            .map(|i| VmRecord {
                computer_name: format!("HV-{i:04}"),
                failover_status: "Active".to_string(),
                vm_name: None,
            })
            .collect();
        let batch = ReportBatch::Vm(records);

        let service = IngestionService::with_connection(&db);
        let response = service.ingest("test", &batch, "unknown").await.unwrap();
        assert_eq!(response.records_count, INSERT_CHUNK_ROWS * 2 + 1);

        let statements = batch
            .insert(&db, Uuid::new_v4(), Utc::now())
            .await
            .unwrap();
        assert_eq!(statements, 3);

        let stored = VmFailoverReports::find()
            .filter(vm_failover_reports::Column::IngestionId.eq(response.ingestion_id))
            .all(&db)
            .await
            .unwrap();
        assert_eq!(stored.len(), INSERT_CHUNK_ROWS * 2 + 1);
    }
}
