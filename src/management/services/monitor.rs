//! # 监控快照服务
//!
//! 每种来源只展示最近一次成功接入的那一批数据。

use chrono::{DateTime, Utc};
use entity::{BackupReports, IngestionLogs, VmFailoverReports, backup_reports, ingestion_logs, vm_failover_reports};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::management::server::AppState;
use crate::types::{IngestionSource, IngestionStatus};

/// 监控快照响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitorSnapshot {
    pub backup: Vec<backup_reports::Model>,
    pub vm: Vec<vm_failover_reports::Model>,
    #[serde(rename = "lastUpdated")]
    pub last_updated: DateTime<Utc>,
    #[serde(rename = "latestBackupIngestion")]
    pub latest_backup_ingestion: Option<DateTime<Utc>>,
    #[serde(rename = "latestVMIngestion")]
    pub latest_vm_ingestion: Option<DateTime<Utc>>,
}

pub struct MonitorService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> MonitorService<'a> {
    /// 使用只读端连接
    #[must_use]
    pub fn new(state: &'a AppState) -> Self {
        Self {
            db: state.reader.as_ref(),
        }
    }

    #[must_use]
    pub const fn with_connection(db: &'a DatabaseConnection) -> Self {
        Self { db }
    }

    /// 某来源最近一次成功的接入日志
    pub async fn latest_success(
        &self,
        source: IngestionSource,
    ) -> Result<Option<ingestion_logs::Model>> {
        let latest = IngestionLogs::find()
            .filter(ingestion_logs::Column::SourceType.eq(source.as_str()))
            .filter(ingestion_logs::Column::Status.eq(IngestionStatus::Success.as_str()))
            .order_by_desc(ingestion_logs::Column::CreatedAt)
            .one(self.db)
            .await?;
        Ok(latest)
    }

    /// 构建当前快照
    pub async fn snapshot(&self) -> Result<MonitorSnapshot> {
        let latest_backup = self.latest_success(IngestionSource::Backup).await?;
        let latest_vm = self.latest_success(IngestionSource::VmFailover).await?;

        let backup = match &latest_backup {
            Some(log) => {
                BackupReports::find()
                    .filter(backup_reports::Column::IngestionId.eq(log.id))
                    .order_by_asc(backup_reports::Column::ComputerName)
                    .all(self.db)
                    .await?
            }
            None => Vec::new(),
        };

        let vm = match &latest_vm {
            Some(log) => {
                VmFailoverReports::find()
                    .filter(vm_failover_reports::Column::IngestionId.eq(log.id))
                    .order_by_asc(vm_failover_reports::Column::ComputerName)
                    .all(self.db)
                    .await?
            }
            None => Vec::new(),
        };

        Ok(MonitorSnapshot {
            backup,
            vm,
            last_updated: Utc::now(),
            latest_backup_ingestion: latest_backup.map(|log| log.created_at),
            latest_vm_ingestion: latest_vm.map(|log| log.created_at),
        })
    }
}
