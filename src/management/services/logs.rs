//! # 接入日志查询服务
//!
//! 统计与最近成功时间只基于本次返回的这一页，调用方需要更大的 `limit` 才能得到全局统计。

use chrono::{DateTime, Utc};
use entity::{IngestionLogs, ingestion_logs};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, QuerySelect};
use serde::{Deserialize, Serialize};

use crate::error::{MonitorError, Result};
use crate::management::server::AppState;
use crate::types::{IngestionSource, IngestionStatus};

/// 默认返回条数
pub const DEFAULT_LIMIT: u64 = 50;
/// 单次最多返回条数
pub const MAX_LIMIT: u64 = 1000;

/// 原始查询参数
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LogsListQuery {
    pub source_type: Option<String>,
    pub status: Option<String>,
    pub limit: Option<String>,
}

/// 校验后的查询条件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogsFilter {
    pub source_type: Option<IngestionSource>,
    pub status: Option<IngestionStatus>,
    pub limit: u64,
}

impl TryFrom<&LogsListQuery> for LogsFilter {
    type Error = MonitorError;

    fn try_from(query: &LogsListQuery) -> Result<Self> {
        let source_type = non_empty(query.source_type.as_deref())
            .map(str::parse::<IngestionSource>)
            .transpose()?;
        let status = non_empty(query.status.as_deref())
            .map(str::parse::<IngestionStatus>)
            .transpose()?;
        let limit = match non_empty(query.limit.as_deref()) {
            None => DEFAULT_LIMIT,
            Some(raw) => {
                let requested: i64 = raw.parse().map_err(|_| {
                    MonitorError::validation_field(format!("Invalid limit: {raw}"), "limit")
                })?;
                u64::try_from(requested).unwrap_or(0).clamp(1, MAX_LIMIT)
            }
        };

        Ok(Self {
            source_type,
            status,
            limit,
        })
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

/// 按状态计数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogStats {
    pub total: usize,
    pub success: usize,
    pub error: usize,
    pub partial: usize,
}

/// 每种来源最近一次成功接入的时间
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestSuccessful {
    pub backup: Option<DateTime<Utc>>,
    pub vm_failover: Option<DateTime<Utc>>,
}

/// 日志列表响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogsListResponse {
    pub logs: Vec<ingestion_logs::Model>,
    pub stats: LogStats,
    #[serde(rename = "latestSuccessful")]
    pub latest_successful: LatestSuccessful,
}

/// 汇总一页日志，输入按时间倒序
#[must_use]
pub fn summarize(logs: &[ingestion_logs::Model]) -> (LogStats, LatestSuccessful) {
    let mut stats = LogStats {
        total: logs.len(),
        ..LogStats::default()
    };
    let mut latest = LatestSuccessful::default();

    for log in logs {
        match log.status.parse::<IngestionStatus>() {
            Ok(IngestionStatus::Success) => {
                stats.success += 1;
                let slot = match log.source_type.parse::<IngestionSource>() {
                    Ok(IngestionSource::Backup) => &mut latest.backup,
                    Ok(IngestionSource::VmFailover) => &mut latest.vm_failover,
                    Err(_) => continue,
                };
                if slot.is_none() {
                    *slot = Some(log.created_at);
                }
            }
            Ok(IngestionStatus::Error) => stats.error += 1,
            Ok(IngestionStatus::Partial) => stats.partial += 1,
            Err(_) => {}
        }
    }

    (stats, latest)
}

pub struct LogsService<'a> {
    db: &'a DatabaseConnection,
}

impl<'a> LogsService<'a> {
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

    /// 查询接入日志，最新在前
    pub async fn list(&self, filter: &LogsFilter) -> Result<LogsListResponse> {
        let mut select = IngestionLogs::find();
        if let Some(source) = filter.source_type {
            select = select.filter(ingestion_logs::Column::SourceType.eq(source.as_str()));
        }
        if let Some(status) = filter.status {
            select = select.filter(ingestion_logs::Column::Status.eq(status.as_str()));
        }

        let logs = select
            .order_by_desc(ingestion_logs::Column::CreatedAt)
            .limit(filter.limit)
            .all(self.db)
            .await?;

        let (stats, latest_successful) = summarize(&logs);
        Ok(LogsListResponse {
            logs,
            stats,
            latest_successful,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use pretty_assertions::assert_eq;
    use uuid::Uuid;

    fn log(source: &str, status: &str, minutes_ago: i64) -> ingestion_logs::Model {
        ingestion_logs::Model {
            id: Uuid::new_v4(),
            source_type: source.to_string(),
            status: status.to_string(),
            records_count: 1,
            error_message: None,
            source_ip: None,
            created_at: Utc::now() - Duration::minutes(minutes_ago),
        }
    }

    #[test]
    fn test_summarize_counts_and_latest() {
        let logs = vec![
            log("vm_failover", "error", 1),
            log("vm_failover", "success", 2),
            log("backup", "partial", 3),
            log("vm_failover", "success", 4),
        ];
        let (stats, latest) = summarize(&logs);

        assert_eq!(
            stats,
            LogStats {
                total: 4,
                success: 2,
                error: 1,
                partial: 1
            }
        );
        assert_eq!(latest.vm_failover, Some(logs[1].created_at));
        assert_eq!(latest.backup, None);
    }

    #[test]
    fn test_filter_defaults() {
        let filter = LogsFilter::try_from(&LogsListQuery::default()).unwrap();
        assert_eq!(
            filter,
            LogsFilter {
                source_type: None,
                status: None,
                limit: DEFAULT_LIMIT
            }
        );
    }

    #[test]
    fn test_filter_parsing_and_clamping() {
        let query = LogsListQuery {
            source_type: Some("vm_failover".to_string()),
            status: Some("error".to_string()),
            limit: Some("100000".to_string()),
        };
        let filter = LogsFilter::try_from(&query).unwrap();
        assert_eq!(filter.source_type, Some(IngestionSource::VmFailover));
        assert_eq!(filter.status, Some(IngestionStatus::Error));
        assert_eq!(filter.limit, MAX_LIMIT);

        let query = LogsListQuery {
            limit: Some("-3".to_string()),
            ..LogsListQuery::default()
        };
        assert_eq!(LogsFilter::try_from(&query).unwrap().limit, 1);
    }

    #[test]
    fn test_filter_rejects_garbage() {
        for query in [
            LogsListQuery {
                limit: Some("ten".to_string()),
                ..LogsListQuery::default()
            },
            LogsListQuery {
                source_type: Some("tape".to_string()),
                ..LogsListQuery::default()
            },
            LogsListQuery {
                status: Some("done".to_string()),
                ..LogsListQuery::default()
            },
        ] {
            let err = LogsFilter::try_from(&query).unwrap_err();
            assert!(matches!(err, MonitorError::Validation { .. }));
        }
    }
}
