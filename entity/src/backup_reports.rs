//! # 备份报告实体定义

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 备份任务状态行，隶属于某一批次接入
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "backup_reports")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub computer_name: String,
    pub backup_status: String,
    /// 备份文件天数
    pub file_age: Option<i32>,
    pub modified_time: Option<String>,
    /// 指向 `ingestion_logs.id`，不建外键
    #[sea_orm(indexed)]
    pub ingestion_id: Option<Uuid>,
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
