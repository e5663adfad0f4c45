//! # 数据接入日志实体定义
//!
//! 每一次接入调用对应一行审计记录

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// 数据接入日志实体
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingestion_logs")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    /// `backup` 或 `vm_failover`
    #[sea_orm(indexed)]
    pub source_type: String,
    /// `success` / `error` / `partial`
    pub status: String,
    pub records_count: i32,
    pub error_message: Option<String>,
    pub source_ip: Option<String>,
    #[sea_orm(indexed)]
    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
