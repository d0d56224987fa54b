//! Realm 存储模块
//!
//! 提供多种存储后端支持：SQLite, PostgreSQL, 内存
//!
//! # 设计
//!
//! - `RealmRepository` / `AuditRepository` trait 定义统一的异步仓储接口
//! - `DataStoreManager` 负责开启事务会话，并保证数据仓储与审计仓储
//!   指向同一个底层事务对象
//! - 通过 `DatabaseConfig` 配置选择和初始化后端

use crate::error::RealmResult;
use crate::status::RealmStatus;
use crate::types::{AuditEntry, Realm};
use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

pub mod config;
pub mod memory;
#[cfg(feature = "backend-postgres")]
pub mod postgres;
pub mod sqlite;

pub use config::{DatabaseConfig, PostgresConfig, SqliteConfig, StorageBackend};
pub use memory::{MemoryDataStore, MemoryManager};
#[cfg(feature = "backend-postgres")]
pub use postgres::{PostgresDataStore, PostgresManager};
pub use sqlite::{SqliteDataStore, SqliteManager};

/// 回滚超时时间
pub const ROLLBACK_TIMEOUT_SECONDS: u64 = 30;

/// Realm 数据仓储接口
///
/// 所有操作都作用于同一个连接或事务句柄。
#[async_trait]
pub trait RealmRepository: Send + Sync {
    /// 按 id 和状态精确查询
    ///
    /// 不存在时返回 `NotFound`
    async fn get_realm(&self, id: Uuid, status: RealmStatus) -> RealmResult<Realm>;

    /// 插入新记录
    async fn create_realm(&self, realm: &Realm) -> RealmResult<()>;

    /// 条件更新 name / description / updated_at / status
    ///
    /// 仅更新 `id` 匹配且当前状态为 `current_status` 的记录；
    /// 条件不满足时静默影响 0 行。
    async fn update_realm(&self, realm: &Realm, current_status: RealmStatus) -> RealmResult<()>;

    /// 删除 `id` 匹配且状态属于 `statuses` 之一的记录
    async fn delete_realm(&self, id: Uuid, statuses: &[RealmStatus]) -> RealmResult<()>;
}

/// 审计仓储接口
#[async_trait]
pub trait AuditRepository: Send + Sync {
    async fn record_audit(&self, entry: &AuditEntry) -> RealmResult<()>;
}

/// 事务会话管理器
///
/// 写会话返回的两个句柄必须是同一个对象，`commit` / `rollback`
/// 会检查这一点并在不一致时返回 `InvalidArgument`。
#[async_trait]
pub trait DataStoreManager: Send + Sync {
    type Store: RealmRepository + AuditRepository + 'static;

    /// 后端名称
    fn backend_name(&self) -> &'static str;

    /// 非事务的只读句柄
    fn read_only(&self) -> Arc<Self::Store>;

    /// 开启新事务，返回 (数据仓储, 审计仓储)
    async fn new_write(&self) -> RealmResult<(Arc<Self::Store>, Arc<Self::Store>)>;

    /// 提交事务；事务已结束时返回错误
    async fn commit(&self, data: &Arc<Self::Store>, audit: &Arc<Self::Store>) -> RealmResult<()>;

    /// 回滚事务；事务已结束时为无害的空操作
    async fn rollback(&self, data: &Arc<Self::Store>, audit: &Arc<Self::Store>)
    -> RealmResult<()>;
}

/// 检查两个句柄是否指向同一个底层对象
pub(crate) fn ensure_same_store<S>(data: &Arc<S>, audit: &Arc<S>) -> RealmResult<()> {
    if Arc::ptr_eq(data, audit) {
        Ok(())
    } else {
        Err(crate::error::RealmError::invalid_argument(
            "audit",
            "must reference the same underlying object as datastore",
        ))
    }
}
