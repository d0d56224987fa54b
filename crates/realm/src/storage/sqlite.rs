//! SQLite 存储后端实现
//!
//! 使用 sqlx 提供原生异步 SQLite 存储支持。
//! 写会话持有一个 `BEGIN IMMEDIATE` 事务，数据仓储与审计仓储共享同一个 `SqliteDataStore`。

use crate::error::{RealmError, RealmResult};
use crate::id::IdGenerator;
use crate::status::RealmStatus;
use crate::storage::config::SqliteConfig;
use crate::storage::{AuditRepository, DataStoreManager, RealmRepository, ensure_same_store};
use crate::types::{AuditEntry, Realm};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteConnection, SqliteJournalMode, SqlitePool, SqlitePoolOptions,
    SqliteSynchronous,
};
use sqlx::{QueryBuilder, Sqlite, Transaction};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

const SELECT_REALM: &str = "SELECT id, name, description, status, created_at, updated_at, deleted_at \
     FROM realms WHERE id = ?1 AND status = ?2";

enum Conn {
    Pool(SqlitePool),
    Tx(Mutex<Option<Transaction<'static, Sqlite>>>),
}

enum ConnGuard<'a> {
    Pooled(PoolConnection<Sqlite>),
    Tx(MutexGuard<'a, Option<Transaction<'static, Sqlite>>>),
}

impl ConnGuard<'_> {
    fn conn(&mut self) -> RealmResult<&mut SqliteConnection> {
        match self {
            ConnGuard::Pooled(conn) => Ok(&mut **conn),
            ConnGuard::Tx(guard) => guard
                .as_mut()
                .map(|tx| &mut **tx)
                .ok_or(RealmError::TransactionDone),
        }
    }
}

#[derive(sqlx::FromRow)]
struct RealmRow {
    id: String,
    name: String,
    description: String,
    status: String,
    created_at: i64,
    updated_at: i64,
    deleted_at: Option<i64>,
}

impl TryFrom<RealmRow> for Realm {
    type Error = RealmError;

    fn try_from(row: RealmRow) -> RealmResult<Self> {
        Ok(Realm {
            id: Uuid::parse_str(&row.id)
                .map_err(|e| RealmError::internal("realm select failed", e))?,
            name: row.name,
            description: row.description,
            status: RealmStatus::from_storage(&row.status)?,
            created_at: from_micros(row.created_at)?,
            updated_at: from_micros(row.updated_at)?,
            deleted_at: row.deleted_at.map(from_micros).transpose()?,
        })
    }
}

fn from_micros(value: i64) -> RealmResult<DateTime<Utc>> {
    DateTime::from_timestamp_micros(value)
        .ok_or_else(|| RealmError::unknown(format!("unexpected timestamp value: {value}")))
}

/// SQLite 数据存储句柄
///
/// 只读句柄直接使用连接池，写句柄绑定到一个事务。
pub struct SqliteDataStore {
    conn: Conn,
    key_gen: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for SqliteDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteDataStore")
            .field("transactional", &self.is_transactional())
            .finish()
    }
}

impl SqliteDataStore {
    fn non_transactional(pool: SqlitePool, key_gen: Arc<dyn IdGenerator>) -> Self {
        Self {
            conn: Conn::Pool(pool),
            key_gen,
        }
    }

    fn transactional(tx: Transaction<'static, Sqlite>, key_gen: Arc<dyn IdGenerator>) -> Self {
        Self {
            conn: Conn::Tx(Mutex::new(Some(tx))),
            key_gen,
        }
    }

    pub fn is_transactional(&self) -> bool {
        matches!(self.conn, Conn::Tx(_))
    }

    async fn acquire(&self) -> RealmResult<ConnGuard<'_>> {
        match &self.conn {
            Conn::Pool(pool) => {
                let conn = pool
                    .acquire()
                    .await
                    .map_err(|e| RealmError::internal("failed to acquire connection", e))?;
                Ok(ConnGuard::Pooled(conn))
            }
            Conn::Tx(tx) => Ok(ConnGuard::Tx(tx.lock().await)),
        }
    }

    async fn commit(&self) -> RealmResult<()> {
        let Conn::Tx(tx) = &self.conn else {
            return Err(RealmError::internal_msg("datastore is not transactional"));
        };
        let tx = tx.lock().await.take().ok_or(RealmError::TransactionDone)?;
        tx.commit()
            .await
            .map_err(|e| RealmError::internal("transaction commit failed", e))
    }

    async fn rollback(&self) -> RealmResult<()> {
        let Conn::Tx(tx) = &self.conn else {
            return Err(RealmError::internal_msg("datastore is not transactional"));
        };
        let tx = tx.lock().await.take().ok_or(RealmError::TransactionDone)?;
        tx.rollback()
            .await
            .map_err(|e| RealmError::internal("transaction rollback failed", e))
    }
}

#[async_trait]
impl RealmRepository for SqliteDataStore {
    async fn get_realm(&self, id: Uuid, status: RealmStatus) -> RealmResult<Realm> {
        let status_value = status.to_storage()?;
        let mut guard = self.acquire().await?;

        let row = sqlx::query_as::<_, RealmRow>(SELECT_REALM)
            .bind(id.to_string())
            .bind(status_value)
            .fetch_optional(guard.conn()?)
            .await
            .map_err(|e| RealmError::internal("realm select failed", e))?;

        match row {
            Some(row) => row.try_into(),
            None => {
                debug!("No realm found for id={} status={}", id, status);
                Err(RealmError::not_found("realm not found"))
            }
        }
    }

    async fn create_realm(&self, realm: &Realm) -> RealmResult<()> {
        let key = self
            .key_gen
            .new_id()
            .map_err(|e| RealmError::internal("failed to generate UUID key", e))?;
        let status_value = realm.status.to_storage()?;
        let mut guard = self.acquire().await?;

        sqlx::query(
            r#"INSERT INTO realms (key, id, name, description, status, created_at, updated_at)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        )
        .bind(key.to_string())
        .bind(realm.id.to_string())
        .bind(&realm.name)
        .bind(&realm.description)
        .bind(status_value)
        .bind(realm.created_at.timestamp_micros())
        .bind(realm.updated_at.timestamp_micros())
        .execute(guard.conn()?)
        .await
        .map_err(|e| RealmError::internal("realm insert failed", e))?;

        debug!("Inserted realm id={} status={}", realm.id, realm.status);
        Ok(())
    }

    async fn update_realm(&self, realm: &Realm, current_status: RealmStatus) -> RealmResult<()> {
        let current_value = current_status.to_storage()?;
        let status_value = realm.status.to_storage()?;
        let mut guard = self.acquire().await?;

        let result = sqlx::query(
            r#"UPDATE realms SET name = ?1, description = ?2, updated_at = ?3, status = ?4
               WHERE id = ?5 AND status = ?6"#,
        )
        .bind(&realm.name)
        .bind(&realm.description)
        .bind(realm.updated_at.timestamp_micros())
        .bind(status_value)
        .bind(realm.id.to_string())
        .bind(current_value)
        .execute(guard.conn()?)
        .await
        .map_err(|e| RealmError::internal("realm update failed", e))?;

        debug!(
            "Updated realm id={} {} -> {}, rows_affected={}",
            realm.id,
            current_status,
            realm.status,
            result.rows_affected()
        );
        Ok(())
    }

    async fn delete_realm(&self, id: Uuid, statuses: &[RealmStatus]) -> RealmResult<()> {
        let values = statuses
            .iter()
            .map(|s| s.to_storage())
            .collect::<RealmResult<Vec<_>>>()?;
        if values.is_empty() {
            return Ok(());
        }

        let mut builder = QueryBuilder::<Sqlite>::new("DELETE FROM realms WHERE id = ");
        builder.push_bind(id.to_string()).push(" AND status IN (");
        let mut separated = builder.separated(", ");
        for value in values {
            separated.push_bind(value);
        }
        separated.push_unseparated(")");

        let mut guard = self.acquire().await?;
        let result = builder
            .build()
            .execute(guard.conn()?)
            .await
            .map_err(|e| RealmError::internal("realm delete failed", e))?;

        debug!(
            "Deleted realm id={}, rows_affected={}",
            id,
            result.rows_affected()
        );
        Ok(())
    }
}

#[async_trait]
impl AuditRepository for SqliteDataStore {
    async fn record_audit(&self, entry: &AuditEntry) -> RealmResult<()> {
        let key = self
            .key_gen
            .new_id()
            .map_err(|e| RealmError::internal("failed to generate UUID key", e))?;
        let status_value = entry.status.to_storage()?;
        let mut guard = self.acquire().await?;

        sqlx::query(
            r#"INSERT INTO realm_audit_log (key, realm_id, action, status, occurred_at)
               VALUES (?1, ?2, ?3, ?4, ?5)"#,
        )
        .bind(key.to_string())
        .bind(entry.realm_id.to_string())
        .bind(entry.action.to_string())
        .bind(status_value)
        .bind(entry.occurred_at.timestamp_micros())
        .execute(guard.conn()?)
        .await
        .map_err(|e| RealmError::internal("audit insert failed", e))?;

        Ok(())
    }
}

/// SQLite 会话管理器
#[derive(Clone)]
pub struct SqliteManager {
    pool: SqlitePool,
    key_gen: Arc<dyn IdGenerator>,
    read_store: Arc<SqliteDataStore>,
}

impl std::fmt::Debug for SqliteManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SqliteManager")
            .field("pool_size", &self.pool.size())
            .finish()
    }
}

impl SqliteManager {
    /// 创建新的 SQLite 会话管理器
    ///
    /// 数据库文件不存在时自动创建，并初始化表结构
    pub async fn new(config: &SqliteConfig, key_gen: Arc<dyn IdGenerator>) -> RealmResult<Self> {
        let path = Path::new(&config.path);
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                RealmError::internal(
                    format!("Failed to create SQLite directory {}", parent.display()),
                    e,
                )
            })?;
        }

        // 创建连接选项并启用 WAL 模式
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.pool_size)
            .connect_with(options)
            .await?;

        let manager = Self::from_pool(pool, key_gen).await?;

        info!(
            "SQLite storage initialized with sqlx: path={}, WAL mode enabled",
            path.display()
        );

        Ok(manager)
    }

    /// 基于已有连接池创建，并初始化表结构
    pub async fn from_pool(pool: SqlitePool, key_gen: Arc<dyn IdGenerator>) -> RealmResult<Self> {
        let read_store = Arc::new(SqliteDataStore::non_transactional(
            pool.clone(),
            key_gen.clone(),
        ));
        let manager = Self {
            pool,
            key_gen,
            read_store,
        };
        manager.init().await?;
        Ok(manager)
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    async fn init(&self) -> RealmResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS realms (
                key TEXT PRIMARY KEY,
                id TEXT NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                created_at INTEGER NOT NULL,
                updated_at INTEGER NOT NULL,
                deleted_at INTEGER
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        // 同一 id 最多一条 active、一条 draft
        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_realms_id_live_status \
             ON realms(id, status) WHERE status IN ('active', 'draft')",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_realms_id ON realms(id)")
            .execute(&self.pool)
            .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS realm_audit_log (
                key TEXT PRIMARY KEY,
                realm_id TEXT NOT NULL,
                action TEXT NOT NULL,
                status TEXT NOT NULL,
                occurred_at INTEGER NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("SQLite tables and indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl DataStoreManager for SqliteManager {
    type Store = SqliteDataStore;

    fn backend_name(&self) -> &'static str {
        "SQLite"
    }

    fn read_only(&self) -> Arc<SqliteDataStore> {
        self.read_store.clone()
    }

    async fn new_write(&self) -> RealmResult<(Arc<SqliteDataStore>, Arc<SqliteDataStore>)> {
        // 立即获取写锁，写者在 busy_timeout 内排队，避免读后写升级锁时 SQLITE_BUSY
        let tx = self
            .pool
            .begin_with("BEGIN IMMEDIATE")
            .await
            .map_err(|e| RealmError::internal("failed to begin transaction", e))?;
        let store = Arc::new(SqliteDataStore::transactional(tx, self.key_gen.clone()));
        Ok((store.clone(), store))
    }

    async fn commit(
        &self,
        data: &Arc<SqliteDataStore>,
        audit: &Arc<SqliteDataStore>,
    ) -> RealmResult<()> {
        ensure_same_store(data, audit)?;
        data.commit().await
    }

    async fn rollback(
        &self,
        data: &Arc<SqliteDataStore>,
        audit: &Arc<SqliteDataStore>,
    ) -> RealmResult<()> {
        ensure_same_store(data, audit)?;
        match data.rollback().await {
            Err(e) if e.is_transaction_done() => Ok(()),
            other => other,
        }
    }
}
