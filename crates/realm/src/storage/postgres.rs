//! PostgreSQL 存储后端实现
//!
//! 使用 sqlx 提供 PostgreSQL 存储支持，id 与时间戳使用原生 UUID / TIMESTAMPTZ 类型

use crate::error::{RealmError, RealmResult};
use crate::id::IdGenerator;
use crate::status::RealmStatus;
use crate::storage::config::PostgresConfig;
use crate::storage::{AuditRepository, DataStoreManager, RealmRepository, ensure_same_store};
use crate::types::{AuditEntry, Realm};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::pool::PoolConnection;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgPool, PgPoolOptions, PgSslMode};
use sqlx::{Postgres, Transaction};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};
use tracing::{debug, info};
use uuid::Uuid;

enum Conn {
    Pool(PgPool),
    Tx(Mutex<Option<Transaction<'static, Postgres>>>),
}

enum ConnGuard<'a> {
    Pooled(PoolConnection<Postgres>),
    Tx(MutexGuard<'a, Option<Transaction<'static, Postgres>>>),
}

impl ConnGuard<'_> {
    fn conn(&mut self) -> RealmResult<&mut PgConnection> {
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
    id: Uuid,
    name: String,
    description: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<RealmRow> for Realm {
    type Error = RealmError;

    fn try_from(row: RealmRow) -> RealmResult<Self> {
        Ok(Realm {
            id: row.id,
            name: row.name,
            description: row.description,
            status: RealmStatus::from_storage(&row.status)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

/// PostgreSQL 数据存储句柄
pub struct PostgresDataStore {
    conn: Conn,
    key_gen: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for PostgresDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PostgresDataStore")
            .field("transactional", &matches!(self.conn, Conn::Tx(_)))
            .finish()
    }
}

impl PostgresDataStore {
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

    async fn finish(&self, commit: bool) -> RealmResult<()> {
        let Conn::Tx(tx) = &self.conn else {
            return Err(RealmError::internal_msg("datastore is not transactional"));
        };
        let tx = tx.lock().await.take().ok_or(RealmError::TransactionDone)?;
        if commit {
            tx.commit()
                .await
                .map_err(|e| RealmError::internal("transaction commit failed", e))
        } else {
            tx.rollback()
                .await
                .map_err(|e| RealmError::internal("transaction rollback failed", e))
        }
    }
}

#[async_trait]
impl RealmRepository for PostgresDataStore {
    async fn get_realm(&self, id: Uuid, status: RealmStatus) -> RealmResult<Realm> {
        let status_value = status.to_storage()?;
        let mut guard = self.acquire().await?;

        let row = sqlx::query_as::<_, RealmRow>(
            r#"SELECT id, name, description, status, created_at, updated_at, deleted_at
               FROM realms WHERE id = $1 AND status = $2"#,
        )
        .bind(id)
        .bind(status_value)
        .fetch_optional(guard.conn()?)
        .await
        .map_err(|e| RealmError::internal("realm select failed", e))?;

        match row {
            Some(row) => row.try_into(),
            None => Err(RealmError::not_found("realm not found")),
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
               VALUES ($1, $2, $3, $4, $5, $6, $7)"#,
        )
        .bind(key)
        .bind(realm.id)
        .bind(&realm.name)
        .bind(&realm.description)
        .bind(status_value)
        .bind(realm.created_at)
        .bind(realm.updated_at)
        .execute(guard.conn()?)
        .await
        .map_err(|e| RealmError::internal("realm insert failed", e))?;

        Ok(())
    }

    async fn update_realm(&self, realm: &Realm, current_status: RealmStatus) -> RealmResult<()> {
        let current_value = current_status.to_storage()?;
        let status_value = realm.status.to_storage()?;
        let mut guard = self.acquire().await?;

        let result = sqlx::query(
            r#"UPDATE realms SET name = $1, description = $2, updated_at = $3, status = $4
               WHERE id = $5 AND status = $6"#,
        )
        .bind(&realm.name)
        .bind(&realm.description)
        .bind(realm.updated_at)
        .bind(status_value)
        .bind(realm.id)
        .bind(current_value)
        .execute(guard.conn()?)
        .await
        .map_err(|e| RealmError::internal("realm update failed", e))?;

        debug!(
            "Updated realm id={} in PostgreSQL, rows_affected={}",
            realm.id,
            result.rows_affected()
        );
        Ok(())
    }

    async fn delete_realm(&self, id: Uuid, statuses: &[RealmStatus]) -> RealmResult<()> {
        let values = statuses
            .iter()
            .map(|s| s.to_storage().map(str::to_string))
            .collect::<RealmResult<Vec<String>>>()?;
        let mut guard = self.acquire().await?;

        sqlx::query("DELETE FROM realms WHERE id = $1 AND status = ANY($2)")
            .bind(id)
            .bind(values)
            .execute(guard.conn()?)
            .await
            .map_err(|e| RealmError::internal("realm delete failed", e))?;

        Ok(())
    }
}

#[async_trait]
impl AuditRepository for PostgresDataStore {
    async fn record_audit(&self, entry: &AuditEntry) -> RealmResult<()> {
        let key = self
            .key_gen
            .new_id()
            .map_err(|e| RealmError::internal("failed to generate UUID key", e))?;
        let status_value = entry.status.to_storage()?;
        let mut guard = self.acquire().await?;

        sqlx::query(
            r#"INSERT INTO realm_audit_log (key, realm_id, action, status, occurred_at)
               VALUES ($1, $2, $3, $4, $5)"#,
        )
        .bind(key)
        .bind(entry.realm_id)
        .bind(entry.action.to_string())
        .bind(status_value)
        .bind(entry.occurred_at)
        .execute(guard.conn()?)
        .await
        .map_err(|e| RealmError::internal("audit insert failed", e))?;

        Ok(())
    }
}

/// PostgreSQL 会话管理器
#[derive(Clone)]
pub struct PostgresManager {
    pool: PgPool,
    key_gen: Arc<dyn IdGenerator>,
    read_store: Arc<PostgresDataStore>,
}

impl PostgresManager {
    /// 创建新的 PostgreSQL 会话管理器
    pub async fn new(config: &PostgresConfig, key_gen: Arc<dyn IdGenerator>) -> RealmResult<Self> {
        let ssl_mode = PgSslMode::from_str(&config.ssl_mode)?;
        let options = PgConnectOptions::new()
            .host(&config.host)
            .port(config.port)
            .database(&config.database)
            .username(&config.username)
            .password(&config.password)
            .ssl_mode(ssl_mode);

        // 创建连接池
        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .max_lifetime(Duration::from_secs(config.max_lifetime_secs))
            .connect_with(options)
            .await?;

        let read_store = Arc::new(PostgresDataStore {
            conn: Conn::Pool(pool.clone()),
            key_gen: key_gen.clone(),
        });
        let manager = Self {
            pool,
            key_gen,
            read_store,
        };

        // 初始化数据库表
        manager.init().await?;

        info!(
            "PostgreSQL storage initialized: host={}:{}, db={}",
            config.host, config.port, config.database
        );

        Ok(manager)
    }

    async fn init(&self) -> RealmResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS realms (
                key UUID PRIMARY KEY,
                id UUID NOT NULL,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                status TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                deleted_at TIMESTAMPTZ
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE UNIQUE INDEX IF NOT EXISTS idx_realms_id_live_status \
             ON realms(id, status) WHERE status IN ('active', 'draft')",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS realm_audit_log (
                key UUID PRIMARY KEY,
                realm_id UUID NOT NULL,
                action TEXT NOT NULL,
                status TEXT NOT NULL,
                occurred_at TIMESTAMPTZ NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        debug!("PostgreSQL tables and indexes initialized");
        Ok(())
    }
}

#[async_trait]
impl DataStoreManager for PostgresManager {
    type Store = PostgresDataStore;

    fn backend_name(&self) -> &'static str {
        "Postgres"
    }

    fn read_only(&self) -> Arc<PostgresDataStore> {
        self.read_store.clone()
    }

    async fn new_write(&self) -> RealmResult<(Arc<PostgresDataStore>, Arc<PostgresDataStore>)> {
        let tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RealmError::internal("failed to begin transaction", e))?;
        let store = Arc::new(PostgresDataStore {
            conn: Conn::Tx(Mutex::new(Some(tx))),
            key_gen: self.key_gen.clone(),
        });
        Ok((store.clone(), store))
    }

    async fn commit(
        &self,
        data: &Arc<PostgresDataStore>,
        audit: &Arc<PostgresDataStore>,
    ) -> RealmResult<()> {
        ensure_same_store(data, audit)?;
        data.finish(true).await
    }

    async fn rollback(
        &self,
        data: &Arc<PostgresDataStore>,
        audit: &Arc<PostgresDataStore>,
    ) -> RealmResult<()> {
        ensure_same_store(data, audit)?;
        match data.finish(false).await {
            Err(e) if e.is_transaction_done() => Ok(()),
            other => other,
        }
    }
}
