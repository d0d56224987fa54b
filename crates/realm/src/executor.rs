//! 用例执行器
//!
//! 负责为每次用例调用管理事务生命周期：
//!
//! - 读操作（Get）使用非事务句柄，直接返回用例结果
//! - 写操作（Create / Release / Update）开启写会话，执行用例，写入审计记录后提交；
//!   无论结果如何都会在最后执行回滚，已提交的事务上回滚为空操作
//!
//! 用例返回的错误原样向上传递；开启会话或提交失败包装为 `Internal`。

use crate::clock::{Clock, SystemClock};
use crate::error::{RealmError, RealmResult};
use crate::id::{IdGenerator, UuidV4Generator};
use crate::status::RealmStatus;
use crate::storage::{
    AuditRepository, DataStoreManager, DatabaseConfig, MemoryManager, ROLLBACK_TIMEOUT_SECONDS,
    SqliteManager, StorageBackend,
};
use crate::types::{AuditAction, AuditEntry, Realm};
use crate::usecases::{
    CreateRealm, CreateRealmInput, CreateRealmRepos, GetRealm, GetRealmInput, GetRealmRepos,
    ReleaseRealm, ReleaseRealmInput, ReleaseRealmRepos, UpdateRealm, UpdateRealmInput,
    UpdateRealmRepos,
};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Realm 操作接口，gRPC 层只依赖该 trait
#[async_trait]
pub trait RealmOps: Send + Sync {
    /// 存储后端名称
    fn backend_name(&self) -> &'static str;

    async fn get_realm(&self, realm_id: Uuid, status: RealmStatus) -> RealmResult<Realm>;

    async fn create_realm(&self, name: String, description: String) -> RealmResult<Realm>;

    async fn release_realm(&self, realm_id: Uuid) -> RealmResult<Realm>;

    async fn update_realm(&self, realm: Realm) -> RealmResult<Realm>;
}

/// 基于 [`DataStoreManager`] 的用例执行器
pub struct RealmUseCaseExecutor<M> {
    id_gen: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
    manager: M,
}

impl<M: DataStoreManager> RealmUseCaseExecutor<M> {
    pub fn new(id_gen: Arc<dyn IdGenerator>, clock: Arc<dyn Clock>, manager: M) -> Self {
        Self {
            id_gen,
            clock,
            manager,
        }
    }

    pub fn manager(&self) -> &M {
        &self.manager
    }

    async fn open_session(&self) -> RealmResult<(Arc<M::Store>, Arc<M::Store>)> {
        self.manager.new_write().await.map_err(|e| {
            error!(error = %e, "failed to configure repositories");
            RealmError::internal("failed to configure repositories", e)
        })
    }

    /// 审计、提交，并在最后无条件回滚
    async fn finish_write(
        &self,
        data: &Arc<M::Store>,
        audit: &Arc<M::Store>,
        action: AuditAction,
        outcome: RealmResult<Realm>,
    ) -> RealmResult<Realm> {
        let result = match outcome {
            Ok(realm) => self.audit_and_commit(data, audit, action, realm).await,
            Err(e) => Err(e),
        };
        self.rollback(data, audit).await;
        result
    }

    async fn audit_and_commit(
        &self,
        data: &Arc<M::Store>,
        audit: &Arc<M::Store>,
        action: AuditAction,
        realm: Realm,
    ) -> RealmResult<Realm> {
        let entry = AuditEntry::new(action, &realm, self.clock.now());
        audit.record_audit(&entry).await.map_err(|e| {
            error!(error = %e, "failed to record audit entry");
            RealmError::internal("failed to record audit entry", e)
        })?;

        self.manager.commit(data, audit).await.map_err(|e| {
            error!(error = %e, "Failed to commit database transaction");
            RealmError::internal("failed to commit transaction", e)
        })?;

        debug!(realm_id = %realm.id, %action, "transaction committed");
        Ok(realm)
    }

    async fn rollback(&self, data: &Arc<M::Store>, audit: &Arc<M::Store>) {
        let timeout = Duration::from_secs(ROLLBACK_TIMEOUT_SECONDS);
        match tokio::time::timeout(timeout, self.manager.rollback(data, audit)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => error!(error = %e, "Failed to rollback db changes"),
            Err(_) => error!(
                "Failed to rollback db changes: timed out after {}s",
                ROLLBACK_TIMEOUT_SECONDS
            ),
        }
    }
}

#[async_trait]
impl<M> RealmOps for RealmUseCaseExecutor<M>
where
    M: DataStoreManager + 'static,
{
    fn backend_name(&self) -> &'static str {
        self.manager.backend_name()
    }

    async fn get_realm(&self, realm_id: Uuid, status: RealmStatus) -> RealmResult<Realm> {
        let repository = self.manager.read_only();
        GetRealm
            .execute(
                GetRealmRepos {
                    repository: repository.as_ref(),
                },
                GetRealmInput { realm_id, status },
            )
            .await
    }

    async fn create_realm(&self, name: String, description: String) -> RealmResult<Realm> {
        let (data, audit) = self.open_session().await?;
        let outcome = CreateRealm
            .execute(
                CreateRealmRepos {
                    id_gen: self.id_gen.as_ref(),
                    clock: self.clock.as_ref(),
                    repository: data.as_ref(),
                },
                CreateRealmInput { name, description },
            )
            .await;
        self.finish_write(&data, &audit, AuditAction::Create, outcome)
            .await
    }

    async fn release_realm(&self, realm_id: Uuid) -> RealmResult<Realm> {
        let (data, audit) = self.open_session().await?;
        let outcome = ReleaseRealm
            .execute(
                ReleaseRealmRepos {
                    clock: self.clock.as_ref(),
                    repository: data.as_ref(),
                },
                ReleaseRealmInput { realm_id },
            )
            .await;
        self.finish_write(&data, &audit, AuditAction::Release, outcome)
            .await
    }

    async fn update_realm(&self, realm: Realm) -> RealmResult<Realm> {
        let (data, audit) = self.open_session().await?;
        let outcome = UpdateRealm
            .execute(
                UpdateRealmRepos {
                    clock: self.clock.as_ref(),
                    repository: data.as_ref(),
                },
                UpdateRealmInput { realm },
            )
            .await;
        self.finish_write(&data, &audit, AuditAction::Update, outcome)
            .await
    }
}

/// 按配置创建存储后端并返回执行器
pub async fn connect(config: &DatabaseConfig) -> RealmResult<Arc<dyn RealmOps>> {
    connect_with(config, Arc::new(UuidV4Generator), Arc::new(SystemClock)).await
}

/// 使用指定的 ID 生成器与时钟创建执行器
pub async fn connect_with(
    config: &DatabaseConfig,
    id_gen: Arc<dyn IdGenerator>,
    clock: Arc<dyn Clock>,
) -> RealmResult<Arc<dyn RealmOps>> {
    let ops: Arc<dyn RealmOps> = match config.backend {
        StorageBackend::Sqlite => {
            let cfg = config
                .sqlite
                .as_ref()
                .ok_or_else(|| RealmError::Config("Missing SQLite config".into()))?;
            let manager = SqliteManager::new(cfg, id_gen.clone()).await?;
            Arc::new(RealmUseCaseExecutor::new(id_gen, clock, manager))
        }

        #[cfg(feature = "backend-postgres")]
        StorageBackend::Postgres => {
            let cfg = config
                .postgres
                .as_ref()
                .ok_or_else(|| RealmError::Config("Missing PostgreSQL config".into()))?;
            let manager = crate::storage::PostgresManager::new(cfg, id_gen.clone()).await?;
            Arc::new(RealmUseCaseExecutor::new(id_gen, clock, manager))
        }

        #[cfg(not(feature = "backend-postgres"))]
        StorageBackend::Postgres => {
            return Err(RealmError::Config(
                "PostgreSQL backend not enabled. Compile with --features backend-postgres".into(),
            ));
        }

        StorageBackend::Memory => {
            let manager = MemoryManager::new(id_gen.clone());
            Arc::new(RealmUseCaseExecutor::new(id_gen, clock, manager))
        }
    };

    info!("Realm storage backend ready: {}", ops.backend_name());
    Ok(ops)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use crate::error::ErrorKind;
    use crate::id::SequenceIdGenerator;
    use crate::storage::{MemoryDataStore, RealmRepository};
    use crate::types::AuditAction;
    use chrono::{TimeZone, Utc};

    /// 可注入故障的内存管理器
    struct FaultyManager {
        inner: MemoryManager,
        fail_begin: bool,
        fail_commit: bool,
        stall_commit: bool,
    }

    #[async_trait]
    impl DataStoreManager for FaultyManager {
        type Store = MemoryDataStore;

        fn backend_name(&self) -> &'static str {
            "Faulty"
        }

        fn read_only(&self) -> Arc<MemoryDataStore> {
            self.inner.read_only()
        }

        async fn new_write(&self) -> RealmResult<(Arc<MemoryDataStore>, Arc<MemoryDataStore>)> {
            if self.fail_begin {
                return Err(RealmError::internal_msg("connection refused"));
            }
            self.inner.new_write().await
        }

        async fn commit(
            &self,
            data: &Arc<MemoryDataStore>,
            audit: &Arc<MemoryDataStore>,
        ) -> RealmResult<()> {
            if self.fail_commit {
                return Err(RealmError::internal_msg("commit deadline exceeded"));
            }
            if self.stall_commit {
                std::future::pending::<()>().await;
            }
            self.inner.commit(data, audit).await
        }

        async fn rollback(
            &self,
            data: &Arc<MemoryDataStore>,
            audit: &Arc<MemoryDataStore>,
        ) -> RealmResult<()> {
            self.inner.rollback(data, audit).await
        }
    }

    fn executor_with(manager: FaultyManager) -> RealmUseCaseExecutor<FaultyManager> {
        let clock = FixedClock(Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap());
        RealmUseCaseExecutor::new(
            Arc::new(SequenceIdGenerator::starting_at(1)),
            Arc::new(clock),
            manager,
        )
    }

    fn executor() -> RealmUseCaseExecutor<FaultyManager> {
        executor_with(FaultyManager {
            inner: MemoryManager::new(Arc::new(SequenceIdGenerator::starting_at(10_000))),
            fail_begin: false,
            fail_commit: false,
            stall_commit: false,
        })
    }

    #[tokio::test]
    async fn test_create_commits_realm_and_audit_entry() {
        let exec = executor();
        let realm = exec
            .create_realm("Realm1".into(), "".into())
            .await
            .unwrap();

        assert_eq!(realm.status, RealmStatus::Draft);
        assert_eq!(exec.manager().inner.realms().await, vec![realm.clone()]);

        let audit = exec.manager().inner.audit_log().await;
        assert_eq!(audit.len(), 1);
        assert_eq!(audit[0].action, AuditAction::Create);
        assert_eq!(audit[0].realm_id, realm.id);
    }

    #[tokio::test]
    async fn test_get_reads_exact_copy() {
        let exec = executor();
        let realm = exec.create_realm("r".into(), "".into()).await.unwrap();

        let err = exec
            .get_realm(realm.id, RealmStatus::Active)
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);

        let fetched = exec.get_realm(realm.id, RealmStatus::Draft).await.unwrap();
        assert_eq!(fetched, realm);
    }

    #[tokio::test]
    async fn test_use_case_error_passes_through_and_rolls_back() {
        let exec = executor();

        let err = exec.release_realm(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(exec.manager().inner.audit_log().await.is_empty());

        // 会话已释放，新的写操作不会阻塞
        exec.create_realm("after".into(), "".into()).await.unwrap();
    }

    #[tokio::test]
    async fn test_session_open_failure_is_internal() {
        let exec = executor_with(FaultyManager {
            inner: MemoryManager::new(Arc::new(SequenceIdGenerator::starting_at(1))),
            fail_begin: true,
            fail_commit: false,
            stall_commit: false,
        });

        let err = exec
            .create_realm("x".into(), "".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("failed to configure repositories"));
    }

    #[tokio::test]
    async fn test_commit_failure_is_internal_and_nothing_persists() {
        let exec = executor_with(FaultyManager {
            inner: MemoryManager::new(Arc::new(SequenceIdGenerator::starting_at(1))),
            fail_begin: false,
            fail_commit: true,
            stall_commit: false,
        });

        let err = exec
            .create_realm("x".into(), "".into())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("failed to commit transaction"));
        assert!(exec.manager().inner.realms().await.is_empty());
        assert!(exec.manager().inner.audit_log().await.is_empty());
    }

    #[tokio::test]
    async fn test_full_lifecycle_keeps_one_active_copy() {
        let exec = executor();
        let created = exec.create_realm("v1".into(), "".into()).await.unwrap();
        exec.release_realm(created.id).await.unwrap();

        let mut edit = created.clone();
        edit.name = "v2".into();
        exec.update_realm(edit).await.unwrap();
        let released = exec.release_realm(created.id).await.unwrap();
        assert_eq!(released.name, "v2");

        let store = exec.manager().read_only();
        let rows: Vec<_> = exec
            .manager()
            .inner
            .realms()
            .await
            .into_iter()
            .filter(|r| r.id == created.id)
            .collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, RealmStatus::Active);
        assert!(
            store
                .get_realm(created.id, RealmStatus::Draft)
                .await
                .unwrap_err()
                .is_not_found()
        );

        let actions: Vec<_> = exec
            .manager()
            .inner
            .audit_log()
            .await
            .into_iter()
            .map(|e| e.action)
            .collect();
        assert_eq!(
            actions,
            vec![
                AuditAction::Create,
                AuditAction::Release,
                AuditAction::Update,
                AuditAction::Release
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_memory_backend() {
        let config = DatabaseConfig {
            backend: StorageBackend::Memory,
            sqlite: None,
            postgres: None,
        };
        let ops = connect(&config).await.unwrap();
        assert_eq!(ops.backend_name(), "Memory");

        let realm = ops.create_realm("m".into(), "".into()).await.unwrap();
        assert_eq!(
            ops.get_realm(realm.id, RealmStatus::Draft).await.unwrap(),
            realm
        );
    }

    #[tokio::test]
    async fn test_connect_sqlite_without_section_is_config_error() {
        let config = DatabaseConfig {
            backend: StorageBackend::Sqlite,
            sqlite: None,
            postgres: None,
        };
        let err = connect(&config).await.err().unwrap();
        assert!(matches!(err, RealmError::Config(_)));
    }

    #[tokio::test]
    async fn test_cancelled_write_discards_session() {
        let exec = executor_with(FaultyManager {
            inner: MemoryManager::new(Arc::new(SequenceIdGenerator::starting_at(1))),
            fail_begin: false,
            fail_commit: false,
            stall_commit: true,
        });

        // 请求在提交前被取消
        let cancelled = tokio::time::timeout(
            Duration::from_millis(50),
            exec.create_realm("cancelled".into(), "".into()),
        )
        .await;
        assert!(cancelled.is_err());
        assert!(exec.manager().inner.realms().await.is_empty());
        assert!(exec.manager().inner.audit_log().await.is_empty());

        // 写锁随会话一起释放
        let (data, audit) = tokio::time::timeout(
            Duration::from_secs(1),
            exec.manager().inner.new_write(),
        )
        .await
        .expect("writer lock released after cancellation")
        .unwrap();
        exec.manager().inner.rollback(&data, &audit).await.unwrap();
    }

    #[cfg(not(feature = "backend-postgres"))]
    #[tokio::test]
    async fn test_connect_postgres_requires_feature() {
        let config = DatabaseConfig {
            backend: StorageBackend::Postgres,
            sqlite: None,
            postgres: Some(crate::storage::PostgresConfig::default()),
        };
        let err = connect(&config).await.err().unwrap();
        assert!(matches!(err, RealmError::Config(_)));
        assert!(err.to_string().contains("--features backend-postgres"));
    }
}
