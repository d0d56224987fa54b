//! 内存存储后端
//!
//! 进程内存储，主要用于开发和测试。写会话独占表锁直到提交或回滚，
//! 变更先写入工作副本，提交时整体替换。

use crate::error::{RealmError, RealmResult};
use crate::id::IdGenerator;
use crate::status::RealmStatus;
use crate::storage::{AuditRepository, DataStoreManager, RealmRepository, ensure_same_store};
use crate::types::{AuditEntry, Realm};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Default)]
struct Tables {
    /// 代理键 -> 记录
    realms: BTreeMap<Uuid, Realm>,
    audit_log: Vec<AuditEntry>,
}

impl Tables {
    fn is_live(status: RealmStatus) -> bool {
        matches!(status, RealmStatus::Active | RealmStatus::Draft)
    }

    fn contains(&self, id: Uuid, status: RealmStatus) -> bool {
        self.realms
            .values()
            .any(|r| r.id == id && r.status == status)
    }

    fn get(&self, id: Uuid, status: RealmStatus) -> RealmResult<Realm> {
        self.realms
            .values()
            .find(|r| r.id == id && r.status == status)
            .cloned()
            .ok_or_else(|| RealmError::not_found("realm not found"))
    }

    fn insert(&mut self, key: Uuid, realm: &Realm) -> RealmResult<()> {
        if Self::is_live(realm.status) && self.contains(realm.id, realm.status) {
            return Err(RealmError::internal(
                "realm insert failed",
                format!("duplicate {} realm for id {}", realm.status, realm.id),
            ));
        }
        self.realms.insert(key, realm.clone());
        Ok(())
    }

    fn update(&mut self, realm: &Realm, current_status: RealmStatus) -> RealmResult<()> {
        if realm.status != current_status
            && Self::is_live(realm.status)
            && self.contains(realm.id, realm.status)
        {
            return Err(RealmError::internal(
                "realm update failed",
                format!("duplicate {} realm for id {}", realm.status, realm.id),
            ));
        }

        if let Some(row) = self
            .realms
            .values_mut()
            .find(|r| r.id == realm.id && r.status == current_status)
        {
            row.name = realm.name.clone();
            row.description = realm.description.clone();
            row.updated_at = realm.updated_at;
            row.status = realm.status;
        }
        Ok(())
    }

    fn delete(&mut self, id: Uuid, statuses: &[RealmStatus]) {
        self.realms
            .retain(|_, r| !(r.id == id && statuses.contains(&r.status)));
    }
}

struct WriteSession {
    committed: OwnedMutexGuard<Tables>,
    working: Tables,
}

enum Session {
    Shared(Arc<Mutex<Tables>>),
    Tx(Mutex<Option<WriteSession>>),
}

/// 内存数据存储句柄
pub struct MemoryDataStore {
    session: Session,
    key_gen: Arc<dyn IdGenerator>,
}

impl std::fmt::Debug for MemoryDataStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryDataStore")
            .field("transactional", &matches!(self.session, Session::Tx(_)))
            .finish()
    }
}

impl MemoryDataStore {
    async fn with_tables<R>(&self, f: impl FnOnce(&mut Tables) -> R + Send) -> RealmResult<R> {
        match &self.session {
            Session::Shared(tables) => {
                let mut tables = tables.lock().await;
                Ok(f(&mut tables))
            }
            Session::Tx(session) => {
                let mut session = session.lock().await;
                let session = session.as_mut().ok_or(RealmError::TransactionDone)?;
                Ok(f(&mut session.working))
            }
        }
    }

    async fn finish(&self, commit: bool) -> RealmResult<()> {
        let Session::Tx(session) = &self.session else {
            return Err(RealmError::internal_msg("datastore is not transactional"));
        };
        let WriteSession {
            mut committed,
            working,
        } = session
            .lock()
            .await
            .take()
            .ok_or(RealmError::TransactionDone)?;
        if commit {
            *committed = working;
        }
        Ok(())
    }
}

#[async_trait]
impl RealmRepository for MemoryDataStore {
    async fn get_realm(&self, id: Uuid, status: RealmStatus) -> RealmResult<Realm> {
        self.with_tables(|t| t.get(id, status)).await?
    }

    async fn create_realm(&self, realm: &Realm) -> RealmResult<()> {
        let key = self
            .key_gen
            .new_id()
            .map_err(|e| RealmError::internal("failed to generate UUID key", e))?;
        self.with_tables(|t| t.insert(key, realm)).await??;
        debug!("Inserted realm id={} status={}", realm.id, realm.status);
        Ok(())
    }

    async fn update_realm(&self, realm: &Realm, current_status: RealmStatus) -> RealmResult<()> {
        self.with_tables(|t| t.update(realm, current_status))
            .await?
    }

    async fn delete_realm(&self, id: Uuid, statuses: &[RealmStatus]) -> RealmResult<()> {
        self.with_tables(|t| t.delete(id, statuses)).await
    }
}

#[async_trait]
impl AuditRepository for MemoryDataStore {
    async fn record_audit(&self, entry: &AuditEntry) -> RealmResult<()> {
        self.with_tables(|t| t.audit_log.push(entry.clone())).await
    }
}

/// 内存会话管理器
#[derive(Clone)]
pub struct MemoryManager {
    tables: Arc<Mutex<Tables>>,
    key_gen: Arc<dyn IdGenerator>,
    read_store: Arc<MemoryDataStore>,
}

impl std::fmt::Debug for MemoryManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryManager").finish_non_exhaustive()
    }
}

impl MemoryManager {
    pub fn new(key_gen: Arc<dyn IdGenerator>) -> Self {
        let tables = Arc::new(Mutex::new(Tables::default()));
        let read_store = Arc::new(MemoryDataStore {
            session: Session::Shared(tables.clone()),
            key_gen: key_gen.clone(),
        });
        Self {
            tables,
            key_gen,
            read_store,
        }
    }

    /// 已提交的全部记录（不区分状态）
    pub async fn realms(&self) -> Vec<Realm> {
        self.tables.lock().await.realms.values().cloned().collect()
    }

    /// 已提交的审计记录
    pub async fn audit_log(&self) -> Vec<AuditEntry> {
        self.tables.lock().await.audit_log.clone()
    }
}

#[async_trait]
impl DataStoreManager for MemoryManager {
    type Store = MemoryDataStore;

    fn backend_name(&self) -> &'static str {
        "Memory"
    }

    fn read_only(&self) -> Arc<MemoryDataStore> {
        self.read_store.clone()
    }

    async fn new_write(&self) -> RealmResult<(Arc<MemoryDataStore>, Arc<MemoryDataStore>)> {
        let committed = self.tables.clone().lock_owned().await;
        let working = committed.clone();
        let store = Arc::new(MemoryDataStore {
            session: Session::Tx(Mutex::new(Some(WriteSession { committed, working }))),
            key_gen: self.key_gen.clone(),
        });
        Ok((store.clone(), store))
    }

    async fn commit(
        &self,
        data: &Arc<MemoryDataStore>,
        audit: &Arc<MemoryDataStore>,
    ) -> RealmResult<()> {
        ensure_same_store(data, audit)?;
        data.finish(true).await
    }

    async fn rollback(
        &self,
        data: &Arc<MemoryDataStore>,
        audit: &Arc<MemoryDataStore>,
    ) -> RealmResult<()> {
        ensure_same_store(data, audit)?;
        match data.finish(false).await {
            Err(e) if e.is_transaction_done() => Ok(()),
            other => other,
        }
    }
}
