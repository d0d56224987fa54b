//! Realm 领域类型

use crate::status::RealmStatus;
use chrono::{DateTime, Utc};
use strum::Display;
use uuid::Uuid;

/// Realm 实体
///
/// 同一个 `id` 最多同时存在一条 Active 记录和一条 Draft 记录。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Realm {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub status: RealmStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Realm {
    /// 将 `overlay` 的可变字段（name、description、updated_at）合并到 `self` 上
    ///
    /// `id`、`status`、`created_at` 始终保留自 `self`。
    pub fn merge(mut self, overlay: &Realm) -> Realm {
        self.name = overlay.name.clone();
        self.description = overlay.description.clone();
        self.updated_at = overlay.updated_at;
        self
    }
}

/// 审计动作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum AuditAction {
    Create,
    Release,
    Update,
}

/// 审计记录，与数据变更在同一事务中写入
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEntry {
    pub realm_id: Uuid,
    pub action: AuditAction,
    pub status: RealmStatus,
    pub occurred_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(action: AuditAction, realm: &Realm, occurred_at: DateTime<Utc>) -> Self {
        Self {
            realm_id: realm.id,
            action,
            status: realm.status,
            occurred_at,
        }
    }
}
