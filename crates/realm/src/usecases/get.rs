//! 查询 Realm 用例

use crate::error::{RealmError, RealmResult};
use crate::status::RealmStatus;
use crate::storage::RealmRepository;
use crate::types::Realm;
use tracing::{debug, error, instrument};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct GetRealmInput {
    pub realm_id: Uuid,
    pub status: RealmStatus,
}

impl GetRealmInput {
    pub fn validate(&self) -> RealmResult<()> {
        Ok(())
    }
}

pub struct GetRealmRepos<'a> {
    pub repository: &'a dyn RealmRepository,
}

impl GetRealmRepos<'_> {
    pub fn validate(&self) -> RealmResult<()> {
        Ok(())
    }
}

/// 按 id 与状态查询
///
/// 只要该 id 存在 Deleted 记录，无论请求哪个状态都返回 `NotFound`。
#[derive(Debug, Clone, Copy, Default)]
pub struct GetRealm;

impl GetRealm {
    #[instrument(
        level = "debug",
        skip_all,
        fields(use_case = "get-realm", realm_id = %input.realm_id)
    )]
    pub async fn execute(&self, repos: GetRealmRepos<'_>, input: GetRealmInput) -> RealmResult<Realm> {
        repos.validate()?;
        input.validate()?;

        let not_found = || RealmError::not_found(format!("realm with ID {} not found", input.realm_id));

        if input.status == RealmStatus::Deleted {
            return Err(not_found());
        }

        let realm = match repos.repository.get_realm(input.realm_id, input.status).await {
            Ok(realm) => realm,
            Err(e) if e.is_not_found() => return Err(not_found()),
            Err(e) => {
                error!(error = %e, "failed to get realm from repository");
                return Err(RealmError::internal("failed to get realm from repository", e));
            }
        };

        // 墓碑检查
        match repos
            .repository
            .get_realm(input.realm_id, RealmStatus::Deleted)
            .await
        {
            Ok(_) => {
                debug!("realm is tombstoned");
                Err(not_found())
            }
            Err(e) if e.is_not_found() => Ok(realm),
            Err(e) => {
                error!(error = %e, "failed to get realm from repository");
                Err(RealmError::internal("failed to get realm from repository", e))
            }
        }
    }
}
