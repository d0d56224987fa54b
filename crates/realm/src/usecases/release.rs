//! 发布 Realm 用例（Draft -> Active）

use crate::clock::Clock;
use crate::error::{RealmError, RealmResult};
use crate::status::RealmStatus;
use crate::storage::RealmRepository;
use crate::types::Realm;
use tracing::{error, instrument, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Copy)]
pub struct ReleaseRealmInput {
    pub realm_id: Uuid,
}

impl ReleaseRealmInput {
    pub fn validate(&self) -> RealmResult<()> {
        Ok(())
    }
}

pub struct ReleaseRealmRepos<'a> {
    pub clock: &'a dyn Clock,
    pub repository: &'a dyn RealmRepository,
}

impl ReleaseRealmRepos<'_> {
    pub fn validate(&self) -> RealmResult<()> {
        Ok(())
    }
}

/// 发布 Draft
///
/// - 没有 Active 时，Draft 原地改为 Active
/// - 已有 Active 时，Draft 内容合并到 Active，先删除 Draft 再更新 Active
#[derive(Debug, Clone, Copy, Default)]
pub struct ReleaseRealm;

impl ReleaseRealm {
    #[instrument(
        level = "debug",
        skip_all,
        fields(use_case = "release-realm", realm_id = %input.realm_id)
    )]
    pub async fn execute(
        &self,
        repos: ReleaseRealmRepos<'_>,
        input: ReleaseRealmInput,
    ) -> RealmResult<Realm> {
        repos.validate()?;
        input.validate()?;

        let now = repos.clock.now();
        let repository = repos.repository;

        let mut draft = match repository
            .get_realm(input.realm_id, RealmStatus::Draft)
            .await
        {
            Ok(realm) => realm,
            Err(e) if e.is_not_found() => {
                warn!(error = %e, "no releasable realm found with provided ID");
                return Err(RealmError::not_found(
                    "no releasable realm found with provided ID",
                ));
            }
            Err(e) => {
                error!(error = %e, "failed to get draft realm from repository");
                return Err(RealmError::internal(
                    "failed to get draft realm from repository",
                    e,
                ));
            }
        };

        let active = match repository
            .get_realm(input.realm_id, RealmStatus::Active)
            .await
        {
            Ok(realm) => realm,
            Err(e) if e.is_not_found() => {
                // 首次发布
                draft.updated_at = now;
                draft.status = RealmStatus::Active;
                repository
                    .update_realm(&draft, RealmStatus::Draft)
                    .await
                    .map_err(|e| {
                        error!(error = %e, "failed to update draft realm in repository");
                        RealmError::internal("failed to update draft realm in repository", e)
                    })?;
                return Ok(draft);
            }
            Err(e) => {
                error!(error = %e, "failed to get active realm from repository");
                return Err(RealmError::internal(
                    "failed to get active realm from repository",
                    e,
                ));
            }
        };

        let mut released = active.merge(&draft);
        released.updated_at = now;

        repository
            .delete_realm(draft.id, &[RealmStatus::Draft])
            .await
            .map_err(|e| {
                error!(error = %e, "failed to delete draft realm from repository");
                RealmError::internal("failed to delete draft realm from repository", e)
            })?;

        repository
            .update_realm(&released, RealmStatus::Active)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to update active realm in repository");
                RealmError::internal("failed to update active realm in repository", e)
            })?;

        Ok(released)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::storage::{DataStoreManager, MemoryManager};
    use crate::usecases::test_support::*;

    async fn release(manager: &MemoryManager, id: Uuid, at: i64) -> RealmResult<Realm> {
        let store = manager.read_only();
        let clock = clock_at(at);
        ReleaseRealm
            .execute(
                ReleaseRealmRepos {
                    clock: &clock,
                    repository: store.as_ref(),
                },
                ReleaseRealmInput { realm_id: id },
            )
            .await
    }

    #[tokio::test]
    async fn test_first_release_promotes_draft_in_place() {
        let manager = memory();
        let id = Uuid::new_v4();
        seed(&manager, &realm(id, "fresh", RealmStatus::Draft)).await;

        let released = release(&manager, id, 60).await.unwrap();
        assert_eq!(released.status, RealmStatus::Active);
        assert_eq!(released.name, "fresh");
        assert_eq!(released.created_at, t0());
        assert_eq!(released.updated_at, clock_at(60).0);

        assert_eq!(rows_for(&manager, id).await, vec![released]);
    }

    #[tokio::test]
    async fn test_rerelease_merges_draft_into_active() {
        let manager = memory();
        let id = Uuid::new_v4();
        let active = realm(id, "v1", RealmStatus::Active);
        let mut draft = realm(id, "v2", RealmStatus::Draft);
        draft.created_at = clock_at(10).0;
        seed(&manager, &active).await;
        seed(&manager, &draft).await;

        let released = release(&manager, id, 120).await.unwrap();
        assert_eq!(released.status, RealmStatus::Active);
        assert_eq!(released.name, "v2");
        assert_eq!(released.description, "v2 description");
        assert_eq!(released.created_at, active.created_at);
        assert_eq!(released.updated_at, clock_at(120).0);

        let rows = rows_for(&manager, id).await;
        assert_eq!(rows, vec![released]);
    }

    #[tokio::test]
    async fn test_release_without_draft_is_not_found() {
        let manager = memory();
        let id = Uuid::new_v4();
        seed(&manager, &realm(id, "live", RealmStatus::Active)).await;

        let err = release(&manager, id, 0).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().contains("no releasable realm"));
    }

    #[tokio::test]
    async fn test_second_release_is_not_found() {
        let manager = memory();
        let id = Uuid::new_v4();
        seed(&manager, &realm(id, "once", RealmStatus::Draft)).await;

        release(&manager, id, 0).await.unwrap();
        let err = release(&manager, id, 1).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
