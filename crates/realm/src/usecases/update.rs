//! 更新 Realm 用例：将修改暂存到 Draft

use crate::clock::Clock;
use crate::error::{RealmError, RealmResult};
use crate::status::RealmStatus;
use crate::storage::RealmRepository;
use crate::types::Realm;
use tracing::{debug, error, instrument};

#[derive(Debug, Clone)]
pub struct UpdateRealmInput {
    /// 只使用 id、name、description；其余字段由服务端决定
    pub realm: Realm,
}

impl UpdateRealmInput {
    pub fn validate(&self) -> RealmResult<()> {
        Ok(())
    }
}

pub struct UpdateRealmRepos<'a> {
    pub clock: &'a dyn Clock,
    pub repository: &'a dyn RealmRepository,
}

impl UpdateRealmRepos<'_> {
    pub fn validate(&self) -> RealmResult<()> {
        Ok(())
    }
}

/// 暂存修改
///
/// 已有 Draft 时原地合并；否则基于 Active 的副本新建 Draft，Active 保持不变。
#[derive(Debug, Clone, Copy, Default)]
pub struct UpdateRealm;

impl UpdateRealm {
    #[instrument(
        level = "debug",
        skip_all,
        fields(use_case = "update-realm", realm_id = %input.realm.id)
    )]
    pub async fn execute(
        &self,
        repos: UpdateRealmRepos<'_>,
        mut input: UpdateRealmInput,
    ) -> RealmResult<Realm> {
        repos.validate()?;
        input.validate()?;

        input.realm.updated_at = repos.clock.now();
        let realm_id = input.realm.id;

        let draft = match repos
            .repository
            .get_realm(realm_id, RealmStatus::Draft)
            .await
        {
            Ok(draft) => draft,
            Err(e) if e.is_not_found() => return self.create_draft(&repos, &input).await,
            Err(e) => {
                error!(error = %e, "failed to get draft realm from repository");
                return Err(RealmError::internal(
                    "failed to get draft realm from repository",
                    e,
                ));
            }
        };

        let draft = draft.merge(&input.realm);
        repos
            .repository
            .update_realm(&draft, RealmStatus::Draft)
            .await
            .map_err(|e| {
                error!(error = %e, "failed to update draft realm in repository");
                RealmError::internal("failed to update draft realm in repository", e)
            })?;

        Ok(draft)
    }

    async fn create_draft(
        &self,
        repos: &UpdateRealmRepos<'_>,
        input: &UpdateRealmInput,
    ) -> RealmResult<Realm> {
        let realm_id = input.realm.id;
        let active = match repos
            .repository
            .get_realm(realm_id, RealmStatus::Active)
            .await
        {
            Ok(active) => active,
            Err(e) if e.is_not_found() => {
                return Err(RealmError::not_found(format!(
                    "realm with ID {realm_id} not found"
                )));
            }
            Err(e) => {
                error!(error = %e, "failed to get active realm from repository");
                return Err(RealmError::internal(
                    "failed to get active realm from repository",
                    e,
                ));
            }
        };

        let mut draft = active.merge(&input.realm);
        draft.status = RealmStatus::Draft;

        repos.repository.create_realm(&draft).await.map_err(|e| {
            error!(error = %e, "failed to create draft realm in repository");
            RealmError::internal("failed to create draft realm in repository", e)
        })?;

        debug!("created draft from active realm");
        Ok(draft)
    }
}
