//! 创建 Realm 用例

use crate::clock::Clock;
use crate::error::{RealmError, RealmResult};
use crate::id::IdGenerator;
use crate::status::RealmStatus;
use crate::storage::RealmRepository;
use crate::types::Realm;
use tracing::{Span, error, instrument};

#[derive(Debug, Clone)]
pub struct CreateRealmInput {
    pub name: String,
    pub description: String,
}

impl CreateRealmInput {
    pub fn validate(&self) -> RealmResult<()> {
        Ok(())
    }
}

pub struct CreateRealmRepos<'a> {
    pub id_gen: &'a dyn IdGenerator,
    pub clock: &'a dyn Clock,
    pub repository: &'a dyn RealmRepository,
}

impl CreateRealmRepos<'_> {
    pub fn validate(&self) -> RealmResult<()> {
        Ok(())
    }
}

/// 以 Draft 状态创建新 Realm，不检查名称唯一性
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateRealm;

impl CreateRealm {
    #[instrument(level = "debug", skip_all, fields(use_case = "create-realm", realm_id))]
    pub async fn execute(
        &self,
        repos: CreateRealmRepos<'_>,
        input: CreateRealmInput,
    ) -> RealmResult<Realm> {
        repos.validate()?;
        input.validate()?;

        let realm_id = repos.id_gen.new_id().map_err(|e| {
            error!(error = %e, "failed to generate UUID id");
            RealmError::internal("failed to generate UUID id", e)
        })?;
        Span::current().record("realm_id", tracing::field::display(realm_id));

        let now = repos.clock.now();
        let realm = Realm {
            id: realm_id,
            name: input.name,
            description: input.description,
            status: RealmStatus::Draft,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };

        repos.repository.create_realm(&realm).await.map_err(|e| {
            error!(error = %e, "failed to create draft realm in repository");
            RealmError::internal("failed to create draft realm in repository", e)
        })?;

        Ok(realm)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::id::SequenceIdGenerator;
    use crate::storage::DataStoreManager;
    use crate::usecases::test_support::*;
    use uuid::Uuid;

    struct FailingIdGenerator;

    impl IdGenerator for FailingIdGenerator {
        fn new_id(&self) -> RealmResult<Uuid> {
            Err(RealmError::internal_msg("entropy exhausted"))
        }
    }

    fn input(name: &str) -> CreateRealmInput {
        CreateRealmInput {
            name: name.to_string(),
            description: String::new(),
        }
    }

    #[tokio::test]
    async fn test_create_returns_draft() {
        let manager = memory();
        let store = manager.read_only();
        let id_gen = SequenceIdGenerator::starting_at(7);
        let clock = clock_at(0);

        let realm = CreateRealm
            .execute(
                CreateRealmRepos {
                    id_gen: &id_gen,
                    clock: &clock,
                    repository: store.as_ref(),
                },
                input("Realm1"),
            )
            .await
            .unwrap();

        assert_eq!(realm.id, Uuid::from_u128(7));
        assert_eq!(realm.status, RealmStatus::Draft);
        assert_eq!(realm.name, "Realm1");
        assert_eq!(realm.description, "");
        assert_eq!(realm.created_at, t0());
        assert_eq!(realm.updated_at, t0());
        assert_eq!(rows_for(&manager, realm.id).await, vec![realm]);
    }

    #[tokio::test]
    async fn test_duplicate_names_are_allowed() {
        let manager = memory();
        let store = manager.read_only();
        let id_gen = SequenceIdGenerator::starting_at(1);
        let clock = clock_at(0);

        for _ in 0..2 {
            CreateRealm
                .execute(
                    CreateRealmRepos {
                        id_gen: &id_gen,
                        clock: &clock,
                        repository: store.as_ref(),
                    },
                    input("same"),
                )
                .await
                .unwrap();
        }
        assert_eq!(manager.realms().await.len(), 2);
    }

    #[tokio::test]
    async fn test_id_generation_failure_is_internal() {
        let manager = memory();
        let store = manager.read_only();
        let clock = clock_at(0);

        let err = CreateRealm
            .execute(
                CreateRealmRepos {
                    id_gen: &FailingIdGenerator,
                    clock: &clock,
                    repository: store.as_ref(),
                },
                input("x"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(err.to_string().contains("failed to generate UUID id"));
        assert!(manager.realms().await.is_empty());
    }

    #[tokio::test]
    async fn test_repository_failure_is_internal() {
        let manager = memory();
        let store = manager.read_only();
        let clock = clock_at(0);
        // 两次生成相同 id，第二次插入违反唯一约束
        let existing = realm(Uuid::from_u128(5), "taken", RealmStatus::Draft);
        seed(&manager, &existing).await;

        let err = CreateRealm
            .execute(
                CreateRealmRepos {
                    id_gen: &SequenceIdGenerator::starting_at(5),
                    clock: &clock,
                    repository: store.as_ref(),
                },
                input("again"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.kind(), ErrorKind::Internal);
        assert!(
            err.to_string()
                .contains("failed to create draft realm in repository")
        );
    }
}
