//! Realm gRPC 客户端

use crate::error::{RealmError, RealmResult};
use realm_mgr_proto::realm_mgr::v1::{
    CreateRealmRequest, EnumStatus, GetRealmRequest, HealthCheckRequest, HealthCheckResponse,
    Realm, ReleaseRealmRequest, UpdateRealmRequest,
    realm_manager_service_client::RealmManagerServiceClient,
};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tonic::transport::{Channel, Endpoint};
use tonic::{Code, Status};
use tracing::debug;

/// Realm gRPC 客户端配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct GrpcClientConfig {
    /// 服务地址，例如 "http://127.0.0.1:50051"
    pub endpoint: String,

    /// 请求超时时间（秒）
    pub timeout_seconds: u64,
}

/// Realm gRPC 客户端
#[derive(Clone)]
pub struct GrpcClient {
    client: RealmManagerServiceClient<Channel>,
}

impl From<Status> for RealmError {
    fn from(status: Status) -> Self {
        match status.code() {
            Code::NotFound => RealmError::not_found(status.message()),
            Code::InvalidArgument => RealmError::invalid_argument("request", status.message()),
            _ => RealmError::internal(format!("gRPC call failed: {}", status.message()), status),
        }
    }
}

impl GrpcClient {
    pub async fn new(config: &GrpcClientConfig) -> RealmResult<Self> {
        let endpoint = Endpoint::from_shared(config.endpoint.clone())
            .map_err(|e| RealmError::internal("Invalid endpoint", e))?
            .timeout(Duration::from_secs(config.timeout_seconds))
            .connect_timeout(Duration::from_secs(config.timeout_seconds));

        let channel = endpoint
            .connect()
            .await
            .map_err(|e| RealmError::internal("Failed to connect to realm-mgr", e))?;

        debug!("Connected to realm-mgr at {}", config.endpoint);
        Ok(Self {
            client: RealmManagerServiceClient::new(channel),
        })
    }

    fn unwrap_realm(realm: Option<Realm>) -> RealmResult<Realm> {
        realm.ok_or_else(|| RealmError::internal_msg("response did not contain a realm"))
    }

    /// `status` 为 `Unspecified` 时服务端按 Active 查询
    pub async fn get_realm(&self, id: &str, status: EnumStatus) -> RealmResult<Realm> {
        let response = self
            .client
            .clone()
            .get_realm(GetRealmRequest {
                id: id.to_string(),
                status: status as i32,
            })
            .await?;
        Self::unwrap_realm(response.into_inner().realm)
    }

    pub async fn create_realm(&self, name: &str, description: &str) -> RealmResult<Realm> {
        let response = self
            .client
            .clone()
            .create_realm(CreateRealmRequest {
                name: name.to_string(),
                description: description.to_string(),
            })
            .await?;
        Self::unwrap_realm(response.into_inner().realm)
    }

    pub async fn release_realm(&self, id: &str) -> RealmResult<Realm> {
        let response = self
            .client
            .clone()
            .release_realm(ReleaseRealmRequest { id: id.to_string() })
            .await?;
        Self::unwrap_realm(response.into_inner().realm)
    }

    pub async fn update_realm(&self, realm: Realm) -> RealmResult<Realm> {
        let response = self
            .client
            .clone()
            .update_realm(UpdateRealmRequest { realm: Some(realm) })
            .await?;
        Self::unwrap_realm(response.into_inner().realm)
    }

    pub async fn health_check(&self) -> RealmResult<HealthCheckResponse> {
        let response = self
            .client
            .clone()
            .health_check(HealthCheckRequest {})
            .await?;
        Ok(response.into_inner())
    }
}
