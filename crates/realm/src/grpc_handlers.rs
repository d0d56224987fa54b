//! Realm gRPC 服务实现

use crate::error::{ErrorKind, RealmError};
use crate::executor::RealmOps;
use crate::models::{INTERNAL_ERR_MSG, realm_from_proto, realm_to_proto, status_from_proto};
use crate::types::Realm;
use crate::validation::Validate;
use realm_mgr_proto::realm_mgr::v1::realm_manager_service_server::{
    RealmManagerService, RealmManagerServiceServer,
};
use realm_mgr_proto::realm_mgr::v1::*;
use realm_mgr_proto::Realm as ProtoRealm;
use std::sync::Arc;
use tonic::{Request, Response, Status};
use tracing::{Instrument, Span, debug, error, info, info_span, warn};
use uuid::Uuid;

const SERVICE_NAME: &str = "realm_mgr.v1.RealmManagerService";

/// Realm gRPC 服务
#[derive(Clone)]
pub struct RealmManagerApi {
    ops: Arc<dyn RealmOps>,
}

fn request_span(method: &'static str) -> Span {
    info_span!(
        "grpc.request",
        grpc_service = SERVICE_NAME,
        grpc_method = method
    )
}

fn validate<T: Validate>(req: &T) -> Result<(), Status> {
    req.validate().map_err(|e| {
        warn!(error = %e, "request validation failed");
        Status::invalid_argument(e.to_string())
    })
}

fn parse_id(id: &str) -> Result<Uuid, Status> {
    Uuid::parse_str(id).map_err(|e| {
        info!(error = %e, realm_id = id, "invalid realm ID supplied");
        Status::invalid_argument(format!("realm ID was not a valid UUID: {id}"))
    })
}

fn internal(e: &RealmError) -> Status {
    if e.is_unknown() {
        error!(error = %e, "unknown error while handling request");
    } else {
        error!(error = %e, "internal error while handling request");
    }
    Status::internal(INTERNAL_ERR_MSG)
}

fn to_proto(realm: &Realm) -> Result<ProtoRealm, Status> {
    realm_to_proto(realm).map_err(|e| internal(&e))
}

impl RealmManagerApi {
    pub fn new(ops: Arc<dyn RealmOps>) -> Self {
        Self { ops }
    }

    async fn handle_get(&self, req: GetRealmRequest) -> Result<GetRealmResponse, Status> {
        validate(&req)?;
        let realm_id = parse_id(&req.id)?;

        // 未指定状态时默认查询 Active
        let status = match EnumStatus::try_from(req.status) {
            Ok(EnumStatus::Unspecified) => EnumStatus::Active,
            Ok(status) => status,
            Err(_) => {
                info!(status = req.status, "invalid realm status supplied");
                return Err(Status::invalid_argument(format!(
                    "unexpected realm status: {}",
                    req.status
                )));
            }
        };
        let status = status_from_proto(status).map_err(|e| {
            info!(error = %e, "invalid realm status supplied");
            Status::invalid_argument(format!("unexpected realm status: {}", req.status))
        })?;

        let realm = self
            .ops
            .get_realm(realm_id, status)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    Status::not_found(format!("realm with ID not found: {}", req.id))
                }
                ErrorKind::InvalidArgument => Status::invalid_argument(e.to_string()),
                _ => internal(&e),
            })?;

        Ok(GetRealmResponse {
            realm: Some(to_proto(&realm)?),
        })
    }

    async fn handle_create(&self, req: CreateRealmRequest) -> Result<CreateRealmResponse, Status> {
        validate(&req)?;

        let realm = self
            .ops
            .create_realm(req.name, req.description)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidArgument => Status::invalid_argument(e.to_string()),
                _ => internal(&e),
            })?;

        info!(realm_id = %realm.id, "realm created");
        Ok(CreateRealmResponse {
            realm: Some(to_proto(&realm)?),
        })
    }

    async fn handle_release(
        &self,
        req: ReleaseRealmRequest,
    ) -> Result<ReleaseRealmResponse, Status> {
        validate(&req)?;
        let realm_id = parse_id(&req.id)?;

        let realm = self
            .ops
            .release_realm(realm_id)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => Status::not_found(format!(
                    "no releasable realm with ID found: {realm_id}"
                )),
                ErrorKind::InvalidArgument => Status::invalid_argument(e.to_string()),
                _ => internal(&e),
            })?;

        info!(realm_id = %realm.id, "realm released");
        Ok(ReleaseRealmResponse {
            realm: Some(to_proto(&realm)?),
        })
    }

    async fn handle_update(&self, req: UpdateRealmRequest) -> Result<UpdateRealmResponse, Status> {
        validate(&req)?;
        let input = realm_from_proto(req.realm.as_ref()).map_err(|e| {
            info!(error = %e, "invalid realm data supplied");
            Status::invalid_argument("invalid realm data supplied")
        })?;
        let realm_id = input.id;

        let realm = self
            .ops
            .update_realm(input)
            .await
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound => {
                    Status::not_found(format!("realm with ID not found: {realm_id}"))
                }
                ErrorKind::InvalidArgument => Status::invalid_argument(e.to_string()),
                _ => internal(&e),
            })?;

        info!(realm_id = %realm.id, "realm draft updated");
        Ok(UpdateRealmResponse {
            realm: Some(to_proto(&realm)?),
        })
    }
}

#[tonic::async_trait]
impl RealmManagerService for RealmManagerApi {
    async fn get_realm(
        &self,
        request: Request<GetRealmRequest>,
    ) -> Result<Response<GetRealmResponse>, Status> {
        self.handle_get(request.into_inner())
            .instrument(request_span("GetRealm"))
            .await
            .map(Response::new)
    }

    async fn create_realm(
        &self,
        request: Request<CreateRealmRequest>,
    ) -> Result<Response<CreateRealmResponse>, Status> {
        self.handle_create(request.into_inner())
            .instrument(request_span("CreateRealm"))
            .await
            .map(Response::new)
    }

    async fn release_realm(
        &self,
        request: Request<ReleaseRealmRequest>,
    ) -> Result<Response<ReleaseRealmResponse>, Status> {
        self.handle_release(request.into_inner())
            .instrument(request_span("ReleaseRealm"))
            .await
            .map(Response::new)
    }

    async fn update_realm(
        &self,
        request: Request<UpdateRealmRequest>,
    ) -> Result<Response<UpdateRealmResponse>, Status> {
        self.handle_update(request.into_inner())
            .instrument(request_span("UpdateRealm"))
            .await
            .map(Response::new)
    }

    /// 健康检查
    async fn health_check(
        &self,
        _request: Request<HealthCheckRequest>,
    ) -> Result<Response<HealthCheckResponse>, Status> {
        debug!("gRPC health check requested");

        let response = HealthCheckResponse {
            status: "SERVING".to_string(),
            service: "realm-mgr".to_string(),
            backend: self.ops.backend_name().to_string(),
            timestamp: chrono::Utc::now().timestamp().max(0) as u64,
        };

        Ok(Response::new(response))
    }
}

/// 创建 gRPC 服务
pub fn create_grpc_service(ops: Arc<dyn RealmOps>) -> RealmManagerServiceServer<RealmManagerApi> {
    RealmManagerServiceServer::new(RealmManagerApi::new(ops))
}
