//! Realm gRPC 服务
//!
//! 按配置连接存储后端，并在 `bind.grpc` 上提供 RealmManagerService，
//! 同时注册标准 `grpc.health.v1.Health` 服务

use super::{ServiceInfo, ServiceStatus};
use anyhow::Result;
use realm::{
    RealmManagerApi, RealmManagerServiceServer, RealmOps, connect, create_grpc_service,
};
use realm_mgr_common::config::RealmMgrConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::broadcast;
use tonic::transport::Server;
use tracing::{error, info};

/// Realm gRPC 服务
#[derive(Debug)]
pub struct RealmGrpcService {
    info: ServiceInfo,
    config: RealmMgrConfig,
}

impl RealmGrpcService {
    pub fn new(config: RealmMgrConfig) -> Self {
        Self {
            info: ServiceInfo::new(
                "Realm gRPC Service",
                Some("Realm 草稿/发布生命周期管理".to_string()),
            ),
            config,
        }
    }

    pub fn info(&self) -> &ServiceInfo {
        &self.info
    }

    /// 解析监听地址
    pub fn bind_addr(&self) -> Result<SocketAddr> {
        let grpc = &self.config.bind.grpc;
        grpc.socket_addr()
            .map_err(|e| anyhow::anyhow!("Failed to parse gRPC address {}:{}: {e}", grpc.ip, grpc.port))
    }

    /// 连接存储后端，构建用例执行器
    pub async fn connect_storage(&self) -> Result<Arc<dyn RealmOps>> {
        connect(&self.config.database)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to create realm storage: {e}"))
    }

    /// 启动 gRPC 服务器，阻塞直到收到关闭信号
    pub async fn start(
        &mut self,
        ops: Arc<dyn RealmOps>,
        mut shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<()> {
        let addr = self.bind_addr()?;
        info!("Starting Realm gRPC service on {}", addr);

        let backend = ops.backend_name();
        let grpc_service = create_grpc_service(ops);

        let (health_reporter, health_service) = tonic_health::server::health_reporter();
        health_reporter
            .set_serving::<RealmManagerServiceServer<RealmManagerApi>>()
            .await;

        let server = Server::builder()
            .add_service(health_service)
            .add_service(grpc_service)
            .serve_with_shutdown(addr, async move {
                let _ = shutdown_rx.recv().await;
                info!("Realm gRPC service received shutdown signal");
            });

        self.info.status = ServiceStatus::Running(format!("gRPC {addr}"));
        info!("✅ Realm gRPC service listening on {} (backend: {})", addr, backend);

        if let Err(e) = server.await {
            error!("Realm gRPC server error: {}", e);
            self.info.status = ServiceStatus::Error(e.to_string());
            return Err(anyhow::anyhow!("Realm gRPC server failed: {e}"));
        }

        info!("Realm gRPC service stopped");
        self.info.status = ServiceStatus::Unknown;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use realm::StorageBackend;

    fn memory_config(port: u16) -> RealmMgrConfig {
        let mut config = RealmMgrConfig::default();
        config.bind.grpc.ip = "127.0.0.1".to_string();
        config.bind.grpc.port = port;
        config.database.backend = StorageBackend::Memory;
        config
    }

    #[test]
    fn test_bind_addr() {
        let service = RealmGrpcService::new(memory_config(50071));
        assert_eq!(service.bind_addr().unwrap().port(), 50071);

        let mut config = memory_config(50071);
        config.bind.grpc.ip = "bad ip".to_string();
        let service = RealmGrpcService::new(config);
        assert!(service.bind_addr().is_err());
    }

    fn free_port() -> u16 {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    }

    #[tokio::test]
    async fn test_start_and_shutdown() {
        let port = free_port();
        let mut service = RealmGrpcService::new(memory_config(port));
        let ops = service.connect_storage().await.unwrap();
        assert_eq!(ops.backend_name(), "Memory");

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let handle = tokio::spawn(async move {
            let result = service.start(ops, shutdown_rx).await;
            (result, service)
        });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        shutdown_tx.send(()).unwrap();

        let (result, service) = handle.await.unwrap();
        assert!(result.is_ok());
        assert_eq!(service.info().status, ServiceStatus::Unknown);
    }

    #[tokio::test]
    async fn test_standard_health_check_reports_serving() {
        use tonic::server::NamedService;
        use tonic_health::pb::HealthCheckRequest;
        use tonic_health::pb::health_check_response::ServingStatus;
        use tonic_health::pb::health_client::HealthClient;

        let port = free_port();
        let mut service = RealmGrpcService::new(memory_config(port));
        let ops = service.connect_storage().await.unwrap();

        let (shutdown_tx, shutdown_rx) = broadcast::channel::<()>(1);
        let handle = tokio::spawn(async move { service.start(ops, shutdown_rx).await });

        tokio::time::sleep(std::time::Duration::from_millis(100)).await;
        let channel = tonic::transport::Endpoint::new(format!("http://127.0.0.1:{port}"))
            .unwrap()
            .connect()
            .await
            .unwrap();
        let mut client = HealthClient::new(channel);

        let overall = client
            .check(HealthCheckRequest {
                service: String::new(),
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(overall.status, ServingStatus::Serving as i32);

        let realm_service = client
            .check(HealthCheckRequest {
                service: <RealmManagerServiceServer<RealmManagerApi> as NamedService>::NAME
                    .to_string(),
            })
            .await
            .unwrap()
            .into_inner();
        assert_eq!(realm_service.status, ServingStatus::Serving as i32);

        let missing = client
            .check(HealthCheckRequest {
                service: "no.such.Service".to_string(),
            })
            .await
            .unwrap_err();
        assert_eq!(missing.code(), tonic::Code::NotFound);

        shutdown_tx.send(()).unwrap();
        assert!(handle.await.unwrap().is_ok());
    }
}
