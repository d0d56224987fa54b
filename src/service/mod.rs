//! 服务管理模块
//!
//! 管理 realm-mgr 对外服务（gRPC）的生命周期

pub mod grpc;

use std::fmt;

pub use grpc::RealmGrpcService;

/// 服务运行状态
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum ServiceStatus {
    #[default]
    Unknown,
    /// 运行中，附带监听信息
    Running(String),
    /// 启动或运行失败
    Error(String),
}

impl fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServiceStatus::Unknown => write!(f, "unknown"),
            ServiceStatus::Running(addr) => write!(f, "running ({addr})"),
            ServiceStatus::Error(msg) => write!(f, "error: {msg}"),
        }
    }
}

/// 服务基本信息
#[derive(Debug, Clone)]
pub struct ServiceInfo {
    /// 服务名称
    pub name: String,
    /// 服务状态
    pub status: ServiceStatus,
    /// 服务描述
    pub description: Option<String>,
}

impl ServiceInfo {
    pub fn new(name: impl Into<String>, description: Option<String>) -> Self {
        Self {
            name: name.into(),
            status: ServiceStatus::Unknown,
            description,
        }
    }

    pub fn is_running(&self) -> bool {
        matches!(self.status, ServiceStatus::Running(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_service_info_status() {
        let mut info = ServiceInfo::new("Realm gRPC Service", None);
        assert!(!info.is_running());
        assert_eq!(info.status.to_string(), "unknown");

        info.status = ServiceStatus::Running("gRPC 127.0.0.1:50051".to_string());
        assert!(info.is_running());
        assert_eq!(info.status.to_string(), "running (gRPC 127.0.0.1:50051)");
    }
}
