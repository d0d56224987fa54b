//! # realm-mgr
//!
//! Realm 管理服务：以 gRPC 对外提供带草稿/发布生命周期的 Realm CRUD

pub mod service;

// Re-export commonly used types
pub use realm_mgr_common::config::RealmMgrConfig;
pub use service::{RealmGrpcService, ServiceInfo, ServiceStatus};
