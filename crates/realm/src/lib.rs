//! Realm 生命周期服务核心
//!
//! Realm 是带有 Draft / Active / Disabled / Deleted 生命周期的命名实体。
//! 本 crate 提供：
//! 1. 仓储与事务会话管理（SQLite / PostgreSQL / 内存）
//! 2. Create / Get / Release / Update 用例及其执行器
//! 3. gRPC 服务实现与客户端
//!
//! 同一 id 同时最多存在一条 Active 和一条 Draft；数据变更与审计记录在同一事务中提交。

pub mod clock;
pub mod error;
pub mod executor;
pub mod grpc_client;
pub mod grpc_handlers;
pub mod id;
pub mod models;
pub mod status;
pub mod storage;
pub mod types;
pub mod usecases;
pub mod validation;

// Re-export commonly used items
pub use clock::{Clock, FixedClock, SystemClock};
pub use error::{ErrorKind, RealmError, RealmResult};
pub use executor::{RealmOps, RealmUseCaseExecutor, connect, connect_with};
pub use grpc_client::{GrpcClient, GrpcClientConfig};
pub use grpc_handlers::{RealmManagerApi, create_grpc_service};
pub use id::{IdGenerator, SequenceIdGenerator, UuidV4Generator};
pub use status::RealmStatus;
pub use storage::{DataStoreManager, DatabaseConfig, StorageBackend};
pub use types::{AuditAction, AuditEntry, Realm};
// Re-export proto types from realm-mgr-proto
pub use realm_mgr_proto::{RealmManagerService, RealmManagerServiceServer};
