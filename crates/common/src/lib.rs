//! realm-mgr 公共组件
//!
//! 进程级配置（TOML）的定义、加载与校验

pub mod config;

pub use config::{BindConfig, GrpcBindConfig, LogConfig, ObservabilityConfig, RealmMgrConfig};
