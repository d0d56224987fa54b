//! 统一配置管理
//!
//! realm-mgr 进程的全部配置项（实例信息、网络绑定、存储后端、日志）
//! 在这里定义并给出默认值。配置文件使用 TOML 格式。

pub mod bind;
pub mod observability;

pub use crate::config::bind::{BindConfig, GrpcBindConfig};
pub use crate::config::observability::{LogConfig, ObservabilityConfig};
use realm::storage::{DatabaseConfig, StorageBackend};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// realm-mgr 主配置
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RealmMgrConfig {
    /// 服务器实例名称
    ///
    /// 用于在多实例部署中区分节点，如 realm-mgr-01、realm-mgr-prod-east-1。
    pub name: String,

    /// 运行环境标识
    ///
    /// - "dev": 开发环境
    /// - "prod": 生产环境，启用更严格的检查
    /// - "test": 测试环境，用于自动化测试
    pub env: String,

    /// 网络绑定配置
    #[serde(default)]
    pub bind: BindConfig,

    /// 存储后端配置
    #[serde(default)]
    pub database: DatabaseConfig,

    /// 可观测性配置
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Default for RealmMgrConfig {
    fn default() -> Self {
        Self {
            name: "realm-mgr-default".to_string(),
            env: "dev".to_string(),
            bind: BindConfig::default(),
            database: DatabaseConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}

impl RealmMgrConfig {
    /// 从文件加载配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let path_ref = path.as_ref();

        if !path_ref.exists() {
            return Err(format!("Configuration file does not exist: {path_ref:?}").into());
        }

        if !path_ref.is_file() {
            return Err(format!("Path is not a valid file: {path_ref:?}").into());
        }

        let content = std::fs::read_to_string(path_ref)?;
        let config: RealmMgrConfig = toml::from_str(&content)?;

        Ok(config)
    }

    /// 从 TOML 字符串加载配置
    pub fn from_toml(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    /// 将配置序列化为 TOML 字符串
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string(self)
    }

    /// 返回可观测性配置引用
    pub fn observability_config(&self) -> &ObservabilityConfig {
        &self.observability
    }

    /// 验证配置有效性
    ///
    /// 以 "Warning:" 开头的条目是非致命提示，其余条目会阻止启动。
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.name.trim().is_empty() {
            errors.push("Instance name cannot be empty".to_string());
        }

        if !["dev", "prod", "test"].contains(&self.env.as_str()) {
            errors.push(format!(
                "Invalid environment '{}', must be one of: dev, prod, test",
                self.env
            ));
        }

        // 网络绑定
        let grpc = &self.bind.grpc;
        if grpc.socket_addr().is_err() {
            errors.push(format!(
                "Invalid gRPC bind address '{}:{}' (bind.grpc.ip)",
                grpc.ip, grpc.port
            ));
        }
        if grpc.port < 1024 {
            errors.push(format!(
                "Invalid gRPC port {} (bind.grpc.port), must be >= 1024",
                grpc.port
            ));
        }

        // 存储后端
        match self.database.backend {
            StorageBackend::Sqlite => match &self.database.sqlite {
                Some(sqlite) => {
                    if sqlite.path.trim().is_empty() {
                        errors.push("SQLite path cannot be empty (database.sqlite.path)".to_string());
                    }
                    if sqlite.pool_size == 0 {
                        errors.push(
                            "SQLite pool size must be greater than 0 (database.sqlite.pool_size)"
                                .to_string(),
                        );
                    }
                }
                None => errors.push(
                    "Database backend is 'sqlite' but [database.sqlite] is missing".to_string(),
                ),
            },
            StorageBackend::Postgres => match &self.database.postgres {
                Some(postgres) => {
                    if postgres.host.trim().is_empty() {
                        errors.push(
                            "PostgreSQL host cannot be empty (database.postgres.host)".to_string(),
                        );
                    }
                    if postgres.database.trim().is_empty() {
                        errors.push(
                            "PostgreSQL database cannot be empty (database.postgres.database)"
                                .to_string(),
                        );
                    }
                    if postgres.pool_size == 0 {
                        errors.push(
                            "PostgreSQL pool size must be greater than 0 (database.postgres.pool_size)"
                                .to_string(),
                        );
                    }
                    if !["disable", "prefer", "require"].contains(&postgres.ssl_mode.as_str()) {
                        errors.push(format!(
                            "Invalid PostgreSQL ssl_mode '{}', must be one of: disable, prefer, require",
                            postgres.ssl_mode
                        ));
                    }
                }
                None => errors.push(
                    "Database backend is 'postgres' but [database.postgres] is missing"
                        .to_string(),
                ),
            },
            StorageBackend::Memory => {}
        }

        // 过滤级别（EnvFilter 语法）
        {
            let main_level = self
                .observability
                .filter_level
                .split(',')
                .next()
                .unwrap_or("")
                .trim();
            if !["trace", "debug", "info", "warn", "error"].contains(&main_level) {
                errors.push(format!(
                    "Invalid filter level '{}', must start with one of: trace, debug, info, warn, error",
                    self.observability.filter_level
                ));
            }
        }

        if !["console", "file"].contains(&self.observability.log.output.as_str()) {
            errors.push(format!(
                "Invalid log output '{}' (observability.log.output), must be 'console' or 'file'",
                self.observability.log.output
            ));
        }

        // 生产环境额外检查
        if self.env == "prod" {
            if self.database.backend == StorageBackend::Memory {
                errors.push("Warning: Production environment should not use the memory backend (database.backend = \"memory\"), data is lost on restart".to_string());
            }

            if self.observability.log.output == "console" {
                errors.push("Warning: Production environment should use file logging (observability.log.output = \"file\")".to_string());
            }

            if self.observability.log.output == "file" && !self.observability.log.rotate {
                errors.push("Warning: Production environment should enable log rotation (observability.log.rotate = true)".to_string());
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}
