//! 存储后端配置
//!
//! 定义各种存储后端的配置结构

use serde::{Deserialize, Serialize};

/// 数据库配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// 存储后端类型
    #[serde(default)]
    pub backend: StorageBackend,

    /// SQLite 配置（当 backend = "sqlite" 时必需）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite: Option<SqliteConfig>,

    /// PostgreSQL 配置（当 backend = "postgres" 时必需）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub postgres: Option<PostgresConfig>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            sqlite: Some(SqliteConfig::default()),
            postgres: None,
        }
    }
}

/// 存储后端类型枚举
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// SQLite 数据库
    #[default]
    Sqlite,
    /// PostgreSQL 数据库
    Postgres,
    /// 进程内存储，重启后数据丢失
    Memory,
}

/// SQLite 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqliteConfig {
    /// 数据库文件路径
    pub path: String,

    /// 连接池大小
    #[serde(default = "default_sqlite_pool_size")]
    pub pool_size: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: "database/realm-mgr.db".to_string(),
            pool_size: default_sqlite_pool_size(),
        }
    }
}

fn default_sqlite_pool_size() -> u32 {
    10
}

/// PostgreSQL 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostgresConfig {
    /// 数据库主机地址
    pub host: String,

    /// 数据库端口
    pub port: u16,

    /// 数据库名称
    pub database: String,

    /// 用户名
    pub username: String,

    /// 密码
    pub password: String,

    /// SSL 模式（disable / prefer / require）
    #[serde(default = "default_ssl_mode")]
    pub ssl_mode: String,

    /// 连接池大小
    #[serde(default = "default_postgres_pool_size")]
    pub pool_size: u32,

    /// 连接最大生命周期（秒）
    #[serde(default = "default_max_lifetime_secs")]
    pub max_lifetime_secs: u64,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            database: "realm_mgr".to_string(),
            username: "realm_mgr".to_string(),
            password: "".to_string(),
            ssl_mode: default_ssl_mode(),
            pool_size: default_postgres_pool_size(),
            max_lifetime_secs: default_max_lifetime_secs(),
        }
    }
}

fn default_ssl_mode() -> String {
    "disable".to_string()
}

fn default_postgres_pool_size() -> u32 {
    20
}

fn default_max_lifetime_secs() -> u64 {
    3600
}
