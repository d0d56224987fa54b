//! Realm 服务错误定义
//!
//! 错误按类别（[`ErrorKind`]）划分：NotFound / InvalidArgument / Internal / Unknown。
//! 用例层只返回带类别的错误，gRPC 层据此映射状态码。

use thiserror::Error;

pub const CANNOT_BE_NIL: &str = "cannot be nil";
pub const CANNOT_BE_BLANK: &str = "cannot be blank";

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Realm 服务错误类型
#[derive(Error, Debug)]
pub enum RealmError {
    /// 资源不存在（包括已被标记为 Deleted 的记录）
    #[error("not found error occurred: {0}")]
    NotFound(String),

    /// 无效的请求参数
    #[error("an invalid argument error occurred: argument {arg} {msg}")]
    InvalidArgument { arg: String, msg: String },

    /// 内部错误，原因只记录在服务端
    #[error("an internal error occurred: {message}")]
    Internal {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// 枚举映射失配等防御性错误
    #[error("an unknown error occurred: {0}")]
    Unknown(String),

    /// 事务已提交或已回滚
    #[error("transaction has already been committed or rolled back")]
    TransactionDone,

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 数据库错误
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// 错误类别
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    NotFound,
    InvalidArgument,
    Internal,
    Unknown,
}

impl RealmError {
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn invalid_argument(arg: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::InvalidArgument {
            arg: arg.into(),
            msg: msg.into(),
        }
    }

    /// 包装底层错误为内部错误
    pub fn internal<E>(message: impl Into<String>, source: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Internal {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// 不带底层原因的内部错误
    pub fn internal_msg(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
            source: None,
        }
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::Unknown(message.into())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::InvalidArgument { .. } => ErrorKind::InvalidArgument,
            Self::Unknown(_) => ErrorKind::Unknown,
            Self::Internal { .. }
            | Self::TransactionDone
            | Self::Config(_)
            | Self::Database(_) => ErrorKind::Internal,
        }
    }

    /// 错误本身或其原因链中是否存在 `Unknown` 错误
    ///
    /// 用例层会把仓储返回的 `Unknown` 包装为 `Internal`，日志需要据此区分。
    pub fn is_unknown(&self) -> bool {
        let mut current: Option<&(dyn std::error::Error + 'static)> = Some(self);
        while let Some(err) = current {
            if let Some(RealmError::Unknown(_)) = err.downcast_ref::<RealmError>() {
                return true;
            }
            current = err.source();
        }
        false
    }

    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// 是否为"事务已结束"错误（回滚时视为无害）
    pub fn is_transaction_done(&self) -> bool {
        matches!(self, Self::TransactionDone)
    }
}

/// Realm 结果类型别名
pub type RealmResult<T> = Result<T, RealmError>;
