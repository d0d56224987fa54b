//! gRPC 请求校验
//!
//! 校验失败时返回 `invalid <Message>.<Field>: <reason>` 形式的消息，
//! 由 gRPC 层以 `INVALID_ARGUMENT` 返回给调用方。

use realm_mgr_proto::realm_mgr::v1::{
    CreateRealmRequest, GetRealmRequest, Realm, ReleaseRealmRequest, UpdateRealmRequest,
};
use thiserror::Error;
use uuid::Uuid;

/// 请求校验错误
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {message}.{field}: {reason}")]
pub struct ValidationError {
    pub message: &'static str,
    pub field: &'static str,
    pub reason: String,
}

impl ValidationError {
    fn new(message: &'static str, field: &'static str, reason: impl Into<String>) -> Self {
        Self {
            message,
            field,
            reason: reason.into(),
        }
    }
}

pub trait Validate {
    fn validate(&self) -> Result<(), ValidationError>;
}

/// 只接受 8-4-4-4-12 带连字符的格式
fn is_uuid(value: &str) -> bool {
    value.len() == 36 && Uuid::parse_str(value).is_ok()
}

fn check_uuid(message: &'static str, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if is_uuid(value) {
        Ok(())
    } else {
        Err(ValidationError::new(
            message,
            field,
            "value must be a valid UUID | caused by: invalid uuid format",
        ))
    }
}

fn check_not_empty(message: &'static str, field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.chars().count() < 1 {
        Err(ValidationError::new(
            message,
            field,
            "value length must be at least 1 runes",
        ))
    } else {
        Ok(())
    }
}

impl Validate for Realm {
    fn validate(&self) -> Result<(), ValidationError> {
        check_uuid("Realm", "Id", &self.id)?;
        check_not_empty("Realm", "Name", &self.name)
    }
}

impl Validate for GetRealmRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_uuid("GetRealmRequest", "Id", &self.id)
    }
}

impl Validate for CreateRealmRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_not_empty("CreateRealmRequest", "Name", &self.name)
    }
}

impl Validate for ReleaseRealmRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        check_uuid("ReleaseRealmRequest", "Id", &self.id)
    }
}

impl Validate for UpdateRealmRequest {
    fn validate(&self) -> Result<(), ValidationError> {
        let realm = self
            .realm
            .as_ref()
            .ok_or_else(|| ValidationError::new("UpdateRealmRequest", "Realm", "value is required"))?;
        realm.validate().map_err(|e| {
            ValidationError::new(
                "UpdateRealmRequest",
                "Realm",
                format!("embedded message failed validation | caused by: {e}"),
            )
        })
    }
}
