//! protobuf 与领域类型之间的转换

use crate::error::{CANNOT_BE_NIL, RealmError, RealmResult};
use crate::status::RealmStatus;
use crate::types::Realm;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use realm_mgr_proto::realm_mgr::v1 as pb;
use std::collections::HashMap;
use uuid::Uuid;

/// 内部错误的统一对外消息
pub const INTERNAL_ERR_MSG: &str = "an internal error occurred";

static STATUS_ENUM_VALUES: Lazy<HashMap<RealmStatus, pb::EnumStatus>> = Lazy::new(|| {
    HashMap::from([
        (RealmStatus::Active, pb::EnumStatus::Active),
        (RealmStatus::Draft, pb::EnumStatus::Draft),
        (RealmStatus::Disabled, pb::EnumStatus::Disabled),
        (RealmStatus::Deleted, pb::EnumStatus::Deleted),
    ])
});

static STATUS_GRPC_VALUES: Lazy<HashMap<pb::EnumStatus, RealmStatus>> =
    Lazy::new(|| STATUS_ENUM_VALUES.iter().map(|(k, v)| (*v, *k)).collect());

pub fn status_to_proto(status: RealmStatus) -> RealmResult<pb::EnumStatus> {
    STATUS_ENUM_VALUES
        .get(&status)
        .copied()
        .ok_or_else(|| RealmError::unknown(format!("unexpected status type: {status}")))
}

/// `ENUM_STATUS_UNSPECIFIED` 没有对应的领域状态
pub fn status_from_proto(status: pb::EnumStatus) -> RealmResult<RealmStatus> {
    STATUS_GRPC_VALUES
        .get(&status)
        .copied()
        .ok_or_else(|| RealmError::unknown(format!("unexpected status type: {}", status.as_str_name())))
}

fn timestamp(t: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: t.timestamp(),
        nanos: t.timestamp_subsec_nanos() as i32,
    }
}

pub fn realm_to_proto(realm: &Realm) -> RealmResult<pb::Realm> {
    Ok(pb::Realm {
        id: realm.id.to_string(),
        name: realm.name.clone(),
        description: realm.description.clone(),
        status: status_to_proto(realm.status)? as i32,
        created_at: Some(timestamp(realm.created_at)),
        updated_at: Some(timestamp(realm.updated_at)),
    })
}

/// 将客户端提交的 Realm 转为领域对象
///
/// 只保留 id、name、description；状态固定为 Draft，时间戳由服务端决定。
pub fn realm_from_proto(realm: Option<&pb::Realm>) -> RealmResult<Realm> {
    let realm = realm.ok_or_else(|| RealmError::invalid_argument("realm", CANNOT_BE_NIL))?;
    let id = Uuid::parse_str(&realm.id).map_err(|_| {
        RealmError::invalid_argument(
            "realm",
            format!("ID was not a valid UUID: {}", realm.id),
        )
    })?;

    Ok(Realm {
        id,
        name: realm.name.clone(),
        description: realm.description.clone(),
        status: RealmStatus::Draft,
        created_at: DateTime::<Utc>::default(),
        updated_at: DateTime::<Utc>::default(),
        deleted_at: None,
    })
}
