//! Realm 状态及其持久化映射
//!
//! 状态与数据库字符串之间的双向映射表在首次使用时构建一次，
//! 反向表由正向表推导。未映射的值返回 [`RealmError::Unknown`]。

use crate::error::{RealmError, RealmResult};
use once_cell::sync::Lazy;
use std::collections::HashMap;
use strum::{Display, EnumIter};

/// Realm 生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum RealmStatus {
    Active,
    Draft,
    Disabled,
    Deleted,
}

static STORAGE_VALUES: Lazy<HashMap<RealmStatus, &'static str>> = Lazy::new(|| {
    HashMap::from([
        (RealmStatus::Active, "active"),
        (RealmStatus::Draft, "draft"),
        (RealmStatus::Disabled, "disabled"),
        (RealmStatus::Deleted, "deleted"),
    ])
});

static STORAGE_STATUSES: Lazy<HashMap<&'static str, RealmStatus>> =
    Lazy::new(|| STORAGE_VALUES.iter().map(|(k, v)| (*v, *k)).collect());

impl RealmStatus {
    /// 转换为数据库中存储的字符串
    pub fn to_storage(self) -> RealmResult<&'static str> {
        STORAGE_VALUES
            .get(&self)
            .copied()
            .ok_or_else(|| RealmError::unknown(format!("unexpected status type: {self}")))
    }

    /// 从数据库字符串解析
    pub fn from_storage(value: &str) -> RealmResult<Self> {
        STORAGE_STATUSES
            .get(value)
            .copied()
            .ok_or_else(|| RealmError::unknown(format!("unexpected status type: {value}")))
    }
}
