//! Realm ID 生成器

use crate::error::RealmResult;
use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

pub trait IdGenerator: Send + Sync {
    fn new_id(&self) -> RealmResult<Uuid>;
}

/// 随机 UUID v4 生成器
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidV4Generator;

impl IdGenerator for UuidV4Generator {
    fn new_id(&self) -> RealmResult<Uuid> {
        Ok(Uuid::new_v4())
    }
}

/// 顺序 ID 生成器，结果可预测
#[derive(Debug, Default)]
pub struct SequenceIdGenerator {
    next: AtomicU64,
}

impl SequenceIdGenerator {
    pub fn starting_at(first: u64) -> Self {
        Self {
            next: AtomicU64::new(first),
        }
    }
}

impl IdGenerator for SequenceIdGenerator {
    fn new_id(&self) -> RealmResult<Uuid> {
        Ok(Uuid::from_u128(u128::from(
            self.next.fetch_add(1, Ordering::SeqCst),
        )))
    }
}
