//! Realm 用例层
//!
//! 每个用例都是无状态单元结构体，接收 `(仓储句柄集合, 输入)` 并返回结果 Realm。
//! 仓储句柄由执行器按调用创建，绑定到同一个事务；用例本身不做提交或回滚。
//!
//! - [`CreateRealm`]: 创建 Draft
//! - [`GetRealm`]: 按 id + 状态查询，Deleted 记录视为不存在
//! - [`ReleaseRealm`]: Draft -> Active（首次发布或合并到已有 Active）
//! - [`UpdateRealm`]: 将修改暂存到 Draft

mod create;
mod get;
mod release;
mod update;

pub use create::{CreateRealm, CreateRealmInput, CreateRealmRepos};
pub use get::{GetRealm, GetRealmInput, GetRealmRepos};
pub use release::{ReleaseRealm, ReleaseRealmInput, ReleaseRealmRepos};
pub use update::{UpdateRealm, UpdateRealmInput, UpdateRealmRepos};
