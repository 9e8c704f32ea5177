//! 同步模块 - 本地缓存与服务端的收敛
//!
//! 职责划分：
//! - CursorStore：household -> 游标映射的持久化（无游标 = 从未同步）
//! - SyncRemote：鉴权 API 边界 trait（快照 / 变更流 / 推送 / 位置树）
//! - applier：单条变更日志应用到本地镜像（穷尽 match 分发）
//! - SyncEngine：bootstrap（全量）与增量两种对账策略 + outbox 上行
//! - SyncCoordinator：只决定「是否 / 何时」同步（防抖、节流、单飞行）
//!
//! Engine 不做重试：失败即返，游标不推进，下一个自然触发点恢复。

pub mod applier;
pub mod coordinator;
pub mod cursor_store;
pub mod engine;
pub mod remote;

pub use coordinator::{CoordinatorConfig, SyncCoordinator, SyncOutcome, SyncReason};
pub use cursor_store::CursorStore;
pub use engine::SyncEngine;
pub use remote::SyncRemote;
