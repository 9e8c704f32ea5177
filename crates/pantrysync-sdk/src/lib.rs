//! PantrySync SDK - 离线优先的家庭库存同步客户端
//!
//! 核心理念：本地镜像是唯一读源，写入先落本地再异步上行；
//! 服务端变更日志是权威顺序，客户端凭游标增量对账。
//!
//! 模块划分：
//! - storage: 本地缓存（SQLite 镜像表 + sled 小状态）与 outbox
//! - sync: 游标存储、变更应用、同步引擎、同步协调器
//! - sdk: PantrySync 门面（初始化、写路径、同步触发）
//!
//! 使用方式：
//! ```ignore
//! let config = PantryConfig::new("/data/pantry", household_id);
//! let sdk = PantrySync::initialize(config, remote).await?;
//! sdk.bootstrap().await?;
//! sdk.create_inventory_item("p-1", "l-1", 2.0, None, None).await?;
//! ```

pub mod error;
pub mod sdk;
pub mod storage;
pub mod sync;

pub use error::{PantrySyncError, Result};
pub use sdk::{PantryConfig, PantrySync};
pub use storage::{GroceryItem, Household, InventoryItem, Location, Product, StorageManager};
pub use sync::{
    CoordinatorConfig, CursorStore, SyncCoordinator, SyncEngine, SyncOutcome, SyncReason,
    SyncRemote,
};
