//! 数据访问层 - 每张镜像表一个专门的操作模块

pub mod grocery;
pub mod household;
pub mod inventory;
pub mod location;
pub mod outbox;
pub mod product;

pub use grocery::GroceryDao;
pub use household::HouseholdDao;
pub use inventory::InventoryDao;
pub use location::LocationDao;
pub use outbox::OutboxDao;
pub use product::ProductDao;
