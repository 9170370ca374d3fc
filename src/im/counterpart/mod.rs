//! 联系人（会话对象）模块
//!
//! 拉取当前角色可以聊天的供应商和保险公司列表

pub mod api;
pub mod models;
pub mod service;
pub mod types;

// 重新导出主要类型
pub use api::CounterpartApi;
pub use models::{Counterpart, CounterpartDirectory, CounterpartKind};
pub use service::CounterpartLoader;
pub use types::{CompanyRecord, VendorRecord};
