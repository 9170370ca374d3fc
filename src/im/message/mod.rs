//! 消息模块
//!
//! 消息模型、请求体以及消息相关的 HTTP API

pub mod api;
pub mod models;
pub mod types;

// 重新导出主要类型
pub use api::MessageApi;
pub use models::Message;
pub use types::SendMessageRequest;
