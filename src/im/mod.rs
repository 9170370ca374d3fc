pub mod auth;
pub mod backend;
pub mod client;
pub mod conversation;
pub mod counterpart;
pub mod error;
pub mod message;
pub mod profile;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

// 重新导出会话面板相关类型
pub use conversation::{ConversationPane, PaneListener, PaneState, RefreshOutcome};
