//! 会话面板模块
//!
//! 一个参数化的聊天面板：历史同步、发送、删除、轮询和展示

pub mod listener;
pub mod ownership;
pub mod poller;
pub mod service;
pub mod state;
pub mod view;

// 重新导出主要类型和函数
pub use listener::{EmptyPaneListener, PaneListener};
pub use ownership::is_own_message;
pub use poller::PollHandle;
pub use service::{ConversationPane, RefreshOutcome};
pub use state::{LoadPhase, PaneSnapshot, PaneState};
pub use view::{render_directory, render_pane, Alignment, Bubble, PaneView};
