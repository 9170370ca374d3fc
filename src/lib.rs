pub mod im;

// 重新导出常用类型和函数，方便外部使用
pub use im::{
    auth::{LocalIdentity, Role, Session, SessionSnapshot, SessionStore},
    backend::{ChatBackend, HttpChatBackend},
    client::ClientConfig,
    conversation::{render_pane, ConversationPane, PaneListener, PaneState, PaneView},
    counterpart::{Counterpart, CounterpartDirectory, CounterpartLoader},
    error::{ChatError, ErrorKind},
    message::Message,
    profile::{ChatProfile, SyncMode},
};
