//! 会话面板监听器回调接口

use crate::im::conversation::state::PaneState;
use crate::im::message::Message;
use async_trait::async_trait;

/// 会话面板监听器
///
/// 回调在面板状态锁内按变更顺序触发，实现方不要在回调里同步调用面板方法
/// （需要时请 `tokio::spawn`）。
#[async_trait]
pub trait PaneListener: Send + Sync {
    /// 面板状态变化（未选择 / 加载中 / 已加载 / 失败）
    async fn on_state_changed(&self, state: PaneState);

    /// 消息列表被服务器数据整体替换
    async fn on_messages_replaced(&self, messages: Vec<Message>);

    /// 发送成功，追加了一条服务器返回的消息
    async fn on_message_appended(&self, message: Message);

    /// 服务器确认删除后移除了一条消息
    async fn on_message_removed(&self, message_id: String);

    /// 需要滚动到最新消息
    async fn on_scroll_to_latest(&self);
}

/// 空实现（默认监听器）
pub struct EmptyPaneListener;

#[async_trait]
impl PaneListener for EmptyPaneListener {
    async fn on_state_changed(&self, _state: PaneState) {}
    async fn on_messages_replaced(&self, _messages: Vec<Message>) {}
    async fn on_message_appended(&self, _message: Message) {}
    async fn on_message_removed(&self, _message_id: String) {}
    async fn on_scroll_to_latest(&self) {}
}
