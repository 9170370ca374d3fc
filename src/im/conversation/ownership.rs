//! 消息归属判断
//!
//! 气泡方向和删除权限都只看 `sender == 本地用户 ID`。
//! 不属于当前两方的消息只记录警告，不做任何纠正。

use crate::im::message::Message;
use tracing::warn;

pub fn is_own_message(message: &Message, local_user_id: &str) -> bool {
    message.is_from(local_user_id)
}

/// 检查历史消息的发送/接收方是否都属于当前会话的两方，返回异常条数
pub fn flag_foreign_participants(
    messages: &[Message],
    local_user_id: &str,
    counterpart_id: &str,
) -> usize {
    let belongs = |id: &str| id == local_user_id || id == counterpart_id;
    let mut foreign = 0;
    for m in messages {
        if !belongs(&m.sender) || !belongs(&m.receiver) {
            foreign += 1;
            warn!(
                "[Pane] ⚠️ 消息 {} 的参与方 ({} -> {}) 与当前会话 ({} <-> {}) 不一致",
                m.id, m.sender, m.receiver, local_user_id, counterpart_id
            );
        }
    }
    foreign
}
