//! 消息 API DTO

use serde::Serialize;

/// 发送消息请求体：`{ receiverId, text }`
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub receiver_id: String,
    pub text: String,
}
