//! 消息 HTTP API 客户端
//!
//! 负责历史消息拉取、发送和删除

use crate::im::client::ClientConfig;
use crate::im::error::{ChatError, Result};
use crate::im::message::models::Message;
use crate::im::message::types::SendMessageRequest;
use crate::im::types::{
    expect_list, handle_empty_response, handle_http_response, parse_all, read_json_body,
};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// 消息相关的 HTTP API 客户端
pub struct MessageApi {
    client: reqwest::Client,
    config: ClientConfig,
    user_id: String,
}

impl MessageApi {
    /// `client` 应该已经在外部配置好认证头
    pub fn new(client: reqwest::Client, config: ClientConfig, user_id: String) -> Self {
        Self {
            client,
            config,
            user_id,
        }
    }

    /// 拉取与某个联系人的完整历史消息（接口没有分页）
    pub async fn get_history(&self, counterpart_id: &str) -> Result<Vec<Message>> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.config.endpoint_segments(&["chat", counterpart_id])?;

        debug!("[ChatAPI] 📡 请求历史消息，联系人: {}", counterpart_id);
        debug!(
            "[ChatAPI]   请求URL: {}, 用户ID: {}, 操作ID: {}",
            url, self.user_id, operation_id
        );

        let response = self
            .client
            .get(&url)
            .header("operationID", &operation_id)
            .send()
            .await?;

        let value = read_json_body(response, "历史消息").await?;
        // 任何一条解析失败都视为本次拉取失败，保留面板上一次的列表
        let messages: Vec<Message> = parse_all(expect_list(value, "历史消息")?, "历史消息")?;

        if messages.len() > self.config.history_warn_threshold {
            warn!(
                "[ChatAPI] ⚠️ 联系人 {} 的历史消息有 {} 条，接口不分页，每次都会全量拉取",
                counterpart_id,
                messages.len()
            );
        }
        debug!(
            "[ChatAPI] ✅ 历史消息响应，联系人: {}, 条数: {}",
            counterpart_id,
            messages.len()
        );
        Ok(messages)
    }

    /// 发送消息，返回服务器创建的消息对象
    pub async fn send(&self, path: &str, request: &SendMessageRequest) -> Result<Message> {
        if request.text.trim().is_empty() {
            return Err(ChatError::Validation("消息内容不能为空".to_string()));
        }
        let operation_id = Uuid::new_v4().to_string();
        let url = self.config.endpoint(path);

        info!(
            "[ChatAPI] 📤 发送消息，接收者: {}, 长度: {}",
            request.receiver_id,
            request.text.chars().count()
        );
        debug!("[ChatAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .post(&url)
            .header("Content-Type", "application/json")
            .header("operationID", &operation_id)
            .json(request)
            .send()
            .await?;

        let message: Message = handle_http_response(response, "发送消息").await?;
        info!("[ChatAPI] ✅ 消息已创建: {}", message.id);
        Ok(message)
    }

    /// 按 ID 删除消息
    pub async fn delete(&self, message_id: &str) -> Result<()> {
        let operation_id = Uuid::new_v4().to_string();
        let url = self.config.endpoint_segments(&["message", message_id])?;

        info!("[ChatAPI] 🗑️ 删除消息: {}", message_id);
        debug!("[ChatAPI]   请求URL: {}, 操作ID: {}", url, operation_id);

        let response = self
            .client
            .delete(&url)
            .header("operationID", &operation_id)
            .send()
            .await?;

        handle_empty_response(response, "删除消息").await
    }
}
