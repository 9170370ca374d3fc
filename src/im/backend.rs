//! 聊天后端抽象
//!
//! 会话面板只依赖 `ChatBackend`，生产环境使用基于 reqwest 的 `HttpChatBackend`。

use crate::im::auth::SessionSnapshot;
use crate::im::client::{build_http_client, ClientConfig};
use crate::im::counterpart::{Counterpart, CounterpartApi};
use crate::im::error::Result;
use crate::im::message::{Message, MessageApi, SendMessageRequest};
use async_trait::async_trait;

#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// `GET /allvendor`
    async fn list_vendors(&self) -> Result<Vec<Counterpart>>;

    /// `GET /getAllCompany`
    async fn list_companies(&self) -> Result<Vec<Counterpart>>;

    /// `GET /chat/:counterpartId`
    async fn fetch_history(&self, counterpart_id: &str) -> Result<Vec<Message>>;

    /// `POST <send_path>`，返回服务器创建的消息
    async fn send_message(&self, send_path: &str, request: &SendMessageRequest) -> Result<Message>;

    /// `DELETE /message/:messageId`
    async fn delete_message(&self, message_id: &str) -> Result<()>;
}

/// 基于 REST 接口的后端实现
pub struct HttpChatBackend {
    counterparts: CounterpartApi,
    messages: MessageApi,
}

impl HttpChatBackend {
    /// 用当前会话的 token 创建后端；没有 token 直接失败
    pub fn connect(config: &ClientConfig, session: &SessionSnapshot) -> Result<Self> {
        config.validate()?;
        let http_client = build_http_client(config, session)?;
        Ok(Self {
            counterparts: CounterpartApi::new(http_client.clone(), config.clone()),
            messages: MessageApi::new(http_client, config.clone(), session.user_id().to_string()),
        })
    }
}

#[async_trait]
impl ChatBackend for HttpChatBackend {
    async fn list_vendors(&self) -> Result<Vec<Counterpart>> {
        self.counterparts.get_vendors().await
    }

    async fn list_companies(&self) -> Result<Vec<Counterpart>> {
        self.counterparts.get_companies().await
    }

    async fn fetch_history(&self, counterpart_id: &str) -> Result<Vec<Message>> {
        self.messages.get_history(counterpart_id).await
    }

    async fn send_message(&self, send_path: &str, request: &SendMessageRequest) -> Result<Message> {
        self.messages.send(send_path, request).await
    }

    async fn delete_message(&self, message_id: &str) -> Result<()> {
        self.messages.delete(message_id).await
    }
}
