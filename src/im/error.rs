//! 聊天 SDK 错误类型
//!
//! 所有后端调用的失败都会被归类为 `ChatError`，会话面板据此决定展示状态。

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChatError {
    /// 网络/传输层失败
    #[error("网络错误: {0}")]
    Network(String),

    #[error("请求超时: {0}")]
    Timeout(String),

    /// token 缺失、过期或被服务器拒绝（401/403）
    #[error("未授权: {0}")]
    Unauthorized(String),

    /// 客户端校验失败（空消息、未选择联系人等）
    #[error("参数校验失败: {0}")]
    Validation(String),

    #[error("资源不存在: {0}")]
    NotFound(String),

    /// 只能删除自己发送的消息（仅 UI 层约束，真正的鉴权在服务端）
    #[error("无权操作: {0}")]
    NotPermitted(String),

    #[error("服务器错误 {status}: {body}")]
    Server { status: u16, body: String },

    #[error("反序列化响应失败: {0}")]
    Decode(String),

    #[error("会话存储错误: {0}")]
    Session(String),

    #[error("配置错误: {0}")]
    Config(String),
}

/// 展示层使用的稳定错误分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Network,
    Timeout,
    Unauthorized,
    Validation,
    NotFound,
    NotPermitted,
    Server,
    Decode,
    Session,
    Config,
}

impl ChatError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ChatError::Network(_) => ErrorKind::Network,
            ChatError::Timeout(_) => ErrorKind::Timeout,
            ChatError::Unauthorized(_) => ErrorKind::Unauthorized,
            ChatError::Validation(_) => ErrorKind::Validation,
            ChatError::NotFound(_) => ErrorKind::NotFound,
            ChatError::NotPermitted(_) => ErrorKind::NotPermitted,
            ChatError::Server { .. } => ErrorKind::Server,
            ChatError::Decode(_) => ErrorKind::Decode,
            ChatError::Session(_) => ErrorKind::Session,
            ChatError::Config(_) => ErrorKind::Config,
        }
    }

    /// 用户手动重试有意义的错误（SDK 本身从不自动重试）
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ChatError::Network(_) | ChatError::Timeout(_) | ChatError::Server { .. }
        )
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, ChatError::NotFound(_))
    }

    /// 根据 HTTP 状态码归类非 2xx 响应
    pub fn from_status(status: reqwest::StatusCode, body: String) -> Self {
        match status.as_u16() {
            401 | 403 => ChatError::Unauthorized(format!("HTTP {}: {}", status, body)),
            404 => ChatError::NotFound(body),
            code => ChatError::Server { status: code, body },
        }
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChatError::Timeout(e.to_string())
        } else if e.is_decode() {
            ChatError::Decode(e.to_string())
        } else if let Some(status) = e.status() {
            ChatError::from_status(status, e.to_string())
        } else {
            ChatError::Network(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ChatError {
    fn from(e: serde_json::Error) -> Self {
        ChatError::Decode(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ChatError>;
