//! HTTP 客户端适配层
//!
//! 负责客户端配置，以及构建带认证头的 `reqwest::Client`。

use crate::im::auth::SessionSnapshot;
use crate::im::error::{ChatError, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, info};

/// 默认轮询间隔（保险公司端）
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(2);

/// 默认请求超时
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// 客户端配置
#[derive(Clone, Debug)]
pub struct ClientConfig {
    /// REST API 基础地址
    pub api_base_url: String,
    /// 图片资源基础地址
    pub image_base_url: String,
    /// 单个请求的超时时间
    pub request_timeout: Duration,
    /// 轮询模式下的刷新间隔
    pub poll_interval: Duration,
    /// 历史消息超过该条数时打印警告（接口没有分页）
    pub history_warn_threshold: usize,
    /// 会话文件路径
    pub session_path: PathBuf,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new("http://localhost:8000/api".to_string())
    }
}

impl ClientConfig {
    /// 创建默认配置
    pub fn new(api_base_url: String) -> Self {
        Self {
            api_base_url,
            image_base_url: "http://localhost:8000/uploads".to_string(),
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
            poll_interval: DEFAULT_POLL_INTERVAL,
            history_warn_threshold: 500,
            session_path: PathBuf::from("console-chat-session.json"),
        }
    }

    /// 在默认配置上叠加环境变量
    pub fn from_env() -> Result<Self> {
        let mut cfg = Self::default();
        if let Ok(v) = std::env::var("CONSOLE_CHAT_API_URL") {
            cfg.api_base_url = v;
        }
        if let Ok(v) = std::env::var("CONSOLE_CHAT_IMAGE_URL") {
            cfg.image_base_url = v;
        }
        if let Ok(v) = std::env::var("CONSOLE_CHAT_TIMEOUT_SECS") {
            cfg.request_timeout = Duration::from_secs(parse_secs("CONSOLE_CHAT_TIMEOUT_SECS", &v)?);
        }
        if let Ok(v) = std::env::var("CONSOLE_CHAT_POLL_SECS") {
            cfg.poll_interval = Duration::from_secs(parse_secs("CONSOLE_CHAT_POLL_SECS", &v)?);
        }
        if let Ok(v) = std::env::var("CONSOLE_CHAT_SESSION") {
            cfg.session_path = PathBuf::from(v);
        }
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn with_image_base_url(mut self, url: impl Into<String>) -> Self {
        self.image_base_url = url.into();
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    pub fn with_session_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.session_path = path.into();
        self
    }

    pub fn validate(&self) -> Result<()> {
        for (name, url) in [
            ("api_base_url", &self.api_base_url),
            ("image_base_url", &self.image_base_url),
        ] {
            if !(url.starts_with("http://") || url.starts_with("https://")) {
                return Err(ChatError::Config(format!(
                    "{} 不是合法的 http(s) 地址: {:?}",
                    name, url
                )));
            }
        }
        if self.poll_interval.is_zero() {
            return Err(ChatError::Config("poll_interval 不能为 0".to_string()));
        }
        if self.request_timeout.is_zero() {
            return Err(ChatError::Config("request_timeout 不能为 0".to_string()));
        }
        Ok(())
    }

    /// 拼接 API 地址（去掉多余的斜杠）
    pub fn endpoint(&self, path: &str) -> String {
        join_url(&self.api_base_url, path)
    }

    /// 在 API 地址后追加路径段，每段都会做百分号编码（ID 里的 `/`、`?`、`#` 不会改变路由）
    pub fn endpoint_segments(&self, segments: &[&str]) -> Result<String> {
        let mut url = reqwest::Url::parse(&self.api_base_url)
            .map_err(|e| ChatError::Config(format!("api_base_url 解析失败: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ChatError::Config(format!("api_base_url 不能追加路径: {}", self.api_base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url.to_string())
    }

    /// 解析图片资源地址；已经是完整 URL 的原样返回
    pub fn image_url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            join_url(&self.image_base_url, path)
        }
    }
}

fn parse_secs(name: &str, value: &str) -> Result<u64> {
    value
        .trim()
        .parse::<u64>()
        .map_err(|e| ChatError::Config(format!("{} 不是合法的秒数 {:?}: {}", name, value, e)))
}

fn join_url(base: &str, path: &str) -> String {
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// 创建带认证拦截器的 HTTP 客户端（token 通过 default_headers 自动添加）
///
/// 没有 token 时直接返回 `Unauthorized`，不会发出任何请求
pub fn build_http_client(config: &ClientConfig, session: &SessionSnapshot) -> Result<reqwest::Client> {
    let token = session.require_token()?;
    let mut headers = reqwest::header::HeaderMap::new();
    headers.insert(
        reqwest::header::AUTHORIZATION,
        reqwest::header::HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|e| ChatError::Unauthorized(format!("无效的 token: {}", e)))?,
    );
    headers.insert(
        reqwest::header::ACCEPT,
        reqwest::header::HeaderValue::from_static("application/json"),
    );

    let client = reqwest::ClientBuilder::new()
        .default_headers(headers)
        .timeout(config.request_timeout)
        .build()
        .map_err(|e| ChatError::Config(format!("创建 HTTP 客户端失败: {}", e)))?;

    info!(
        "[Client] 🔗 HTTP 客户端已就绪 (user={}, role={})",
        session.user_id(),
        session.role()
    );
    debug!(
        "[Client]   API: {}, 超时: {:?}",
        config.api_base_url, config.request_timeout
    );
    Ok(client)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::im::auth::{LocalIdentity, Role};

    #[test]
    fn endpoint_and_image_url_join_cleanly() {
        let cfg = ClientConfig::new("http://api.local/v1/".to_string())
            .with_image_base_url("http://cdn.local/img/");
        assert_eq!(cfg.endpoint("/chat/abc"), "http://api.local/v1/chat/abc");
        assert_eq!(cfg.endpoint("allvendor"), "http://api.local/v1/allvendor");
        assert_eq!(cfg.image_url("/frames/a.png"), "http://cdn.local/img/frames/a.png");
        assert_eq!(cfg.image_url("https://x.io/a.png"), "https://x.io/a.png");
    }

    #[test]
    fn endpoint_segments_escape_ids() {
        let cfg = ClientConfig::new("http://api.local/v1/".to_string());
        assert_eq!(
            cfg.endpoint_segments(&["chat", "Vendor-123"]).unwrap(),
            "http://api.local/v1/chat/Vendor-123"
        );
        assert_eq!(
            cfg.endpoint_segments(&["message", "a/b?c#d"]).unwrap(),
            "http://api.local/v1/message/a%2Fb%3Fc%23d"
        );
    }

    #[test]
    fn validate_rejects_bad_values() {
        assert!(ClientConfig::default().validate().is_ok());
        assert!(ClientConfig::new("localhost:8000".to_string()).validate().is_err());
        assert!(ClientConfig::default()
            .with_poll_interval(Duration::ZERO)
            .validate()
            .is_err());
    }

    #[test]
    fn http_client_requires_token() {
        let cfg = ClientConfig::default();
        let no_token = SessionSnapshot::new(LocalIdentity::new("Admin-1", Role::Admin));
        assert!(matches!(
            build_http_client(&cfg, &no_token),
            Err(ChatError::Unauthorized(_))
        ));

        let ok = SessionSnapshot::new(LocalIdentity::new("Admin-1", Role::Admin).with_token("abc"));
        assert!(build_http_client(&cfg, &ok).is_ok());
    }
}
