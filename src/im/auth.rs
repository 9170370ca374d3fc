//! 本地身份与会话存储
//!
//! 登录成功后写入会话文件，运行期间只读，登出时清除。
//! 聊天面板拿到的是 `SessionSnapshot`，不会在运行中被修改。

use crate::im::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::RwLock;
use tracing::{debug, info, warn};

/// 控制台角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Admin,
    Vendor,
    InsuranceCompany,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Role::Admin => "admin",
            Role::Vendor => "vendor",
            Role::InsuranceCompany => "insurance",
        };
        f.write_str(s)
    }
}

impl FromStr for Role {
    type Err = ChatError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Role::Admin),
            "vendor" => Ok(Role::Vendor),
            "insurance" | "company" | "insurancecompany" | "insurance-company" => {
                Ok(Role::InsuranceCompany)
            }
            other => Err(ChatError::Config(format!("未知角色: {}", other))),
        }
    }
}

/// 当前登录用户
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalIdentity {
    pub user_id: String,
    pub role: Role,
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default)]
    pub display_name: Option<String>,
}

impl LocalIdentity {
    pub fn new(user_id: impl Into<String>, role: Role) -> Self {
        Self {
            user_id: user_id.into(),
            role,
            token: None,
            display_name: None,
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }
}

/// 会话只读快照
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionSnapshot {
    identity: LocalIdentity,
}

impl SessionSnapshot {
    pub fn new(identity: LocalIdentity) -> Self {
        Self { identity }
    }

    pub fn user_id(&self) -> &str {
        &self.identity.user_id
    }

    pub fn role(&self) -> Role {
        self.identity.role
    }

    pub fn display_name(&self) -> Option<&str> {
        self.identity.display_name.as_deref()
    }

    /// 请求前置条件：没有 token 直接失败，不再发出注定失败的请求
    pub fn require_token(&self) -> Result<&str> {
        match self.identity.token.as_deref() {
            Some(t) if !t.trim().is_empty() => Ok(t),
            _ => Err(ChatError::Unauthorized(format!(
                "用户 {} 没有可用的 token",
                self.identity.user_id
            ))),
        }
    }
}

/// 会话文件（JSON）读写
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn load(&self) -> Result<Option<LocalIdentity>> {
        if !self.path.exists() {
            debug!("[Session] 会话文件不存在: {}", self.path.display());
            return Ok(None);
        }
        let text = std::fs::read_to_string(&self.path)
            .map_err(|e| ChatError::Session(format!("读取 {} 失败: {}", self.path.display(), e)))?;
        let identity: LocalIdentity = serde_json::from_str(&text)
            .map_err(|e| ChatError::Session(format!("解析 {} 失败: {}", self.path.display(), e)))?;
        debug!(
            "[Session] 读取会话，用户ID: {}, 角色: {}",
            identity.user_id, identity.role
        );
        Ok(Some(identity))
    }

    pub fn save(&self, identity: &LocalIdentity) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ChatError::Session(format!("创建目录 {} 失败: {}", parent.display(), e))
                })?;
            }
        }
        let text = serde_json::to_string_pretty(identity)?;
        std::fs::write(&self.path, text)
            .map_err(|e| ChatError::Session(format!("写入 {} 失败: {}", self.path.display(), e)))
    }

    pub fn clear(&self) -> Result<()> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ChatError::Session(format!(
                "删除 {} 失败: {}",
                self.path.display(),
                e
            ))),
        }
    }
}

/// 进程内会话：登录时写入，全程只读，登出时清除
pub struct Session {
    store: SessionStore,
    current: RwLock<Option<LocalIdentity>>,
}

impl Session {
    /// 从会话文件恢复（文件不存在时为未登录状态）
    pub fn restore(store: SessionStore) -> Result<Self> {
        let current = store.load()?;
        if let Some(ref id) = current {
            info!("[Session] 🔐 已恢复会话，用户ID: {}", id.user_id);
        }
        Ok(Self {
            store,
            current: RwLock::new(current),
        })
    }

    pub fn login(&self, identity: LocalIdentity) -> Result<SessionSnapshot> {
        self.store.save(&identity)?;
        info!(
            "[Session] ✅ 登录，用户ID: {}, 角色: {}",
            identity.user_id, identity.role
        );
        let snapshot = SessionSnapshot::new(identity.clone());
        match self.current.write() {
            Ok(mut guard) => *guard = Some(identity),
            Err(poisoned) => *poisoned.into_inner() = Some(identity),
        }
        Ok(snapshot)
    }

    pub fn snapshot(&self) -> Option<SessionSnapshot> {
        let guard = match self.current.read() {
            Ok(g) => g,
            Err(poisoned) => {
                warn!("[Session] 会话锁已中毒，继续读取");
                poisoned.into_inner()
            }
        };
        guard.clone().map(SessionSnapshot::new)
    }

    pub fn logout(&self) -> Result<()> {
        match self.current.write() {
            Ok(mut guard) => *guard = None,
            Err(poisoned) => *poisoned.into_inner() = None,
        }
        self.store.clear()?;
        info!("[Session] 👋 已登出");
        Ok(())
    }
}
