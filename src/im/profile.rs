//! 角色配置
//!
//! 管理员、供应商、保险公司三种聊天界面只是常量不同，这里用一个配置记录描述差异。

use crate::im::auth::Role;
use crate::im::client::DEFAULT_POLL_INTERVAL;
use crate::im::counterpart::Counterpart;
use std::time::Duration;

/// 管理员端和供应商端的发送路径
pub const SEND_PATH: &str = "send";

/// 保险公司端的发送路径
pub const CHAT_SEND_PATH: &str = "chat/send";

/// 历史消息刷新方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// 仅在切换联系人（或显式刷新）时拉取
    OnDemand,
    /// 打开会话期间按固定间隔拉取
    Polling { interval: Duration },
}

/// 需要加载哪些联系人列表
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DirectoryScope {
    pub vendors: bool,
    pub companies: bool,
}

impl DirectoryScope {
    pub const NONE: DirectoryScope = DirectoryScope {
        vendors: false,
        companies: false,
    };

    pub const ALL: DirectoryScope = DirectoryScope {
        vendors: true,
        companies: true,
    };

    pub fn is_empty(&self) -> bool {
        !self.vendors && !self.companies
    }
}

/// 单个参数化聊天组件的配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatProfile {
    pub role: Role,
    pub directory: DirectoryScope,
    pub send_path: String,
    /// 固定接收者（非管理员角色只能和管理员聊天）
    pub fixed_receiver: Option<Counterpart>,
    pub sync_mode: SyncMode,
}

impl ChatProfile {
    /// 管理员：可以和所有供应商、保险公司聊天，按需刷新
    pub fn admin() -> Self {
        Self {
            role: Role::Admin,
            directory: DirectoryScope::ALL,
            send_path: SEND_PATH.to_string(),
            fixed_receiver: None,
            sync_mode: SyncMode::OnDemand,
        }
    }

    /// 供应商：固定和管理员聊天，按需刷新
    pub fn vendor(admin_id: impl Into<String>) -> Self {
        Self {
            role: Role::Vendor,
            directory: DirectoryScope::NONE,
            send_path: SEND_PATH.to_string(),
            fixed_receiver: Some(Counterpart::admin(admin_id)),
            sync_mode: SyncMode::OnDemand,
        }
    }

    /// 保险公司：固定和管理员聊天，走 `/chat/send`，每 2 秒轮询
    pub fn insurance(admin_id: impl Into<String>) -> Self {
        Self {
            role: Role::InsuranceCompany,
            directory: DirectoryScope::NONE,
            send_path: CHAT_SEND_PATH.to_string(),
            fixed_receiver: Some(Counterpart::admin(admin_id)),
            sync_mode: SyncMode::Polling {
                interval: DEFAULT_POLL_INTERVAL,
            },
        }
    }

    /// 按角色选择预设；非管理员角色需要管理员 ID
    pub fn for_role(role: Role, admin_id: Option<&str>) -> Option<Self> {
        match role {
            Role::Admin => Some(Self::admin()),
            Role::Vendor => admin_id.map(Self::vendor),
            Role::InsuranceCompany => admin_id.map(Self::insurance),
        }
    }

    pub fn with_sync_mode(mut self, mode: SyncMode) -> Self {
        self.sync_mode = mode;
        self
    }

    /// 覆盖轮询间隔（只对轮询模式生效）
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        if let SyncMode::Polling { .. } = self.sync_mode {
            self.sync_mode = SyncMode::Polling { interval };
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_capture_role_differences() {
        let admin = ChatProfile::admin();
        assert_eq!(admin.directory, DirectoryScope::ALL);
        assert!(admin.fixed_receiver.is_none());
        assert_eq!(admin.sync_mode, SyncMode::OnDemand);

        let vendor = ChatProfile::vendor("Admin-1");
        assert!(vendor.directory.is_empty());
        assert_eq!(vendor.send_path, "send");
        assert_eq!(vendor.fixed_receiver.as_ref().unwrap().chat_id, "Admin-1");

        let insurance = ChatProfile::insurance("Admin-1");
        assert_eq!(insurance.send_path, "chat/send");
        assert_eq!(
            insurance.sync_mode,
            SyncMode::Polling {
                interval: Duration::from_secs(2)
            }
        );
    }

    #[test]
    fn poll_interval_override_only_touches_polling_profiles() {
        let p = ChatProfile::insurance("A").with_poll_interval(Duration::from_secs(5));
        assert_eq!(
            p.sync_mode,
            SyncMode::Polling {
                interval: Duration::from_secs(5)
            }
        );
        let a = ChatProfile::admin().with_poll_interval(Duration::from_secs(5));
        assert_eq!(a.sync_mode, SyncMode::OnDemand);
        assert!(ChatProfile::for_role(Role::Vendor, None).is_none());
    }
}
