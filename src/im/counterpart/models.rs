//! 联系人本地模型

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum CounterpartKind {
    Vendor,
    Company,
    Admin,
}

/// 会话对象（只读，生命周期与页面会话相同）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Counterpart {
    /// 记录 ID
    pub id: String,
    /// 聊天使用的用户 ID（消息的 sender/receiver）；记录没有 userId 时与 `id` 相同
    pub chat_id: String,
    pub display_name: String,
    pub email: String,
    pub kind: CounterpartKind,
}

impl Counterpart {
    /// 固定的管理员联系人（供应商端、保险公司端使用）
    pub fn admin(user_id: impl Into<String>) -> Self {
        let user_id = user_id.into();
        Self {
            id: user_id.clone(),
            chat_id: user_id,
            display_name: "Admin".to_string(),
            email: String::new(),
            kind: CounterpartKind::Admin,
        }
    }
}

impl fmt::Display for Counterpart {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.email.is_empty() {
            write!(f, "{}", self.display_name)
        } else {
            write!(f, "{} <{}>", self.display_name, self.email)
        }
    }
}

/// 两个独立的列表，只在展示时合并
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CounterpartDirectory {
    pub vendors: Vec<Counterpart>,
    pub companies: Vec<Counterpart>,
}

impl CounterpartDirectory {
    /// 展示顺序：先供应商，后保险公司
    pub fn entries(&self) -> impl Iterator<Item = &Counterpart> {
        self.vendors.iter().chain(self.companies.iter())
    }

    pub fn len(&self) -> usize {
        self.vendors.len() + self.companies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 按记录 ID 或聊天 ID 查找
    pub fn find(&self, id: &str) -> Option<&Counterpart> {
        self.entries().find(|c| c.id == id || c.chat_id == id)
    }

    /// 名称或邮箱包含关键字（不区分大小写）
    pub fn filter(&self, query: &str) -> Vec<&Counterpart> {
        let q = query.trim().to_lowercase();
        if q.is_empty() {
            return self.entries().collect();
        }
        self.entries()
            .filter(|c| {
                c.display_name.to_lowercase().contains(&q) || c.email.to_lowercase().contains(&q)
            })
            .collect()
    }
}
