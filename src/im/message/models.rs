//! 消息模型

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// 服务器返回的聊天消息
///
/// 线上格式：`{ _id, sender, receiver, text, createdAt }`。
/// `sender`/`receiver` 可能是 ID 字符串，也可能是被 populate 之后的对象。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(deserialize_with = "deserialize_id_ref")]
    pub sender: String,
    #[serde(deserialize_with = "deserialize_id_ref")]
    pub receiver: String,
    #[serde(default)]
    pub text: String,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
}

impl Message {
    pub fn is_from(&self, user_id: &str) -> bool {
        self.sender == user_id
    }
}

/// 兼容 `"abc"` 和 `{ "_id": "abc", ... }` 两种写法
fn deserialize_id_ref<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IdRef {
        Plain(String),
        Populated {
            #[serde(rename = "_id")]
            id: String,
        },
    }

    Ok(match IdRef::deserialize(deserializer)? {
        IdRef::Plain(s) => s,
        IdRef::Populated { id } => id,
    })
}
