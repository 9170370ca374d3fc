//! 联系人 API DTO
//!
//! 后端字段命名并不统一，这里用 alias 兼容常见写法

use crate::im::counterpart::models::{Counterpart, CounterpartKind};
use serde::{Deserialize, Deserializer};

/// 可选的 ID 引用（字符串或 populate 后的对象）
fn deserialize_opt_id_ref<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
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

    Ok(Option::<IdRef>::deserialize(deserializer)?.map(|r| match r {
        IdRef::Plain(s) => s,
        IdRef::Populated { id } => id,
    }))
}

/// `GET /allvendor` 的单条记录
#[derive(Debug, Clone, Deserialize)]
pub struct VendorRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId", default, deserialize_with = "deserialize_opt_id_ref")]
    pub user_id: Option<String>,
    #[serde(default, alias = "contactName", alias = "fullName", alias = "ownerName")]
    pub name: Option<String>,
    #[serde(rename = "companyName", alias = "shopName", default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// `GET /getAllCompany` 的单条记录
#[derive(Debug, Clone, Deserialize)]
pub struct CompanyRecord {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId", default, deserialize_with = "deserialize_opt_id_ref")]
    pub user_id: Option<String>,
    #[serde(rename = "companyName", alias = "name", default)]
    pub company_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

fn non_empty(v: Option<String>) -> Option<String> {
    v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl VendorRecord {
    /// 供应商显示联系人姓名，没有时退回店铺名/邮箱
    pub fn into_counterpart(self) -> Option<Counterpart> {
        if self.id.trim().is_empty() {
            return None;
        }
        let email = non_empty(self.email).unwrap_or_default();
        let display_name = non_empty(self.name)
            .or_else(|| non_empty(self.company_name))
            .unwrap_or_else(|| email.clone());
        Some(Counterpart {
            chat_id: non_empty(self.user_id).unwrap_or_else(|| self.id.clone()),
            id: self.id,
            display_name,
            email,
            kind: CounterpartKind::Vendor,
        })
    }
}

impl CompanyRecord {
    /// 保险公司显示公司名
    pub fn into_counterpart(self) -> Option<Counterpart> {
        if self.id.trim().is_empty() {
            return None;
        }
        let email = non_empty(self.email).unwrap_or_default();
        let display_name = non_empty(self.company_name).unwrap_or_else(|| email.clone());
        Some(Counterpart {
            chat_id: non_empty(self.user_id).unwrap_or_else(|| self.id.clone()),
            id: self.id,
            display_name,
            email,
            kind: CounterpartKind::Company,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn vendor_uses_contact_name_and_user_id() {
        let rec: VendorRecord = serde_json::from_value(json!({
            "_id": "v-rec-1",
            "userId": { "_id": "Vendor-123", "role": "vendor" },
            "contactName": "Ada Lens",
            "companyName": "Lens & Co",
            "email": "ada@lens.co"
        }))
        .unwrap();
        let cp = rec.into_counterpart().unwrap();
        assert_eq!(cp.chat_id, "Vendor-123");
        assert_eq!(cp.display_name, "Ada Lens");
        assert_eq!(cp.kind, CounterpartKind::Vendor);
    }

    #[test]
    fn company_falls_back_to_record_id_and_email() {
        let rec: CompanyRecord = serde_json::from_value(json!({
            "_id": "c-1",
            "email": "claims@shield.example"
        }))
        .unwrap();
        let cp = rec.into_counterpart().unwrap();
        assert_eq!(cp.chat_id, "c-1");
        assert_eq!(cp.display_name, "claims@shield.example");
    }
}
