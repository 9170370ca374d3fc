use crate::im::error::{ChatError, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, warn};

/// 列表接口可能使用的包装字段
pub const LIST_ENVELOPE_KEYS: &[&str] = &["data", "messages", "vendors", "companies", "result"];

/// 单个对象接口可能使用的包装字段
pub const OBJECT_ENVELOPE_KEYS: &[&str] = &["data", "message", "result"];

/// 读取响应 body 并检查 HTTP 状态
///
/// body 只能读取一次，这里统一读取为 `Value` 并打印，后续由调用方决定如何解析
pub async fn read_json_body(response: reqwest::Response, operation_name: &str) -> Result<Value> {
    let status = response.status();
    let body_bytes = response.bytes().await?;
    let body_str = String::from_utf8_lossy(&body_bytes);
    debug!("[HTTP] {}响应 Body: {}", operation_name, body_str);

    if !status.is_success() {
        error!(
            "[HTTP] {}请求失败，HTTP状态: {}, 响应: {}",
            operation_name, status, body_str
        );
        return Err(ChatError::from_status(status, body_str.into_owned()));
    }
    debug!("[HTTP] {}请求成功，HTTP状态: {}", operation_name, status);

    if body_bytes.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&body_bytes).map_err(|e| {
        error!(
            "[HTTP] {}反序列化失败: {:?}\n原始响应: {}",
            operation_name, e, body_str
        );
        ChatError::Decode(format!("{}: {}", operation_name, e))
    })
}

/// 通用 HTTP 响应处理：检查状态、去掉包装层并反序列化为 `T`
pub async fn handle_http_response<T: DeserializeOwned>(
    response: reqwest::Response,
    operation_name: &str,
) -> Result<T> {
    let value = read_json_body(response, operation_name).await?;
    let inner = unwrap_object(value);
    serde_json::from_value(inner).map_err(|e| {
        error!("[HTTP] {}数据结构不匹配: {:?}", operation_name, e);
        ChatError::Decode(format!("{}: {}", operation_name, e))
    })
}

/// 只关心状态码的响应（例如删除）
pub async fn handle_empty_response(response: reqwest::Response, operation_name: &str) -> Result<()> {
    read_json_body(response, operation_name).await.map(|_| ())
}

/// 后端既可能直接返回数组，也可能包一层 `{ data: [...] }`
pub fn extract_list(value: Value) -> Vec<Value> {
    match value {
        Value::Array(items) => items,
        Value::Object(mut map) => {
            for key in LIST_ENVELOPE_KEYS {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return items;
                }
            }
            Vec::new()
        }
        _ => Vec::new(),
    }
}

/// 严格版本：只接受裸数组或已知包装字段下的数组
///
/// `{ success: false, msg: ... }` 这类 2xx 错误体不能当成空列表处理
pub fn expect_list(value: Value, operation_name: &str) -> Result<Vec<Value>> {
    match value {
        Value::Array(items) => Ok(items),
        Value::Object(mut map) => {
            for key in LIST_ENVELOPE_KEYS {
                if let Some(Value::Array(items)) = map.remove(*key) {
                    return Ok(items);
                }
            }
            let body = Value::Object(map);
            error!("[HTTP] {}响应中没有消息列表: {}", operation_name, body);
            Err(ChatError::Decode(format!("{}: 响应中没有列表字段: {}", operation_name, body)))
        }
        other => {
            error!("[HTTP] {}响应不是列表: {}", operation_name, other);
            Err(ChatError::Decode(format!("{}: 响应不是列表: {}", operation_name, other)))
        }
    }
}

/// 对象响应去掉包装层；无包装时原样返回
pub fn unwrap_object(value: Value) -> Value {
    if let Value::Object(ref map) = value {
        for key in OBJECT_ENVELOPE_KEYS {
            if let Some(inner) = map.get(*key) {
                if inner.is_object() || inner.is_array() {
                    return inner.clone();
                }
            }
        }
    }
    value
}

/// 逐条解析列表，解析失败的条目记录日志后跳过
pub fn parse_list<T: DeserializeOwned>(items: Vec<Value>, operation_name: &str) -> Vec<T> {
    items
        .into_iter()
        .filter_map(|item| match serde_json::from_value::<T>(item) {
            Ok(v) => Some(v),
            Err(e) => {
                warn!("[HTTP] ⚠️ {}跳过无法解析的条目: {}", operation_name, e);
                None
            }
        })
        .collect()
}

/// 逐条解析列表，任何一条失败则整体失败（保持服务器返回的完整顺序）
pub fn parse_all<T: DeserializeOwned>(items: Vec<Value>, operation_name: &str) -> Result<Vec<T>> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| {
            serde_json::from_value::<T>(item).map_err(|e| {
                error!("[HTTP] {}第 {} 条无法解析: {}", operation_name, i, e);
                ChatError::Decode(format!("{}: 第 {} 条: {}", operation_name, i, e))
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn extract_list_accepts_bare_and_wrapped_arrays() {
        assert_eq!(extract_list(json!([1, 2])).len(), 2);
        assert_eq!(extract_list(json!({ "data": [1, 2, 3] })).len(), 3);
        assert_eq!(extract_list(json!({ "vendors": [1] })).len(), 1);
        assert!(extract_list(json!({ "status": "ok" })).is_empty());
        assert!(extract_list(Value::Null).is_empty());
    }

    #[test]
    fn expect_list_rejects_bodies_without_a_list() {
        assert_eq!(expect_list(json!([1]), "t").unwrap().len(), 1);
        assert_eq!(expect_list(json!({ "messages": [] }), "t").unwrap().len(), 0);

        let err = expect_list(json!({ "success": false, "msg": "db error" }), "t").unwrap_err();
        assert!(matches!(err, ChatError::Decode(_)));
        assert!(expect_list(json!({ "data": "oops" }), "t").is_err());
        assert!(expect_list(json!("oops"), "t").is_err());
        assert!(expect_list(Value::Null, "t").is_err());
    }

    #[test]
    fn parse_all_fails_on_any_bad_entry() {
        #[derive(serde::Deserialize)]
        struct Item {
            #[allow(dead_code)]
            n: u32,
        }
        let ok: Vec<Item> = parse_all(vec![json!({ "n": 1 }), json!({ "n": 2 })], "t").unwrap();
        assert_eq!(ok.len(), 2);

        let items = vec![json!({ "n": 1 }), json!({ "n": null }), json!({ "n": 3 })];
        assert!(matches!(parse_all::<Item>(items.clone(), "t"), Err(ChatError::Decode(_))));
        assert_eq!(parse_list::<Item>(items, "t").len(), 2);
    }

    #[test]
    fn unwrap_object_prefers_envelope() {
        let wrapped = json!({ "success": true, "message": { "_id": "m1" } });
        assert_eq!(unwrap_object(wrapped)["_id"], "m1");

        // message 为字符串时不是包装层
        let plain = json!({ "_id": "m2", "message": "ok" });
        assert_eq!(unwrap_object(plain)["_id"], "m2");
    }
}
