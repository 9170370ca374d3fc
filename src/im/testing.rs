//! 测试用内存后端和记录型监听器

use crate::im::backend::ChatBackend;
use crate::im::conversation::{PaneListener, PaneState};
use crate::im::counterpart::{Counterpart, CounterpartKind};
use crate::im::error::{ChatError, Result};
use crate::im::message::{Message, SendMessageRequest};
use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, TimeZone, Utc};
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, Once};
use tokio::sync::Notify;

pub(crate) fn init_test_logger() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("console_chat_sdk=debug")
            .with_test_writer()
            .try_init();
    });
}

type EchoTransform = Box<dyn Fn(&str) -> String + Send + Sync>;

#[derive(Default)]
struct FakeState {
    local_user: String,
    vendors: Vec<Counterpart>,
    companies: Vec<Counterpart>,
    fail_vendors: bool,
    fail_companies: bool,
    fail_history: bool,
    fail_send: bool,
    fail_delete: bool,
    histories: HashMap<String, Vec<Message>>,
    holds: HashMap<String, Arc<Notify>>,
    parked: HashMap<String, usize>,
    send_hold: Option<Arc<Notify>>,
    parked_sends: usize,
    echo: Option<EchoTransform>,
    next_id: u64,
    list_calls: usize,
    history_calls: Vec<String>,
    sends: Vec<(String, SendMessageRequest)>,
    deletes: Vec<String>,
}

/// 内存版聊天后端
///
/// 发送的消息以 `srv-N` 为 ID 回显，并写入接收者对应的历史记录。
pub(crate) struct FakeBackend {
    state: Mutex<FakeState>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                local_user: "Admin-1".to_string(),
                ..FakeState::default()
            }),
        }
    }

    pub fn with_local_user(self, user_id: &str) -> Self {
        self.lock().local_user = user_id.to_string();
        self
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap()
    }

    pub fn vendor(chat_id: &str, name: &str) -> Counterpart {
        Counterpart {
            id: format!("rec-{}", chat_id),
            chat_id: chat_id.to_string(),
            display_name: name.to_string(),
            email: format!("{}@example.com", chat_id.to_lowercase()),
            kind: CounterpartKind::Vendor,
        }
    }

    pub fn message(id: &str, sender: &str, receiver: &str, text: &str) -> Message {
        Message {
            id: id.to_string(),
            sender: sender.to_string(),
            receiver: receiver.to_string(),
            text: text.to_string(),
            created_at: Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap(),
        }
    }

    pub fn set_vendors(&self, vendors: Vec<Counterpart>) {
        self.lock().vendors = vendors;
    }

    pub fn set_companies(&self, companies: Vec<Counterpart>) {
        self.lock().companies = companies;
    }

    pub fn fail_vendors(&self, fail: bool) {
        self.lock().fail_vendors = fail;
    }

    pub fn fail_companies(&self, fail: bool) {
        self.lock().fail_companies = fail;
    }

    pub fn fail_history(&self, fail: bool) {
        self.lock().fail_history = fail;
    }

    pub fn fail_send(&self, fail: bool) {
        self.lock().fail_send = fail;
    }

    pub fn fail_delete(&self, fail: bool) {
        self.lock().fail_delete = fail;
    }

    pub fn set_history(&self, counterpart_id: &str, messages: Vec<Message>) {
        self.lock()
            .histories
            .insert(counterpart_id.to_string(), messages);
    }

    pub fn push_history(&self, counterpart_id: &str, message: Message) {
        self.lock()
            .histories
            .entry(counterpart_id.to_string())
            .or_default()
            .push(message);
    }

    /// 服务器端删除消息（模拟他处已删除）
    pub fn forget_message(&self, message_id: &str) {
        for list in self.lock().histories.values_mut() {
            list.retain(|m| m.id != message_id);
        }
    }

    pub fn set_echo_transform(&self, f: impl Fn(&str) -> String + Send + Sync + 'static) {
        self.lock().echo = Some(Box::new(f));
    }

    /// 之后对该联系人的历史请求在读取数据后挂起，直到返回的 `Notify` 被通知
    pub fn hold_history(&self, counterpart_id: &str) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock()
            .holds
            .insert(counterpart_id.to_string(), gate.clone());
        gate
    }

    /// 之后的发送在服务器创建消息后挂起，直到返回的 `Notify` 被通知
    pub fn hold_send(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.lock().send_hold = Some(gate.clone());
        gate
    }

    pub async fn wait_for_send(&self) {
        while self.lock().parked_sends == 0 {
            tokio::task::yield_now().await;
        }
    }

    pub fn release_hold(&self, counterpart_id: &str) {
        self.lock().holds.remove(counterpart_id);
    }

    /// 等到有一个被挂起的历史请求
    pub async fn wait_for_history_call(&self, counterpart_id: &str) {
        loop {
            if self.lock().parked.get(counterpart_id).copied().unwrap_or(0) > 0 {
                return;
            }
            tokio::task::yield_now().await;
        }
    }

    pub fn list_calls(&self) -> usize {
        self.lock().list_calls
    }

    pub fn history_calls(&self) -> Vec<String> {
        self.lock().history_calls.clone()
    }

    pub fn sends(&self) -> Vec<(String, SendMessageRequest)> {
        self.lock().sends.clone()
    }

    pub fn deletes(&self) -> Vec<String> {
        self.lock().deletes.clone()
    }
}

fn injected(what: &str) -> ChatError {
    ChatError::from_status(
        StatusCode::INTERNAL_SERVER_ERROR,
        format!("injected {} failure", what),
    )
}

#[async_trait]
impl ChatBackend for FakeBackend {
    async fn list_vendors(&self) -> Result<Vec<Counterpart>> {
        let mut state = self.lock();
        state.list_calls += 1;
        if state.fail_vendors {
            return Err(injected("vendor list"));
        }
        Ok(state.vendors.clone())
    }

    async fn list_companies(&self) -> Result<Vec<Counterpart>> {
        let mut state = self.lock();
        state.list_calls += 1;
        if state.fail_companies {
            return Err(injected("company list"));
        }
        Ok(state.companies.clone())
    }

    async fn fetch_history(&self, counterpart_id: &str) -> Result<Vec<Message>> {
        let (result, gate) = {
            let mut state = self.lock();
            state.history_calls.push(counterpart_id.to_string());
            let result = if state.fail_history {
                Err(injected("history"))
            } else {
                Ok(state
                    .histories
                    .get(counterpart_id)
                    .cloned()
                    .unwrap_or_default())
            };
            let gate = state.holds.get(counterpart_id).cloned();
            if gate.is_some() {
                *state.parked.entry(counterpart_id.to_string()).or_default() += 1;
            }
            (result, gate)
        };

        if let Some(gate) = gate {
            gate.notified().await;
            if let Some(n) = self.lock().parked.get_mut(counterpart_id) {
                *n = n.saturating_sub(1);
            }
        }
        result
    }

    async fn send_message(&self, send_path: &str, request: &SendMessageRequest) -> Result<Message> {
        let (message, gate) = {
            let mut state = self.lock();
            state.sends.push((send_path.to_string(), request.clone()));
            if state.fail_send {
                return Err(injected("send"));
            }
            state.next_id += 1;
            let text = match &state.echo {
                Some(f) => f(&request.text),
                None => request.text.clone(),
            };
            let message = Message {
                id: format!("srv-{}", state.next_id),
                sender: state.local_user.clone(),
                receiver: request.receiver_id.clone(),
                text,
                created_at: Utc.with_ymd_and_hms(2024, 5, 1, 10, 0, 0).unwrap()
                    + ChronoDuration::seconds(state.next_id as i64),
            };
            state
                .histories
                .entry(request.receiver_id.clone())
                .or_default()
                .push(message.clone());
            let gate = state.send_hold.clone();
            if gate.is_some() {
                state.parked_sends += 1;
            }
            (message, gate)
        };

        if let Some(gate) = gate {
            gate.notified().await;
            let mut state = self.lock();
            state.parked_sends = state.parked_sends.saturating_sub(1);
        }
        Ok(message)
    }

    async fn delete_message(&self, message_id: &str) -> Result<()> {
        let mut state = self.lock();
        state.deletes.push(message_id.to_string());
        if state.fail_delete {
            return Err(injected("delete"));
        }
        let mut found = false;
        for list in state.histories.values_mut() {
            let before = list.len();
            list.retain(|m| m.id != message_id);
            found |= list.len() < before;
        }
        if found {
            Ok(())
        } else {
            Err(ChatError::NotFound(format!("message {}", message_id)))
        }
    }
}

/// 记录回调次数和状态序列
#[derive(Default)]
pub(crate) struct RecordingListener {
    states: Mutex<Vec<PaneState>>,
    appended: Mutex<Vec<String>>,
    removed: Mutex<Vec<String>>,
    replaced: Mutex<usize>,
    scrolls: Mutex<usize>,
}

impl RecordingListener {
    pub fn states(&self) -> Vec<PaneState> {
        self.states.lock().unwrap().clone()
    }

    pub fn appended(&self) -> Vec<String> {
        self.appended.lock().unwrap().clone()
    }

    pub fn removed(&self) -> Vec<String> {
        self.removed.lock().unwrap().clone()
    }

    pub fn replaced(&self) -> usize {
        *self.replaced.lock().unwrap()
    }

    pub fn scrolls(&self) -> usize {
        *self.scrolls.lock().unwrap()
    }
}

#[async_trait]
impl PaneListener for RecordingListener {
    async fn on_state_changed(&self, state: PaneState) {
        self.states.lock().unwrap().push(state);
    }

    async fn on_messages_replaced(&self, _messages: Vec<Message>) {
        *self.replaced.lock().unwrap() += 1;
    }

    async fn on_message_appended(&self, message: Message) {
        self.appended.lock().unwrap().push(message.id);
    }

    async fn on_message_removed(&self, message_id: String) {
        self.removed.lock().unwrap().push(message_id);
    }

    async fn on_scroll_to_latest(&self) {
        *self.scrolls.lock().unwrap() += 1;
    }
}
