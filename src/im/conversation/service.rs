//! 会话面板服务层
//!
//! 管理当前选中联系人的消息列表。所有对列表的修改（整体替换、追加、删除）
//! 都在同一把异步锁内完成，保证互不穿插。
//!
//! - 每次选择联系人都会递增 `generation`，旧联系人的迟到响应直接丢弃
//! - 每次拉取都带一个递增的 `ticket`，比已应用结果更旧的响应直接丢弃
//! - 有拉取在途时，本地追加/删除记入 `journal`，拉取结果落地时在服务器列表上重放
//!   拉取发出之后才发生的本地修改，避免轮询覆盖刚发送的消息；没有在途拉取时不记录

use crate::im::auth::SessionSnapshot;
use crate::im::backend::ChatBackend;
use crate::im::conversation::listener::{EmptyPaneListener, PaneListener};
use crate::im::conversation::ownership::{flag_foreign_participants, is_own_message};
use crate::im::conversation::poller::PollHandle;
use crate::im::conversation::state::{LoadPhase, PaneSnapshot, PaneState};
use crate::im::counterpart::Counterpart;
use crate::im::error::{ChatError, Result};
use crate::im::message::{Message, SendMessageRequest};
use crate::im::profile::{ChatProfile, SyncMode};
use std::sync::{Arc, Weak};
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// 一次拉取的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// 没有选中联系人，未发请求
    NoCounterpart,
    /// 结果已落地；`changed` 表示列表内容是否有变化
    Applied { changed: bool },
    /// 联系人已切换或响应过期，结果被丢弃
    Discarded,
}

#[derive(Debug, Clone)]
enum LocalOp {
    Append(Message),
    Remove(String),
}

#[derive(Default)]
struct PaneInner {
    counterpart: Option<Counterpart>,
    phase: Option<LoadPhase>,
    generation: u64,
    messages: Vec<Message>,
    draft: String,
    next_ticket: u64,
    applied_ticket: u64,
    revision: u64,
    journal: Vec<(u64, LocalOp)>,
    /// 在途拉取：(ticket, 发出时的 revision)
    pending: Vec<(u64, u64)>,
}

impl PaneInner {
    fn state(&self) -> PaneState {
        match (&self.counterpart, &self.phase) {
            (Some(cp), Some(phase)) => PaneState::CounterpartSelected {
                counterpart_id: cp.chat_id.clone(),
                phase: phase.clone(),
            },
            _ => PaneState::NoCounterpartSelected,
        }
    }

    fn begin_fetch(&mut self) -> (u64, u64) {
        self.next_ticket += 1;
        self.pending.push((self.next_ticket, self.revision));
        (self.next_ticket, self.revision)
    }

    fn finish_fetch(&mut self, ticket: u64) {
        self.pending.retain(|(t, _)| *t != ticket);
    }

    /// 只保留最早的在途拉取之后的记录
    fn prune_journal(&mut self) {
        match self.pending.iter().map(|(_, rev)| *rev).min() {
            Some(floor) => self.journal.retain(|(rev, _)| *rev > floor),
            None => self.journal.clear(),
        }
    }

    fn record(&mut self, op: LocalOp) {
        self.revision += 1;
        if !self.pending.is_empty() {
            self.journal.push((self.revision, op));
        }
    }

    /// 切换或关闭会话时丢弃所有同步簿记
    fn reset_sync(&mut self) {
        self.applied_ticket = self.next_ticket;
        self.pending.clear();
        self.journal.clear();
    }
}

fn apply_op(messages: &mut Vec<Message>, op: &LocalOp) {
    match op {
        LocalOp::Append(m) => {
            if !messages.iter().any(|x| x.id == m.id) {
                messages.push(m.clone());
            }
        }
        LocalOp::Remove(id) => messages.retain(|x| &x.id != id),
    }
}

struct PaneShared {
    backend: Arc<dyn ChatBackend>,
    profile: ChatProfile,
    session: SessionSnapshot,
    listener: Arc<dyn PaneListener>,
    inner: Mutex<PaneInner>,
    poller: std::sync::Mutex<Option<PollHandle>>,
}

impl PaneShared {
    fn replace_poller(&self, next: Option<PollHandle>) {
        let mut slot = match self.poller.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        if let Some(old) = slot.take() {
            old.stop();
        }
        *slot = next;
    }
}

/// 参数化的会话面板（管理员 / 供应商 / 保险公司共用）
///
/// 可以廉价克隆；最后一个句柄被丢弃时轮询任务随之停止。
#[derive(Clone)]
pub struct ConversationPane {
    shared: Arc<PaneShared>,
}

impl ConversationPane {
    /// 创建新的会话面板（使用默认空监听器）
    pub fn new(backend: Arc<dyn ChatBackend>, profile: ChatProfile, session: SessionSnapshot) -> Self {
        Self::with_listener(backend, profile, session, Arc::new(EmptyPaneListener))
    }

    /// 创建新的会话面板（带自定义监听器）
    pub fn with_listener(
        backend: Arc<dyn ChatBackend>,
        profile: ChatProfile,
        session: SessionSnapshot,
        listener: Arc<dyn PaneListener>,
    ) -> Self {
        info!(
            "[Pane] 创建会话面板，用户ID: {}, 角色: {}, 发送路径: {}",
            session.user_id(),
            profile.role,
            profile.send_path
        );
        Self {
            shared: Arc::new(PaneShared {
                backend,
                profile,
                session,
                listener,
                inner: Mutex::new(PaneInner::default()),
                poller: std::sync::Mutex::new(None),
            }),
        }
    }

    pub fn profile(&self) -> &ChatProfile {
        &self.shared.profile
    }

    pub fn session(&self) -> &SessionSnapshot {
        &self.shared.session
    }

    /// 固定接收者的角色打开面板时直接选中管理员；管理员角色等待用户选择
    pub async fn open(&self) -> Result<RefreshOutcome> {
        match self.shared.profile.fixed_receiver.clone() {
            Some(admin) => self.select(admin).await,
            None => Ok(RefreshOutcome::NoCounterpart),
        }
    }

    /// 选中联系人：进入加载状态、拉取历史，轮询模式下启动轮询
    pub async fn select(&self, counterpart: Counterpart) -> Result<RefreshOutcome> {
        let generation = {
            let mut inner = self.shared.inner.lock().await;
            let switched = inner
                .counterpart
                .as_ref()
                .map(|c| c.chat_id != counterpart.chat_id)
                .unwrap_or(true);
            inner.generation += 1;
            inner.phase = Some(LoadPhase::Loading);
            inner.counterpart = Some(counterpart.clone());
            inner.reset_sync();
            info!(
                "[Pane] 👉 选中联系人: {} ({}), generation={}",
                counterpart.display_name, counterpart.chat_id, inner.generation
            );

            self.shared.listener.on_state_changed(inner.state()).await;
            if switched && !inner.messages.is_empty() {
                inner.messages.clear();
                self.shared.listener.on_messages_replaced(Vec::new()).await;
            }
            inner.generation
        };

        match self.shared.profile.sync_mode {
            SyncMode::Polling { interval } => {
                let weak = Arc::downgrade(&self.shared);
                let handle = PollHandle::spawn(
                    interval,
                    format!("chat/{}", counterpart.chat_id),
                    move || poll_tick(weak.clone(), generation),
                );
                self.shared.replace_poller(Some(handle));
            }
            SyncMode::OnDemand => self.shared.replace_poller(None),
        }

        self.refresh_generation(generation).await
    }

    /// 关闭当前会话：停止轮询并回到未选择状态
    pub async fn close(&self) {
        self.shared.replace_poller(None);
        let mut inner = self.shared.inner.lock().await;
        if inner.counterpart.is_none() {
            return;
        }
        inner.generation += 1;
        inner.counterpart = None;
        inner.phase = None;
        inner.reset_sync();
        info!("[Pane] 关闭会话, generation={}", inner.generation);
        self.shared.listener.on_state_changed(inner.state()).await;
        if !inner.messages.is_empty() {
            inner.messages.clear();
            self.shared.listener.on_messages_replaced(Vec::new()).await;
        }
    }

    /// 重新拉取当前联系人的历史消息
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        let generation = self.shared.inner.lock().await.generation;
        self.refresh_generation(generation).await
    }

    async fn refresh_generation(&self, generation: u64) -> Result<RefreshOutcome> {
        refresh_shared(&self.shared, generation).await
    }

    pub async fn set_draft(&self, text: impl Into<String>) {
        self.shared.inner.lock().await.draft = text.into();
    }

    pub async fn draft(&self) -> String {
        self.shared.inner.lock().await.draft.clone()
    }

    /// 发送按钮是否可用：已选中联系人且草稿去空白后非空
    pub async fn can_send(&self) -> bool {
        let inner = self.shared.inner.lock().await;
        inner.counterpart.is_some() && !inner.draft.trim().is_empty()
    }

    /// 发送草稿；成功后清空草稿，失败时保留草稿以便重试
    pub async fn send_draft(&self) -> Result<Option<Message>> {
        let draft = self.draft().await;
        let sent = self.send_text(&draft).await?;
        if sent.is_some() {
            let mut inner = self.shared.inner.lock().await;
            // 发送期间用户又改了草稿时不清空
            if inner.draft == draft {
                inner.draft.clear();
            }
        }
        Ok(sent)
    }

    /// 发送消息
    ///
    /// 空白内容或未选中联系人时什么都不做，返回 `Ok(None)`。
    /// 成功时把服务器返回的消息追加到列表末尾。
    pub async fn send_text(&self, text: &str) -> Result<Option<Message>> {
        let text = text.trim();
        let (receiver_id, generation) = {
            let inner = self.shared.inner.lock().await;
            let Some(selected) = inner.counterpart.as_ref() else {
                debug!("[Pane] 未选中联系人，忽略发送");
                return Ok(None);
            };
            if text.is_empty() {
                debug!("[Pane] 消息内容为空，忽略发送");
                return Ok(None);
            }
            let receiver = self
                .shared
                .profile
                .fixed_receiver
                .as_ref()
                .unwrap_or(selected);
            (receiver.chat_id.clone(), inner.generation)
        };

        let request = SendMessageRequest {
            receiver_id,
            text: text.to_string(),
        };
        let message = match self
            .shared
            .backend
            .send_message(&self.shared.profile.send_path, &request)
            .await
        {
            Ok(m) => m,
            Err(e) => {
                error!("[Pane] ❌ 消息发送失败 (接收者: {}): {}", request.receiver_id, e);
                return Err(e);
            }
        };

        let mut inner = self.shared.inner.lock().await;
        if inner.generation != generation {
            warn!(
                "[Pane] 发送完成时联系人已切换，消息 {} 不追加到当前列表",
                message.id
            );
            return Ok(Some(message));
        }

        let op = LocalOp::Append(message.clone());
        let before = inner.messages.len();
        apply_op(&mut inner.messages, &op);
        inner.record(op);
        if inner.messages.len() > before {
            info!("[Pane] ✅ 已追加消息: {}", message.id);
            self.shared.listener.on_message_appended(message.clone()).await;
            self.shared.listener.on_scroll_to_latest().await;
        } else {
            debug!("[Pane] 消息 {} 已由拉取结果带回，不重复追加", message.id);
        }
        Ok(Some(message))
    }

    /// 是否给该消息提供删除入口（仅 UI 约束，鉴权在服务端）
    pub fn can_delete(&self, message: &Message) -> bool {
        is_own_message(message, self.shared.session.user_id())
    }

    /// 删除消息；服务器确认后才从本地移除
    ///
    /// 本地不存在的 ID 直接返回 `Ok(false)`，不发请求。
    pub async fn delete_message(&self, message_id: &str) -> Result<bool> {
        let generation = {
            let inner = self.shared.inner.lock().await;
            let Some(message) = inner.messages.iter().find(|m| m.id == message_id) else {
                debug!("[Pane] 消息 {} 不在当前列表中，忽略删除", message_id);
                return Ok(false);
            };
            if !self.can_delete(message) {
                warn!(
                    "[Pane] 拒绝删除他人消息: {} (sender={})",
                    message_id, message.sender
                );
                return Err(ChatError::NotPermitted(format!(
                    "消息 {} 不是当前用户发送的",
                    message_id
                )));
            }
            inner.generation
        };

        match self.shared.backend.delete_message(message_id).await {
            Ok(()) => {}
            Err(e) if e.is_not_found() => {
                info!("[Pane] 服务器上消息 {} 已不存在，按已删除处理", message_id);
            }
            Err(e) => {
                error!("[Pane] ❌ 删除消息失败: {}: {}", message_id, e);
                return Err(e);
            }
        }

        let mut inner = self.shared.inner.lock().await;
        if inner.generation != generation {
            debug!("[Pane] 删除完成时联系人已切换: {}", message_id);
            return Ok(true);
        }
        let op = LocalOp::Remove(message_id.to_string());
        let before = inner.messages.len();
        apply_op(&mut inner.messages, &op);
        inner.record(op);
        if inner.messages.len() < before {
            info!("[Pane] 🗑️ 已移除消息: {}", message_id);
            self.shared
                .listener
                .on_message_removed(message_id.to_string())
                .await;
        }
        Ok(true)
    }

    pub async fn state(&self) -> PaneState {
        self.shared.inner.lock().await.state()
    }

    pub async fn messages(&self) -> Vec<Message> {
        self.shared.inner.lock().await.messages.clone()
    }

    pub async fn snapshot(&self) -> PaneSnapshot {
        let inner = self.shared.inner.lock().await;
        PaneSnapshot {
            state: inner.state(),
            counterpart: inner.counterpart.clone(),
            messages: inner.messages.clone(),
            draft: inner.draft.clone(),
        }
    }

    pub fn is_polling(&self) -> bool {
        let slot = match self.shared.poller.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        };
        slot.as_ref().map(|h| !h.is_finished()).unwrap_or(false)
    }
}

/// 轮询回调只持有弱引用，面板被丢弃或联系人切换后自动结束
async fn poll_tick(weak: Weak<PaneShared>, generation: u64) -> bool {
    let Some(shared) = weak.upgrade() else {
        return false;
    };
    match refresh_shared(&shared, generation).await {
        Ok(RefreshOutcome::Discarded) | Ok(RefreshOutcome::NoCounterpart) => {
            shared.inner.lock().await.generation == generation
        }
        // 失败已在 refresh 中记录，下个周期继续
        Ok(RefreshOutcome::Applied { .. }) | Err(_) => true,
    }
}

async fn refresh_shared(shared: &PaneShared, generation: u64) -> Result<RefreshOutcome> {
    let (counterpart_id, ticket, revision) = {
        let mut inner = shared.inner.lock().await;
        if inner.generation != generation {
            return Ok(RefreshOutcome::Discarded);
        }
        let Some(cp) = inner.counterpart.as_ref() else {
            debug!("[Pane] 未选中联系人，不拉取历史");
            return Ok(RefreshOutcome::NoCounterpart);
        };
        let counterpart_id = cp.chat_id.clone();
        let (ticket, revision) = inner.begin_fetch();
        (counterpart_id, ticket, revision)
    };

    debug!(
        "[Pane] 🔄 拉取历史消息: {}, ticket={}, generation={}",
        counterpart_id, ticket, generation
    );
    let result = shared.backend.fetch_history(&counterpart_id).await;

    let mut inner = shared.inner.lock().await;
    inner.finish_fetch(ticket);
    if inner.generation != generation {
        debug!(
            "[Pane] 丢弃已切换联系人的响应: {} (generation {} != {})",
            counterpart_id, generation, inner.generation
        );
        inner.prune_journal();
        return Ok(RefreshOutcome::Discarded);
    }
    if ticket < inner.applied_ticket {
        debug!(
            "[Pane] 丢弃过期响应: ticket {} < 已应用 {}",
            ticket, inner.applied_ticket
        );
        inner.prune_journal();
        return Ok(RefreshOutcome::Discarded);
    }

    match result {
        Ok(mut server) => {
            flag_foreign_participants(&server, shared.session.user_id(), &counterpart_id);
            for (_, op) in inner.journal.iter().filter(|(rev, _)| *rev > revision) {
                apply_op(&mut server, op);
            }
            inner.prune_journal();
            inner.applied_ticket = ticket;

            let changed = server != inner.messages;
            let phase_changed = inner.phase != Some(LoadPhase::Loaded);
            inner.phase = Some(LoadPhase::Loaded);
            if phase_changed {
                shared.listener.on_state_changed(inner.state()).await;
            }
            if changed {
                debug!(
                    "[Pane] 消息列表已更新: {}, 条数 {} -> {}",
                    counterpart_id,
                    inner.messages.len(),
                    server.len()
                );
                inner.messages = server.clone();
                shared.listener.on_messages_replaced(server).await;
                shared.listener.on_scroll_to_latest().await;
            }
            Ok(RefreshOutcome::Applied { changed })
        }
        Err(e) => {
            error!("[Pane] ❌ 拉取历史消息失败: {}: {}", counterpart_id, e);
            inner.prune_journal();
            inner.phase = Some(LoadPhase::from_error(&e));
            shared.listener.on_state_changed(inner.state()).await;
            Err(e)
        }
    }
}
