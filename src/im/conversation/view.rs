//! 展示层视图模型

use crate::im::conversation::ownership::is_own_message;
use crate::im::conversation::state::{LoadPhase, PaneSnapshot, PaneState};
use crate::im::counterpart::CounterpartDirectory;
use crate::im::message::Message;
use chrono::{DateTime, Utc};

pub const SELECT_PROMPT: &str = "Select a conversation to start chatting";

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Alignment {
    /// 对方的消息
    Left,
    /// 自己的消息
    Right,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bubble {
    pub message_id: String,
    pub text: String,
    pub timestamp: String,
    pub alignment: Alignment,
    /// 只有自己发的消息才提供删除入口
    pub deletable: bool,
}

impl Bubble {
    pub fn from_message(message: &Message, local_user_id: &str) -> Self {
        let own = is_own_message(message, local_user_id);
        Self {
            message_id: message.id.clone(),
            text: message.text.clone(),
            timestamp: format_timestamp(&message.created_at),
            alignment: if own { Alignment::Right } else { Alignment::Left },
            deletable: own,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneView {
    Prompt(&'static str),
    Conversation {
        title: String,
        status: Option<String>,
        bubbles: Vec<Bubble>,
    },
}

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

/// 按服务器顺序渲染，不做排序
pub fn render_pane(snapshot: &PaneSnapshot, local_user_id: &str) -> PaneView {
    let phase = match &snapshot.state {
        PaneState::NoCounterpartSelected => return PaneView::Prompt(SELECT_PROMPT),
        PaneState::CounterpartSelected { phase, .. } => phase,
    };
    let title = snapshot
        .counterpart
        .as_ref()
        .map(|c| c.to_string())
        .unwrap_or_default();
    let status = match phase {
        LoadPhase::Loading => Some("Loading…".to_string()),
        LoadPhase::Loaded => None,
        LoadPhase::Error { message, .. } => Some(format!("Could not refresh: {}", message)),
    };
    let bubbles = snapshot
        .messages
        .iter()
        .map(|m| Bubble::from_message(m, local_user_id))
        .collect();
    PaneView::Conversation {
        title,
        status,
        bubbles,
    }
}

/// 联系人选择列表的展示行
pub fn render_directory(directory: &CounterpartDirectory) -> Vec<String> {
    directory.entries().map(|c| c.to_string()).collect()
}
