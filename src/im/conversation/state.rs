//! 会话面板状态

use crate::im::counterpart::Counterpart;
use crate::im::error::{ChatError, ErrorKind};
use crate::im::message::Message;

/// 选中联系人之后的加载阶段
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadPhase {
    Loading,
    Loaded,
    /// 拉取失败，仍然展示上一次成功加载的列表
    Error { kind: ErrorKind, message: String },
}

impl LoadPhase {
    pub fn from_error(e: &ChatError) -> Self {
        LoadPhase::Error {
            kind: e.kind(),
            message: e.to_string(),
        }
    }
}

/// 面板状态机
///
/// `NoCounterpartSelected → CounterpartSelected(Loading) → Loaded | Error`，
/// 任何状态下选择联系人都会回到 `Loading`。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaneState {
    NoCounterpartSelected,
    CounterpartSelected {
        counterpart_id: String,
        phase: LoadPhase,
    },
}

impl PaneState {
    pub fn is_selected(&self) -> bool {
        matches!(self, PaneState::CounterpartSelected { .. })
    }

    pub fn phase(&self) -> Option<&LoadPhase> {
        match self {
            PaneState::NoCounterpartSelected => None,
            PaneState::CounterpartSelected { phase, .. } => Some(phase),
        }
    }
}

/// 面板只读快照，供展示层使用
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaneSnapshot {
    pub state: PaneState,
    pub counterpart: Option<Counterpart>,
    pub messages: Vec<Message>,
    pub draft: String,
}
