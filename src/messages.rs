//! 面向用户的提示信息
//!
//! 核心流程只产生结构化的消息，显示方式由调用方决定。

use std::fmt;
use std::sync::Mutex;

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    Info,
    Warning,
    Error,
    Success,
}

impl MessageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Info => "info",
            MessageKind::Warning => "warning",
            MessageKind::Error => "error",
            MessageKind::Success => "success",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserMessage {
    pub kind: MessageKind,
    pub text: String,
}

impl UserMessage {
    pub fn new(kind: MessageKind, text: impl Into<String>) -> Self {
        UserMessage { kind, text: text.into() }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Info, text)
    }

    pub fn warning(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Warning, text)
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Error, text)
    }

    pub fn success(text: impl Into<String>) -> Self {
        Self::new(MessageKind::Success, text)
    }
}

impl fmt::Display for UserMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.kind.as_str(), self.text)
    }
}

/// 消息接收方
pub trait MessageSink: Send + Sync {
    fn push(&self, message: UserMessage);
}

/// 收集所有消息的实现
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Mutex<Vec<UserMessage>>,
}

impl MessageLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// 取出并清空已收集的消息
    pub fn take(&self) -> Vec<UserMessage> {
        std::mem::take(&mut *self.lock())
    }

    pub fn messages(&self) -> Vec<UserMessage> {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<UserMessage>> {
        self.messages.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MessageSink for MessageLog {
    fn push(&self, message: UserMessage) {
        self.lock().push(message);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_log_collects_and_drains() {
        let log = MessageLog::new();
        log.push(UserMessage::warning("some options unavailable"));
        log.push(UserMessage::success("saved"));

        assert_eq!(log.messages().len(), 2);
        let taken = log.take();
        assert_eq!(taken[0].kind, MessageKind::Warning);
        assert_eq!(taken[1].to_string(), "[success] saved");
        assert!(log.messages().is_empty());
    }
}
