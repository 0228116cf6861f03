//! Conversation state for the chat screen
//!
//! The message log, the draft being typed and the busy flag live here, free
//! of any terminal or network types so the submit/complete cycle can be
//! driven directly.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::api::{ApiError, ChatResponse};

pub const GREETING: &str = "안녕하세요! 명지전문대학 학사챗봇입니다. 무엇을 도와드릴까요?";
pub const CLEARED_NOTICE: &str = "채팅이 초기화되었습니다. 새로운 대화를 시작해보세요!";
pub const UNREACHABLE_NOTICE: &str =
    "죄송합니다. 서버와 연결할 수 없습니다. 잠시 후 다시 시도해주세요.";
pub const ERROR_PREFIX: &str = "오류: ";

/// Who wrote a message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    User,
    Ai,
}

impl Role {
    /// Role label the chat API expects in `chat_history`
    pub fn wire_name(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Ai => "assistant",
        }
    }
}

/// A single entry of the message log
#[derive(Debug, Clone)]
pub struct Message {
    pub role: Role,
    pub content: String,
    pub timestamp: DateTime<Local>,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            timestamp: Local::now(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
            timestamp: Local::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub message: String,
    pub chat_history: Vec<HistoryEntry>,
}

/// How an outstanding request ended
#[derive(Debug)]
pub enum ChatOutcome {
    Reply(ChatResponse),
    Failed(ApiError),
}

impl From<Result<ChatResponse, ApiError>> for ChatOutcome {
    fn from(result: Result<ChatResponse, ApiError>) -> Self {
        match result {
            Ok(response) => ChatOutcome::Reply(response),
            Err(err) => ChatOutcome::Failed(err),
        }
    }
}

#[derive(Debug)]
pub struct Conversation {
    messages: Vec<Message>,
    draft: String,
    busy: bool,
}

impl Conversation {
    /// Fresh conversation seeded with the greeting
    pub fn new() -> Self {
        Self {
            messages: vec![Message::ai(GREETING)],
            draft: String::new(),
            busy: false,
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn update_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Whether the send control is enabled
    pub fn can_submit(&self) -> bool {
        !self.busy && !self.draft.trim().is_empty()
    }

    /// Start a send. Returns the request to issue, or `None` when the draft is
    /// blank or a request is already outstanding.
    pub fn submit(&mut self) -> Option<ChatRequest> {
        if !self.can_submit() {
            return None;
        }

        let message = self.draft.trim().to_string();

        // History reflects the log before this message; index 0 is the
        // seeded notice, which never leaves the screen.
        let chat_history = self
            .messages
            .iter()
            .skip(1)
            .map(|msg| HistoryEntry {
                role: msg.role.wire_name().to_string(),
                content: msg.content.clone(),
            })
            .collect();

        self.messages.push(Message::user(message.clone()));
        self.draft.clear();
        self.busy = true;

        Some(ChatRequest {
            message,
            chat_history,
        })
    }

    /// Finish the outstanding request by appending exactly one AI message.
    pub fn complete(&mut self, outcome: ChatOutcome) {
        if !self.busy {
            tracing::warn!("dropping chat completion with no request outstanding");
            return;
        }

        let content = match outcome {
            ChatOutcome::Reply(response) if response.success => response.response,
            ChatOutcome::Reply(response) => format!("{}{}", ERROR_PREFIX, response.response),
            ChatOutcome::Failed(err) => {
                tracing::warn!(error = %err, "chat request failed");
                UNREACHABLE_NOTICE.to_string()
            }
        };

        self.messages.push(Message::ai(content));
        self.busy = false;
    }

    /// Replace the whole log with the cleared notice. Draft and busy are untouched.
    pub fn reset(&mut self) {
        self.messages = vec![Message::ai(CLEARED_NOTICE)];
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}
