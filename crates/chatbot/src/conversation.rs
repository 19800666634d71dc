use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use demeter_core::{DomainResult, Record, uuid_id, validate};

uuid_id!(ChatSessionId, "ChatSessionId");
uuid_id!(ChatMessageId, "ChatMessageId");

pub const MAX_MESSAGE_LEN: usize = 4000;
const DEFAULT_TITLE: &str = "New conversation";
const TITLE_MAX_LEN: usize = 120;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSession {
    pub id: ChatSessionId,
    /// Identity-provider subject of the owner.
    pub user_id: String,
    pub title: String,
    pub message_count: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for ChatSession {
    type Id = ChatSessionId;
    const KIND: &'static str = "chat_sessions";
    const ENTITY: &'static str = "ChatSession";

    fn id(&self) -> ChatSessionId {
        self.id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MessageRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    pub id: ChatMessageId,
    pub session_id: ChatSessionId,
    pub role: MessageRole,
    pub content: String,
    pub created_at: DateTime<Utc>,
}

impl Record for ChatMessage {
    type Id = ChatMessageId;
    const KIND: &'static str = "chat_messages";
    const ENTITY: &'static str = "ChatMessage";

    fn id(&self) -> ChatMessageId {
        self.id
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateChatSessionRequest {
    #[serde(default)]
    pub title: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateChatSessionRequest {
    pub title: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostMessageRequest {
    pub content: String,
}

impl ChatSession {
    pub fn create(user_id: impl Into<String>, req: CreateChatSessionRequest, now: DateTime<Utc>) -> DomainResult<Self> {
        let title = validate::optional_text("title", req.title.as_deref(), TITLE_MAX_LEN)?
            .unwrap_or_else(|| DEFAULT_TITLE.to_string());
        Ok(Self {
            id: ChatSessionId::new(),
            user_id: user_id.into(),
            title,
            message_count: 0,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply_update(&mut self, req: UpdateChatSessionRequest, now: DateTime<Utc>) -> DomainResult<()> {
        if let Some(title) = req.title.as_deref() {
            self.title = validate::required_text("title", title, TITLE_MAX_LEN)?;
        }
        self.updated_at = now;
        Ok(())
    }

    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.user_id == user_id
    }

    /// Append a message. The first user message titles an untitled session.
    pub fn add_message(&mut self, role: MessageRole, content: &str, now: DateTime<Utc>) -> DomainResult<ChatMessage> {
        let content = validate::required_text("content", content, MAX_MESSAGE_LEN)?;
        if role == MessageRole::User && self.message_count == 0 && self.title == DEFAULT_TITLE {
            self.title = content.chars().take(60).collect::<String>().trim_end().to_string();
        }
        self.message_count += 1;
        self.updated_at = now;
        Ok(ChatMessage {
            id: ChatMessageId::new(),
            session_id: self.id,
            role,
            content,
            created_at: now,
        })
    }
}
