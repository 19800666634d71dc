//! Inventory assistant: chat sessions, messages, and a rule-based responder
//! that answers from a live analytics snapshot.

pub mod assistant;
pub mod conversation;

pub use assistant::{AssistantContext, Intent, SALES_WINDOW_DAYS, detect_intent, reply};
pub use conversation::{
    ChatMessage, ChatMessageId, ChatSession, ChatSessionId, CreateChatSessionRequest, MessageRole,
    PostMessageRequest, UpdateChatSessionRequest,
};
