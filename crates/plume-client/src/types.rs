//! Core types for conversations with the inference service

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Message role as the service understands it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    /// Reserved for tool round trips; never surfaced to the reducer
    Tool,
}

/// A minimal `{role, content}` record, the unit of server-confirmed history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEntry {
    pub role: Role,
    pub content: String,
}

impl ChatEntry {
    /// Create a user entry
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    /// Create an assistant entry
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// Body of `POST /api/chat`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ChatEntry>,
}

/// One conversational turn contribution as the UI tracks it
#[derive(Debug, Clone)]
pub struct Message {
    /// Client-assigned identifier, never reused
    pub id: Uuid,
    pub role: Role,
    /// Accumulated final text; append-only while the turn is in flight
    pub content: String,
    /// Intermediate reasoning trace; cleared exactly once when real content
    /// starts arriving
    pub reasoning: String,
    /// True from creation until the turn is confirmed complete
    pub pending: bool,
    /// Failure description; mutually exclusive with a clean completion
    pub error: Option<String>,
}

impl Message {
    /// Create a completed user message
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::User,
            content: content.into(),
            reasoning: String::new(),
            pending: false,
            error: None,
        }
    }

    /// Create the pending assistant message for a fresh turn
    pub fn pending_assistant() -> Self {
        Self {
            id: Uuid::new_v4(),
            role: Role::Assistant,
            content: String::new(),
            reasoning: String::new(),
            pending: true,
            error: None,
        }
    }
}
