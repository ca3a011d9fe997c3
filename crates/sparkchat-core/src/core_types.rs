//! Core type definitions for the chat session and the completion wire format
//!
//! `ChatMessage` is what a session stores and what the terminal renders. `WireMessage`
//! is the stripped-down role/content pair sent to the chat-completion endpoint.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Author of a message kept in the session. System prompts never enter the session.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::User => write!(f, "user"),
            Role::Assistant => write!(f, "assistant"),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    id: u64,
    role: Role,
    content: String,
    created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub(crate) fn new(id: u64, role: Role, content: String) -> Self {
        Self {
            id,
            role,
            content,
            created_at: Utc::now(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn to_wire(&self) -> WireMessage {
        WireMessage {
            role: match self.role {
                Role::User => WireRole::User,
                Role::Assistant => WireRole::Assistant,
            },
            content: self.content.clone(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WireRole {
    System,
    User,
    Assistant,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct WireMessage {
    pub role: WireRole,
    pub content: String,
}

impl WireMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: WireRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: WireRole::User,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationLevel {
    Info,
    Error,
}

/// Transient user-visible signal, rendered by the front end and then forgotten.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotificationLevel,
    pub title: String,
    pub description: String,
}

impl Notification {
    pub fn info(title: &str, description: &str) -> Self {
        Self {
            level: NotificationLevel::Info,
            title: title.to_string(),
            description: description.to_string(),
        }
    }

    pub fn error(title: &str, description: &str) -> Self {
        Self {
            level: NotificationLevel::Error,
            title: title.to_string(),
            description: description.to_string(),
        }
    }
}
