//! Core library for the Spark Chat client.
//!
//! This crate holds everything behind the chat window except rendering:
//!
//! - **Session**: the in-memory ordered message log for one conversation
//! - **Credentials**: API key and system prompt behind a pluggable persistence boundary
//! - **Completion client**: the OpenAI-compatible chat-completion call
//! - **Chat session**: the `Idle`/`Sending` state machine tying the three together, with a
//!   single-flight guard, timeout and cancellation
//! - **Configuration**: defaults layered with an optional TOML file

pub mod chat_session;
pub mod config;
pub mod core_types;
pub mod credentials;
pub mod errors;
pub mod llm;
pub mod session;

pub use chat_session::{ChatSession, ChatState, CompletionOutcome, PendingCompletion};
pub use config::Config;
pub use core_types::{ChatMessage, Notification, NotificationLevel, Role, WireMessage, WireRole};
pub use credentials::{CredentialStore, Credentials, FileCredentialStore, InMemoryCredentialStore};
pub use errors::ChatError;
pub use llm::{ChatCompletion, OpenAIClient};
pub use session::Session;

#[cfg(test)]
pub mod test_utils;
