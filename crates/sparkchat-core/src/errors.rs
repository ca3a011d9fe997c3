//! Error types for the chat client
//!
//! Errors are grouped by where they occur. Pre-flight rejections (`EmptyMessage`,
//! `MissingCredential`, `RequestInFlight`) never touch the network. Post-flight failures
//! (`Transport`, `Status`, `MalformedResponse`, `Timeout`, `Cancelled`) all go through the
//! same notification path. Storage and configuration errors come from the persistence boundary.
//! `StaleOutcome` marks a completion handed back for a request that is no longer current.

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ChatError {
    #[error("Message is empty")]
    EmptyMessage,
    #[error("No API key configured")]
    MissingCredential,
    #[error("A response is still pending")]
    RequestInFlight,
    #[error("HTTP request failed: {0}")]
    Transport(String),
    #[error("API request failed with status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Malformed response: {0}")]
    MalformedResponse(String),
    #[error("Request timed out after {0:?}")]
    Timeout(Duration),
    #[error("Request cancelled")]
    Cancelled,
    #[error("Outcome for request {0} arrived after that request was superseded")]
    StaleOutcome(u64),
    #[error("Credential storage error: {0}")]
    Storage(String),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("I/O error: {0}")]
    Io(String),
}

impl ChatError {
    /// True for failures that happen after a request was issued.
    pub fn is_request_failure(&self) -> bool {
        matches!(
            self,
            ChatError::Transport(_)
                | ChatError::Status { .. }
                | ChatError::MalformedResponse(_)
                | ChatError::Timeout(_)
                | ChatError::Cancelled
        )
    }
}

impl From<std::io::Error> for ChatError {
    fn from(err: std::io::Error) -> Self {
        ChatError::Io(err.to_string())
    }
}

impl From<reqwest::Error> for ChatError {
    fn from(err: reqwest::Error) -> Self {
        ChatError::Transport(err.to_string())
    }
}
