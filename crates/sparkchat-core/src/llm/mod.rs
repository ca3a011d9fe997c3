//! Chat-completion abstraction and the hosted OpenAI-compatible client.
//!
//! The session layer only ever talks to `ChatCompletion`, so tests can swap in a scripted
//! implementation and the terminal can point the real client at any compatible base URL.

use crate::core_types::WireMessage;
use crate::errors::ChatError;
use async_trait::async_trait;

pub mod openai;

pub use openai::OpenAIClient;

pub const DEFAULT_API_BASE: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_TEMPERATURE: f32 = 0.7;
pub const DEFAULT_MAX_TOKENS: u32 = 1000;

#[async_trait]
pub trait ChatCompletion: Send + Sync {
    /// Sends the full ordered message list and returns the content of the first choice.
    async fn complete(&self, api_key: &str, messages: &[WireMessage]) -> Result<String, ChatError>;
}
