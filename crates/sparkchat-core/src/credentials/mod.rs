//! Persistence boundary for the API key and the system prompt.
//!
//! Both values live under fixed names in a small key-value store. Reads fall back to
//! built-in defaults, writes are durable before they return, and nothing is encrypted.

use crate::errors::ChatError;

pub mod file_store;
pub mod memory_store;

pub use file_store::FileCredentialStore;
pub use memory_store::InMemoryCredentialStore;

pub const API_KEY_NAME: &str = "openai_api_key";
pub const SYSTEM_PROMPT_NAME: &str = "system_prompt";
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant. Be concise and friendly.";

/// Durable string key-value storage.
pub trait CredentialStore: Send + Sync {
    fn get(&self, name: &str) -> Result<Option<String>, ChatError>;

    /// Persists `value` under `name`, overwriting any previous value.
    fn set(&mut self, name: &str, value: &str) -> Result<(), ChatError>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub api_key: String,
    pub system_prompt: String,
}

impl Default for Credentials {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
        }
    }
}

impl Credentials {
    /// Reads both values. An unset or empty prompt falls back to the default, an unset key
    /// reads as the empty string.
    pub fn load(store: &dyn CredentialStore) -> Result<Self, ChatError> {
        let api_key = store.get(API_KEY_NAME)?.unwrap_or_default();
        let system_prompt = store
            .get(SYSTEM_PROMPT_NAME)?
            .filter(|prompt| !prompt.is_empty())
            .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());

        Ok(Self {
            api_key,
            system_prompt,
        })
    }

    pub fn has_api_key(&self) -> bool {
        !self.api_key.is_empty()
    }

    /// Key suitable for display: the last four characters, everything else hidden.
    pub fn masked_api_key(&self) -> String {
        if self.api_key.is_empty() {
            return "(not set)".to_string();
        }
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let tail: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), tail)
    }
}
