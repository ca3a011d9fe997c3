use std::collections::HashMap;

use super::CredentialStore;
use crate::errors::ChatError;

/// Store that lives only as long as the process.
#[derive(Debug, Default, Clone)]
pub struct InMemoryCredentialStore {
    values: HashMap<String, String>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(mut self, name: &str, value: &str) -> Self {
        self.values.insert(name.to_string(), value.to_string());
        self
    }
}

impl CredentialStore for InMemoryCredentialStore {
    fn get(&self, name: &str) -> Result<Option<String>, ChatError> {
        Ok(self.values.get(name).cloned())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), ChatError> {
        self.values.insert(name.to_string(), value.to_string());
        Ok(())
    }
}
