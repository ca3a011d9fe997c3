use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use super::CredentialStore;
use crate::errors::ChatError;

/// TOML-file backed store. The whole document is rewritten on every `set`.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
    values: BTreeMap<String, String>,
}

impl FileCredentialStore {
    /// Opens the store at `path`. A missing file is an empty store.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ChatError> {
        let path = path.as_ref().to_path_buf();
        let values = if path.exists() {
            let content = fs::read_to_string(&path).map_err(|e| {
                ChatError::Storage(format!("Failed to read {}: {}", path.display(), e))
            })?;
            toml::from_str::<BTreeMap<String, String>>(&content).map_err(|e| {
                ChatError::Storage(format!("Failed to parse {}: {}", path.display(), e))
            })?
        } else {
            BTreeMap::new()
        };

        log::debug!(
            "Opened credential store at {} ({} entries)",
            path.display(),
            values.len()
        );

        Ok(Self { path, values })
    }

    pub fn default_path() -> Result<PathBuf, ChatError> {
        dirs::config_dir()
            .map(|dir| dir.join("sparkchat").join("credentials.toml"))
            .ok_or_else(|| ChatError::Storage("Could not determine config directory".to_string()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self) -> Result<(), ChatError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        let content = toml::to_string(&self.values)
            .map_err(|e| ChatError::Storage(format!("Failed to serialize credentials: {}", e)))?;

        let tmp_path = self.path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self, name: &str) -> Result<Option<String>, ChatError> {
        Ok(self.values.get(name).cloned())
    }

    fn set(&mut self, name: &str, value: &str) -> Result<(), ChatError> {
        let previous = self.values.insert(name.to_string(), value.to_string());
        if let Err(e) = self.persist() {
            // Keep memory in step with disk when the write fails.
            match previous {
                Some(old) => self.values.insert(name.to_string(), old),
                None => self.values.remove(name),
            };
            return Err(e);
        }
        log::info!("Saved '{}' to {}", name, self.path.display());
        Ok(())
    }
}
