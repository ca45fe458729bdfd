use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::sync::RwLock;

use crate::core::error::CredentialError;

/// Opaque persistence for the bearer token.
pub trait CredentialStore: Send + Sync {
    fn get(&self) -> Option<String>;
    fn set(&self, token: &str) -> Result<(), CredentialError>;
    fn remove(&self) -> Result<(), CredentialError>;
}

#[derive(Debug, Default)]
pub struct MemoryCredentialStore {
    token: RwLock<Option<String>>,
}

impl MemoryCredentialStore {
    pub fn new(token: Option<String>) -> Self {
        Self {
            token: RwLock::new(token),
        }
    }
}

impl CredentialStore for MemoryCredentialStore {
    fn get(&self) -> Option<String> {
        self.token.read().ok().and_then(|t| t.clone())
    }

    fn set(&self, token: &str) -> Result<(), CredentialError> {
        let mut slot = self
            .token
            .write()
            .map_err(|e| CredentialError::Io(e.to_string()))?;
        *slot = Some(token.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), CredentialError> {
        let mut slot = self
            .token
            .write()
            .map_err(|e| CredentialError::Io(e.to_string()))?;
        *slot = None;
        Ok(())
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CredentialFile {
    access_token: String,
}

/// Stores `{"access_token": ...}` in a JSON file.
#[derive(Debug, Clone)]
pub struct FileCredentialStore {
    path: PathBuf,
}

impl FileCredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    fn read(&self) -> Result<Option<String>, CredentialError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let content =
            std::fs::read_to_string(&self.path).map_err(|e| CredentialError::Io(e.to_string()))?;
        let file: CredentialFile =
            serde_json::from_str(&content).map_err(|e| CredentialError::Corrupt(e.to_string()))?;
        Ok(Some(file.access_token).filter(|t| !t.is_empty()))
    }
}

impl CredentialStore for FileCredentialStore {
    fn get(&self) -> Option<String> {
        match self.read() {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!("ignoring credential file {}: {e}", self.path.display());
                None
            }
        }
    }

    fn set(&self, token: &str) -> Result<(), CredentialError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| CredentialError::Io(e.to_string()))?;
        }
        let body = serde_json::to_string_pretty(&CredentialFile {
            access_token: token.to_string(),
        })
        .map_err(|e| CredentialError::Corrupt(e.to_string()))?;
        std::fs::write(&self.path, body).map_err(|e| CredentialError::Io(e.to_string()))
    }

    fn remove(&self) -> Result<(), CredentialError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(CredentialError::Io(e.to_string())),
        }
    }
}
