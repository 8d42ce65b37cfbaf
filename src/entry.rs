//! Configured entries and the JSON file they are kept in.

use crate::fingerprint::{Endpoint, EndpointError};
use crate::options::{str_field, FormData, CONF_API_KEY, CONF_BASE_URL};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("entry store I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("entry store is corrupt: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("no entry matches '{0}'")]
    NotFound(String),
    #[error("an entry for this endpoint already exists: {0}")]
    Duplicate(String),
}

/// One configured Kokoro server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigEntry {
    pub unique_id: String,
    pub title: String,
    pub data: FormData,
    #[serde(default)]
    pub options: FormData,
    pub created_at: DateTime<Utc>,
}

impl ConfigEntry {
    pub fn new(unique_id: impl Into<String>, title: impl Into<String>, data: FormData) -> Self {
        Self {
            unique_id: unique_id.into(),
            title: title.into(),
            data,
            options: FormData::new(),
            created_at: Utc::now(),
        }
    }

    /// Stored data with saved options layered on top.
    pub fn merged(&self) -> FormData {
        let mut merged = self.data.clone();
        for (k, v) in &self.options {
            merged.insert(k.clone(), v.clone());
        }
        merged
    }

    pub fn endpoint(&self) -> Result<Endpoint, EndpointError> {
        Endpoint::parse(
            str_field(&self.data, CONF_BASE_URL).unwrap_or_default(),
            str_field(&self.data, CONF_API_KEY),
        )
    }
}

/// Answers whether an endpoint identity is already configured.
pub trait EntryRegistry {
    fn is_configured(&self, unique_id: &str) -> Result<bool, StoreError>;
}

/// Entries persisted as pretty-printed JSON.
pub struct EntryStore {
    path: PathBuf,
    entries: Vec<ConfigEntry>,
}

impl EntryStore {
    /// Open the store at `path`, starting empty when the file does not exist.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let content = fs::read_to_string(&path)?;
            if content.trim().is_empty() {
                Vec::new()
            } else {
                serde_json::from_str(&content)?
            }
        } else {
            Vec::new()
        };
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn entries(&self) -> &[ConfigEntry] {
        &self.entries
    }

    /// Look up by unique id, unique-id prefix or exact title.
    pub fn get(&self, key: &str) -> Result<&ConfigEntry, StoreError> {
        self.index_of(key).map(|i| &self.entries[i])
    }

    pub fn add(&mut self, entry: ConfigEntry) -> Result<&ConfigEntry, StoreError> {
        if self.entries.iter().any(|e| e.unique_id == entry.unique_id) {
            return Err(StoreError::Duplicate(entry.unique_id));
        }
        info!(unique_id = %entry.unique_id, title = %entry.title, "Adding entry");
        self.entries.push(entry);
        self.save()?;
        Ok(&self.entries[self.entries.len() - 1])
    }

    pub fn update_options(&mut self, key: &str, options: FormData) -> Result<(), StoreError> {
        let i = self.index_of(key)?;
        info!(unique_id = %self.entries[i].unique_id, "Updating entry options");
        self.entries[i].options = options;
        self.save()
    }

    pub fn remove(&mut self, key: &str) -> Result<ConfigEntry, StoreError> {
        let i = self.index_of(key)?;
        let removed = self.entries.remove(i);
        info!(unique_id = %removed.unique_id, "Removed entry");
        self.save()?;
        Ok(removed)
    }

    fn index_of(&self, key: &str) -> Result<usize, StoreError> {
        self.entries
            .iter()
            .position(|e| e.unique_id == key || e.title == key)
            .or_else(|| {
                let mut matches = self
                    .entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| !key.is_empty() && e.unique_id.starts_with(key));
                match (matches.next(), matches.next()) {
                    (Some((i, _)), None) => Some(i),
                    _ => None,
                }
            })
            .ok_or_else(|| StoreError::NotFound(key.to_string()))
    }

    fn save(&self) -> Result<(), StoreError> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                fs::create_dir_all(dir)?;
            }
        }
        let content = serde_json::to_string_pretty(&self.entries)?;
        fs::write(&self.path, content)?;
        Ok(())
    }
}

impl EntryRegistry for EntryStore {
    fn is_configured(&self, unique_id: &str) -> Result<bool, StoreError> {
        Ok(self.entries.iter().any(|e| e.unique_id == unique_id))
    }
}
