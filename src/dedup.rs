// src/dedup.rs
//! Persisted set of job URLs already handled in earlier runs

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::core::FsOps;

#[derive(Debug, Default, Serialize, Deserialize)]
struct StoreFile {
    #[serde(default)]
    urls: BTreeSet<String>,
}

#[derive(Debug)]
pub struct DedupStore {
    path: PathBuf,
    urls: BTreeSet<String>,
}

impl DedupStore {
    /// Empty store bound to `path`; nothing is read
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            urls: BTreeSet::new(),
        }
    }

    /// Load the store. A missing or corrupt file yields an empty store.
    pub async fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        if !path.exists() {
            debug!("No scanned URL store at {}, starting empty", path.display());
            return Self::new(path);
        }

        match FsOps::read_document::<StoreFile>(&path).await {
            Ok(file) => {
                info!(
                    "Loaded {} scanned URLs from {}",
                    file.urls.len(),
                    path.display()
                );
                Self {
                    path,
                    urls: file.urls,
                }
            }
            Err(e) => {
                warn!("Failed to load scanned URLs from {}: {:#}", path.display(), e);
                Self::new(path)
            }
        }
    }

    pub fn contains(&self, url: &str) -> bool {
        self.urls.contains(url)
    }

    /// Returns true when the URL was not yet present
    pub fn add(&mut self, url: &str) -> bool {
        if self.urls.contains(url) {
            return false;
        }
        self.urls.insert(url.to_string())
    }

    pub fn len(&self) -> usize {
        self.urls.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urls.is_empty()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn persist(&self) -> Result<()> {
        let body = serde_json::to_string_pretty(&StoreFile {
            urls: self.urls.clone(),
        })
        .context("Failed to serialize scanned URLs")?;

        FsOps::write_file_atomic(&self.path, &body)
            .await
            .with_context(|| format!("Failed to save scanned URLs to {}", self.path.display()))?;

        debug!("Saved {} scanned URLs to {}", self.urls.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = DedupStore::load(dir.path().join("scanned_urls.json")).await;
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = DedupStore::new(dir.path().join("s.json"));

        assert!(store.add("https://a"));
        assert!(!store.add("https://a"));
        assert_eq!(store.len(), 1);
        assert!(store.contains("https://a"));
        assert!(!store.contains("https://b"));
    }

    #[tokio::test]
    async fn test_persist_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state").join("scanned_urls.json");

        let mut store = DedupStore::new(&path);
        store.add("https://b");
        store.add("https://a");
        store.persist().await.unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw, serde_json::json!({"urls": ["https://a", "https://b"]}));

        let reloaded = DedupStore::load(&path).await;
        assert_eq!(reloaded.len(), 2);
        assert!(reloaded.contains("https://a"));
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scanned_urls.json");
        std::fs::write(&path, "{not json").unwrap();

        let store = DedupStore::load(&path).await;
        assert!(store.is_empty());
    }
}
