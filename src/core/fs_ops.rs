// src/core/fs_ops.rs
//! Unified file system operations shared by config, resume, dedup store and reports

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::debug;

/// Serialization formats accepted for user-authored documents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentFormat {
    Json,
    Toml,
    Yaml,
}

impl DocumentFormat {
    /// Pick the format from the file extension, JSON when unknown
    pub fn from_path(path: &Path) -> Self {
        match Self::get_extension(path).as_deref() {
            Some("toml") => Self::Toml,
            Some("yaml") | Some("yml") => Self::Yaml,
            _ => Self::Json,
        }
    }

    fn get_extension(path: &Path) -> Option<String> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| ext.to_lowercase())
    }

    pub fn parse<T: DeserializeOwned>(self, content: &str) -> Result<T> {
        match self {
            Self::Json => serde_json::from_str(content).context("Invalid JSON"),
            Self::Toml => toml::from_str(content).context("Invalid TOML"),
            Self::Yaml => serde_yaml::from_str(content).context("Invalid YAML"),
        }
    }
}

pub struct FsOps;

impl FsOps {
    /// Ensure directory exists
    pub async fn ensure_dir_exists(path: &Path) -> Result<()> {
        if !path.exists() {
            fs::create_dir_all(path)
                .await
                .with_context(|| format!("Failed to create directory: {}", path.display()))?;
            debug!("Created directory: {}", path.display());
        }
        Ok(())
    }

    pub async fn read_file_safe(path: &Path) -> Result<String> {
        fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))
    }

    /// Write file, creating the parent directory first
    pub async fn write_file_safe(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            Self::ensure_dir_exists(parent).await?;
        }

        fs::write(path, content)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display()))?;

        debug!("Written file: {}", path.display());
        Ok(())
    }

    /// Write to a sibling temp file then rename over the target.
    /// A crash mid-write leaves the previous content intact.
    pub async fn write_file_atomic(path: &Path, content: &str) -> Result<()> {
        let tmp_path = Self::temp_sibling(path);
        Self::write_file_safe(&tmp_path, content).await?;

        fs::rename(&tmp_path, path).await.with_context(|| {
            format!(
                "Failed to move {} to {}",
                tmp_path.display(),
                path.display()
            )
        })
    }

    /// Read a JSON/TOML/YAML document, format picked by extension
    pub async fn read_document<T: DeserializeOwned>(path: &Path) -> Result<T> {
        let content = Self::read_file_safe(path).await?;
        DocumentFormat::from_path(path)
            .parse(&content)
            .with_context(|| format!("Failed to parse {}", path.display()))
    }

    fn temp_sibling(path: &Path) -> PathBuf {
        let file_name = path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("data");
        path.with_file_name(format!(".{}.tmp", file_name))
    }
}
