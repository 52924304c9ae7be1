// src/core/config_manager.rs
//! Configuration loading: one validated, immutable `Settings` per run

use anyhow::{Context, Result};
use chrono::Local;
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{DocumentFormat, FsOps};
use crate::utils::{apply_timestamp, resolve_path};

pub const DEFAULT_CONFIG_PATH: &str = "job_matcher_config.json";
pub const API_KEY_ENV: &str = "GEMINI_API_KEY";

const DEFAULT_LOG_FILE: &str = "logs/job_matcher_YYYYMMDD_HHMMSS.log";
const DEFAULT_SUMMARY_FILE: &str = "summaries/job_summary.html";
const DEFAULT_MATCHES_JSON: &str = "matched_jobs.json";
const DEFAULT_COVER_LETTER_DIR: &str = "cover_letters";
const DEFAULT_SCANNED_URLS_FILE: &str = "scanned_urls.json";
const DEFAULT_GEMINI_MODEL: &str = "gemini-1.5-flash-latest";
const DEFAULT_GEMINI_API_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_GEOCODER_URL: &str = "https://nominatim.openstreetmap.org";
const DEFAULT_REQUEST_DELAY_MS: u64 = 500;

/// Config file as written by the user. Unknown keys are ignored.
#[derive(Debug, Default, Deserialize)]
struct RawConfig {
    csv: Option<String>,
    score_threshold: Option<f64>,
    max_jobs: Option<i64>,
    resume: Option<String>,
    log_file: Option<String>,
    log_level: Option<String>,
    #[serde(default)]
    debug: bool,
    summary_file: Option<String>,
    matches_json: Option<String>,
    cover_letter_dir: Option<String>,
    scanned_urls_file: Option<String>,
    #[serde(default)]
    save_html: bool,
    use_llm: Option<bool>,
    cover_letters: Option<bool>,
    gemini_model: Option<String>,
    gemini_api_url: Option<String>,
    google_api_key_file: Option<String>,
    #[serde(default)]
    rescan_all_jobs: bool,
    target_location: Option<String>,
    max_distance_km: Option<f64>,
    geocoder_url: Option<String>,
    llm_scoring_guide_file: Option<String>,
    llm_scoring_guide: Option<String>,
    request_delay_ms: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub csv_source: String,
    pub score_threshold: f64,
    pub max_jobs: usize,
    pub resume_path: PathBuf,
    pub logging: LoggingConfig,
    pub summary_file: PathBuf,
    pub matches_json: PathBuf,
    /// Per-run directory, `run_<timestamp>` under the configured cover letter dir
    pub cover_letter_dir: PathBuf,
    pub scanned_urls_file: PathBuf,
    pub save_html: bool,
    pub cover_letters: bool,
    pub llm: LlmConfig,
    pub rescan_all_jobs: bool,
    /// Present only when both target and radius are configured
    pub location: Option<LocationConfig>,
    pub request_delay: Duration,
    pub run_timestamp: String,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_file: PathBuf,
    pub level: String,
    pub debug: bool,
}

#[derive(Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub model: String,
    pub api_url: String,
    pub scoring_guide: Option<String>,
}

impl fmt::Debug for LlmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmConfig")
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .field("api_url", &self.api_url)
            .field("scoring_guide", &self.scoring_guide.as_ref().map(|g| g.len()))
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct LocationConfig {
    pub target: String,
    pub max_distance_km: f64,
    pub geocoder_url: String,
}

pub struct ConfigManager;

impl ConfigManager {
    /// Load settings from a config file, taking the API key fallback from the environment
    pub async fn load(config_path: &Path) -> Result<Settings> {
        let env_key = std::env::var(API_KEY_ENV).ok();
        Self::load_with_env_key(config_path, env_key).await
    }

    pub async fn load_with_env_key(
        config_path: &Path,
        env_api_key: Option<String>,
    ) -> Result<Settings> {
        if !config_path.exists() {
            anyhow::bail!("Configuration file not found: {}", config_path.display());
        }

        let content = FsOps::read_file_safe(config_path).await?;
        let raw: RawConfig = DocumentFormat::from_path(config_path)
            .parse(&content)
            .with_context(|| format!("Invalid configuration file: {}", config_path.display()))?;

        let base_dir = config_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        let base_dir = std::path::absolute(&base_dir)
            .with_context(|| format!("Failed to resolve {}", base_dir.display()))?;

        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        Self::build(raw, &base_dir, timestamp, env_api_key).await
    }

    async fn build(
        raw: RawConfig,
        base_dir: &Path,
        run_timestamp: String,
        env_api_key: Option<String>,
    ) -> Result<Settings> {
        let csv_source = raw
            .csv
            .filter(|s| !s.trim().is_empty())
            .context("Config must define 'csv' (job source)")?;
        let csv_source = resolve_csv_source(base_dir, csv_source.trim());

        let score_threshold = raw
            .score_threshold
            .context("Config must define 'score_threshold'")?;
        if !score_threshold.is_finite() || score_threshold <= 0.0 || score_threshold > 100.0 {
            anyhow::bail!(
                "Config 'score_threshold' must be in (0, 100], got {}",
                score_threshold
            );
        }

        let max_jobs = raw.max_jobs.context("Config must define 'max_jobs'")?;
        if max_jobs <= 0 {
            anyhow::bail!("Config 'max_jobs' must be > 0, got {}", max_jobs);
        }

        let resume_path = raw
            .resume
            .filter(|s| !s.trim().is_empty())
            .map(|r| resolve_path(base_dir, &r))
            .context("Config must define 'resume'")?;
        if !resume_path.exists() {
            anyhow::bail!("Resume file not found: {}", resume_path.display());
        }

        if raw.use_llm == Some(false) {
            anyhow::bail!("LLM evaluation is required. Set 'use_llm': true in config.");
        }

        let path_or = |value: Option<String>, default: &str| {
            let value = value.unwrap_or_else(|| default.to_string());
            resolve_path(base_dir, &apply_timestamp(&value, &run_timestamp))
        };

        let logging = LoggingConfig {
            log_file: path_or(raw.log_file, DEFAULT_LOG_FILE),
            level: raw
                .log_level
                .map(|l| l.to_lowercase())
                .unwrap_or_else(|| if raw.debug { "debug" } else { "info" }.to_string()),
            debug: raw.debug,
        };

        let cover_letter_dir = path_or(raw.cover_letter_dir, DEFAULT_COVER_LETTER_DIR)
            .join(format!("run_{}", run_timestamp));
        let summary_file = path_or(raw.summary_file, DEFAULT_SUMMARY_FILE);
        let matches_json = path_or(raw.matches_json, DEFAULT_MATCHES_JSON);
        let scanned_urls_file = path_or(raw.scanned_urls_file, DEFAULT_SCANNED_URLS_FILE);

        let api_key = Self::resolve_api_key(
            base_dir,
            raw.google_api_key_file.as_deref(),
            env_api_key,
        )
        .await?;

        let scoring_guide = match raw.llm_scoring_guide_file.as_deref() {
            Some(file) => {
                let path = resolve_path(base_dir, file);
                let guide = FsOps::read_file_safe(&path)
                    .await
                    .context("Failed to load 'llm_scoring_guide_file'")?;
                Some(guide)
            }
            None => raw.llm_scoring_guide,
        }
        .map(|g| g.trim().to_string())
        .filter(|g| !g.is_empty());

        let llm = LlmConfig {
            api_key,
            model: raw
                .gemini_model
                .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_string()),
            api_url: raw
                .gemini_api_url
                .unwrap_or_else(|| DEFAULT_GEMINI_API_URL.to_string()),
            scoring_guide,
        };

        let location = match (raw.target_location, raw.max_distance_km) {
            (Some(target), Some(max_distance_km)) if !target.trim().is_empty() => {
                if !max_distance_km.is_finite() || max_distance_km <= 0.0 {
                    anyhow::bail!(
                        "Config 'max_distance_km' must be > 0, got {}",
                        max_distance_km
                    );
                }
                Some(LocationConfig {
                    target: target.trim().to_string(),
                    max_distance_km,
                    geocoder_url: raw
                        .geocoder_url
                        .unwrap_or_else(|| DEFAULT_GEOCODER_URL.to_string()),
                })
            }
            _ => None,
        };

        Ok(Settings {
            csv_source,
            score_threshold,
            max_jobs: max_jobs as usize,
            resume_path,
            logging,
            summary_file,
            matches_json,
            cover_letter_dir,
            scanned_urls_file,
            save_html: raw.save_html,
            cover_letters: raw.cover_letters.unwrap_or(true),
            llm,
            rescan_all_jobs: raw.rescan_all_jobs,
            location,
            request_delay: Duration::from_millis(
                raw.request_delay_ms.unwrap_or(DEFAULT_REQUEST_DELAY_MS),
            ),
            run_timestamp,
        })
    }

    /// Secret file first, environment variable second
    async fn resolve_api_key(
        base_dir: &Path,
        key_file: Option<&str>,
        env_api_key: Option<String>,
    ) -> Result<String> {
        if let Some(file) = key_file {
            let path = resolve_path(base_dir, file);
            if path.exists() {
                let key = FsOps::read_file_safe(&path).await?.trim().to_string();
                if !key.is_empty() {
                    return Ok(key);
                }
            }
        }

        env_api_key
            .map(|k| k.trim().to_string())
            .filter(|k| !k.is_empty())
            .with_context(|| {
                format!(
                    "Gemini API key missing. Set {} or provide 'google_api_key_file'{}",
                    API_KEY_ENV,
                    key_file
                        .map(|f| format!(" (checked {})", f))
                        .unwrap_or_default()
                )
            })
    }
}

/// URLs pass through; local paths resolve against the config directory
fn resolve_csv_source(base_dir: &Path, source: &str) -> String {
    if source.starts_with("http://") || source.starts_with("https://") {
        return source.to_string();
    }
    let path = source.strip_prefix("file://").unwrap_or(source);
    resolve_path(base_dir, path).to_string_lossy().into_owned()
}

impl Settings {
    /// Create output directories before the run starts
    pub async fn ensure_directories(&self) -> Result<()> {
        let parents = [
            self.logging.log_file.parent(),
            self.summary_file.parent(),
            self.matches_json.parent(),
            self.scanned_urls_file.parent(),
        ];
        for dir in parents.into_iter().flatten() {
            FsOps::ensure_dir_exists(dir).await?;
        }
        Ok(())
    }
}
