// src/types/job.rs
//! Job listing, scrape, score and match record structures

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Maximum description characters kept on a match record
pub const RECORD_DESCRIPTION_CHARS: usize = 1000;

// ===== Feed =====

/// One row of the CSV feed. `url` is the unique key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobListing {
    pub title: String,
    pub company: String,
    pub category: String,
    pub size: String,
    pub level: String,
    pub city: String,
    pub url: String,
    #[serde(default)]
    pub updated: String,
}

// ===== Collaborator outputs =====

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScrapedDescription {
    pub url: String,
    pub description: String,
    pub requirements: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    /// Always within 0..=100
    pub score: f64,
    pub rationale: String,
    pub strengths: Vec<String>,
    pub gaps: Vec<String>,
}

/// One row of the per-requirement match table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequirementScore {
    pub requirement: String,
    /// 1 (irrelevant) to 10 (perfect match)
    pub score: u8,
    #[serde(default)]
    pub reason: String,
}

// ===== Record fields =====

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ScrapeStatus {
    Scraped,
    Failed { reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "km", rename_all = "snake_case")]
pub enum Distance {
    /// Location filtering was not active for this run
    NotChecked,
    Known(f64),
    /// Filtering was active but the job city could not be geocoded
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum CoverLetter {
    /// Not eligible: below threshold, unscored or not scraped
    Skipped,
    /// Eligible but cover letters are switched off in config
    Disabled,
    Written { path: PathBuf },
    Unavailable { reason: String },
}

// ===== Match record =====

/// One row of the final report. Built once per processed job and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub job: JobListing,
    pub scrape: ScrapeStatus,
    /// `None` when scraping or scoring failed
    pub score: Option<f64>,
    pub rationale: String,
    #[serde(default)]
    pub strengths: Vec<String>,
    #[serde(default)]
    pub gaps: Vec<String>,
    #[serde(default)]
    pub requirement_scores: Vec<RequirementScore>,
    pub description: String,
    pub distance: Distance,
    pub cover_letter: CoverLetter,
    pub above_threshold: bool,
    pub processed_at: DateTime<Utc>,
}

impl MatchRecord {
    pub fn scrape_failed(job: JobListing, reason: String) -> Self {
        Self {
            job,
            rationale: format!("Scrape failed: {}", reason),
            scrape: ScrapeStatus::Failed { reason },
            score: None,
            strengths: Vec::new(),
            gaps: Vec::new(),
            requirement_scores: Vec::new(),
            description: String::new(),
            distance: Distance::NotChecked,
            cover_letter: CoverLetter::Skipped,
            above_threshold: false,
            processed_at: Utc::now(),
        }
    }

    pub fn is_scored(&self) -> bool {
        self.score.is_some()
    }

    pub fn cover_letter_path(&self) -> Option<&Path> {
        match &self.cover_letter {
            CoverLetter::Written { path } => Some(path.as_path()),
            _ => None,
        }
    }
}
