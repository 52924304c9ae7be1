// src/job_analysis/mod.rs
//! External collaborators of the matcher: the job page scraper and the LLM.
//! Both sit behind traits so the pipeline can run against fakes.

use async_trait::async_trait;
use thiserror::Error;

use crate::types::{RequirementScore, ScoreResult, ScrapedDescription};

pub mod gemini_client;
pub mod job_scraper;
pub mod prompts;

pub use gemini_client::GeminiClient;
pub use job_scraper::HttpJobScraper;

#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("page returned HTTP {0}")]
    Status(u16),

    #[error("no job description found on page")]
    NoContent,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("LLM returned empty content")]
    EmptyContent,

    #[error("unparseable LLM output: {0}")]
    Parse(String),
}

/// Inputs for a tailored cover letter
#[derive(Debug, Clone, Copy)]
pub struct CoverLetterRequest<'a> {
    pub resume_text: &'a str,
    pub candidate_name: &'a str,
    pub job_title: &'a str,
    pub company: &'a str,
    pub job_description: &'a str,
    pub location: &'a str,
    pub skills: &'a [String],
}

#[async_trait]
pub trait JobScraper: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<ScrapedDescription, ScrapeError>;
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn score(
        &self,
        resume_text: &str,
        job_description: &str,
        scoring_guide: Option<&str>,
    ) -> Result<ScoreResult, LlmError>;

    async fn analyze_requirements(
        &self,
        requirements: &[String],
        core_skills: &[String],
    ) -> Result<Vec<RequirementScore>, LlmError>;

    async fn cover_letter(&self, request: &CoverLetterRequest<'_>) -> Result<String, LlmError>;
}
