// src/cover_letter.rs
//! Cover letter files for high-scoring jobs

use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::FsOps;
use crate::types::{JobListing, Resume};
use crate::utils::sanitize_filename_part;

/// Writes generated letters into the per-run directory, wrapped with a
/// date/company/name header and the candidate's contact lines.
pub struct CoverLetterWriter {
    dir: PathBuf,
    candidate_name: String,
    email: Option<String>,
    phone: Option<String>,
}

impl CoverLetterWriter {
    pub fn new(dir: impl Into<PathBuf>, resume: &Resume) -> Self {
        let non_empty = |value: &Option<String>| {
            value
                .as_deref()
                .map(str::trim)
                .filter(|v| !v.is_empty())
                .map(str::to_string)
        };

        Self {
            dir: dir.into(),
            candidate_name: resume.name.trim().to_string(),
            email: non_empty(&resume.contact.email),
            phone: non_empty(&resume.contact.phone),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn file_name(job: &JobListing, now: &DateTime<Local>) -> String {
        format!(
            "{}_{}_{}.txt",
            sanitize_filename_part(&job.title, "job"),
            sanitize_filename_part(&job.company, "company"),
            now.format("%Y%m%d_%H%M%S")
        )
    }

    pub fn render(&self, company: &str, letter: &str, now: &DateTime<Local>) -> String {
        let mut text = format!(
            "{}\n{}\n{}\n\n{}",
            now.format("%B %d, %Y"),
            company,
            self.candidate_name,
            letter.trim()
        );

        let contact: Vec<String> = [("Email", &self.email), ("Phone", &self.phone)]
            .into_iter()
            .filter_map(|(label, value)| value.as_ref().map(|v| format!("{}: {}", label, v)))
            .collect();
        if !contact.is_empty() {
            text.push_str("\n\n");
            text.push_str(&contact.join("\n"));
        }
        text.push('\n');
        text
    }

    /// Write the letter and return its path. Never overwrites an existing file.
    pub async fn write(&self, job: &JobListing, letter: &str) -> Result<PathBuf> {
        let now = Local::now();
        let file_name = Self::file_name(job, &now);

        let mut path = self.dir.join(&file_name);
        let stem = file_name.trim_end_matches(".txt").to_string();
        let mut attempt = 1;
        while path.exists() {
            attempt += 1;
            path = self.dir.join(format!("{}_{}.txt", stem, attempt));
        }

        FsOps::write_file_safe(&path, &self.render(&job.company, letter, &now))
            .await
            .with_context(|| format!("Failed to write cover letter for {}", job.title))?;

        info!("Cover letter saved: {}", path.display());
        Ok(path)
    }
}
