// src/matcher.rs
//! The per-job pipeline: dedup, scrape, distance, score, cover letter

use chrono::Utc;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::Settings;
use crate::cover_letter::CoverLetterWriter;
use crate::dedup::DedupStore;
use crate::job_analysis::{CoverLetterRequest, JobScraper, LlmClient};
use crate::location::{DistanceCheck, LocationFilter};
use crate::types::job::RECORD_DESCRIPTION_CHARS;
use crate::types::{
    CoverLetter, Distance, JobListing, MatchRecord, RequirementScore, Resume, ScoreResult,
    ScrapeStatus, ScrapedDescription,
};
use crate::utils::{ellipsize, truncate_chars};

/// The subset of settings the pipeline acts on
#[derive(Debug, Clone)]
pub struct MatchOptions {
    pub score_threshold: f64,
    pub max_jobs: usize,
    pub rescan_all: bool,
    pub cover_letters: bool,
    pub scoring_guide: Option<String>,
    pub request_delay: Duration,
}

impl From<&Settings> for MatchOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            score_threshold: settings.score_threshold,
            max_jobs: settings.max_jobs,
            rescan_all: settings.rescan_all_jobs,
            cover_letters: settings.cover_letters,
            scoring_guide: settings.llm.scoring_guide.clone(),
            request_delay: settings.request_delay,
        }
    }
}

enum JobOutcome {
    Recorded(MatchRecord),
    OutOfRange(f64),
}

pub struct JobMatcher {
    options: MatchOptions,
    resume: Resume,
    resume_text: String,
    core_skills: Vec<String>,
    scraper: Box<dyn JobScraper>,
    llm: Box<dyn LlmClient>,
    location: Option<LocationFilter>,
    letters: CoverLetterWriter,
}

impl JobMatcher {
    pub fn new(
        options: MatchOptions,
        resume: Resume,
        scraper: Box<dyn JobScraper>,
        llm: Box<dyn LlmClient>,
        letters: CoverLetterWriter,
    ) -> Self {
        let resume_text = resume.to_text();
        let core_skills = resume.core_skills();
        Self {
            options,
            resume,
            resume_text,
            core_skills,
            scraper,
            llm,
            location: None,
            letters,
        }
    }

    pub fn with_location_filter(mut self, filter: Option<LocationFilter>) -> Self {
        self.location = filter;
        self
    }

    /// Process listings in feed order until `max_jobs` records exist.
    /// URLs of scored jobs are added to `store` and persisted as they complete.
    pub async fn run(&mut self, listings: &[JobListing], store: &mut DedupStore) -> Vec<MatchRecord> {
        let mut records: Vec<MatchRecord> = Vec::new();
        let mut already_seen = 0usize;
        let mut out_of_range = 0usize;

        info!(
            "Processing up to {} of {} jobs (threshold {:.1})",
            self.options.max_jobs,
            listings.len(),
            self.options.score_threshold
        );

        for (index, job) in listings.iter().enumerate() {
            if records.len() >= self.options.max_jobs {
                info!("Reached max_jobs limit ({})", self.options.max_jobs);
                break;
            }

            if !self.options.rescan_all && store.contains(&job.url) {
                debug!("Skipping already scanned job: {}", job.url);
                already_seen += 1;
                continue;
            }

            info!(
                "[{}/{}] {} at {}",
                records.len() + 1,
                self.options.max_jobs,
                job.title,
                job.company
            );

            match self.process(job).await {
                JobOutcome::Recorded(record) => {
                    if record.is_scored() && store.add(&job.url) {
                        if let Err(e) = store.persist().await {
                            warn!("{:#}", e);
                        }
                    }
                    records.push(record);
                }
                JobOutcome::OutOfRange(km) => {
                    info!(
                        "Skipping {} in '{}': {:.1} km exceeds the limit",
                        job.title, job.city, km
                    );
                    out_of_range += 1;
                }
            }

            let more_remaining = index + 1 < listings.len();
            if more_remaining
                && records.len() < self.options.max_jobs
                && !self.options.request_delay.is_zero()
            {
                tokio::time::sleep(self.options.request_delay).await;
            }
        }

        let above = records.iter().filter(|r| r.above_threshold).count();
        info!(
            "Processed {} jobs, {} above threshold {:.1} ({} already scanned, {} out of range)",
            records.len(),
            above,
            self.options.score_threshold,
            already_seen,
            out_of_range
        );
        records
    }

    async fn process(&mut self, job: &JobListing) -> JobOutcome {
        let scraped = match self.scraper.fetch(&job.url).await {
            Ok(scraped) => scraped,
            Err(e) => {
                warn!("Failed to fetch description for {}: {}", job.url, e);
                return JobOutcome::Recorded(MatchRecord::scrape_failed(job.clone(), e.to_string()));
            }
        };

        let distance = match self.location.as_mut() {
            Some(filter) => match filter.check(&job.city).await {
                DistanceCheck::Keep(distance) => distance,
                DistanceCheck::Reject(km) => return JobOutcome::OutOfRange(km),
            },
            None => Distance::NotChecked,
        };

        let scored = self
            .llm
            .score(
                &self.resume_text,
                &scraped.description,
                self.options.scoring_guide.as_deref(),
            )
            .await;

        let record = match scored {
            Ok(score) => self.scored_record(job, scraped, score, distance).await,
            Err(e) => {
                warn!("LLM scoring failed for {} at {}: {}", job.title, job.company, e);
                MatchRecord {
                    job: job.clone(),
                    scrape: ScrapeStatus::Scraped,
                    score: None,
                    rationale: format!("Scoring failed: {}", e),
                    strengths: Vec::new(),
                    gaps: Vec::new(),
                    requirement_scores: Vec::new(),
                    description: truncate_chars(&scraped.description, RECORD_DESCRIPTION_CHARS),
                    distance,
                    cover_letter: CoverLetter::Skipped,
                    above_threshold: false,
                    processed_at: Utc::now(),
                }
            }
        };
        JobOutcome::Recorded(record)
    }

    async fn scored_record(
        &self,
        job: &JobListing,
        scraped: ScrapedDescription,
        score: ScoreResult,
        distance: Distance,
    ) -> MatchRecord {
        let requirement_scores = self.analyze_requirements(job, &scraped.requirements).await;

        let above_threshold = score.score >= self.options.score_threshold;
        let cover_letter = if !above_threshold {
            info!(
                "Job below threshold (score {:.1} < {:.1})",
                score.score, self.options.score_threshold
            );
            CoverLetter::Skipped
        } else {
            info!(
                "Job above threshold (score {:.1} >= {:.1})",
                score.score, self.options.score_threshold
            );
            if self.options.cover_letters {
                self.cover_letter(job, &scraped.description).await
            } else {
                CoverLetter::Disabled
            }
        };

        MatchRecord {
            job: job.clone(),
            scrape: ScrapeStatus::Scraped,
            score: Some(score.score),
            rationale: score.rationale,
            strengths: score.strengths,
            gaps: score.gaps,
            requirement_scores,
            description: truncate_chars(&scraped.description, RECORD_DESCRIPTION_CHARS),
            distance,
            cover_letter,
            above_threshold,
            processed_at: Utc::now(),
        }
    }

    async fn analyze_requirements(
        &self,
        job: &JobListing,
        requirements: &[String],
    ) -> Vec<RequirementScore> {
        if requirements.is_empty() {
            return Vec::new();
        }

        match self
            .llm
            .analyze_requirements(requirements, &self.core_skills)
            .await
        {
            Ok(table) => {
                log_requirement_table(job, &table);
                table
            }
            Err(e) => {
                warn!("Requirement analysis failed for {}: {}", job.url, e);
                Vec::new()
            }
        }
    }

    async fn cover_letter(&self, job: &JobListing, description: &str) -> CoverLetter {
        let request = CoverLetterRequest {
            resume_text: &self.resume_text,
            candidate_name: &self.resume.name,
            job_title: &job.title,
            company: &job.company,
            job_description: description,
            location: &job.city,
            skills: &self.resume.skills,
        };

        let letter = match self.llm.cover_letter(&request).await {
            Ok(letter) if !letter.trim().is_empty() => letter,
            Ok(_) => {
                warn!("Empty cover letter returned for {}", job.url);
                return CoverLetter::Unavailable {
                    reason: "empty cover letter".to_string(),
                };
            }
            Err(e) => {
                warn!("Cover letter generation failed for {}: {}", job.url, e);
                return CoverLetter::Unavailable {
                    reason: e.to_string(),
                };
            }
        };

        match self.letters.write(job, &letter).await {
            Ok(path) => CoverLetter::Written { path },
            Err(e) => {
                warn!("{:#}", e);
                CoverLetter::Unavailable {
                    reason: format!("{:#}", e),
                }
            }
        }
    }
}

fn log_requirement_table(job: &JobListing, table: &[RequirementScore]) {
    info!("Requirement analysis for: {} at {}", job.title, job.company);
    info!("{:<50} {:<6} Reason", "Requirement", "Score");
    for row in table {
        info!(
            "{:<50} {:<6} {}",
            ellipsize(&row.requirement, 50),
            row.score,
            ellipsize(&row.reason, 50)
        );
    }
}
