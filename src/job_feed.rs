// src/job_feed.rs
//! CSV job feed: download (or read) and normalize into `JobListing`s

use anyhow::{Context, Result};
use reqwest::Client;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::core::FsOps;
use crate::types::JobListing;

const FEED_TIMEOUT_SECS: u64 = 30;

pub struct JobFeed {
    client: Client,
}

impl JobFeed {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(FEED_TIMEOUT_SECS))
            .build()
            .context("Failed to create HTTP client")?;
        Ok(Self { client })
    }

    /// Fetch the feed from an http(s) URL or a local path. Any failure here is fatal for the run.
    pub async fn fetch(&self, source: &str) -> Result<Vec<JobListing>> {
        let body = if source.starts_with("http://") || source.starts_with("https://") {
            self.download(source).await?
        } else {
            let path = source.strip_prefix("file://").unwrap_or(source);
            FsOps::read_file_safe(Path::new(path))
                .await
                .context("Failed to read local job feed")?
        };

        let listings = parse_job_listings(&body)
            .with_context(|| format!("Failed to parse job feed from {}", source))?;

        info!("Fetched {} job listings", listings.len());
        if let Some(sample) = listings.first() {
            info!(
                "Sample listing - Company: '{}', Title: '{}', URL: '{}'",
                sample.company, sample.title, sample.url
            );
        }
        Ok(listings)
    }

    async fn download(&self, url: &str) -> Result<String> {
        info!("Downloading job feed: {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to fetch job listings")?;

        if !response.status().is_success() {
            anyhow::bail!("Job feed returned HTTP {}", response.status());
        }

        response
            .text()
            .await
            .context("Failed to read job feed body")
    }
}

/// Parse CSV text into listings.
/// Headers are matched case- and whitespace-insensitively; rows without a URL and
/// repeated URLs are dropped.
pub fn parse_job_listings(text: &str) -> Result<Vec<JobListing>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .context("Job feed has no header row")?
        .iter()
        .map(|h| h.trim().to_lowercase())
        .collect();
    debug!("CSV columns found: {:?}", headers);

    if !headers.iter().any(|h| h == "url") {
        anyhow::bail!("Job feed has no 'url' column (columns: {:?})", headers);
    }

    let mut listings = Vec::new();
    let mut seen = HashSet::new();

    for (idx, record) in reader.records().enumerate() {
        let row_number = idx + 1;
        let record = record.with_context(|| format!("Malformed CSV row {}", row_number))?;

        let row: HashMap<&str, &str> = headers
            .iter()
            .map(String::as_str)
            .zip(record.iter())
            .collect();
        let field = |name: &str| row.get(name).map(|v| v.to_string()).unwrap_or_default();

        let url = field("url");
        if url.is_empty() {
            warn!("Skipping row {}: no URL", row_number);
            continue;
        }
        if !seen.insert(url.clone()) {
            debug!("Skipping row {}: duplicate URL {}", row_number, url);
            continue;
        }

        let company = ["company", "company_name", "employer"]
            .iter()
            .map(|key| field(*key))
            .find(|v| !v.is_empty())
            .or_else(|| record.get(0).map(str::to_string))
            .unwrap_or_default();
        if company.is_empty() {
            warn!("Company name missing for job at row {}. URL: {}", row_number, url);
        }

        listings.push(JobListing {
            title: field("title"),
            company,
            category: field("category"),
            size: field("size"),
            level: field("level"),
            city: field("city"),
            url,
            updated: field("updated"),
        });
    }

    Ok(listings)
}
