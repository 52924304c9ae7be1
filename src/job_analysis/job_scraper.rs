// src/job_analysis/job_scraper.rs
use super::{JobScraper, ScrapeError};
use crate::core::FsOps;
use crate::types::ScrapedDescription;
use crate::utils::{clean_text, truncate_chars};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::Utc;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use std::path::PathBuf;
use tracing::{debug, info, warn};

const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";
const MAX_DESCRIPTION_CHARS: usize = 5000;
const SNAPSHOT_DIR: &str = "debug_pages";

/// Plain HTTP scraper. Pages are parsed with CSS selectors, most specific first.
pub struct HttpJobScraper {
    client: Client,
    snapshot_dir: Option<PathBuf>,
}

impl HttpJobScraper {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            snapshot_dir: None,
        })
    }

    /// Keep a copy of every fetched page for selector debugging
    pub fn with_html_snapshots(mut self, enabled: bool) -> Self {
        self.snapshot_dir = enabled.then(|| PathBuf::from(SNAPSHOT_DIR));
        self
    }

    async fn save_snapshot(&self, html: &str) {
        let Some(dir) = &self.snapshot_dir else {
            return;
        };
        let path = dir.join(format!("{}.html", Utc::now().format("%Y%m%d_%H%M%S_%3f")));
        match FsOps::write_file_safe(&path, html).await {
            Ok(()) => debug!("Saved HTML snapshot to {}", path.display()),
            Err(e) => debug!("Failed to save HTML snapshot: {:#}", e),
        }
    }
}

#[async_trait]
impl JobScraper for HttpJobScraper {
    async fn fetch(&self, url: &str) -> Result<ScrapedDescription, ScrapeError> {
        info!("Fetching job post: {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ScrapeError::Status(response.status().as_u16()));
        }

        let html = response.text().await?;
        self.save_snapshot(&html).await;

        let (description, requirements) = extract_description(&html);
        if description.is_empty() {
            warn!("No description text extracted from {}", url);
            return Err(ScrapeError::NoContent);
        }

        debug!(
            "Extracted {} chars and {} requirements from {}",
            description.len(),
            requirements.len(),
            url
        );

        Ok(ScrapedDescription {
            url: url.to_string(),
            description,
            requirements,
        })
    }
}

/// Pull the description text and requirement bullets out of a job page.
/// Requirements are only returned when a dedicated list was found.
pub fn extract_description(html: &str) -> (String, Vec<String>) {
    let document = Html::parse_document(html);

    if let Some(found) = parse_company_description_list(&document) {
        return found;
    }

    let mut description = String::new();
    match parse_requirements_section(&document) {
        Ok(found) => return found,
        Err(container_text) => {
            if container_text.len() > description.len() {
                description = container_text;
            }
        }
    }

    if description.len() < 200 {
        description = longest(description, parse_generic_description(&document));
    }

    if description.len() < 200 {
        debug!("Using full page text as last resort");
        description = longest(description, body_text(&document));
    }

    (truncate_chars(&clean_text(&description), MAX_DESCRIPTION_CHARS), Vec::new())
}

/// Bulleted requirements inside a company-authored description block
fn parse_company_description_list(document: &Html) -> Option<(String, Vec<String>)> {
    let selectors = [
        ".userDesignedContent.company-description li",
        ".userDesignedContent .company-description li",
    ];

    for selector_str in selectors {
        let items = select_texts(document.root_element(), selector_str);
        if items.is_empty() {
            continue;
        }
        let description = items.join(" | ");
        if description.len() > 200 {
            debug!("Extracted {} requirement items from primary selector", items.len());
            return Some((truncate_chars(&description, MAX_DESCRIPTION_CHARS), items));
        }
    }
    None
}

/// Look for a "Requirements" heading followed by a list inside the description
/// container. On a miss, returns the container's full text for the caller to fall back on.
fn parse_requirements_section(document: &Html) -> Result<(String, Vec<String>), String> {
    let containers = [
        ".jobs-description__content.jobs-description-content",
        ".jobs-description__content--condensed",
    ];
    let Ok(heading_selector) = Selector::parse("h1, h2, h3, h4, h5, h6, p, strong, b") else {
        return Err(String::new());
    };

    let mut fallback = String::new();
    for container_selector in containers {
        let Ok(selector) = Selector::parse(container_selector) else {
            continue;
        };
        let Some(container) = document.select(&selector).next() else {
            continue;
        };

        let mut requirements = Vec::new();
        for heading in container.select(&heading_selector) {
            if !mentions_requirements(&element_text(heading)) {
                continue;
            }
            let list = following_list(heading).or_else(|| {
                heading
                    .parent()
                    .and_then(ElementRef::wrap)
                    .and_then(following_list)
            });
            if let Some(list) = list {
                requirements.extend(select_texts(list, "li"));
            }
        }

        if !requirements.is_empty() {
            let description = clean_text(&requirements.join(" | "));
            if description.len() > 100 {
                debug!("Extracted {} items under a Requirements heading", requirements.len());
                return Ok((truncate_chars(&description, MAX_DESCRIPTION_CHARS), requirements));
            }
        }

        let container_text = element_text(container);
        if container_text.len() > fallback.len() {
            fallback = container_text;
        }
    }
    Err(fallback)
}

fn parse_generic_description(document: &Html) -> String {
    let selectors = [
        "[class*='description']",
        "[class*='job-description']",
        "[class*='posting-description']",
        "article",
        "main",
        "section",
    ];

    let mut best = String::new();
    for selector_str in selectors {
        let text = select_texts(document.root_element(), selector_str).join(" ");
        best = longest(best, text);
        if best.len() > 400 {
            break;
        }
    }
    best
}

fn body_text(document: &Html) -> String {
    select_texts(document.root_element(), "body").join(" ")
}

/// First `<ul>` among the following siblings of `element`
fn following_list(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element
        .next_siblings()
        .filter_map(ElementRef::wrap)
        .find(|sibling| sibling.value().name() == "ul")
}

fn mentions_requirements(text: &str) -> bool {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .any(|word| word == "requirement" || word == "requirements")
}

fn select_texts(scope: ElementRef<'_>, selector_str: &str) -> Vec<String> {
    let Ok(selector) = Selector::parse(selector_str) else {
        return Vec::new();
    };
    scope
        .select(&selector)
        .map(element_text)
        .filter(|text| !text.is_empty())
        .collect()
}

fn element_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

fn longest(current: String, candidate: String) -> String {
    if candidate.len() > current.len() {
        candidate
    } else {
        current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bullets(n: usize) -> String {
        (0..n)
            .map(|i| format!("<li>Requirement number {} with enough words to matter</li>", i))
            .collect()
    }

    #[test]
    fn test_company_description_list_yields_requirements() {
        let html = format!(
            r#"<html><body><div class="userDesignedContent company-description"><ul>{}</ul></div></body></html>"#,
            bullets(6)
        );
        let (description, requirements) = extract_description(&html);

        assert_eq!(requirements.len(), 6);
        assert_eq!(requirements[0], "Requirement number 0 with enough words to matter");
        assert!(description.contains(" | "));
    }

    #[test]
    fn test_requirements_heading_followed_by_list() {
        let html = format!(
            r#"<html><body>
                <div class="jobs-description__content jobs-description-content">
                    <h3>About us</h3><p>We build things.</p>
                    <h3>Key Requirements:</h3>
                    <ul>{}</ul>
                </div>
            </body></html>"#,
            bullets(4)
        );
        let (description, requirements) = extract_description(&html);

        assert_eq!(requirements.len(), 4);
        assert!(description.starts_with("Requirement number 0"));
    }

    #[test]
    fn test_requirements_list_in_parent_sibling() {
        let html = format!(
            r#"<div class="jobs-description__content--condensed">
                <div><strong>Requirements</strong></div>
                <ul>{}</ul>
            </div>"#,
            bullets(3)
        );
        let (_, requirements) = extract_description(&html);
        assert_eq!(requirements.len(), 3);
    }

    #[test]
    fn test_generic_fallback_has_no_requirements() {
        let text = "Build data pipelines in Rust and Python. ".repeat(10);
        let html = format!(
            r#"<html><body><nav>Menu</nav><div class="job-description">{}</div></body></html>"#,
            text
        );
        let (description, requirements) = extract_description(&html);

        assert!(requirements.is_empty());
        assert!(description.starts_with("Build data pipelines"));
        assert!(!description.contains("Menu"));
    }

    #[test]
    fn test_body_text_is_last_resort() {
        let html = "<html><body><p>Short   posting\n text</p></body></html>";
        let (description, requirements) = extract_description(html);
        assert_eq!(description, "Short posting text");
        assert!(requirements.is_empty());
    }

    #[test]
    fn test_description_is_capped() {
        let text = "word ".repeat(3000);
        let html = format!("<main>{}</main>", text);
        let (description, _) = extract_description(&html);
        assert_eq!(description.chars().count(), MAX_DESCRIPTION_CHARS);
    }

    #[test]
    fn test_mentions_requirements() {
        assert!(mentions_requirements("Minimum Requirements:"));
        assert!(mentions_requirements("requirement"));
        assert!(!mentions_requirements("Requirementsish"));
    }
}
