// src/reporting.rs
//! JSON export and HTML dashboard for a run's match records

use anyhow::{Context, Result};
use chrono::Local;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::path::{Component, Path};
use tracing::{info, warn};

use crate::core::FsOps;
use crate::template_processor::TemplateProcessor;
use crate::types::{CoverLetter, Distance, MatchRecord};
use crate::utils::{escape_html, relative_path};

/// Write every record as a pretty JSON array
pub async fn write_matches_json(records: &[MatchRecord], path: &Path) -> Result<()> {
    let body = serde_json::to_string_pretty(records).context("Failed to serialize match records")?;
    FsOps::write_file_atomic(path, &body)
        .await
        .with_context(|| format!("Failed to write match JSON to {}", path.display()))?;
    info!("Wrote {} match records to {}", records.len(), path.display());
    Ok(())
}

pub async fn read_matches_json(path: &Path) -> Result<Vec<MatchRecord>> {
    let body = FsOps::read_file_safe(path).await?;
    serde_json::from_str(&body).with_context(|| format!("Invalid match JSON in {}", path.display()))
}

/// Score descending, unscored records last; ties keep feed order
pub fn sort_for_report(records: &[MatchRecord]) -> Vec<&MatchRecord> {
    let mut sorted: Vec<&MatchRecord> = records.iter().collect();
    sorted.sort_by(|a, b| match (a.score, b.score) {
        (Some(x), Some(y)) => y.partial_cmp(&x).unwrap_or(Ordering::Equal),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
    sorted
}

pub async fn write_html_summary(records: &[MatchRecord], path: &Path, threshold: f64) -> Result<()> {
    let html = render_html_summary(records, path, threshold);
    FsOps::write_file_safe(path, &html)
        .await
        .with_context(|| format!("Failed to write HTML summary to {}", path.display()))?;
    info!("Wrote HTML summary to {}", path.display());
    Ok(())
}

/// Cover letter links are made relative to the directory of `summary_path`
pub fn render_html_summary(records: &[MatchRecord], summary_path: &Path, threshold: f64) -> String {
    let summary_dir = summary_path.parent().unwrap_or_else(|| Path::new(""));
    let sorted = sort_for_report(records);

    let rows: Vec<String> = sorted
        .iter()
        .map(|record| render_row(record, summary_dir, threshold))
        .collect();
    let above = sorted
        .iter()
        .filter(|r| r.score.is_some_and(|s| s >= threshold))
        .count();

    let mut variables = HashMap::new();
    variables.insert("rows", rows.join("\n"));
    variables.insert("total", records.len().to_string());
    variables.insert("above", above.to_string());
    variables.insert("threshold", format!("{:.1}", threshold));
    variables.insert(
        "generated_at",
        Local::now().format("%Y-%m-%d %H:%M:%S").to_string(),
    );

    TemplateProcessor::dashboard().render(&variables)
}

fn render_row(record: &MatchRecord, summary_dir: &Path, threshold: f64) -> String {
    let job = &record.job;
    if job.company.is_empty() {
        warn!("Company missing for job: {} (URL: {})", job.title, job.url);
    }

    let row_class = match record.score {
        Some(score) if score >= threshold => r#" class="highlight""#,
        Some(_) => "",
        None => r#" class="unscored""#,
    };

    let score_cell = match record.score {
        Some(score) => format!(r#"<td data-order="{:.2}">{:.2}</td>"#, score, score),
        None => r#"<td data-order="-1">N/A</td>"#.to_string(),
    };

    let distance_cell = match record.distance {
        Distance::Known(km) => format!(r#"<td data-order="{:.1}">{:.1}</td>"#, km, km),
        Distance::Unknown => r#"<td data-order="-1">Unknown</td>"#.to_string(),
        Distance::NotChecked => r#"<td data-order="-1">N/A</td>"#.to_string(),
    };

    let cover_cell = match &record.cover_letter {
        CoverLetter::Written { path } => format!(
            r#"<a href="{}" target="_blank">Cover Letter</a>"#,
            escape_html(&href(summary_dir, path))
        ),
        CoverLetter::Unavailable { reason } => {
            format!(r#"<span title="{}">Unavailable</span>"#, escape_html(reason))
        }
        CoverLetter::Disabled | CoverLetter::Skipped => String::new(),
    };

    format!(
        "<tr{}>{}<td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td><td>{}</td>{}\
         <td><a href=\"{}\" target=\"_blank\">Job Posting</a></td><td>{}</td><td>{}</td></tr>",
        row_class,
        score_cell,
        escape_html(&job.title),
        escape_html(&job.company),
        escape_html(&job.category),
        escape_html(&job.size),
        escape_html(&job.level),
        escape_html(&job.city),
        distance_cell,
        escape_html(&job.url),
        escape_html(&record.rationale),
        cover_cell,
    )
}

/// Relative URL with forward slashes on every platform
fn href(summary_dir: &Path, target: &Path) -> String {
    relative_path(summary_dir, target)
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            Component::ParentDir => Some("..".to_string()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{JobListing, RequirementScore, ScrapeStatus};
    use chrono::Utc;
    use std::path::PathBuf;

    fn record(url: &str, score: Option<f64>) -> MatchRecord {
        MatchRecord {
            job: JobListing {
                title: format!("Title {}", url),
                company: "Acme & Sons".to_string(),
                category: "Eng".to_string(),
                size: "11-50".to_string(),
                level: "Senior".to_string(),
                city: "Paris".to_string(),
                url: format!("https://jobs.example.com/{}", url),
                updated: String::new(),
            },
            scrape: ScrapeStatus::Scraped,
            score,
            rationale: "<b>fit</b>".to_string(),
            strengths: vec!["Rust".to_string()],
            gaps: Vec::new(),
            requirement_scores: vec![RequirementScore {
                requirement: "Rust".to_string(),
                score: 8,
                reason: "core".to_string(),
            }],
            description: "desc".to_string(),
            distance: Distance::Known(12.345),
            cover_letter: CoverLetter::Skipped,
            above_threshold: score.is_some_and(|s| s >= 80.0),
            processed_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_json_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("matched_jobs.json");

        let mut with_letter = record("a", Some(91.0));
        with_letter.cover_letter = CoverLetter::Written {
            path: PathBuf::from("/tmp/letters/a.txt"),
        };
        let mut failed = MatchRecord::scrape_failed(record("b", None).job, "timeout".to_string());
        failed.distance = Distance::Unknown;
        let records = vec![with_letter, failed];

        write_matches_json(&records, &path).await.unwrap();
        let loaded = read_matches_json(&path).await.unwrap();
        assert_eq!(loaded, records);

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[0]["cover_letter"]["status"], "written");
        assert_eq!(raw[1]["distance"]["status"], "unknown");
        assert_eq!(raw[1]["scrape"]["reason"], "timeout");
    }

    #[test]
    fn test_sort_puts_unscored_last() {
        let records = vec![
            record("low", Some(40.0)),
            record("none", None),
            record("high", Some(95.0)),
            record("mid", Some(70.0)),
        ];
        let order: Vec<&str> = sort_for_report(&records)
            .iter()
            .map(|r| r.job.url.rsplit('/').next().unwrap())
            .collect();
        assert_eq!(order, vec!["high", "mid", "low", "none"]);
    }

    #[test]
    fn test_html_rows_escape_highlight_and_link() {
        let mut high = record("high", Some(88.0));
        high.cover_letter = CoverLetter::Written {
            path: PathBuf::from("/data/cover_letters/run_1/Title_high.txt"),
        };
        let records = vec![record("low", Some(40.0)), high];

        let html = render_html_summary(&records, Path::new("/data/summaries/job_summary.html"), 80.0);

        let high_at = html.find("Title high").unwrap();
        let low_at = html.find("Title low").unwrap();
        assert!(high_at < low_at);
        assert!(html.contains(r#"<tr class="highlight"><td data-order="88.00">88.00</td>"#));
        assert!(html.contains(r#"href="../cover_letters/run_1/Title_high.txt""#));
        assert!(html.contains("Acme &amp; Sons"));
        assert!(html.contains("&lt;b&gt;fit&lt;/b&gt;"));
        assert!(!html.contains("<b>fit</b>"));
        assert!(html.contains(">12.3</td>"));
        assert!(html.contains("At or above 80.0: 1."));
        assert!(!html.contains("{{rows}}"));
    }

    #[test]
    fn test_html_column_order() {
        let html = render_html_summary(&[], Path::new("summary.html"), 75.0);
        let headers = [
            "Match Score",
            "Job Title",
            "Company",
            "Category",
            "Size",
            "Level",
            "City",
            "Distance (km)",
            "Job URL",
            "Match Explanation",
            "Cover Letter",
        ];
        let positions: Vec<usize> = headers
            .iter()
            .map(|h| html.find(&format!("<th>{}</th>", h)).unwrap())
            .collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]));
        assert!(html.contains("Jobs processed: 0."));
    }

    #[test]
    fn test_unscored_row() {
        let failed = MatchRecord::scrape_failed(record("x", None).job, "HTTP 404".to_string());
        let html = render_html_summary(&[failed], Path::new("summary.html"), 75.0);
        assert!(html.contains(r#"<tr class="unscored"><td data-order="-1">N/A</td>"#));
        assert!(html.contains("Scrape failed: HTTP 404"));
    }
}
