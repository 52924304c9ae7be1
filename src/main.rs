use anyhow::{Context, Result};
use clap::Parser;
use std::fs::OpenOptions;
use std::sync::Mutex;
use tracing::{debug, info, warn};

use job_matcher::cli::Cli;
use job_matcher::core::{ConfigManager, LoggingConfig};
use job_matcher::cover_letter::CoverLetterWriter;
use job_matcher::dedup::DedupStore;
use job_matcher::job_analysis::{GeminiClient, HttpJobScraper};
use job_matcher::job_feed::JobFeed;
use job_matcher::location::{LocationFilter, NominatimGeocoder};
use job_matcher::matcher::{JobMatcher, MatchOptions};
use job_matcher::reporting;
use job_matcher::types::Resume;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const QUIET_TARGETS: [&str; 4] = ["hyper", "reqwest", "html5ever", "selectors"];

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&logging.log_file)
        .with_context(|| format!("Failed to open log file {}", logging.log_file.display()))?;

    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => {
            let mut directives = vec![logging.level.clone()];
            directives.extend(QUIET_TARGETS.iter().map(|t| format!("{}=warn", t)));
            EnvFilter::try_new(directives.join(","))
                .with_context(|| format!("Invalid log_level '{}'", logging.level))?
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(logging.debug))
        .with(
            fmt::layer()
                .json()
                .with_writer(Mutex::new(file))
                .with_current_span(false)
                .with_span_list(false),
        )
        .with(filter)
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut settings = ConfigManager::load(&cli.config).await?;
    cli.apply_overrides(&mut settings);
    settings.ensure_directories().await?;

    init_logging(&settings.logging)?;

    info!("Starting job matcher run {}", settings.run_timestamp);
    info!("Config: {}", cli.config.display());
    info!("Log file: {}", settings.logging.log_file.display());
    debug!("{:?}", settings);

    let resume = Resume::load(&settings.resume_path).await?;
    info!("Loaded resume for {}", resume.name);

    let listings = JobFeed::new()?
        .fetch(&settings.csv_source)
        .await
        .context("Failed to fetch job listings")?;

    let mut store = DedupStore::load(&settings.scanned_urls_file).await;

    let scraper = HttpJobScraper::new()?.with_html_snapshots(settings.save_html);
    let llm = GeminiClient::new(&settings.llm)?;
    if settings.llm.scoring_guide.is_some() {
        info!("Using personal scoring guide");
    }

    let location = match &settings.location {
        Some(config) => {
            let geocoder = NominatimGeocoder::new(&config.geocoder_url)?;
            LocationFilter::new(Box::new(geocoder), config).await
        }
        None => None,
    };

    if settings.cover_letters {
        info!("Cover letters directory: {}", settings.cover_letter_dir.display());
    }
    let letters = CoverLetterWriter::new(&settings.cover_letter_dir, &resume);

    let mut matcher = JobMatcher::new(
        MatchOptions::from(&settings),
        resume,
        Box::new(scraper),
        Box::new(llm),
        letters,
    )
    .with_location_filter(location);

    let records = matcher.run(&listings, &mut store).await;

    if let Err(e) = store.persist().await {
        warn!("{:#}", e);
    }

    reporting::write_matches_json(&records, &settings.matches_json).await?;
    reporting::write_html_summary(&records, &settings.summary_file, settings.score_threshold)
        .await?;

    let scored = records.iter().filter(|r| r.is_scored()).count();
    let above = records.iter().filter(|r| r.above_threshold).count();
    let letters_written = records
        .iter()
        .filter(|r| r.cover_letter_path().is_some())
        .count();
    info!(
        "Run complete: {} records, {} scored, {} above threshold, {} cover letters",
        records.len(),
        scored,
        above,
        letters_written
    );
    info!("Summary: {}", settings.summary_file.display());

    Ok(())
}
