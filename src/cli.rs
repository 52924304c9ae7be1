// src/cli.rs
use clap::Parser;
use std::path::PathBuf;

use crate::core::config_manager::DEFAULT_CONFIG_PATH;
use crate::core::Settings;

#[derive(Debug, Parser)]
#[command(name = "job-matcher")]
#[command(about = "Score job listings against a resume and draft cover letters for the best matches")]
#[command(version)]
pub struct Cli {
    /// Configuration file (JSON or YAML)
    #[arg(short, long, default_value = DEFAULT_CONFIG_PATH)]
    pub config: PathBuf,

    /// Process jobs even if their URL was seen in an earlier run
    #[arg(long)]
    pub rescan_all: bool,

    /// Override the configured max_jobs
    #[arg(long, value_parser = clap::value_parser!(u32).range(1..))]
    pub max_jobs: Option<u32>,

    /// Enable debug logging
    #[arg(long)]
    pub debug: bool,
}

impl Cli {
    /// Flags take precedence over the config file
    pub fn apply_overrides(&self, settings: &mut Settings) {
        if self.rescan_all {
            settings.rescan_all_jobs = true;
        }
        if let Some(max_jobs) = self.max_jobs {
            settings.max_jobs = max_jobs as usize;
        }
        if self.debug {
            settings.logging.debug = true;
            settings.logging.level = "debug".to_string();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::try_parse_from(["job-matcher"]).unwrap();
        assert_eq!(cli.config, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert!(!cli.rescan_all);
        assert_eq!(cli.max_jobs, None);
    }

    #[test]
    fn test_flags() {
        let cli = Cli::try_parse_from([
            "job-matcher",
            "--config",
            "conf/run.yaml",
            "--rescan-all",
            "--max-jobs",
            "7",
            "--debug",
        ])
        .unwrap();
        assert_eq!(cli.config, PathBuf::from("conf/run.yaml"));
        assert!(cli.rescan_all);
        assert_eq!(cli.max_jobs, Some(7));
        assert!(cli.debug);
    }

    #[test]
    fn test_zero_max_jobs_is_rejected() {
        assert!(Cli::try_parse_from(["job-matcher", "--max-jobs", "0"]).is_err());
    }
}
