// src/lib.rs
//! Job matcher: pulls a CSV job feed, scores each posting against a resume
//! with an LLM, drafts cover letters for the best matches and reports the run.

pub mod cli;
pub mod core;
pub mod cover_letter;
pub mod dedup;
pub mod job_analysis;
pub mod job_feed;
pub mod location;
pub mod matcher;
pub mod reporting;
pub mod template_processor;
pub mod types;
pub mod utils;

pub use crate::core::{ConfigManager, Settings};
pub use crate::dedup::DedupStore;
pub use crate::matcher::{JobMatcher, MatchOptions};
