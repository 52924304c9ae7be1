// src/types/mod.rs
pub mod job;
pub mod response;
pub mod resume;

pub use job::{
    CoverLetter, Distance, JobListing, MatchRecord, RequirementScore, ScoreResult, ScrapeStatus,
    ScrapedDescription,
};
pub use resume::Resume;
