// src/core/mod.rs
//! Core services shared by every pipeline stage

pub mod config_manager;
pub mod fs_ops;

pub use config_manager::{ConfigManager, LlmConfig, LocationConfig, LoggingConfig, Settings};
pub use fs_ops::{DocumentFormat, FsOps};
