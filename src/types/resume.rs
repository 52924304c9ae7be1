// src/types/resume.rs
//! Resume document used as the candidate side of every match

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::core::FsOps;

/// Skills assumed when the resume lists none
pub const FALLBACK_CORE_SKILLS: [&str; 4] = ["Python", "Selenium", "Web Scraping", "Data Analysis"];

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Resume {
    pub name: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub contact: Contact,
    #[serde(default)]
    pub skills: Vec<String>,
    #[serde(default)]
    pub tools: Vec<String>,
    #[serde(default)]
    pub experience: Vec<Experience>,
    #[serde(default)]
    pub education: Vec<Education>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
    pub location: Option<String>,
    pub linkedin: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Experience {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub description: String,
    pub years: Option<String>,
    pub period: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Education {
    #[serde(default)]
    pub degree: String,
    #[serde(default, alias = "institution")]
    pub university: String,
}

impl Resume {
    /// Load and validate a resume; JSON, TOML or YAML by extension
    pub async fn load(path: &Path) -> Result<Self> {
        let resume: Resume = FsOps::read_document(path)
            .await
            .with_context(|| format!("Unreadable resume file: {}", path.display()))?;
        resume
            .validate()
            .with_context(|| format!("Invalid resume: {}", path.display()))?;
        Ok(resume)
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            anyhow::bail!("Resume must define a non-empty 'name'");
        }
        if self.skills.is_empty() && self.experience.is_empty() {
            anyhow::bail!("Resume must list at least one of 'skills' or 'experience'");
        }
        Ok(())
    }

    /// Skills used for the requirement table
    pub fn core_skills(&self) -> Vec<String> {
        if self.skills.is_empty() {
            FALLBACK_CORE_SKILLS.iter().map(|s| s.to_string()).collect()
        } else {
            self.skills.clone()
        }
    }

    /// Flatten the resume into one text block for the LLM
    pub fn to_text(&self) -> String {
        let mut sections = Vec::new();

        if let Some(summary) = self.summary.as_deref().filter(|s| !s.trim().is_empty()) {
            sections.push(format!("Summary: {}", summary));
        }

        if !self.skills.is_empty() {
            sections.push(format!("Skills: {}", self.skills.join(", ")));
        }
        if !self.tools.is_empty() {
            sections.push(format!("Tools: {}", self.tools.join(", ")));
        }

        let experience: Vec<String> = self
            .experience
            .iter()
            .map(|exp| {
                let years = exp
                    .years
                    .as_deref()
                    .or(exp.period.as_deref())
                    .unwrap_or_default();
                format!(
                    "{} at {} ({}): {}",
                    exp.title, exp.company, years, exp.description
                )
            })
            .collect();
        if !experience.is_empty() {
            sections.push(format!("Experience: {}", experience.join(" | ")));
        }

        let education: Vec<String> = self
            .education
            .iter()
            .map(|edu| format!("{} - {}", edu.degree, edu.university))
            .collect();
        if !education.is_empty() {
            sections.push(format!("Education: {}", education.join(" | ")));
        }

        sections.join("\n").trim().to_string()
    }
}
