// src/template_processor.rs
use std::collections::HashMap;

const DASHBOARD_TEMPLATE: &str = include_str!("../templates/dashboard.html");

/// `{{key}}` placeholder substitution over a bundled template
pub struct TemplateProcessor {
    template: &'static str,
}

impl TemplateProcessor {
    pub fn dashboard() -> Self {
        Self {
            template: DASHBOARD_TEMPLATE,
        }
    }

    pub fn render(&self, variables: &HashMap<&str, String>) -> String {
        Self::process_variables(self.template, variables)
    }

    /// Replace each `{{key}}` found in `variables` in one pass.
    /// Substituted values are never rescanned; unknown placeholders are left as is.
    pub fn process_variables(content: &str, variables: &HashMap<&str, String>) -> String {
        let mut out = String::with_capacity(content.len());
        let mut rest = content;

        while let Some(start) = rest.find("{{") {
            out.push_str(&rest[..start]);
            let after_open = &rest[start + 2..];

            match after_open.find("}}") {
                Some(end) => {
                    let key = after_open[..end].trim();
                    match variables.get(key) {
                        Some(value) => out.push_str(value),
                        None => out.push_str(&rest[start..start + 2 + end + 2]),
                    }
                    rest = &after_open[end + 2..];
                }
                None => {
                    out.push_str(&rest[start..]);
                    rest = "";
                }
            }
        }

        out.push_str(rest);
        out
    }
}
