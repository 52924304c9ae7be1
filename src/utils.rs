// src/utils.rs
use std::path::{Component, Path, PathBuf};

/// Placeholder replaced by the run timestamp in configured file names
pub const TIMESTAMP_PLACEHOLDER: &str = "YYYYMMDD_HHMMSS";

/// Normalize a free-text value for file system usage.
/// Whitespace-separated words are joined with `_`, anything else non-alphanumeric is dropped.
pub fn sanitize_filename_part(input: &str, fallback: &str) -> String {
    let joined = input
        .split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| c.is_alphanumeric() || *c == '-' || *c == '_')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join("_");

    if joined.is_empty() {
        fallback.to_string()
    } else {
        joined
    }
}

/// Collapse every run of whitespace (including newlines) into a single space
pub fn clean_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Truncate to at most `max` characters without splitting a UTF-8 sequence
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

/// Shorten for table/log display, appending "..." when cut
pub fn ellipsize(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        format!("{}...", truncate_chars(text, max.saturating_sub(3)))
    } else {
        text.to_string()
    }
}

/// Minimal HTML escaping for text and attribute values
pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            _ => out.push(c),
        }
    }
    out
}

/// Replace the timestamp placeholder in a configured path string
pub fn apply_timestamp(value: &str, timestamp: &str) -> String {
    value.replace(TIMESTAMP_PLACEHOLDER, timestamp)
}

/// Resolve a possibly relative path against a base directory
pub fn resolve_path(base: &Path, value: &str) -> PathBuf {
    let candidate = PathBuf::from(value);
    if candidate.is_absolute() {
        candidate
    } else {
        base.join(candidate)
    }
}

/// Path of `target` relative to the directory `from_dir`.
/// Both paths are expected to be absolute or both relative to the same root.
pub fn relative_path(from_dir: &Path, target: &Path) -> PathBuf {
    if let Ok(stripped) = target.strip_prefix(from_dir) {
        return stripped.to_path_buf();
    }

    let from: Vec<Component> = from_dir.components().collect();
    let to: Vec<Component> = target.components().collect();
    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    // Different roots (e.g. Windows drives) leave nothing to climb from
    if common == 0 && (from_dir.has_root() || target.has_root()) {
        return target
            .file_name()
            .map(PathBuf::from)
            .unwrap_or_else(|| target.to_path_buf());
    }

    let mut result = PathBuf::new();
    for _ in common..from.len() {
        result.push("..");
    }
    for component in &to[common..] {
        result.push(component.as_os_str());
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_filename_part() {
        assert_eq!(
            sanitize_filename_part("Senior Rust Engineer", "job"),
            "Senior_Rust_Engineer"
        );
        assert_eq!(sanitize_filename_part("ACME / Labs, Inc.", "company"), "ACME_Labs_Inc");
        assert_eq!(sanitize_filename_part("   ", "company"), "company");
        assert_eq!(sanitize_filename_part("C++ dev", "job"), "C_dev");
    }

    #[test]
    fn test_clean_text() {
        assert_eq!(clean_text("  a \n\n b\t c  "), "a b c");
        assert_eq!(clean_text(""), "");
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        assert_eq!(ellipsize("abcdefghij", 6), "abc...");
        assert_eq!(ellipsize("abc", 6), "abc");
    }

    #[test]
    fn test_escape_html() {
        assert_eq!(
            escape_html(r#"<a href="x">Tom & 'Jerry'</a>"#),
            "&lt;a href=&quot;x&quot;&gt;Tom &amp; &#x27;Jerry&#x27;&lt;/a&gt;"
        );
    }

    #[test]
    fn test_apply_timestamp() {
        assert_eq!(
            apply_timestamp("logs/run_YYYYMMDD_HHMMSS.log", "20250101_120000"),
            "logs/run_20250101_120000.log"
        );
        assert_eq!(apply_timestamp("plain.log", "x"), "plain.log");
    }

    #[test]
    fn test_relative_path() {
        assert_eq!(
            relative_path(Path::new("/work/out"), Path::new("/work/out/letters/a.txt")),
            PathBuf::from("letters/a.txt")
        );
        assert_eq!(
            relative_path(Path::new("/work/summaries"), Path::new("/work/cover_letters/a.txt")),
            PathBuf::from("../cover_letters/a.txt")
        );
        assert_eq!(
            relative_path(Path::new("/a/b/c"), Path::new("/a/x/y.txt")),
            PathBuf::from("../../x/y.txt")
        );
    }
}
