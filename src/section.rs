//! Section model and truncation
//!
//! A Section is one titled group of result lines from a single sub-query.
//! Producers always hand back the full line list; truncation is applied by
//! the renderer through `truncate` so every command behaves the same.

use serde::Serialize;

use crate::invoke::Tool;

/// Whether a Section carries real results
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum SectionStatus {
    Ok,
    /// The tool behind this Section is not installed
    Unavailable { tool: Tool },
    /// A best-effort query failed; the rest of the command went on
    Failed { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Section {
    pub title: String,
    pub lines: Vec<String>,
    /// Lines hidden by the renderer; producers leave this at 0
    pub(crate) truncated: usize,
    pub status: SectionStatus,
}

impl Section {
    pub fn new(title: impl Into<String>, lines: Vec<String>) -> Self {
        Self {
            title: title.into(),
            lines,
            truncated: 0,
            status: SectionStatus::Ok,
        }
    }

    pub fn empty(title: impl Into<String>) -> Self {
        Self::new(title, Vec::new())
    }

    pub fn unavailable(title: impl Into<String>, tool: Tool) -> Self {
        Self {
            status: SectionStatus::Unavailable { tool },
            ..Self::empty(title)
        }
    }

    pub fn failed(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            status: SectionStatus::Failed {
                message: message.into(),
            },
            ..Self::empty(title)
        }
    }

    /// Total number of result lines before truncation
    pub fn count(&self) -> usize {
        self.lines.len()
    }

    pub fn truncated(&self) -> usize {
        self.truncated
    }

    pub fn is_degraded(&self) -> bool {
        self.status != SectionStatus::Ok
    }

    /// JSON key for this Section
    pub fn key(&self) -> String {
        section_key(&self.title)
    }
}

/// Derive a JSON key from a title: lowercase, spaces to underscores
///
/// `-` also maps to `_`, other punctuation is dropped and runs of
/// underscores collapse, so "Store subscriptions ($)" becomes
/// `store_subscriptions`.
pub fn section_key(title: &str) -> String {
    let mut key = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            key.extend(c.to_lowercase());
        } else if (c == ' ' || c == '-' || c == '_') && !key.ends_with('_') {
            key.push('_');
        }
    }
    key.trim_matches('_').to_string()
}

/// Split `lines` at `limit`
///
/// Returns the shown prefix and how many lines were left out.
/// `shown.len() == min(lines.len(), limit)` and
/// `overflow == lines.len().saturating_sub(limit)`.
pub fn truncate<T>(lines: &[T], limit: usize) -> (&[T], usize) {
    let shown = lines.len().min(limit);
    (&lines[..shown], lines.len() - shown)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn numbered(n: usize) -> Vec<String> {
        (1..=n).map(|i| format!("line {i}")).collect()
    }

    #[test]
    fn test_truncate_over_limit() {
        let lines = numbered(12);
        let (shown, overflow) = truncate(&lines, 5);
        assert_eq!(shown, &lines[..5]);
        assert_eq!(overflow, 7);
    }

    #[test]
    fn test_truncate_under_and_at_limit() {
        let lines = numbered(3);
        assert_eq!(truncate(&lines, 5), (&lines[..], 0));
        assert_eq!(truncate(&lines, 3), (&lines[..], 0));
    }

    #[test]
    fn test_truncate_counts_add_up() {
        for len in 0..20 {
            let lines = numbered(len);
            for limit in 0..25 {
                let (shown, overflow) = truncate(&lines, limit);
                assert_eq!(shown.len() + overflow, len);
                assert_eq!(shown.len(), len.min(limit));
                assert_eq!(shown, &lines[..shown.len()]);
            }
        }
    }

    #[test]
    fn test_section_key() {
        assert_eq!(section_key("Recent commits"), "recent_commits");
        assert_eq!(section_key("Most changed files"), "most_changed_files");
        assert_eq!(section_key("Store subscriptions ($)"), "store_subscriptions");
        assert_eq!(section_key("TODO markers"), "todo_markers");
        assert_eq!(section_key("Call-sites"), "call_sites");
    }

    #[test]
    fn test_degraded_sections() {
        assert!(!Section::empty("Matches").is_degraded());
        assert!(Section::unavailable("Pull requests", Tool::Gh).is_degraded());
        let failed = Section::failed("Issues", "gh auth required");
        assert!(failed.is_degraded());
        assert_eq!(failed.count(), 0);
    }
}
