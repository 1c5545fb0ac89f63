//! Result rendering for terminals and JSON consumers
//!
//! Both modes read the same `Report`. Human mode truncates each Section to
//! its limit and prints a "N more" footer; JSON mode always carries the full
//! result list with its total `count`, since machine consumers page on their
//! own.

use owo_colors::OwoColorize;
use serde_json::{Map, Value, json};
use std::collections::BTreeSet;

use crate::config::{Config, RenderMode};
use crate::error::ErrorKind;
use crate::invoke::Tool;
use crate::section::{Section, SectionStatus, truncate};

/// Printed when even the error document cannot be serialized
pub const MINIMAL_ERROR_JSON: &str =
    r#"{"error":{"kind":"internal","message":"failed to serialize output"}}"#;

/// Top-level keys a Section key may not shadow
const RESERVED_KEYS: &[&str] = &["command", "query", "filters", "notices", "error"];

/// Everything one command produced, in declaration order
#[derive(Debug, Clone, Default)]
pub struct Report {
    pub command: String,
    pub query: Option<String>,
    pub filters: Vec<String>,
    sections: Vec<Section>,
    /// Human-mode limit per Section; `None` disables truncation
    limits: Vec<Option<usize>>,
}

impl Report {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            ..Self::default()
        }
    }

    pub fn query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    pub fn filters(mut self, filters: Vec<String>) -> Self {
        self.filters = filters;
        self
    }

    pub fn push(&mut self, section: Section, limit: Option<usize>) {
        self.sections.push(section);
        self.limits.push(limit);
    }

    pub fn sections(&self) -> &[Section] {
        &self.sections
    }

    /// Tools that were missing for at least one Section, each once
    pub fn missing_tools(&self) -> BTreeSet<Tool> {
        self.sections
            .iter()
            .filter_map(|s| match s.status {
                SectionStatus::Unavailable { tool } => Some(tool),
                _ => None,
            })
            .collect()
    }

    /// One notice per missing tool, however many Sections it affected
    pub fn notices(&self) -> Vec<String> {
        self.missing_tools()
            .into_iter()
            .map(|tool| format!("tool {tool} not found - install it to enable this check"))
            .collect()
    }

    /// Record how many lines human mode hides for each Section
    fn apply_limits(&mut self) {
        for (section, limit) in self.sections.iter_mut().zip(&self.limits) {
            section.truncated = match limit {
                Some(limit) => truncate(&section.lines, *limit).1,
                None => 0,
            };
        }
    }
}

/// Output renderer configuration
pub struct Renderer {
    pub mode: RenderMode,
    /// Whether to use colors
    pub use_colors: bool,
    /// Headers with glyphs; off in agent mode
    pub decorate: bool,
    /// Pretty-print JSON (minified by default)
    pub pretty: bool,
}

impl Renderer {
    pub fn new(config: &Config) -> Self {
        Self {
            mode: config.mode,
            use_colors: config.color && !config.agent,
            decorate: !config.agent,
            pretty: config.pretty,
        }
    }

    /// Plain renderer for `mode`, no colors
    pub fn plain(mode: RenderMode) -> Self {
        Self {
            mode,
            use_colors: false,
            decorate: false,
            pretty: false,
        }
    }

    /// Render a report; fills in each Section's truncation count
    pub fn render(&self, report: &mut Report) -> String {
        report.apply_limits();
        match self.mode {
            RenderMode::Human => self.render_human(report),
            RenderMode::Json => self.render_json(report),
        }
    }

    /// Render a fatal error for `command`
    pub fn render_error(&self, command: &str, kind: ErrorKind, message: &str) -> String {
        match self.mode {
            RenderMode::Json => {
                let doc = json!({
                    "command": command,
                    "error": { "kind": kind, "message": message },
                });
                self.to_json(&doc)
            }
            RenderMode::Human => format!("Error: {message}"),
        }
    }

    fn render_human(&self, report: &Report) -> String {
        let mut out = String::new();

        for (idx, section) in report.sections.iter().enumerate() {
            if idx > 0 {
                out.push('\n');
            }
            out.push_str(&self.header(section));
            out.push('\n');

            match &section.status {
                SectionStatus::Unavailable { tool } => {
                    out.push_str(&self.marker(&format!("(unavailable: {tool} not found)")));
                    out.push('\n');
                    continue;
                }
                SectionStatus::Failed { message } => {
                    out.push_str(&self.marker(&format!("(failed: {message})")));
                    out.push('\n');
                    continue;
                }
                SectionStatus::Ok => {}
            }

            if section.lines.is_empty() {
                out.push_str(&self.marker("(no results)"));
                out.push('\n');
                continue;
            }

            let shown = section.count() - section.truncated;
            for line in &section.lines[..shown] {
                out.push_str("  ");
                out.push_str(line);
                out.push('\n');
            }

            if section.truncated > 0 {
                let footer = format!("({} more - refine your query)", section.truncated);
                out.push_str("  ");
                if self.use_colors {
                    out.push_str(&footer.dimmed().to_string());
                } else {
                    out.push_str(&footer);
                }
                out.push('\n');
            }
        }

        out
    }

    fn header(&self, section: &Section) -> String {
        let count = format!("({})", section.count());
        match (self.decorate, self.use_colors) {
            (true, true) => format!(
                "{} {} {}",
                "▸".bright_blue(),
                section.title.bright_cyan().bold(),
                count.dimmed()
            ),
            (true, false) => format!("▸ {} {}", section.title, count),
            (false, _) => format!("## {} {}", section.title, count),
        }
    }

    fn marker(&self, text: &str) -> String {
        if self.use_colors {
            format!("  {}", text.yellow())
        } else {
            format!("  {text}")
        }
    }

    fn render_json(&self, report: &Report) -> String {
        let mut doc = Map::new();
        doc.insert("command".to_string(), json!(report.command));
        if let Some(query) = &report.query {
            doc.insert("query".to_string(), json!(query));
        }
        doc.insert("filters".to_string(), json!(report.filters));

        for section in &report.sections {
            let mut entry = Map::new();
            entry.insert("count".to_string(), json!(section.count()));
            entry.insert("results".to_string(), json!(section.lines));
            if let Ok(Value::Object(status)) = serde_json::to_value(&section.status) {
                entry.extend(status);
            }
            if let SectionStatus::Unavailable { tool } = section.status {
                entry.insert(
                    "notice".to_string(),
                    json!(format!("{tool} not found - install it to enable this check")),
                );
            }

            doc.insert(unique_key(&doc, section.key()), Value::Object(entry));
        }

        doc.insert("notices".to_string(), json!(report.notices()));
        self.to_json(&Value::Object(doc))
    }

    fn to_json(&self, value: &Value) -> String {
        let rendered = if self.pretty {
            serde_json::to_string_pretty(value)
        } else {
            serde_json::to_string(value)
        };
        rendered.unwrap_or_else(|e| {
            log::error!("JSON serialization failed: {}", e);
            MINIMAL_ERROR_JSON.to_string()
        })
    }
}

/// Avoid clobbering reserved keys or an earlier Section with the same title
fn unique_key(doc: &Map<String, Value>, key: String) -> String {
    let key = if key.is_empty() { "section".to_string() } else { key };
    if !doc.contains_key(&key) && !RESERVED_KEYS.contains(&key.as_str()) {
        return key;
    }
    let mut n = 2;
    loop {
        let candidate = format!("{key}_{n}");
        if !doc.contains_key(&candidate) {
            return candidate;
        }
        n += 1;
    }
}
