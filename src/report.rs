//! Summary report for a parsed feed.
//!
//! Counts what the document carried and flags entries that are likely to
//! trouble a consumer: no id, no title, or a failed batch operation.

use crate::extensions::ExtensionList;
use crate::model::{AtomNode, Entry, Feed, Source};
use colored::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Issue severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
    Info,
}

/// A single finding with context
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportIssue {
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl ReportIssue {
    fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            message: message.into(),
            location: None,
            suggestion: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(Severity::Error, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(Severity::Warning, message)
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(Severity::Info, message)
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Format the issue with colors for terminal output
    pub fn format_colored(&self) -> String {
        let mut output = String::new();

        let (icon, color_fn): (&str, fn(&str) -> ColoredString) = match self.severity {
            Severity::Error => ("✗", |s: &str| s.red().bold()),
            Severity::Warning => ("⚠", |s: &str| s.yellow().bold()),
            Severity::Info => ("ℹ", |s: &str| s.cyan().bold()),
        };
        output.push_str(&format!("{} ", color_fn(icon)));

        if let Some(ref location) = self.location {
            output.push_str(&format!("[{}] ", location.bright_blue()));
        }
        output.push_str(&self.message);
        output.push('\n');

        if let Some(ref suggestion) = self.suggestion {
            output.push_str(&format!("  {} {}\n", "→".bright_green(), suggestion.green()));
        }
        output
    }

    /// Format without colors for logs or non-terminal output
    pub fn format_plain(&self) -> String {
        let severity = match self.severity {
            Severity::Error => "ERROR",
            Severity::Warning => "WARNING",
            Severity::Info => "INFO",
        };
        let mut output = format!("[{}] ", severity);
        if let Some(ref location) = self.location {
            output.push_str(&format!("[{}] ", location));
        }
        output.push_str(&self.message);
        output.push('\n');
        if let Some(ref suggestion) = self.suggestion {
            output.push_str(&format!("  Suggestion: {}\n", suggestion));
        }
        output
    }
}

/// What the document contained.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedStats {
    pub entries: usize,
    pub links: usize,
    pub categories: usize,
    pub authors: usize,
    /// Extension elements and attributes kept for round-tripping.
    pub extensions: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_results: Option<i32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedReport {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_path: Option<String>,
    pub stats: FeedStats,
    pub issues: Vec<ReportIssue>,
}

impl FeedReport {
    /// Inspects a parsed feed.
    pub fn analyze(feed: &Feed) -> Self {
        let mut report = Self {
            file_path: None,
            stats: FeedStats {
                total_results: feed.total_results(),
                ..Default::default()
            },
            issues: Vec::new(),
        };

        let source = feed.source();
        report.count_source(source);

        if source.id().is_none() && feed.has_content() && !is_entry_document(feed) {
            report.issues.push(
                ReportIssue::warning("Feed has no atom:id")
                    .with_location("feed")
                    .with_suggestion("Add a permanent, universally unique <id>"),
            );
        }

        for (index, entry) in feed.entries().iter().enumerate() {
            report.stats.entries += 1;
            report.check_entry(index, entry);
        }

        if report.stats.extensions > 0 {
            report.issues.push(ReportIssue::info(format!(
                "{} extension {} preserved",
                report.stats.extensions,
                if report.stats.extensions == 1 { "node" } else { "nodes" }
            )));
        }
        report
    }

    pub fn with_file(mut self, path: impl AsRef<Path>) -> Self {
        self.file_path = Some(path.as_ref().display().to_string());
        self
    }

    pub fn has_errors(&self) -> bool {
        self.count(Severity::Error) > 0
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.issues.iter().filter(|i| i.severity == severity).count()
    }

    /// Convert the report to JSON
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn render_colored(&self) -> String {
        let mut output = String::new();
        if let Some(ref path) = self.file_path {
            output.push_str(&format!("\n{} {}\n\n", "Feed:".bold(), path.bright_blue()));
        }
        output.push_str(&format!("{} {}\n", "Contents:".bold(), self.stats_line()));
        for issue in &self.issues {
            output.push_str(&issue.format_colored());
        }
        if !self.has_errors() && self.count(Severity::Warning) == 0 {
            output.push_str(&format!("{}\n", "✓ No problems found".green().bold()));
        } else {
            output.push_str(&format!(
                "{} {}, {}\n",
                "Summary:".bold(),
                plural(self.count(Severity::Error), "error").red().bold(),
                plural(self.count(Severity::Warning), "warning").yellow().bold()
            ));
        }
        output
    }

    pub fn render_plain(&self) -> String {
        let mut output = String::new();
        if let Some(ref path) = self.file_path {
            output.push_str(&format!("\nFeed: {}\n\n", path));
        }
        output.push_str(&format!("Contents: {}\n", self.stats_line()));
        for issue in &self.issues {
            output.push_str(&issue.format_plain());
        }
        if !self.has_errors() && self.count(Severity::Warning) == 0 {
            output.push_str("No problems found\n");
        } else {
            output.push_str(&format!(
                "Summary: {}, {}\n",
                plural(self.count(Severity::Error), "error"),
                plural(self.count(Severity::Warning), "warning")
            ));
        }
        output
    }

    fn stats_line(&self) -> String {
        format!(
            "{}, {}, {}, {}",
            plural(self.stats.entries, "entry"),
            plural(self.stats.links, "link"),
            plural(self.stats.categories, "category"),
            plural(self.stats.extensions, "extension")
        )
    }

    fn count_source(&mut self, source: &Source) {
        self.stats.links += source.links().len();
        self.stats.categories += source.categories().len();
        self.stats.authors += source.authors().len();
        self.stats.extensions += source_extensions(source);
    }

    fn check_entry(&mut self, index: usize, entry: &Entry) {
        let location = match entry.id() {
            Some(id) => format!("entry {}", id.uri()),
            None => format!("entry #{}", index + 1),
        };

        self.stats.links += entry.links().len();
        self.stats.categories += entry.categories().len();
        self.stats.authors += entry.authors().len();
        self.stats.extensions += extension_count(entry.common().extensions())
            + node_extensions(entry.id())
            + node_extensions([entry.title(), entry.summary(), entry.rights()].into_iter().flatten())
            + node_extensions(entry.links())
            + node_extensions(entry.categories())
            + node_extensions(entry.authors())
            + node_extensions(entry.contributors())
            + node_extensions(entry.content())
            + entry.source().map_or(0, source_extensions);

        if entry.id().is_none() {
            self.issues.push(
                ReportIssue::warning("Entry has no atom:id")
                    .with_location(location.clone())
                    .with_suggestion("Clients cannot update or delete an entry without an id"),
            );
        }
        if entry.title().is_none() {
            self.issues
                .push(ReportIssue::warning("Entry has no atom:title").with_location(location.clone()));
        }
        if let Some(status) = entry.batch().and_then(|b| b.status.as_ref()) {
            if status.is_failure() {
                let code = status.code.unwrap_or_default();
                let reason = status.reason.as_deref().unwrap_or("no reason given");
                self.issues.push(
                    ReportIssue::error(format!("Batch operation failed with status {code}: {reason}"))
                        .with_location(location),
                );
            }
        }
    }
}

/// A standalone entry document parses into a feed without feed metadata.
fn is_entry_document(feed: &Feed) -> bool {
    !feed.source().has_content() && feed.entries().len() == 1
}

fn extension_count(list: &ExtensionList) -> usize {
    list.len()
}

/// Extensions on `source` itself and on every node below it.
fn source_extensions(source: &Source) -> usize {
    extension_count(source.common().extensions())
        + node_extensions([source.id(), source.icon(), source.logo()].into_iter().flatten())
        + node_extensions([source.title(), source.subtitle(), source.rights()].into_iter().flatten())
        + node_extensions(source.generator())
        + node_extensions(source.links())
        + node_extensions(source.categories())
        + node_extensions(source.authors())
        + node_extensions(source.contributors())
}

fn node_extensions<'a, N: AtomNode + 'a>(nodes: impl IntoIterator<Item = &'a N>) -> usize {
    nodes
        .into_iter()
        .map(|n| extension_count(n.common().extensions()))
        .sum()
}

fn plural(count: usize, noun: &str) -> String {
    match (count, noun) {
        (1, _) => format!("1 {noun}"),
        (_, "entry") => format!("{count} entries"),
        (_, "category") => format!("{count} categories"),
        _ => format!("{count} {noun}s"),
    }
}
