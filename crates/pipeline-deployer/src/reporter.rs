//! Batch result reporting.
//!
//! Aggregates per-pipeline outcomes into a [`BatchReport`], renders the
//! human-readable summary, and derives the process exit status. Nothing
//! else in the crate decides exit codes.

use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Anything the reporter can count: one pipeline's result.
pub trait Outcome {
    fn subject(&self) -> &str;
    fn succeeded(&self) -> bool;
    /// One-line cause or result description.
    fn detail(&self) -> &str;
}

/// Which orchestrator produced the batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportKind {
    Deployment,
    Verification,
}

impl ReportKind {
    pub fn title(&self) -> &'static str {
        match self {
            ReportKind::Deployment => "Deployment",
            ReportKind::Verification => "Verification",
        }
    }
}

/// Aggregate counts.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl Summary {
    pub fn is_success(&self) -> bool {
        self.failed == 0
    }
}

impl std::fmt::Display for Summary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Total: {}, Succeeded: {}, Failed: {}",
            self.total, self.succeeded, self.failed
        )
    }
}

/// One line of the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub subject: String,
    pub success: bool,
    pub detail: String,
}

/// Outcomes of one deploy or verify invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub kind: ReportKind,
    pub generated_at: DateTime<Utc>,
    pub entries: Vec<ReportEntry>,
    pub summary: Summary,
}

impl BatchReport {
    /// Build a report from outcomes, preserving their order.
    pub fn from_outcomes<O: Outcome>(kind: ReportKind, outcomes: &[O]) -> Self {
        let entries: Vec<ReportEntry> = outcomes
            .iter()
            .map(|o| ReportEntry {
                subject: o.subject().to_string(),
                success: o.succeeded(),
                detail: o.detail().to_string(),
            })
            .collect();

        let total = entries.len();
        let succeeded = entries.iter().filter(|e| e.success).count();
        let summary = Summary {
            total,
            succeeded,
            failed: total - succeeded,
        };

        Self {
            kind,
            generated_at: Utc::now(),
            entries,
            summary,
        }
    }

    pub fn is_success(&self) -> bool {
        self.summary.is_success()
    }

    /// 0 when nothing failed, 1 otherwise.
    pub fn exit_status(&self) -> u8 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn exit_code(&self) -> std::process::ExitCode {
        std::process::ExitCode::from(self.exit_status())
    }

    /// Render the per-pipeline lines followed by the summary line.
    pub fn render(&self) -> String {
        let mut out = format!("{} summary:\n", self.kind.title());
        for entry in &self.entries {
            let mark = if entry.success { "✓" } else { "✗" };
            out.push_str(&format!("  {} {}: {}\n", mark, entry.subject, entry.detail));
        }
        out.push_str(&format!("  {}\n", self.summary));
        out
    }

    /// Write the report as pretty-printed JSON.
    pub fn write_json(&self, path: &Path) -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }
}
