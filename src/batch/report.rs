//! # Batch Report Module
//!
//! Esito per singolo file (`Outcome`) e raccolta ordinata degli esiti di un run
//! (`BatchReport`). Le statistiche del run sono derivate, mai memorizzate.

use serde::Serialize;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Pipeline stage at which an item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureStage {
    /// The tag applicator rejected the file; the original is untouched in Input
    Tagging,
    /// Tagging succeeded but the original could not be moved to Processed
    Relocation,
}

impl std::fmt::Display for FailureStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureStage::Tagging => write!(f, "tagging"),
            FailureStage::Relocation => write!(f, "relocation"),
        }
    }
}

/// Terminal result for one work item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Success {
        tagged_path: PathBuf,
        processed_path: PathBuf,
    },
    Failure {
        stage: FailureStage,
        reason: String,
        /// Tagged artifact left behind in Output by a relocation failure
        orphaned_output: Option<PathBuf>,
    },
}

impl Outcome {
    pub fn tagging_failed(reason: impl Into<String>) -> Self {
        Outcome::Failure {
            stage: FailureStage::Tagging,
            reason: reason.into(),
            orphaned_output: None,
        }
    }

    pub fn relocation_failed(reason: impl Into<String>, orphaned_output: PathBuf) -> Self {
        Outcome::Failure {
            stage: FailureStage::Relocation,
            reason: reason.into(),
            orphaned_output: Some(orphaned_output),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Outcome::Success { .. } => None,
            Outcome::Failure { reason, .. } => Some(reason),
        }
    }

    pub fn orphaned_output(&self) -> Option<&Path> {
        match self {
            Outcome::Failure {
                orphaned_output: Some(path),
                ..
            } => Some(path),
            _ => None,
        }
    }
}

/// Outcomes of one run keyed by file name, in discovery order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    outcomes: Vec<(String, Outcome)>,
}

impl BatchReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, file_name: impl Into<String>, outcome: Outcome) {
        self.outcomes.push((file_name.into(), outcome));
    }

    pub fn get(&self, file_name: &str) -> Option<&Outcome> {
        self.outcomes
            .iter()
            .find(|(name, _)| name == file_name)
            .map(|(_, outcome)| outcome)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Outcome)> {
        self.outcomes.iter().map(|(name, outcome)| (name.as_str(), outcome))
    }

    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn total(&self) -> usize {
        self.outcomes.len()
    }

    pub fn successful(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.total() - self.successful()
    }

    pub fn success_rate(&self) -> f64 {
        if self.outcomes.is_empty() {
            0.0
        } else {
            self.successful() as f64 / self.total() as f64 * 100.0
        }
    }

    pub fn failed_files(&self) -> Vec<&str> {
        self.iter()
            .filter(|(_, o)| !o.is_success())
            .map(|(name, _)| name)
            .collect()
    }

    pub fn orphaned_outputs(&self) -> Vec<&Path> {
        self.outcomes.iter().filter_map(|(_, o)| o.orphaned_output()).collect()
    }

    /// Human-readable end-of-run summary
    pub fn format_summary(&self) -> String {
        let rule = "=".repeat(60);
        let mut out = String::new();
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "PROCESSING SUMMARY");
        let _ = writeln!(out, "{}", rule);
        let _ = writeln!(out, "Total videos: {}", self.total());
        let _ = writeln!(out, "Successful: {}", self.successful());
        let _ = writeln!(out, "Failed: {}", self.failed());
        let _ = writeln!(out, "Success rate: {:.1}%", self.success_rate());

        if self.failed() > 0 {
            let _ = writeln!(out, "\nFailed videos:");
            for (name, outcome) in self.iter().filter(|(_, o)| !o.is_success()) {
                if let Outcome::Failure { stage, reason, .. } = outcome {
                    let _ = writeln!(out, "  - {} ({} failed: {})", name, stage, reason);
                }
            }
        }

        let orphans = self.orphaned_outputs();
        if !orphans.is_empty() {
            let _ = writeln!(out, "\nTagged files left in output without a relocated original:");
            for path in orphans {
                let _ = writeln!(out, "  - {}", path.display());
            }
        }

        out
    }
}
