//! # Directory Status Module
//!
//! Questo modulo produce uno snapshot in sola lettura delle tre directory.
//!
//! ## Responsabilità:
//! - Conteggio dei video in attesa nella directory di input
//! - Conteggio degli originali in processed e dei file taggati in output
//! - Anteprima dei nomi limitata a pochi elementi per directory
//! - Directory inesistenti trattate come vuote
//!
//! ## Esempio output:
//! ```text
//! 📁 Input directory (input): 2 video(s)
//!    - a.mp4
//!    - b.mov
//! ```

use crate::batch::PathResolver;
use crate::error::TaggerError;
use crate::file_manager::FileManager;
use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Contents of one directory as seen by the status report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectorySummary {
    pub path: PathBuf,
    pub count: usize,
    /// First names in sorted order, capped at the preview size
    pub preview: Vec<String>,
    /// Names not included in the preview
    pub remaining: usize,
    pub total_bytes: u64,
}

impl DirectorySummary {
    fn from_files(path: &Path, files: &[PathBuf], preview_limit: usize) -> Self {
        let preview = files
            .iter()
            .take(preview_limit)
            .filter_map(|f| f.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .collect::<Vec<_>>();

        let total_bytes = files
            .iter()
            .filter_map(|f| std::fs::metadata(f).ok())
            .map(|m| m.len())
            .sum();

        Self {
            path: path.to_path_buf(),
            count: files.len(),
            remaining: files.len().saturating_sub(preview.len()),
            preview,
            total_bytes,
        }
    }

    fn write_section(&self, f: &mut fmt::Formatter<'_>, title: &str, noun: &str) -> fmt::Result {
        writeln!(
            f,
            "📁 {} directory ({}): {} {} [{}]",
            title,
            self.path.display(),
            self.count,
            noun,
            FileManager::format_size(self.total_bytes)
        )?;
        for name in &self.preview {
            writeln!(f, "   - {}", name)?;
        }
        if self.remaining > 0 {
            writeln!(f, "   ... and {} more", self.remaining)?;
        }
        Ok(())
    }
}

/// Snapshot of the three pipeline directories
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DirectoryReport {
    pub input: DirectorySummary,
    pub processed: DirectorySummary,
    pub output: DirectorySummary,
}

impl fmt::Display for DirectoryReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rule = "=".repeat(60);
        writeln!(f, "{}", rule)?;
        writeln!(f, "DIRECTORY STATUS")?;
        writeln!(f, "{}", rule)?;
        self.input.write_section(f, "Input", "video(s)")?;
        writeln!(f)?;
        self.processed.write_section(f, "Processed", "file(s)")?;
        writeln!(f)?;
        self.output.write_section(f, "Output", "tagged file(s)")
    }
}

/// Read-only reporter over the directory layout
pub struct StatusReporter;

impl StatusReporter {
    /// Summarize the directories without modifying anything
    pub fn snapshot(
        input_dir: &Path,
        processed_dir: &Path,
        output_dir: &Path,
        preview_limit: usize,
    ) -> Result<DirectoryReport, TaggerError> {
        let input = Self::list_or_empty(input_dir, FileManager::is_video)?;
        let processed = Self::list_or_empty(processed_dir, FileManager::is_video)?;
        let output = Self::list_or_empty(output_dir, PathResolver::is_tagged_name)?;

        Ok(DirectoryReport {
            input: DirectorySummary::from_files(input_dir, &input, preview_limit),
            processed: DirectorySummary::from_files(processed_dir, &processed, preview_limit),
            output: DirectorySummary::from_files(output_dir, &output, preview_limit),
        })
    }

    fn list_or_empty(dir: &Path, filter: fn(&Path) -> bool) -> Result<Vec<PathBuf>, TaggerError> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        FileManager::list_files(dir, filter)
    }
}
