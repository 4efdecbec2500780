//! # Path Resolution Module
//!
//! Centralizza il calcolo dei path di destinazione per un `WorkItem`:
//! artifact taggato in output e originale in processed.

use crate::file_manager::WorkItem;
use std::path::{Path, PathBuf};

/// Suffix appended to the base name of tagged artifacts
pub const TAGGED_SUFFIX: &str = "_tagged";

/// Utility per calcolare i path di destinazione in modo centralizzato
pub struct PathResolver;

impl PathResolver {
    /// `<output_dir>/<base name>_tagged<extension>`
    pub fn tagged_output_path(item: &WorkItem, output_dir: &Path) -> PathBuf {
        let mut name = item.raw_stem.clone();
        name.push(TAGGED_SUFFIX);
        if let Some(ext) = item.source_path.extension() {
            name.push(".");
            name.push(ext);
        }
        output_dir.join(name)
    }

    /// `<processed_dir>/<file name>`
    pub fn processed_path(item: &WorkItem, processed_dir: &Path) -> PathBuf {
        processed_dir.join(&item.raw_file_name)
    }

    /// Whether a file name follows the tagged artifact convention
    pub fn is_tagged_name(path: &Path) -> bool {
        path.file_stem()
            .map(|stem| stem.to_string_lossy().ends_with(TAGGED_SUFFIX))
            .unwrap_or(false)
    }
}
