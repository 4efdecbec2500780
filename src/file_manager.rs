//! # File Management Module
//!
//! Questo modulo gestisce la discovery dei video e lo spostamento dei file.
//!
//! ## Responsabilità:
//! - Discovery non ricorsiva dei video nella directory di input
//! - Filtro per estensioni video riconosciute (case-insensitive)
//! - Ordinamento deterministico per nome file
//! - Spostamento sicuro degli originali nella directory processed
//! - Utilità per dimensioni human-readable
//!
//! ## Formati riconosciuti:
//! - **Video**: MP4, AVI, MOV, MKV, WMV, FLV, WebM, M4V
//!
//! ## Operazioni sui file:
//! - `list_eligible()`: Elenca i `WorkItem` pronti per il tagging
//! - `is_video()`: Determina se un path ha un'estensione video riconosciuta
//! - `move_file()`: Rename con fallback copy+remove tra filesystem diversi
//! - `format_size()`: Converte bytes in formato leggibile (KB, MB, GB)
//!
//! ## Esempio:
//! ```rust,ignore
//! let items = FileManager::list_eligible(Path::new("input"))?;
//! for item in items {
//!     println!("{}", item.file_name);
//! }
//! ```

use crate::error::TaggerError;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Video extensions picked up from the input directory
pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "avi", "mov", "mkv", "wmv", "flv", "webm", "m4v"];

/// One discovered input file awaiting processing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkItem {
    pub source_path: PathBuf,
    /// Full file name as shown in logs and used as the key of the run outcomes
    pub file_name: String,
    /// File name without extension, used to derive the title
    pub base_name: String,
    /// Extension including the leading dot, case preserved (".MP4")
    pub extension: String,
    /// On-disk file name, kept byte-exact for the destination paths
    pub raw_file_name: OsString,
    /// On-disk file stem
    pub raw_stem: OsString,
}

impl WorkItem {
    pub fn from_path(path: &Path) -> Option<Self> {
        let raw_file_name = path.file_name()?.to_os_string();
        let raw_stem = path.file_stem()?.to_os_string();
        let extension = path
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();

        Some(Self {
            source_path: path.to_path_buf(),
            file_name: raw_file_name.to_string_lossy().into_owned(),
            base_name: raw_stem.to_string_lossy().into_owned(),
            extension,
            raw_file_name,
            raw_stem,
        })
    }
}

/// Manages file discovery and relocation
pub struct FileManager;

impl FileManager {
    /// List recognized video files directly inside `input_dir`, sorted by name
    pub fn list_eligible(input_dir: &Path) -> Result<Vec<WorkItem>, TaggerError> {
        let items = Self::list_files(input_dir, Self::is_video)?
            .iter()
            .filter_map(|path| WorkItem::from_path(path))
            .collect();
        Ok(items)
    }

    /// Regular files directly inside `dir` accepted by `filter`, sorted by name
    pub fn list_files(dir: &Path, filter: impl Fn(&Path) -> bool) -> Result<Vec<PathBuf>, TaggerError> {
        let mut files = Vec::new();

        for entry in WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(true)
            .sort_by_file_name()
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) if e.depth() == 0 => {
                    let source = e
                        .into_io_error()
                        .unwrap_or_else(|| std::io::Error::new(std::io::ErrorKind::Other, "walk error"));
                    return Err(TaggerError::Discovery {
                        path: dir.to_path_buf(),
                        source,
                    });
                }
                Err(e) => {
                    warn!("Skipping unreadable entry in {}: {}", dir.display(), e);
                    continue;
                }
            };

            if !entry.file_type().is_file() || !filter(entry.path()) {
                debug!("Ignoring entry: {}", entry.path().display());
                continue;
            }

            files.push(entry.into_path());
        }

        Ok(files)
    }

    /// Check if a path carries a recognized video extension
    pub fn is_video(path: &Path) -> bool {
        if let Some(ext) = path.extension() {
            let ext_lower = ext.to_string_lossy().to_lowercase();
            VIDEO_EXTENSIONS.contains(&ext_lower.as_str())
        } else {
            false
        }
    }

    /// Move a file, refusing to overwrite an existing destination
    pub async fn move_file(source: &Path, destination: &Path) -> Result<(), TaggerError> {
        match tokio::fs::try_exists(destination).await {
            Ok(false) => {}
            Ok(true) => {
                return Err(TaggerError::Relocation(format!(
                    "destination already exists: {}",
                    destination.display()
                )));
            }
            Err(e) => {
                return Err(TaggerError::Relocation(format!(
                    "cannot check destination {}: {}",
                    destination.display(),
                    e
                )));
            }
        }

        match tokio::fs::rename(source, destination).await {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                // rename fails across filesystems; fall back to copy + remove
                debug!(
                    "Rename {} -> {} failed ({}), trying copy",
                    source.display(),
                    destination.display(),
                    rename_err
                );
                if let Err(copy_err) = tokio::fs::copy(source, destination).await {
                    let _ = tokio::fs::remove_file(destination).await;
                    return Err(TaggerError::Relocation(format!(
                        "cannot move {} to {}: {} (copy: {})",
                        source.display(),
                        destination.display(),
                        rename_err,
                        copy_err
                    )));
                }
                tokio::fs::remove_file(source).await.map_err(|e| {
                    TaggerError::Relocation(format!(
                        "copied {} but could not remove the original: {}",
                        source.display(),
                        e
                    ))
                })
            }
        }
    }

    /// Get human-readable file size
    pub fn format_size(size: u64) -> String {
        const UNITS: &[&str] = &["B", "KB", "MB", "GB", "TB"];
        let mut size = size as f64;
        let mut unit_index = 0;

        while size >= 1024.0 && unit_index < UNITS.len() - 1 {
            size /= 1024.0;
            unit_index += 1;
        }

        if unit_index == 0 {
            format!("{} {}", size as u64, UNITS[unit_index])
        } else {
            format!("{:.2} {}", size, UNITS[unit_index])
        }
    }
}
