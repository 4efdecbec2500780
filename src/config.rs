//! # Configuration Management Module
//!
//! Questo modulo gestisce tutta la configurazione dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce la struct `Config` passata esplicitamente all'orchestratore
//! - Fornisce validazione dei parametri (directory disgiunte, timeout, preview)
//! - Supporta caricamento/salvataggio configurazione da/verso file JSON
//! - Fornisce valori di default documentati per tutti i parametri
//!
//! ## Parametri di configurazione:
//! - `input_dir`: Directory con i video da processare (default: "input")
//! - `processed_dir`: Directory per gli originali processati (default: "processed")
//! - `output_dir`: Directory per i video taggati (default: "output")
//! - `metadata_file`: Template JSON dei metadata (default: "sample_metadata.json")
//! - `item_timeout_secs`: Timeout per singolo file durante il tagging (default: 600)
//! - `status_preview`: Numero di nomi mostrati per directory nello status (default: 5)
//! - `json_output`: Emette eventi JSON su stdout (default: false)
//! - `show_progress`: Mostra la progress bar (default: true)
//!
//! ## Esempio:
//! ```rust,ignore
//! let config = Config {
//!     input_dir: "videos".into(),
//!     ..Default::default()
//! };
//! config.validate()?;
//! ```

use crate::error::TaggerError;
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for a batch tagging run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory holding pending videos
    pub input_dir: PathBuf,
    /// Directory receiving originals after a successful tag
    pub processed_dir: PathBuf,
    /// Directory receiving tagged artifacts
    pub output_dir: PathBuf,
    /// JSON metadata template applied to every video
    pub metadata_file: PathBuf,
    /// Upper bound for a single tag application
    pub item_timeout_secs: u64,
    /// How many names the status report shows per directory
    pub status_preview: usize,
    /// Output progress and results as JSON for programmatic use
    pub json_output: bool,
    /// Draw a progress bar while the batch runs
    pub show_progress: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            input_dir: PathBuf::from("input"),
            processed_dir: PathBuf::from("processed"),
            output_dir: PathBuf::from("output"),
            metadata_file: PathBuf::from("sample_metadata.json"),
            item_timeout_secs: 600,
            status_preview: 5,
            json_output: false,
            show_progress: true,
        }
    }
}

impl Config {
    /// Validate configuration parameters
    pub fn validate(&self) -> Result<(), TaggerError> {
        let dirs = [
            ("input", &self.input_dir),
            ("processed", &self.processed_dir),
            ("output", &self.output_dir),
        ];

        for (i, (name_a, dir_a)) in dirs.iter().enumerate() {
            if dir_a.as_os_str().is_empty() {
                return Err(TaggerError::Validation(format!("The {} directory path is empty", name_a)));
            }
            for (name_b, dir_b) in dirs.iter().skip(i + 1) {
                if same_location(dir_a, dir_b) {
                    return Err(TaggerError::Validation(format!(
                        "The {} and {} directories must be different (both are {})",
                        name_a,
                        name_b,
                        dir_a.display()
                    )));
                }
            }
        }

        if self.item_timeout_secs == 0 {
            return Err(TaggerError::Validation("Item timeout must be greater than 0".into()));
        }

        if self.status_preview == 0 {
            return Err(TaggerError::Validation("Status preview count must be greater than 0".into()));
        }

        Ok(())
    }

    pub fn item_timeout(&self) -> Duration {
        Duration::from_secs(self.item_timeout_secs)
    }

    /// Default location of the configuration file
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("video-batch-tagger").join("config.json"))
    }

    /// Load configuration from file
    pub async fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = tokio::fs::read_to_string(path).await?;
        let config: Config = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub async fn save_to_file(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        let content = serde_json::to_string_pretty(self)?;
        tokio::fs::write(path, content).await?;
        Ok(())
    }
}

/// Compares two directory paths, resolving them when they already exist
fn same_location(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(ca), Ok(cb)) => ca == cb,
        _ => a == b,
    }
}
