//! # JSON Output Module
//!
//! Questo modulo gestisce l'output strutturato in JSON per l'uso programmatico.
//!
//! ## Responsabilità:
//! - Emette un oggetto JSON per riga su stdout per ogni evento del batch
//! - Riutilizza `Outcome` e `DirectoryReport` senza duplicarne i campi
//! - I log human-readable restano su stderr
//!
//! ## Tipi di messaggi:
//! - `start`: Inizio del batch (directory e numero di file)
//! - `file_start`: Inizio elaborazione di un file
//! - `file_complete`: Esito di un file
//! - `complete`: Fine del batch con statistiche finali
//! - `status`: Snapshot delle directory
//! - `error`: Errore fatale per il run

use crate::batch::{BatchReport, Outcome};
use crate::config::Config;
use crate::status::DirectoryReport;
use serde::Serialize;
use std::path::PathBuf;

/// Tipo di messaggio JSON
#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JsonMessage<'a> {
    Start {
        input_dir: &'a PathBuf,
        processed_dir: &'a PathBuf,
        output_dir: &'a PathBuf,
        metadata_file: &'a PathBuf,
        total_files: usize,
    },

    FileStart {
        file: &'a str,
        index: usize,
        total: usize,
    },

    FileComplete {
        file: &'a str,
        index: usize,
        total: usize,
        outcome: &'a Outcome,
    },

    Complete {
        total: usize,
        successful: usize,
        failed: usize,
        success_rate: f64,
        failed_files: Vec<&'a str>,
        duration_seconds: f64,
    },

    Status {
        report: &'a DirectoryReport,
    },

    Error {
        message: String,
        details: Option<String>,
    },
}

impl<'a> JsonMessage<'a> {
    /// Emette il messaggio JSON su stdout
    pub fn emit(&self) {
        if let Ok(json) = serde_json::to_string(self) {
            println!("{}", json);
        }
    }

    pub fn start(config: &'a Config, total_files: usize) -> Self {
        JsonMessage::Start {
            input_dir: &config.input_dir,
            processed_dir: &config.processed_dir,
            output_dir: &config.output_dir,
            metadata_file: &config.metadata_file,
            total_files,
        }
    }

    pub fn complete(report: &'a BatchReport, duration_seconds: f64) -> Self {
        JsonMessage::Complete {
            total: report.total(),
            successful: report.successful(),
            failed: report.failed(),
            success_rate: report.success_rate(),
            failed_files: report.failed_files(),
            duration_seconds,
        }
    }

    /// Fatal error, with the full cause chain as details
    pub fn error(err: &anyhow::Error) -> Self {
        let causes: Vec<String> = err.chain().skip(1).map(|c| c.to_string()).collect();
        JsonMessage::Error {
            message: err.to_string(),
            details: if causes.is_empty() { None } else { Some(causes.join(": ")) },
        }
    }
}
