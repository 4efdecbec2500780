//! # Video Batch Tagger Library
//!
//! Questo è il modulo principale della libreria che espone tutte le API pubbliche.
//!
//! ## Responsabilità:
//! - Definisce la struttura modulare dell'applicazione
//! - Espone i tipi e le funzioni principali tramite re-exports
//! - Fornisce un'interfaccia pulita per il main.rs e per altri consumatori
//!
//! ## Architettura dei moduli:
//! - `config`: Configurazione esplicita e validazione parametri
//! - `error`: Tipi di errore custom (fatali per il run o locali al file)
//! - `metadata`: Template metadata e composizione con titolo derivato
//! - `file_manager`: Discovery dei video e spostamento file
//! - `video_processor`: Scrittura/lettura tag con ffmpeg e ffprobe
//! - `batch`: Orchestratore del batch e worker per singolo file
//! - `status`: Snapshot delle directory input/processed/output
//! - `downloader`: Download playlist con yt-dlp verso la directory di input
//! - `progress` / `json_output`: Feedback visivo e eventi JSON
//!
//! ## Utilizzo:
//! ```rust,ignore
//! use video_batch_tagger::{BatchTagger, Config};
//!
//! let tagger = BatchTagger::new(Config::default())?;
//! let report = tagger.run_batch().await?;
//! println!("{}", report.format_summary());
//! ```

pub mod batch;
pub mod config;
pub mod downloader;
pub mod error;
pub mod file_manager;
pub mod json_output;
pub mod metadata;
pub mod platform;
pub mod progress;
pub mod status;
pub mod video_processor;

pub use batch::{run_batch, BatchReport, BatchTagger, FailureStage, Outcome};
pub use config::Config;
pub use error::TaggerError;
pub use file_manager::{FileManager, WorkItem};
pub use metadata::{compose, ComposedMetadata, MetadataTemplate, TagSet};
pub use status::{DirectoryReport, StatusReporter};
pub use video_processor::{TagApplicator, VideoProcessor};
