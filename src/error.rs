//! # Error Types Module
//!
//! Questo modulo definisce tutti i tipi di errore custom dell'applicazione.
//!
//! ## Responsabilità:
//! - Definisce `TaggerError` enum per categorizzare tutti gli errori possibili
//! - Distingue errori fatali per il batch da errori locali al singolo file
//! - Integra con `thiserror` per automatic error conversion
//!
//! ## Categorie di errori:
//! - `Configuration`: Template metadata mancante o non valido (fatale per il run)
//! - `Discovery`: Directory input non leggibile (fatale per il run)
//! - `Tagging`: Il tag applicator rifiuta un file (locale al file)
//! - `Relocation`: Spostamento dell'originale fallito dopo il tagging (locale al file)
//! - `FFmpeg`: Errori di ffmpeg/ffprobe
//! - `MissingDependency`: Tool esterno mancante (ffmpeg, ffprobe, yt-dlp)
//! - `Download`: Errore nel download della playlist
//! - `Validation`: Configurazione non valida (directory sovrapposte, timeout nullo)
//! - `Timeout`: Tag applicator bloccato oltre il limite configurato
//!
//! ## Esempio:
//! ```rust,ignore
//! if !template_path.exists() {
//!     return Err(TaggerError::Configuration(format!("Metadata file not found: {}", path)));
//! }
//! ```

use std::path::PathBuf;

/// Custom error types for batch video tagging
#[derive(thiserror::Error, Debug)]
pub enum TaggerError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot read input directory {path}: {source}")]
    Discovery {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Tagging failed: {0}")]
    Tagging(String),

    #[error("Relocation failed: {0}")]
    Relocation(String),

    #[error("FFmpeg error: {0}")]
    FFmpeg(String),

    #[error("Dependency missing: {0}")]
    MissingDependency(String),

    #[error("Download error: {0}")]
    Download(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = TaggerError::Configuration("Metadata file not found: meta.json".into());
        assert_eq!(err.to_string(), "Configuration error: Metadata file not found: meta.json");
        assert_eq!(TaggerError::Timeout(600).to_string(), "Timed out after 600s");

        let err = TaggerError::Discovery {
            path: PathBuf::from("input"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert_eq!(err.to_string(), "Cannot read input directory input: denied");
    }
}
