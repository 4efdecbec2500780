//! # Playlist Download Module
//!
//! Popola la directory di input scaricando una playlist con `yt-dlp`.
//!
//! ## Responsabilità:
//! - Download best-effort: i singoli video che falliscono vengono saltati
//! - Selezione qualità (altezza massima o selettore di formato libero)
//! - Modalità solo audio con estrazione MP3
//! - Elenco dei video della playlist senza scaricarli
//!
//! ## Naming dei file:
//! - `<indice playlist>-<titolo>.<ext>`, es. `03-Live Show.mp4`
//! - L'indice iniziale viene poi rimosso dalla derivazione del titolo

use crate::error::TaggerError;
use crate::platform::PlatformCommands;
use serde::Deserialize;
use std::ffi::OsString;
use std::path::Path;
use tokio::process::Command;
use tracing::{info, warn};

/// Options for a playlist download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DownloadOptions {
    /// Maximum height in pixels ("720") or a raw yt-dlp format selector
    pub quality: String,
    pub audio_only: bool,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            quality: "best".to_string(),
            audio_only: false,
        }
    }
}

impl DownloadOptions {
    fn format_selector(&self) -> String {
        if self.audio_only {
            "bestaudio[ext=m4a]/bestaudio[ext=mp3]/bestaudio".to_string()
        } else if !self.quality.is_empty() && self.quality.chars().all(|c| c.is_ascii_digit()) {
            format!("best[height<={}]", self.quality)
        } else {
            self.quality.clone()
        }
    }
}

/// One video listed in a playlist
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaylistEntry {
    pub index: usize,
    pub title: String,
    pub id: String,
}

#[derive(Deserialize)]
struct FlatPlaylist {
    #[serde(default)]
    entries: Vec<Option<FlatEntry>>,
}

#[derive(Deserialize)]
struct FlatEntry {
    id: Option<String>,
    title: Option<String>,
}

/// yt-dlp backed playlist fetcher
#[derive(Debug, Clone, Default)]
pub struct PlaylistDownloader {
    options: DownloadOptions,
}

impl PlaylistDownloader {
    pub fn new(options: DownloadOptions) -> Self {
        Self { options }
    }

    fn download_args(&self, playlist_url: &str, target_dir: &Path) -> Vec<OsString> {
        let template = target_dir.join("%(playlist_index)s-%(title)s.%(ext)s");
        let mut args: Vec<OsString> = vec![
            "--ignore-errors".into(),
            "-o".into(),
            template.into_os_string(),
            "-f".into(),
            self.options.format_selector().into(),
        ];

        if self.options.audio_only {
            for arg in ["-x", "--audio-format", "mp3", "--audio-quality", "192K"] {
                args.push(arg.into());
            }
        }

        args.push(playlist_url.into());
        args
    }

    /// Fetch every playlist item into `target_dir`, skipping items that fail
    pub async fn download(&self, playlist_url: &str, target_dir: &Path) -> Result<(), TaggerError> {
        tokio::fs::create_dir_all(target_dir).await?;

        let ytdlp = PlatformCommands::instance().get_command("yt-dlp");
        info!("Starting download of playlist: {}", playlist_url);
        info!("Output directory: {}", target_dir.display());
        info!(
            "Quality: {}",
            if self.options.audio_only { "Audio only" } else { self.options.quality.as_str() }
        );

        let status = Command::new(ytdlp)
            .args(self.download_args(playlist_url, target_dir))
            .status()
            .await
            .map_err(|e| TaggerError::Download(format!("Failed to execute {}: {}", ytdlp, e)))?;

        if status.success() {
            info!("Download completed!");
        } else {
            // --ignore-errors still exits non-zero when some items were skipped
            warn!("yt-dlp finished with {}; some videos may have been skipped", status);
        }
        Ok(())
    }

    /// List the playlist contents without downloading
    pub async fn list(&self, playlist_url: &str) -> Result<Vec<PlaylistEntry>, TaggerError> {
        let ytdlp = PlatformCommands::instance().get_command("yt-dlp");

        let output = Command::new(ytdlp)
            .args(["-J", "--flat-playlist", "--quiet"])
            .arg(playlist_url)
            .output()
            .await
            .map_err(|e| TaggerError::Download(format!("Failed to execute {}: {}", ytdlp, e)))?;

        if !output.status.success() {
            return Err(TaggerError::Download(format!(
                "Cannot read playlist {}: {}",
                playlist_url,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        parse_flat_playlist(&output.stdout)
    }
}

fn parse_flat_playlist(json: &[u8]) -> Result<Vec<PlaylistEntry>, TaggerError> {
    let playlist: FlatPlaylist = serde_json::from_slice(json)
        .map_err(|e| TaggerError::Download(format!("Unexpected yt-dlp output: {}", e)))?;

    Ok(playlist
        .entries
        .into_iter()
        .enumerate()
        .filter_map(|(i, entry)| {
            let entry = entry?;
            Some(PlaylistEntry {
                index: i + 1,
                title: entry.title.unwrap_or_else(|| "Unknown".to_string()),
                id: entry.id.unwrap_or_else(|| "Unknown".to_string()),
            })
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg_strings(args: Vec<OsString>) -> Vec<String> {
        args.into_iter().map(|a| a.to_string_lossy().into_owned()).collect()
    }

    #[test]
    fn test_format_selector() {
        let mut options = DownloadOptions::default();
        assert_eq!(options.format_selector(), "best");

        options.quality = "720".to_string();
        assert_eq!(options.format_selector(), "best[height<=720]");

        options.audio_only = true;
        assert_eq!(options.format_selector(), "bestaudio[ext=m4a]/bestaudio[ext=mp3]/bestaudio");
    }

    #[test]
    fn test_download_args() {
        let downloader = PlaylistDownloader::new(DownloadOptions {
            quality: "480".to_string(),
            audio_only: false,
        });
        let args = arg_strings(downloader.download_args("https://example.com/list", Path::new("input")));

        assert_eq!(args[0], "--ignore-errors");
        assert!(args[2].ends_with("%(playlist_index)s-%(title)s.%(ext)s"));
        assert!(args[2].starts_with("input"));
        assert_eq!(args[4], "best[height<=480]");
        assert_eq!(args.last().unwrap(), "https://example.com/list");
        assert!(!args.contains(&"-x".to_string()));
    }

    #[test]
    fn test_audio_only_args_extract_mp3() {
        let downloader = PlaylistDownloader::new(DownloadOptions {
            quality: "best".to_string(),
            audio_only: true,
        });
        let args = arg_strings(downloader.download_args("url", Path::new("input")));
        assert!(args.windows(2).any(|w| w[0] == "--audio-format" && w[1] == "mp3"));
    }

    #[test]
    fn test_parse_flat_playlist() {
        let json = br#"{"title": "List", "entries": [
            {"id": "abc", "title": "First"},
            null,
            {"id": "def"}
        ]}"#;

        let entries = parse_flat_playlist(json).unwrap();
        assert_eq!(
            entries,
            vec![
                PlaylistEntry { index: 1, title: "First".into(), id: "abc".into() },
                PlaylistEntry { index: 3, title: "Unknown".into(), id: "def".into() },
            ]
        );
    }

    #[test]
    fn test_parse_flat_playlist_rejects_garbage() {
        assert!(matches!(parse_flat_playlist(b"nope"), Err(TaggerError::Download(_))));
    }
}
