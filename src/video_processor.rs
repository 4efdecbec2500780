//! # Video Processing Module
//!
//! Questo modulo gestisce la scrittura e la lettura dei metadata nei file video.
//!
//! ## Responsabilità:
//! - Definisce il trait `TagApplicator` usato dall'orchestratore
//! - Scrittura dei tag con FFmpeg senza ricodifica (`-c copy`)
//! - Lettura dei tag esistenti e delle proprietà video con ffprobe
//! - Verifica dipendenze esterne (ffmpeg, ffprobe)
//!
//! ## Pipeline di tagging:
//! 1. Crea un file temporaneo nella directory di destinazione (stessa estensione)
//! 2. FFmpeg copia gli stream e aggiunge `-metadata key=value` per ogni tag
//! 3. Il file temporaneo viene rinominato atomicamente sul path finale
//! 4. In caso di errore il temporaneo viene rimosso automaticamente
//!
//! ## Modalità dei tag:
//! - `Merge`: mantiene i metadata originali e sovrascrive quelli forniti
//! - `Replace`: scarta i metadata originali e scrive solo quelli forniti
//!
//! ## Dipendenze richieste:
//! - `ffmpeg`: Scrittura metadata
//! - `ffprobe`: Lettura metadata e proprietà video
//!
//! ## Esempio:
//! ```rust,ignore
//! let processor = VideoProcessor::new();
//! processor.apply_tags(&source, &target, &metadata).await?;
//! let tags = processor.read_tags(&target).await?;
//! ```

use crate::error::TaggerError;
use crate::metadata::{ComposedMetadata, TagSet};
use crate::platform::PlatformCommands;
use async_trait::async_trait;
use serde_json::Value;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::process::Command;
use tracing::debug;

/// Embeds a tag set into a media file, producing a new file.
///
/// Implementations must be safe to retry with the same inputs.
#[async_trait]
pub trait TagApplicator: Send + Sync {
    /// Write `source` plus `metadata` to `target`, returning the artifact path
    async fn apply_tags(
        &self,
        source: &Path,
        target: &Path,
        metadata: &ComposedMetadata,
    ) -> Result<PathBuf, TaggerError>;

    /// External programs that must be on PATH before a batch starts
    fn required_tools(&self) -> &'static [&'static str] {
        &[]
    }
}

/// How existing container metadata is treated when writing tags
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TagMode {
    Merge,
    Replace,
}

impl TagMode {
    fn map_metadata_arg(self) -> &'static str {
        match self {
            TagMode::Merge => "0",
            TagMode::Replace => "-1",
        }
    }
}

/// ffmpeg/ffprobe backed tagging and inspection
#[derive(Debug, Clone, Default)]
pub struct VideoProcessor;

impl VideoProcessor {
    pub fn new() -> Self {
        Self
    }

    /// Write `tags` into a copy of `source` at `target`.
    ///
    /// `target` may equal `source`; the original is then replaced atomically.
    pub async fn write_tags(
        &self,
        source: &Path,
        target: &Path,
        tags: &TagSet,
        mode: TagMode,
    ) -> Result<PathBuf, TaggerError> {
        if !source.is_file() {
            return Err(TaggerError::Tagging(format!("Video file not found: {}", source.display())));
        }

        let target_dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        tokio::fs::create_dir_all(&target_dir).await?;

        // ffmpeg picks the container from the extension, so the temp file keeps it
        let suffix = target
            .extension()
            .map(|ext| format!(".{}", ext.to_string_lossy()))
            .unwrap_or_default();
        let temp_path = tempfile::Builder::new()
            .prefix(".tagging-")
            .suffix(&suffix)
            .tempfile_in(&target_dir)?
            .into_temp_path();

        let args = Self::ffmpeg_args(source, &temp_path, tags, mode);
        self.run_ffmpeg(args).await?;

        temp_path
            .persist(target)
            .map_err(|e| TaggerError::Io(e.error))?;

        debug!("✓ Metadata written successfully to: {}", target.display());
        Ok(target.to_path_buf())
    }

    /// Copy `source` to `target` with every container tag removed
    pub async fn clear_tags(&self, source: &Path, target: &Path) -> Result<PathBuf, TaggerError> {
        self.write_tags(source, target, &TagSet::new(), TagMode::Replace).await
    }

    fn ffmpeg_args(source: &Path, output: &Path, tags: &TagSet, mode: TagMode) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            "-i".into(),
            source.as_os_str().to_owned(),
            "-map_metadata".into(),
            mode.map_metadata_arg().into(),
        ];

        for (key, value) in tags.iter() {
            args.push("-metadata".into());
            args.push(format!("{}={}", key, value).into());
        }

        // Copy streams without re-encoding
        for arg in ["-c", "copy", "-y"] {
            args.push(arg.into());
        }
        args.push(output.as_os_str().to_owned());
        args
    }

    async fn run_ffmpeg(&self, args: Vec<OsString>) -> Result<(), TaggerError> {
        let platform = PlatformCommands::instance();
        let ffmpeg_cmd = platform.get_command("ffmpeg");

        let start_time = std::time::Instant::now();
        let output = Command::new(ffmpeg_cmd)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| TaggerError::FFmpeg(format!("Failed to execute {}: {}", ffmpeg_cmd, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            debug!("FFmpeg failed after {:.1}s: {}", start_time.elapsed().as_secs_f64(), stderr);
            return Err(TaggerError::FFmpeg(if stderr.is_empty() {
                format!("ffmpeg exited with {}", output.status)
            } else {
                stderr
            }));
        }

        debug!("FFmpeg completed in {:.1}s", start_time.elapsed().as_secs_f64());
        Ok(())
    }

    async fn probe(&self, video_path: &Path) -> Result<Value, TaggerError> {
        let platform = PlatformCommands::instance();
        let ffprobe_cmd = platform.get_command("ffprobe");

        let output = Command::new(ffprobe_cmd)
            .args(["-v", "quiet", "-print_format", "json", "-show_format", "-show_streams"])
            .arg(video_path)
            .output()
            .await
            .map_err(|e| TaggerError::FFmpeg(format!("Failed to execute {}: {}", ffprobe_cmd, e)))?;

        if !output.status.success() {
            return Err(TaggerError::FFmpeg(format!(
                "ffprobe could not read {}: {}",
                video_path.display(),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| TaggerError::FFmpeg(format!("Unexpected ffprobe output: {}", e)))
    }

    /// Read container and video stream tags
    pub async fn read_tags(&self, video_path: &Path) -> Result<TagSet, TaggerError> {
        let probe = self.probe(video_path).await?;
        Ok(tags_from_probe(&probe))
    }

    /// Get video information using ffprobe
    pub async fn get_video_info(&self, video_path: &Path) -> Result<VideoInfo, TaggerError> {
        let probe = self.probe(video_path).await?;
        Ok(VideoInfo::from_probe(&probe))
    }

    /// Check if required tools are available
    pub async fn check_dependencies(tools: &[&str]) -> Result<(), TaggerError> {
        let platform = PlatformCommands::instance();

        for tool in tools {
            if !platform.is_command_available(tool).await {
                return Err(TaggerError::MissingDependency(format!(
                    "{} is required but was not found on PATH",
                    tool
                )));
            }
        }

        Ok(())
    }
}

#[async_trait]
impl TagApplicator for VideoProcessor {
    async fn apply_tags(
        &self,
        source: &Path,
        target: &Path,
        metadata: &ComposedMetadata,
    ) -> Result<PathBuf, TaggerError> {
        self.write_tags(source, target, metadata, TagMode::Merge).await
    }

    fn required_tools(&self) -> &'static [&'static str] {
        &["ffmpeg"]
    }
}

/// Format-level tags first, then video stream tags overriding them
fn tags_from_probe(probe: &Value) -> TagSet {
    let mut tags = TagSet::new();

    let mut collect = |section: &Value| {
        if let Some(map) = section["tags"].as_object() {
            for (key, value) in map {
                let text = match value {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                tags.insert(key.clone(), text);
            }
        }
    };

    collect(&probe["format"]);
    if let Some(streams) = probe["streams"].as_array() {
        for stream in streams.iter().filter(|s| s["codec_type"] == "video") {
            collect(stream);
        }
    }

    tags
}

/// Video file information
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub duration: f64,
    pub size: u64,
    pub bitrate: u64,
    pub format_name: String,
    pub width: u32,
    pub height: u32,
    pub codec: String,
}

impl VideoInfo {
    fn from_probe(info: &Value) -> Self {
        let format = &info["format"];
        let parse_u64 = |v: &Value| v.as_str().and_then(|s| s.parse::<u64>().ok()).unwrap_or(0);

        let duration = format["duration"]
            .as_str()
            .and_then(|d| d.parse::<f64>().ok())
            .unwrap_or(0.0);

        let video_stream = info["streams"]
            .as_array()
            .and_then(|streams| streams.iter().find(|s| s["codec_type"] == "video"))
            .unwrap_or(&Value::Null);

        Self {
            duration,
            size: parse_u64(&format["size"]),
            bitrate: parse_u64(&format["bit_rate"]),
            format_name: format["format_name"].as_str().unwrap_or("unknown").to_string(),
            width: video_stream["width"].as_u64().unwrap_or(0) as u32,
            height: video_stream["height"].as_u64().unwrap_or(0) as u32,
            codec: video_stream["codec_name"].as_str().unwrap_or("unknown").to_string(),
        }
    }
}
