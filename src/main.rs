//! # Video Batch Tagger - Main Entry Point
//!
//! Questo è il punto di ingresso principale dell'applicazione.
//!
//! ## Responsabilità:
//! - Parsing degli argomenti della command line con `clap`
//! - Inizializzazione del sistema di logging con `tracing` (su stderr)
//! - Caricamento della configurazione e applicazione degli override CLI
//! - Dispatch dei comandi: process, status, inspect, tag, download, init-config
//!
//! ## Exit code:
//! - 0 anche se alcuni file falliscono (gli esiti sono nel riepilogo)
//! - diverso da 0 per errori di run (template mancante, directory illeggibile)
//!
//! ## Esempio di utilizzo:
//! ```bash
//! video-tagger process --metadata custom_metadata.json
//! video-tagger --input videos --output tagged --processed done status
//! ```

use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use video_batch_tagger::{
    downloader::{DownloadOptions, PlaylistDownloader},
    json_output::JsonMessage,
    progress::ProgressManager,
    video_processor::TagMode,
    BatchTagger, Config, MetadataTemplate, TagSet, VideoProcessor,
};

#[derive(Parser)]
#[command(name = "video-tagger")]
#[command(about = "Batch video metadata tagger - process videos from an input directory")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Input directory (default: input)
    #[arg(long, global = true, value_name = "INPUT_DIR")]
    input: Option<PathBuf>,

    /// Processed directory (default: processed)
    #[arg(long, global = true, value_name = "PROCESSED_DIR")]
    processed: Option<PathBuf>,

    /// Output directory (default: output)
    #[arg(long, global = true, value_name = "OUTPUT_DIR")]
    output: Option<PathBuf>,

    /// Metadata JSON file (default: sample_metadata.json)
    #[arg(short, long, global = true, value_name = "JSON_FILE")]
    metadata: Option<PathBuf>,

    /// Configuration file (default: <config dir>/video-batch-tagger/config.json)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Output progress and results as JSON on stdout
    #[arg(long, global = true)]
    json: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Process all videos in the input directory
    Process,

    /// Show directory status
    Status,

    /// Show video information and current metadata tags
    Inspect {
        /// Path to the video file
        file: PathBuf,
    },

    /// Add, remove or clear tags on a single video
    Tag {
        /// Path to the video file
        file: PathBuf,

        /// Add a metadata tag (can be used multiple times)
        #[arg(long, num_args = 2, value_names = ["KEY", "VALUE"])]
        add: Vec<String>,

        /// Remove a metadata tag (can be used multiple times)
        #[arg(long, value_name = "KEY")]
        remove: Vec<String>,

        /// Clear all metadata before applying additions
        #[arg(long)]
        clear: bool,

        /// Load tags from a JSON file
        #[arg(long, value_name = "JSON_FILE")]
        template: Option<PathBuf>,

        /// Write to this file instead of replacing the original
        #[arg(long, value_name = "OUTPUT_FILE")]
        save_as: Option<PathBuf>,
    },

    /// Download a playlist into the input directory
    Download {
        /// Playlist URL
        url: String,

        /// Max height (e.g. 720) or a yt-dlp format selector
        #[arg(short, long, default_value = "best")]
        quality: String,

        /// Download audio only (mp3)
        #[arg(long)]
        audio_only: bool,

        /// List playlist videos without downloading
        #[arg(long)]
        list: bool,

        /// Target directory (default: the input directory)
        #[arg(long)]
        dir: Option<PathBuf>,
    },

    /// Write the effective configuration to the config file
    InitConfig,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging; stdout stays free for JSON output
    let default_level = if args.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let json = args.json;
    let result = run(args).await;
    if let Err(ref e) = result {
        if json {
            JsonMessage::error(e).emit();
        }
    }
    result
}

async fn run(args: Args) -> Result<()> {
    let config_path = args.config.clone().or_else(Config::default_path);
    let config = load_config(&args, config_path.as_ref()).await?;

    match args.command {
        Some(Commands::Process) => {
            let tagger = BatchTagger::new(config)?;
            let report = tagger.run_batch().await?;
            if !tagger.config().json_output {
                println!("\n{}", report.format_summary());
            }
        }
        Some(Commands::Status) => show_status(config, false).await?,
        None => show_status(config, true).await?,
        Some(Commands::Inspect { file }) => inspect(&file).await?,
        Some(Commands::Tag {
            file,
            add,
            remove,
            clear,
            template,
            save_as,
        }) => edit_tags(file, add, remove, clear, template, save_as).await?,
        Some(Commands::Download {
            url,
            quality,
            audio_only,
            list,
            dir,
        }) => {
            VideoProcessor::check_dependencies(&["yt-dlp"]).await?;
            let downloader = PlaylistDownloader::new(DownloadOptions { quality, audio_only });

            if list {
                let spinner = ProgressManager::spinner("Fetching playlist information...");
                let entries = downloader.list(&url).await;
                spinner.finish_and_clear();
                let entries = entries?;
                println!("Found {} videos in playlist:", entries.len());
                for entry in entries {
                    println!("{:3}. {} (ID: {})", entry.index, entry.title, entry.id);
                }
            } else {
                let target = dir.unwrap_or(config.input_dir);
                downloader.download(&url, &target).await?;
            }
        }
        Some(Commands::InitConfig) => {
            let path = config_path
                .ok_or_else(|| anyhow::anyhow!("No configuration directory available; pass --config"))?;
            config.validate()?;
            config.save_to_file(&path).await?;
            println!("Configuration written to {}", path.display());
        }
    }

    Ok(())
}

/// Config file values with CLI overrides applied
async fn load_config(args: &Args, config_path: Option<&PathBuf>) -> Result<Config> {
    let mut config = match config_path {
        Some(path) => Config::from_file(path).await?,
        None => Config::default(),
    };

    if let Some(ref input) = args.input {
        config.input_dir = input.clone();
    }
    if let Some(ref processed) = args.processed {
        config.processed_dir = processed.clone();
    }
    if let Some(ref output) = args.output {
        config.output_dir = output.clone();
    }
    if let Some(ref metadata) = args.metadata {
        config.metadata_file = metadata.clone();
    }
    config.json_output |= args.json;

    Ok(config)
}

async fn show_status(config: Config, with_hint: bool) -> Result<()> {
    let tagger = BatchTagger::new(config)?;
    tagger.prepare_directories().await?;
    let report = tagger.status()?;

    if tagger.config().json_output {
        JsonMessage::Status { report: &report }.emit();
    } else {
        println!("\n{}", report);
        if with_hint {
            println!("\nUse `video-tagger process` to start processing videos");
        }
    }
    Ok(())
}

async fn inspect(file: &Path) -> Result<()> {
    VideoProcessor::check_dependencies(&["ffprobe"]).await?;
    let processor = VideoProcessor::new();

    let info = processor.get_video_info(file).await?;
    println!("\nVideo Information: {}", file.display());
    println!("{}", "=".repeat(30));
    println!("Duration: {:.2}s", info.duration);
    println!("Size: {} bytes", info.size);
    println!("Format: {}", info.format_name);
    println!("Video: {} {}x{}", info.codec, info.width, info.height);

    let tags = processor.read_tags(file).await?;
    if tags.is_empty() {
        println!("\nNo metadata found");
    } else {
        println!("\nMetadata:");
        println!("{}", "=".repeat(50));
        for (key, value) in tags.iter() {
            println!("{:20}: {}", key, value);
        }
    }
    Ok(())
}

async fn edit_tags(
    file: PathBuf,
    add: Vec<String>,
    remove: Vec<String>,
    clear: bool,
    template: Option<PathBuf>,
    save_as: Option<PathBuf>,
) -> Result<()> {
    let mut additions = TagSet::new();
    if let Some(ref template_path) = template {
        let loaded = MetadataTemplate::load(template_path).await?;
        info!("Loading metadata from: {}", template_path.display());
        additions.extend_from(loaded.tags());
    }
    for pair in add.chunks(2) {
        if let [key, value] = pair {
            info!("Adding tag: {} = {}", key, value);
            additions.insert(key.as_str(), value.as_str());
        }
    }

    if additions.is_empty() && remove.is_empty() && !clear {
        return inspect(&file).await;
    }

    VideoProcessor::check_dependencies(&["ffmpeg", "ffprobe"]).await?;
    let processor = VideoProcessor::new();
    let target = save_as.unwrap_or_else(|| file.clone());

    let written = if clear && additions.is_empty() {
        info!("Clearing all metadata...");
        processor.clear_tags(&file, &target).await?
    } else if remove.is_empty() && !clear {
        processor.write_tags(&file, &target, &additions, TagMode::Merge).await?
    } else {
        let mut tags = if clear {
            info!("Clearing all metadata...");
            TagSet::new()
        } else {
            processor.read_tags(&file).await?
        };

        let mut removed_any = false;
        for key in &remove {
            if tags.remove(key).is_some() {
                info!("Removing tag: {}", key);
                removed_any = true;
            } else {
                warn!("Tag '{}' not found in metadata", key);
            }
        }
        if !clear && !removed_any && additions.is_empty() {
            return Ok(());
        }

        tags.extend_from(&additions);
        processor.write_tags(&file, &target, &tags, TagMode::Replace).await?
    };

    println!("✓ Metadata written successfully to: {}", written.display());
    Ok(())
}
