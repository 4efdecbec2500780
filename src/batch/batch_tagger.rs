//! # Batch Tagger Main Orchestrator
//!
//! Questo è il modulo principale che orchestra il processo di tagging.
//!
//! ## Responsabilità:
//! - Preparazione delle directory (input, processed, output)
//! - Caricamento del template metadata una sola volta per run
//! - Discovery dei video e processing sequenziale in ordine deterministico
//! - Raccolta degli esiti per file in un `BatchReport`
//! - Eventi JSON e progress bar durante il run
//!
//! ## Flusso di esecuzione:
//! 1. **Directory**: Crea input/processed/output se mancanti
//! 2. **Template**: Carica il JSON (errore fatale se mancante o non valido)
//! 3. **Discovery**: Elenca i video in input (errore fatale se illeggibile)
//! 4. **Dependency check**: Verifica i tool richiesti dal tag applicator
//! 5. **Processing**: Un file alla volta, `TaskTagger` produce un `Outcome`
//! 6. **Report**: Ritorna gli esiti, le statistiche sono derivate
//!
//! ## Error handling:
//! - Errori di run (template, discovery, dipendenze) interrompono prima del loop
//! - Errori per singoli file diventano `Outcome::Failure` e il loop continua
//!
//! ## Esempio:
//! ```rust,ignore
//! let tagger = BatchTagger::new(config)?;
//! let report = tagger.run_batch().await?;
//! println!("{}", report.format_summary());
//! ```

use crate::{
    batch::{report::BatchReport, task_tagger::TaskTagger},
    config::Config,
    file_manager::{FileManager, WorkItem},
    json_output::JsonMessage,
    metadata::MetadataTemplate,
    progress::ProgressManager,
    status::{DirectoryReport, StatusReporter},
    video_processor::{TagApplicator, VideoProcessor},
};
use anyhow::Result;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Drives a whole batch run over the configured directories
pub struct BatchTagger<A = VideoProcessor> {
    config: Config,
    applicator: A,
}

impl BatchTagger<VideoProcessor> {
    /// Batch tagger backed by ffmpeg
    pub fn new(config: Config) -> Result<Self> {
        Self::with_applicator(config, VideoProcessor::new())
    }
}

impl<A: TagApplicator> BatchTagger<A> {
    pub fn with_applicator(config: Config, applicator: A) -> Result<Self> {
        config.validate()?;
        Ok(Self { config, applicator })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Create the three pipeline directories if they are missing
    pub async fn prepare_directories(&self) -> Result<()> {
        for dir in [
            &self.config.input_dir,
            &self.config.processed_dir,
            &self.config.output_dir,
        ] {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to create directory {}: {}", dir.display(), e))?;
        }
        Ok(())
    }

    /// Process every eligible video in the input directory
    pub async fn run_batch(&self) -> Result<BatchReport> {
        let start_time = Instant::now();

        self.prepare_directories().await?;
        let template = MetadataTemplate::load(&self.config.metadata_file).await?;
        let items = FileManager::list_eligible(&self.config.input_dir)?;

        if self.config.json_output {
            JsonMessage::start(&self.config, items.len()).emit();
        }

        if items.is_empty() {
            info!("No video files found in {}", self.config.input_dir.display());
            let report = BatchReport::new();
            if self.config.json_output {
                JsonMessage::complete(&report, start_time.elapsed().as_secs_f64()).emit();
            }
            return Ok(report);
        }

        self.check_dependencies().await?;
        self.log_plan(&items);

        let report = self.process_items(&items, &template).await;

        if self.config.json_output {
            JsonMessage::complete(&report, start_time.elapsed().as_secs_f64()).emit();
        }
        info!(
            "Batch finished in {:.1}s: {}/{} succeeded",
            start_time.elapsed().as_secs_f64(),
            report.successful(),
            report.total()
        );

        Ok(report)
    }

    /// Read-only snapshot of the configured directories
    pub fn status(&self) -> Result<DirectoryReport> {
        Ok(StatusReporter::snapshot(
            &self.config.input_dir,
            &self.config.processed_dir,
            &self.config.output_dir,
            self.config.status_preview,
        )?)
    }

    async fn process_items(&self, items: &[WorkItem], template: &MetadataTemplate) -> BatchReport {
        let task = TaskTagger::new(
            &self.applicator,
            &self.config.processed_dir,
            &self.config.output_dir,
            self.config.item_timeout(),
        );
        let progress = ProgressManager::for_batch(
            items.len() as u64,
            self.config.show_progress && !self.config.json_output,
        );
        let total = items.len();
        let mut report = BatchReport::new();

        for (index, item) in items.iter().enumerate() {
            info!("Processing {}/{}: {}", index + 1, total, item.file_name);
            progress.set_message(&item.file_name);
            if self.config.json_output {
                JsonMessage::FileStart {
                    file: &item.file_name,
                    index: index + 1,
                    total,
                }
                .emit();
            }

            let outcome = task.process(item, template).await;

            let mark = if outcome.is_success() { "✓" } else { "✗" };
            progress.update(&format!("{} {}", mark, item.file_name));
            if self.config.json_output {
                JsonMessage::FileComplete {
                    file: &item.file_name,
                    index: index + 1,
                    total,
                    outcome: &outcome,
                }
                .emit();
            }

            report.record(item.file_name.clone(), outcome);
        }

        progress.finish(&format!(
            "Done: {} succeeded, {} failed",
            report.successful(),
            report.failed()
        ));
        report
    }

    async fn check_dependencies(&self) -> Result<()> {
        let tools = self.applicator.required_tools();
        if !tools.is_empty() {
            VideoProcessor::check_dependencies(tools).await?;
            debug!("Required tools available: {}", tools.join(", "));
        }
        Ok(())
    }

    fn log_plan(&self, items: &[WorkItem]) {
        info!("Found {} video(s) to process:", items.len());
        for item in items {
            info!("  - {}", item.file_name);
        }
        info!("Metadata template: {}", self.config.metadata_file.display());
        info!("Originals go to: {}", self.config.processed_dir.display());
        info!("Tagged videos go to: {}", self.config.output_dir.display());
    }
}

/// Run one batch with the ffmpeg tag applicator over explicit directories
pub async fn run_batch(
    input_dir: &Path,
    processed_dir: &Path,
    output_dir: &Path,
    metadata_template: &Path,
) -> Result<BatchReport> {
    let config = Config {
        input_dir: input_dir.to_path_buf(),
        processed_dir: processed_dir.to_path_buf(),
        output_dir: output_dir.to_path_buf(),
        metadata_file: metadata_template.to_path_buf(),
        ..Config::default()
    };
    BatchTagger::new(config)?.run_batch().await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::batch::{FailureStage, Outcome};
    use crate::error::TaggerError;
    use crate::metadata::ComposedMetadata;
    use async_trait::async_trait;
    use std::fs;
    use std::path::PathBuf;
    use std::sync::Mutex;
    use std::time::Duration;
    use tempfile::TempDir;
    use tokio_test::{assert_err, assert_ok};

    /// Copies the source to the target, failing for configured file names
    #[derive(Default)]
    struct FakeApplicator {
        fail_on: Vec<String>,
        delay: Option<Duration>,
        calls: Mutex<Vec<(String, ComposedMetadata)>>,
    }

    impl FakeApplicator {
        fn failing_on(names: &[&str]) -> Self {
            Self {
                fail_on: names.iter().map(|n| n.to_string()).collect(),
                ..Default::default()
            }
        }

        fn called(&self) -> Vec<String> {
            self.calls.lock().unwrap().iter().map(|(name, _)| name.clone()).collect()
        }
    }

    #[async_trait]
    impl TagApplicator for FakeApplicator {
        async fn apply_tags(
            &self,
            source: &Path,
            target: &Path,
            metadata: &ComposedMetadata,
        ) -> Result<PathBuf, TaggerError> {
            let name = source.file_name().unwrap().to_string_lossy().into_owned();
            self.calls.lock().unwrap().push((name.clone(), metadata.clone()));

            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail_on.contains(&name) {
                return Err(TaggerError::FFmpeg(format!("unsupported format: {}", name)));
            }

            tokio::fs::copy(source, target).await?;
            Ok(target.to_path_buf())
        }
    }

    struct Workspace {
        _temp: TempDir,
        config: Config,
    }

    impl Workspace {
        fn new(template: Option<&str>) -> Self {
            let temp = TempDir::new().unwrap();
            let root = temp.path();
            let config = Config {
                input_dir: root.join("input"),
                processed_dir: root.join("processed"),
                output_dir: root.join("output"),
                metadata_file: root.join("metadata.json"),
                show_progress: false,
                ..Config::default()
            };
            fs::create_dir_all(&config.input_dir).unwrap();
            if let Some(content) = template {
                fs::write(&config.metadata_file, content).unwrap();
            }
            Self { _temp: temp, config }
        }

        fn add_input(&self, name: &str) {
            fs::write(self.config.input_dir.join(name), format!("video {}", name)).unwrap();
        }

        fn listing(dir: &Path) -> Vec<String> {
            if !dir.exists() {
                return Vec::new();
            }
            let mut names: Vec<String> = fs::read_dir(dir)
                .unwrap()
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect();
            names.sort();
            names
        }

        fn input(&self) -> Vec<String> {
            Self::listing(&self.config.input_dir)
        }

        fn processed(&self) -> Vec<String> {
            Self::listing(&self.config.processed_dir)
        }

        fn output(&self) -> Vec<String> {
            Self::listing(&self.config.output_dir)
        }
    }

    #[tokio::test]
    async fn test_end_to_end_tags_and_relocates() {
        let ws = Workspace::new(Some(r#"{"artist": "X"}"#));
        for name in ["a.mp4", "b.mov", "notes.txt"] {
            ws.add_input(name);
        }

        let tagger = BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::default()).unwrap();
        let report = tagger.run_batch().await.unwrap();

        let names: Vec<&str> = report.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a.mp4", "b.mov"]);
        assert!(report.iter().all(|(_, o)| o.is_success()));

        assert_eq!(ws.input(), vec!["notes.txt"]);
        assert_eq!(ws.processed(), vec!["a.mp4", "b.mov"]);
        assert_eq!(ws.output(), vec!["a_tagged.mp4", "b_tagged.mov"]);

        let calls = tagger.applicator.calls.lock().unwrap();
        let (_, metadata) = &calls[0];
        assert_eq!(metadata.get("artist"), Some("X"));
        assert_eq!(metadata.get("title"), Some("a"));

        match report.get("b.mov").unwrap() {
            Outcome::Success { tagged_path, processed_path } => {
                assert_eq!(tagged_path, &ws.config.output_dir.join("b_tagged.mov"));
                assert_eq!(processed_path, &ws.config.processed_dir.join("b.mov"));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_template_title_is_kept() {
        let ws = Workspace::new(Some(r#"{"title": "Series", "year": 2024}"#));
        ws.add_input("01-episode.mkv");

        let tagger = BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::default()).unwrap();
        assert_ok!(tagger.run_batch().await);

        let calls = tagger.applicator.calls.lock().unwrap();
        assert_eq!(calls[0].1.get("title"), Some("Series"));
        assert_eq!(calls[0].1.get("year"), Some("2024"));
    }

    #[tokio::test]
    async fn test_empty_input_returns_empty_report() {
        let ws = Workspace::new(Some(r#"{"artist": "X"}"#));

        let tagger = BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::default()).unwrap();
        let report = tagger.run_batch().await.unwrap();

        assert!(report.is_empty());
        assert!(ws.input().is_empty());
        assert!(ws.processed().is_empty());
        assert!(ws.output().is_empty());
        assert!(tagger.applicator.called().is_empty());
    }

    #[tokio::test]
    async fn test_second_run_is_a_no_op() {
        let ws = Workspace::new(Some(r#"{"artist": "X"}"#));
        ws.add_input("a.mp4");
        ws.add_input("b.webm");

        let tagger = BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::default()).unwrap();
        let first = tagger.run_batch().await.unwrap();
        let second = tagger.run_batch().await.unwrap();

        assert_eq!(first.successful(), 2);
        assert!(second.is_empty());
        assert_eq!(tagger.applicator.called().len(), 2);
    }

    #[tokio::test]
    async fn test_missing_template_aborts_before_touching_input() {
        let ws = Workspace::new(None);
        ws.add_input("a.mp4");

        let tagger = BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::default()).unwrap();
        let err = assert_err!(tagger.run_batch().await);

        assert!(matches!(
            err.downcast_ref::<TaggerError>(),
            Some(TaggerError::Configuration(_))
        ));
        assert_eq!(ws.input(), vec!["a.mp4"]);
        assert!(ws.processed().is_empty());
        assert!(ws.output().is_empty());
        assert!(tagger.applicator.called().is_empty());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_input_aborts_with_discovery_error() {
        use std::os::unix::fs::PermissionsExt;

        let ws = Workspace::new(Some(r#"{"artist": "X"}"#));
        ws.add_input("a.mp4");
        let input = ws.config.input_dir.clone();
        fs::set_permissions(&input, fs::Permissions::from_mode(0o000)).unwrap();
        if fs::read_dir(&input).is_ok() {
            // running with privileges that ignore directory permissions
            fs::set_permissions(&input, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let tagger = BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::default()).unwrap();
        let result = tagger.run_batch().await;
        fs::set_permissions(&input, fs::Permissions::from_mode(0o755)).unwrap();

        let err = assert_err!(result);
        assert!(matches!(
            err.downcast_ref::<TaggerError>(),
            Some(TaggerError::Discovery { .. })
        ));
        assert!(tagger.applicator.called().is_empty());
        assert_eq!(ws.input(), vec!["a.mp4"]);
        assert!(ws.processed().is_empty());
        assert!(ws.output().is_empty());
    }

    #[tokio::test]
    async fn test_malformed_template_is_configuration_error() {
        let ws = Workspace::new(Some("{ not json"));
        ws.add_input("a.mp4");

        let tagger = BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::default()).unwrap();
        let err = tagger.run_batch().await.unwrap_err();

        assert!(matches!(
            err.downcast_ref::<TaggerError>(),
            Some(TaggerError::Configuration(_))
        ));
        assert_eq!(ws.input(), vec!["a.mp4"]);
    }

    #[tokio::test]
    async fn test_one_failure_does_not_stop_the_batch() {
        let ws = Workspace::new(Some(r#"{"artist": "X"}"#));
        for name in ["1.mp4", "2.mp4", "3.mp4", "4.mp4"] {
            ws.add_input(name);
        }

        let tagger =
            BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::failing_on(&["2.mp4"])).unwrap();
        let report = tagger.run_batch().await.unwrap();

        assert_eq!(tagger.applicator.called(), vec!["1.mp4", "2.mp4", "3.mp4", "4.mp4"]);
        assert_eq!(report.total(), 4);
        assert_eq!(report.successful(), 3);
        assert_eq!(report.failed_files(), vec!["2.mp4"]);

        match report.get("2.mp4").unwrap() {
            Outcome::Failure { stage, reason, orphaned_output } => {
                assert_eq!(*stage, FailureStage::Tagging);
                assert!(reason.contains("unsupported format"));
                assert!(orphaned_output.is_none());
            }
            other => panic!("unexpected outcome: {:?}", other),
        }

        assert_eq!(ws.input(), vec!["2.mp4"]);
        assert_eq!(ws.processed(), vec!["1.mp4", "3.mp4", "4.mp4"]);
        assert_eq!(ws.output(), vec!["1_tagged.mp4", "3_tagged.mp4", "4_tagged.mp4"]);
    }

    #[tokio::test]
    async fn test_relocation_collision_leaves_orphaned_output() {
        let ws = Workspace::new(Some(r#"{"artist": "X"}"#));
        ws.add_input("a.mp4");
        ws.add_input("b.mp4");
        fs::create_dir_all(&ws.config.processed_dir).unwrap();
        fs::write(ws.config.processed_dir.join("a.mp4"), b"older copy").unwrap();

        let tagger = BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::default()).unwrap();
        let report = tagger.run_batch().await.unwrap();

        let outcome = report.get("a.mp4").unwrap();
        assert!(!outcome.is_success());
        assert!(matches!(outcome, Outcome::Failure { stage: FailureStage::Relocation, .. }));
        assert_eq!(
            outcome.orphaned_output(),
            Some(ws.config.output_dir.join("a_tagged.mp4").as_path())
        );
        assert!(report.get("b.mp4").unwrap().is_success());

        assert_eq!(ws.input(), vec!["a.mp4"]);
        assert_eq!(fs::read(ws.config.processed_dir.join("a.mp4")).unwrap(), b"older copy");
        assert_eq!(ws.output(), vec!["a_tagged.mp4", "b_tagged.mp4"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_names_are_moved_byte_exact() {
        use std::ffi::{OsStr, OsString};
        use std::os::unix::ffi::OsStrExt;

        let ws = Workspace::new(Some(r#"{"artist": "X"}"#));
        let raw = OsStr::from_bytes(b"caf\xe9.mp4");
        fs::write(ws.config.input_dir.join(raw), b"video").unwrap();

        let tagger = BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::default()).unwrap();
        let report = tagger.run_batch().await.unwrap();
        assert_eq!(report.successful(), 1);

        let raw_listing = |dir: &Path| -> Vec<OsString> {
            fs::read_dir(dir).unwrap().map(|e| e.unwrap().file_name()).collect()
        };
        assert!(raw_listing(&ws.config.input_dir).is_empty());
        assert_eq!(raw_listing(&ws.config.processed_dir), vec![raw.to_os_string()]);
        assert_eq!(
            raw_listing(&ws.config.output_dir),
            vec![OsStr::from_bytes(b"caf\xe9_tagged.mp4").to_os_string()]
        );
    }

    #[tokio::test]
    async fn test_hung_applicator_times_out_per_item() {
        let ws = Workspace::new(Some(r#"{"artist": "X"}"#));
        ws.add_input("slow.mp4");
        let config = Config {
            item_timeout_secs: 1,
            ..ws.config.clone()
        };
        let applicator = FakeApplicator {
            delay: Some(Duration::from_secs(30)),
            ..Default::default()
        };

        let tagger = BatchTagger::with_applicator(config, applicator).unwrap();
        let report = tagger.run_batch().await.unwrap();

        let outcome = report.get("slow.mp4").unwrap();
        assert!(matches!(outcome, Outcome::Failure { stage: FailureStage::Tagging, .. }));
        assert!(outcome.error().unwrap().contains("Timed out"));
        assert_eq!(ws.input(), vec!["slow.mp4"]);
    }

    #[tokio::test]
    async fn test_directories_are_created() {
        let ws = Workspace::new(Some("{}"));
        fs::remove_dir(&ws.config.input_dir).unwrap();

        let tagger = BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::default()).unwrap();
        let report = tagger.run_batch().await.unwrap();

        assert!(report.is_empty());
        assert!(ws.config.input_dir.is_dir());
        assert!(ws.config.processed_dir.is_dir());
        assert!(ws.config.output_dir.is_dir());
    }

    #[tokio::test]
    async fn test_status_reflects_run() {
        let ws = Workspace::new(Some(r#"{"artist": "X"}"#));
        ws.add_input("a.mp4");
        ws.add_input("b.mp4");

        let tagger =
            BatchTagger::with_applicator(ws.config.clone(), FakeApplicator::failing_on(&["b.mp4"])).unwrap();
        tagger.run_batch().await.unwrap();
        let status = tagger.status().unwrap();

        assert_eq!(status.input.preview, vec!["b.mp4"]);
        assert_eq!(status.processed.preview, vec!["a.mp4"]);
        assert_eq!(status.output.preview, vec!["a_tagged.mp4"]);
    }

    #[test]
    fn test_overlapping_directories_are_rejected() {
        let config = Config {
            processed_dir: PathBuf::from("same"),
            output_dir: PathBuf::from("same"),
            ..Config::default()
        };
        assert!(BatchTagger::with_applicator(config, FakeApplicator::default()).is_err());
    }
}
