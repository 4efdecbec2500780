//! # Task Tagger Module
//!
//! Worker per il tagging di un singolo `WorkItem`.
//! Ogni errore viene convertito in un `Outcome` esplicito: nessun errore
//! per-file risale fino al loop del batch.

use crate::{
    batch::path_resolver::PathResolver,
    batch::report::Outcome,
    error::TaggerError,
    file_manager::{FileManager, WorkItem},
    metadata::{compose, ComposedMetadata, MetadataTemplate},
    video_processor::TagApplicator,
};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Drives one item through compose → tag → relocate
pub struct TaskTagger<'a, A: TagApplicator + ?Sized> {
    applicator: &'a A,
    processed_dir: &'a Path,
    output_dir: &'a Path,
    timeout: Duration,
}

impl<'a, A: TagApplicator + ?Sized> TaskTagger<'a, A> {
    pub fn new(applicator: &'a A, processed_dir: &'a Path, output_dir: &'a Path, timeout: Duration) -> Self {
        Self {
            applicator,
            processed_dir,
            output_dir,
            timeout,
        }
    }

    /// Processa un singolo file
    pub async fn process(&self, item: &WorkItem, template: &MetadataTemplate) -> Outcome {
        let metadata = compose(template, &item.base_name);
        let target = PathResolver::tagged_output_path(item, self.output_dir);

        debug!("Tagging {} -> {}", item.source_path.display(), target.display());
        let tagged_path = match self.tag(item, &target, &metadata).await {
            Ok(path) => path,
            Err(e) => {
                warn!("✗ Tagging failed for {}: {} (original left in input)", item.file_name, e);
                return Outcome::tagging_failed(e.to_string());
            }
        };

        let processed_path = PathResolver::processed_path(item, self.processed_dir);
        if let Err(e) = FileManager::move_file(&item.source_path, &processed_path).await {
            error!(
                "✗ Relocation failed for {}: {}. Tagged file left at {} while the original stays in input",
                item.file_name,
                e,
                tagged_path.display()
            );
            return Outcome::relocation_failed(e.to_string(), tagged_path);
        }

        info!("✓ Successfully processed: {}", item.file_name);
        debug!("  Original moved to: {}", processed_path.display());
        debug!("  Tagged video saved to: {}", tagged_path.display());
        for (key, value) in metadata.iter() {
            debug!("  {:15}: {}", key, value);
        }

        Outcome::Success {
            tagged_path,
            processed_path,
        }
    }

    async fn tag(&self, item: &WorkItem, target: &Path, metadata: &ComposedMetadata) -> Result<PathBuf, TaggerError> {
        tokio::time::timeout(
            self.timeout,
            self.applicator.apply_tags(&item.source_path, target, metadata),
        )
        .await
        .map_err(|_| TaggerError::Timeout(self.timeout.as_secs()))?
    }
}
