//! # Batch Module
//!
//! Modulo che separa le responsabilità del batch in sottomoduli:
//! - `batch_tagger`: Orchestratore principale del run
//! - `task_tagger`: Worker per singoli file (compose → tag → relocate)
//! - `path_resolver`: Logica di calcolo path centralizzata
//! - `report`: Esiti per file e riepilogo del run

pub mod batch_tagger;
pub mod path_resolver;
pub mod report;
pub mod task_tagger;

pub use batch_tagger::{run_batch, BatchTagger};
pub use path_resolver::PathResolver;
pub use report::{BatchReport, FailureStage, Outcome};
pub use task_tagger::TaskTagger;
