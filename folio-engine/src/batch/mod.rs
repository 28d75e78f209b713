//! Batch runs: content enrichment, parallel compilation, output table and
//! population report

pub mod content;
pub mod orchestrator;
pub mod report;

pub use content::{enrich, ContentProvider, ContentRequest};
pub use orchestrator::{BatchOrchestrator, BatchResult, OutputTable, DEFAULT_MAX_PARALLEL};
pub use report::{FieldStats, FieldStatus, PopulationReport, RecordOutcome, SkippedRecord};
