//! Batch orchestrator
//!
//! Runs every record of a batch through compile → validate → recover and
//! assembles the output table and the population report.
//!
//! # Architecture
//! - Records are independent; up to `max_parallel` run at once on the
//!   blocking pool via `futures::stream::buffered`, which keeps input order
//! - The identifier pool is the only shared mutable state and serializes its
//!   own mutations
//! - Cancellation stops submitting further records; records already running
//!   finish and their identifier assignments stay committed
//! - A failed record is skipped and reported, the batch always completes

use super::content::{enrich, ContentProvider};
use super::report::{PopulationReport, RecordOutcome, SkippedRecord};
use crate::error::{EngineError, EngineResult};
use crate::fields::{Field, OutputRecord};
use crate::pipeline::CompilationPipeline;
use crate::recovery::{RecoveryManager, RecoveryReport};
use crate::types::MetadataRecord;
use chrono::Utc;
use folio_common::config::write_atomic;
use futures::stream::{self, StreamExt};
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use uuid::Uuid;

/// Records processed concurrently unless configured otherwise
pub const DEFAULT_MAX_PARALLEL: usize = 4;

/// Header row plus one row per compiled record, in input order
#[derive(Debug, Clone, PartialEq)]
pub struct OutputTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl OutputTable {
    pub fn new() -> Self {
        Self {
            headers: Field::headers().into_iter().map(String::from).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, output: &OutputRecord) {
        self.rows.push(output.values().to_vec());
    }

    /// Value of `field` in row `row`
    pub fn cell(&self, row: usize, field: Field) -> Option<&str> {
        self.rows.get(row)?.get(field.index()).map(String::as_str)
    }

    pub fn to_writer<W: Write>(&self, writer: W) -> EngineResult<W> {
        let mut csv_writer = csv::Writer::from_writer(writer);
        csv_writer.write_record(&self.headers)?;
        for row in &self.rows {
            csv_writer.write_record(row)?;
        }
        csv_writer
            .into_inner()
            .map_err(|e| EngineError::Io(e.into_error()))
    }

    pub fn to_csv_string(&self) -> EngineResult<String> {
        let bytes = self.to_writer(Vec::new())?;
        String::from_utf8(bytes).map_err(|e| EngineError::InvalidInput(e.to_string()))
    }

    /// Write the table as CSV, replacing `path` atomically
    pub fn write_csv(&self, path: &Path) -> EngineResult<()> {
        let bytes = self.to_writer(Vec::new())?;
        write_atomic(path, &bytes)?;
        Ok(())
    }
}

impl Default for OutputTable {
    fn default() -> Self {
        Self::new()
    }
}

/// Everything a batch run produces
#[derive(Debug, Clone)]
pub struct BatchResult {
    pub table: OutputTable,
    pub report: PopulationReport,
}

/// Per-record work, cloned into each blocking task
#[derive(Debug, Clone)]
struct RecordWorker {
    pipeline: CompilationPipeline,
    recovery: RecoveryManager,
}

impl RecordWorker {
    fn process(&self, index: usize, record: &MetadataRecord) -> EngineResult<(OutputRecord, RecordOutcome)> {
        let compiled = self.pipeline.compile(record)?;
        let mut output = compiled.output.clone();

        let validation = self.recovery.validator().validate_record(&output);
        let (recovery, validation) = if validation.is_record_valid {
            (RecoveryReport::default(), validation)
        } else {
            self.recovery.recover(&compiled.book_id, &mut output, &validation)
        };

        let outcome = RecordOutcome::new(index, &compiled, &output, &validation, recovery);
        Ok((output, outcome))
    }
}

enum Processed {
    Compiled(OutputRecord, Box<RecordOutcome>),
    Skipped(SkippedRecord),
    NotSubmitted,
}

/// Drives a batch of records through the engine
pub struct BatchOrchestrator {
    worker: RecordWorker,
    content: Option<Arc<dyn ContentProvider>>,
    max_parallel: usize,
}

impl BatchOrchestrator {
    /// Parallelism from the `max_parallel_records` setting, else the default
    pub fn new(pipeline: CompilationPipeline) -> Self {
        let recovery = RecoveryManager::new(pipeline.tables().clone(), pipeline.config().clone());
        let max_parallel = pipeline
            .config()
            .setting_usize("max_parallel_records")
            .unwrap_or(DEFAULT_MAX_PARALLEL);
        Self {
            worker: RecordWorker { pipeline, recovery },
            content: None,
            max_parallel,
        }
    }

    pub fn with_content_provider(mut self, provider: Arc<dyn ContentProvider>) -> Self {
        self.content = Some(provider);
        self
    }

    pub fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }

    pub fn pipeline(&self) -> &CompilationPipeline {
        &self.worker.pipeline
    }

    /// Compile, validate and recover one record synchronously
    pub fn process_record(&self, index: usize, record: &MetadataRecord) -> EngineResult<(OutputRecord, RecordOutcome)> {
        self.worker.process(index, record)
    }

    /// Run the whole batch
    pub async fn run(&self, records: Vec<MetadataRecord>, cancel_token: &CancellationToken) -> BatchResult {
        let run_id = Uuid::new_v4();
        let started_at = Utc::now();
        let records_total = records.len();

        info!(
            run_id = %run_id,
            records = records_total,
            max_parallel = self.max_parallel,
            "Batch started"
        );

        let processed: Vec<Processed> = stream::iter(records.into_iter().enumerate())
            .map(|(index, mut record)| {
                let worker = self.worker.clone();
                let content = self.content.clone();
                let cancel_token = cancel_token.clone();
                async move {
                    if cancel_token.is_cancelled() {
                        return Processed::NotSubmitted;
                    }

                    if let Some(provider) = content.as_deref() {
                        enrich(provider, worker.pipeline.registry(), &mut record).await;
                    }

                    let book_id = record.book_id();
                    let result = tokio::task::spawn_blocking(move || worker.process(index, &record))
                        .await
                        .map_err(|e| EngineError::Worker(e.to_string()))
                        .and_then(|r| r);

                    match result {
                        Ok((output, outcome)) => Processed::Compiled(output, Box::new(outcome)),
                        Err(e) => {
                            warn!(book_id = %book_id, index, error = %e, "Record skipped");
                            Processed::Skipped(SkippedRecord {
                                index,
                                book_id,
                                reason: e.to_string(),
                            })
                        }
                    }
                }
            })
            .buffered(self.max_parallel.max(1))
            .collect()
            .await;

        let mut table = OutputTable::new();
        let mut outcomes = Vec::new();
        let mut skipped = Vec::new();
        let mut not_submitted = 0;

        for item in processed {
            match item {
                Processed::Compiled(output, outcome) => {
                    table.push(&output);
                    outcomes.push(*outcome);
                }
                Processed::Skipped(record) => skipped.push(record),
                Processed::NotSubmitted => not_submitted += 1,
            }
        }

        if not_submitted > 0 {
            warn!(run_id = %run_id, not_submitted, "Batch cancelled before all records were submitted");
        }

        let report = PopulationReport::build(
            run_id,
            started_at,
            self.worker.pipeline.config().scope.clone(),
            records_total,
            outcomes,
            skipped,
            not_submitted,
        );

        info!(run_id = %run_id, "Batch finished: {}", report.summary());

        BatchResult { table, report }
    }
}
