//! Population report
//!
//! The single answer to "did this batch actually work": for every field of
//! every compiled record, whether it is filled, empty by design, repaired,
//! or broken; plus per-field fill rates and the records that were skipped.

use crate::fields::{Field, OutputRecord};
use crate::pipeline::{CompiledRecord, IdentifierSource};
use crate::recovery::{RecoveredField, RecoveryReport, UnresolvedField};
use crate::validators::RecordValidation;
use chrono::{DateTime, Utc};
use folio_common::config::write_atomic;
use folio_common::ScopeIdentity;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use uuid::Uuid;

use crate::error::EngineResult;

/// State of one field in one record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldStatus {
    /// Non-empty and valid
    Populated,
    /// Empty and valid: nothing to fill, not an error
    IntentionallyEmpty,
    /// Invalid as compiled, fixed by recovery
    Recovered,
    /// Strategy raised; emitted empty
    StrategyFailed,
    /// Invalid after recovery; emitted as-is
    Unresolved,
}

impl FieldStatus {
    /// Unresolved beats recovered beats strategy failure
    pub fn classify(
        field: Field,
        output: &OutputRecord,
        compiled: &CompiledRecord,
        recovery: &RecoveryReport,
    ) -> Self {
        if recovery.is_unresolved(field) {
            FieldStatus::Unresolved
        } else if recovery.is_recovered(field) {
            FieldStatus::Recovered
        } else if compiled.strategy_failures.contains_key(&field) {
            FieldStatus::StrategyFailed
        } else if output.is_empty(field) {
            FieldStatus::IntentionallyEmpty
        } else {
            FieldStatus::Populated
        }
    }

    /// Counts toward the fill rate
    pub fn is_filled(self) -> bool {
        matches!(self, FieldStatus::Populated | FieldStatus::Recovered)
    }
}

/// Per-record result
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    /// Position in the input
    pub index: usize,
    pub book_id: String,
    pub identifier: Option<String>,
    pub identifier_source: IdentifierSource,
    pub is_valid: bool,
    pub field_status: BTreeMap<Field, FieldStatus>,
    pub strategy_failures: BTreeMap<Field, String>,
    pub recovered: Vec<RecoveredField>,
    pub unresolved: Vec<UnresolvedField>,
    /// Validator warnings, fields without warnings omitted
    pub warnings: BTreeMap<Field, Vec<String>>,
}

impl RecordOutcome {
    pub fn new(
        index: usize,
        compiled: &CompiledRecord,
        output: &OutputRecord,
        validation: &RecordValidation,
        recovery: RecoveryReport,
    ) -> Self {
        let field_status = Field::ALL
            .iter()
            .map(|&field| (field, FieldStatus::classify(field, output, compiled, &recovery)))
            .collect();
        let warnings = validation
            .diagnostics
            .iter()
            .filter(|d| !d.warnings.is_empty())
            .map(|d| (d.field, d.warnings.clone()))
            .collect();

        Self {
            index,
            book_id: compiled.book_id.clone(),
            identifier: compiled.identifier.clone(),
            identifier_source: compiled.identifier_source,
            is_valid: validation.is_record_valid,
            field_status,
            strategy_failures: compiled.strategy_failures.clone(),
            recovered: recovery.recovered,
            unresolved: recovery.unresolved,
            warnings,
        }
    }

    pub fn status(&self, field: Field) -> Option<FieldStatus> {
        self.field_status.get(&field).copied()
    }
}

/// A record that produced no row
#[derive(Debug, Clone, Serialize)]
pub struct SkippedRecord {
    pub index: usize,
    pub book_id: String,
    pub reason: String,
}

/// Fill statistics for one field across the batch
#[derive(Debug, Clone, Default, Serialize)]
pub struct FieldStats {
    pub populated: usize,
    pub intentionally_empty: usize,
    pub recovered: usize,
    pub strategy_failed: usize,
    pub unresolved: usize,
    /// (populated + recovered) / compiled records
    pub fill_rate: f64,
}

impl FieldStats {
    fn count(&mut self, status: FieldStatus) {
        match status {
            FieldStatus::Populated => self.populated += 1,
            FieldStatus::IntentionallyEmpty => self.intentionally_empty += 1,
            FieldStatus::Recovered => self.recovered += 1,
            FieldStatus::StrategyFailed => self.strategy_failed += 1,
            FieldStatus::Unresolved => self.unresolved += 1,
        }
    }
}

/// Batch-level report, written as JSON next to the output table
#[derive(Debug, Clone, Serialize)]
pub struct PopulationReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub scope: ScopeIdentity,
    pub records_total: usize,
    pub records_compiled: usize,
    pub records_valid: usize,
    /// Batch stopped before every record was submitted
    pub cancelled: bool,
    pub records_not_submitted: usize,
    pub skipped: Vec<SkippedRecord>,
    pub fields: BTreeMap<Field, FieldStats>,
    pub records: Vec<RecordOutcome>,
}

impl PopulationReport {
    /// Aggregate per-record outcomes into the report
    pub fn build(
        run_id: Uuid,
        started_at: DateTime<Utc>,
        scope: ScopeIdentity,
        records_total: usize,
        records: Vec<RecordOutcome>,
        skipped: Vec<SkippedRecord>,
        records_not_submitted: usize,
    ) -> Self {
        let mut fields: BTreeMap<Field, FieldStats> = Field::ALL
            .iter()
            .map(|&f| (f, FieldStats::default()))
            .collect();

        for outcome in &records {
            for (field, status) in &outcome.field_status {
                if let Some(stats) = fields.get_mut(field) {
                    stats.count(*status);
                }
            }
        }

        let compiled = records.len();
        for stats in fields.values_mut() {
            stats.fill_rate = if compiled == 0 {
                0.0
            } else {
                (stats.populated + stats.recovered) as f64 / compiled as f64
            };
        }

        Self {
            run_id,
            started_at,
            finished_at: Utc::now(),
            scope,
            records_total,
            records_compiled: compiled,
            records_valid: records.iter().filter(|r| r.is_valid).count(),
            cancelled: records_not_submitted > 0,
            records_not_submitted,
            skipped,
            fields,
            records,
        }
    }

    /// Outcome for `book_id`
    pub fn record(&self, book_id: &str) -> Option<&RecordOutcome> {
        self.records.iter().find(|r| r.book_id == book_id)
    }

    pub fn fill_rate(&self, field: Field) -> f64 {
        self.fields.get(&field).map(|s| s.fill_rate).unwrap_or(0.0)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        format!(
            "{} of {} records compiled, {} valid, {} skipped{}",
            self.records_compiled,
            self.records_total,
            self.records_valid,
            self.skipped.len(),
            if self.cancelled { " (cancelled)" } else { "" }
        )
    }

    pub fn to_json(&self) -> EngineResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> EngineResult<()> {
        let json = self.to_json()?;
        write_atomic(path, json.as_bytes())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compiled(failures: &[Field]) -> CompiledRecord {
        CompiledRecord {
            book_id: "bk-1".into(),
            identifier: None,
            identifier_source: IdentifierSource::Missing,
            output: OutputRecord::new(),
            strategy_failures: failures.iter().map(|f| (*f, "boom".to_string())).collect(),
        }
    }

    #[test]
    fn test_classify_precedence() {
        let mut output = OutputRecord::new();
        output.set(Field::Title, "T");
        let compiled = compiled(&[Field::Weight]);
        let mut recovery = RecoveryReport::default();
        recovery.unresolved.push(UnresolvedField {
            field: Field::CoverFinish,
            value: "Velvet".into(),
            error_message: "bad".into(),
        });

        let status = |f| FieldStatus::classify(f, &output, &compiled, &recovery);
        assert_eq!(status(Field::Title), FieldStatus::Populated);
        assert_eq!(status(Field::Subtitle), FieldStatus::IntentionallyEmpty);
        assert_eq!(status(Field::Weight), FieldStatus::StrategyFailed);
        assert_eq!(status(Field::CoverFinish), FieldStatus::Unresolved);
    }

    #[test]
    fn test_fill_rates_and_summary() {
        let mut output = OutputRecord::new();
        output.set(Field::Title, "T");
        let compiled = compiled(&[]);
        let validation = RecordValidation {
            diagnostics: Vec::new(),
            is_record_valid: true,
        };
        let outcomes = vec![
            RecordOutcome::new(0, &compiled, &output, &validation, RecoveryReport::default()),
            RecordOutcome::new(1, &compiled, &OutputRecord::new(), &validation, RecoveryReport::default()),
        ];
        let report = PopulationReport::build(
            Uuid::new_v4(),
            Utc::now(),
            ScopeIdentity::default(),
            3,
            outcomes,
            vec![SkippedRecord {
                index: 2,
                book_id: "bk-3".into(),
                reason: "pool exhausted".into(),
            }],
            0,
        );

        assert_eq!(report.fill_rate(Field::Title), 0.5);
        assert_eq!(report.fill_rate(Field::Subtitle), 0.0);
        assert_eq!(report.summary(), "2 of 3 records compiled, 2 valid, 1 skipped");
        assert!(report.to_json().unwrap().contains("\"intentionally_empty\""));
    }
}
