//! Record validation
//!
//! Produces one [`ValidationDiagnostic`] per field from the single-field
//! rules in [`field_rules`] and the cross-field checks in [`consistency`].
//! Warnings never make a field invalid. The validator only reads the record.

pub mod consistency;
pub mod field_rules;

use crate::fields::{Field, OutputRecord};
use crate::lookup::LookupTables;
use folio_common::ResolvedConfig;
use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

/// Outcome of validating one field
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationDiagnostic {
    #[serde(rename = "field_name")]
    pub field: Field,
    pub is_valid: bool,
    /// Empty when valid; multiple failures are joined with "; "
    pub error_message: String,
    pub warnings: Vec<String>,
}

impl ValidationDiagnostic {
    pub fn valid(field: Field) -> Self {
        Self {
            field,
            is_valid: true,
            error_message: String::new(),
            warnings: Vec::new(),
        }
    }

    pub fn fail(&mut self, message: impl Into<String>) {
        let message = message.into();
        self.is_valid = false;
        if self.error_message.is_empty() {
            self.error_message = message;
        } else {
            self.error_message.push_str("; ");
            self.error_message.push_str(&message);
        }
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        self.warnings.push(message.into());
    }
}

/// All diagnostics for one record, in canonical field order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordValidation {
    pub diagnostics: Vec<ValidationDiagnostic>,
    pub is_record_valid: bool,
}

impl RecordValidation {
    pub fn diagnostic(&self, field: Field) -> &ValidationDiagnostic {
        &self.diagnostics[field.index()]
    }

    /// Invalid diagnostics only
    pub fn failures(&self) -> impl Iterator<Item = &ValidationDiagnostic> + '_ {
        self.diagnostics.iter().filter(|d| !d.is_valid)
    }
}

/// Field and record validator
#[derive(Debug, Clone)]
pub struct Validator {
    tables: Arc<LookupTables>,
    config: Arc<ResolvedConfig>,
}

impl Validator {
    pub fn new(tables: Arc<LookupTables>, config: Arc<ResolvedConfig>) -> Self {
        Self { tables, config }
    }

    /// Validate one field in the context of the whole record
    pub fn validate_field(&self, field: Field, output: &OutputRecord) -> ValidationDiagnostic {
        let mut diag = ValidationDiagnostic::valid(field);
        let value = output.get(field);

        for rule in field_rules::rules_for(field, &self.config) {
            field_rules::apply(rule, field, value, &self.tables, &self.config, &mut diag);
        }
        consistency::check(field, output, &self.tables, &mut diag);

        diag
    }

    pub fn validate_record(&self, output: &OutputRecord) -> RecordValidation {
        let diagnostics: Vec<ValidationDiagnostic> = Field::ALL
            .iter()
            .map(|&field| self.validate_field(field, output))
            .collect();
        let is_record_valid = diagnostics.iter().all(|d| d.is_valid);

        debug!(
            invalid = diagnostics.iter().filter(|d| !d.is_valid).count(),
            warnings = diagnostics.iter().map(|d| d.warnings.len()).sum::<usize>(),
            "Record validated"
        );

        RecordValidation {
            diagnostics,
            is_record_valid,
        }
    }
}
