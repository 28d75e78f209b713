//! Recovery of invalid fields
//!
//! For every field the validator rejected, try in order:
//! 1. **Checksum repair** - recompute an identifier's check digit
//! 2. **Price derivation** - rebuild a territory price from a sibling
//!    territory's price through the multiplier table in reverse
//! 3. **Truncation** - cut over-length text at the last word boundary
//!
//! Each attempt is re-validated on that field alone; a failed attempt is
//! undone before the next one. Fields no attempt can fix keep their value
//! and are reported as unresolved.

use crate::fields::{Field, OutputRecord, TERRITORY_FIELDS};
use crate::lookup::LookupTables;
use crate::strategies::pricing::{base_from_territory, price_from_base_amount};
use crate::strategies::text_length::{resolve_limit, truncate_at_word_boundary};
use crate::validators::field_rules::{self, Rule};
use crate::validators::{RecordValidation, Validator};
use folio_common::{isbn, ResolvedConfig};
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Which correction fixed a field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RecoveryAction {
    ChecksumRepair,
    PriceDerivation { from_territory: String },
    Truncation { limit: usize },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecoveredField {
    pub field: Field,
    pub original: String,
    pub recovered: String,
    pub action: RecoveryAction,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UnresolvedField {
    pub field: Field,
    pub value: String,
    pub error_message: String,
}

/// What recovery did to one record
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RecoveryReport {
    pub recovered: Vec<RecoveredField>,
    pub unresolved: Vec<UnresolvedField>,
}

impl RecoveryReport {
    pub fn is_recovered(&self, field: Field) -> bool {
        self.recovered.iter().any(|r| r.field == field)
    }

    pub fn is_unresolved(&self, field: Field) -> bool {
        self.unresolved.iter().any(|u| u.field == field)
    }
}

/// Applies local corrections to invalid fields
#[derive(Debug, Clone)]
pub struct RecoveryManager {
    validator: Validator,
    tables: Arc<LookupTables>,
    config: Arc<ResolvedConfig>,
}

impl RecoveryManager {
    pub fn new(tables: Arc<LookupTables>, config: Arc<ResolvedConfig>) -> Self {
        Self {
            validator: Validator::new(tables.clone(), config.clone()),
            tables,
            config,
        }
    }

    pub fn validator(&self) -> &Validator {
        &self.validator
    }

    /// Repair what can be repaired in `output`; returns the report and the
    /// final record validation
    pub fn recover(&self, book_id: &str, output: &mut OutputRecord, validation: &RecordValidation) -> (RecoveryReport, RecordValidation) {
        let mut report = RecoveryReport::default();

        for diag in validation.failures() {
            let field = diag.field;
            let original = output.get(field).to_string();

            match self.attempt_all(field, output) {
                Some(action) => {
                    let recovered = output.get(field).to_string();
                    info!(
                        book_id,
                        field = %field,
                        action = ?action,
                        "Field recovered"
                    );
                    report.recovered.push(RecoveredField {
                        field,
                        original,
                        recovered,
                        action,
                    });
                }
                None => {
                    let error_message = self.validator.validate_field(field, output).error_message;
                    warn!(book_id, field = %field, error = %error_message, "Field unresolved");
                    report.unresolved.push(UnresolvedField {
                        field,
                        value: original,
                        error_message,
                    });
                }
            }
        }

        // Re-run everything: a repaired field can settle a cross-field check elsewhere
        let final_validation = if report.recovered.is_empty() {
            validation.clone()
        } else {
            self.validator.validate_record(output)
        };

        // Fields that passed alone but fail against the repaired record
        for diag in final_validation.failures() {
            if !report.is_unresolved(diag.field) && !report.is_recovered(diag.field) {
                report.unresolved.push(UnresolvedField {
                    field: diag.field,
                    value: output.get(diag.field).to_string(),
                    error_message: diag.error_message.clone(),
                });
            }
        }

        (report, final_validation)
    }

    /// Try each applicable correction; leaves `output` unchanged when none works
    fn attempt_all(&self, field: Field, output: &mut OutputRecord) -> Option<RecoveryAction> {
        let original = output.get(field).to_string();
        let attempts: [fn(&Self, Field, &OutputRecord) -> Option<(String, RecoveryAction)>; 3] =
            [Self::repair_checksum, Self::derive_price, Self::truncate];

        for attempt in attempts {
            let Some((candidate, action)) = attempt(self, field, output) else {
                continue;
            };
            if candidate == original {
                continue;
            }
            output.set(field, candidate);
            if self.validator.validate_field(field, output).is_valid {
                return Some(action);
            }
            debug!(field = %field, action = ?action, "Recovery attempt did not validate");
            output.set(field, original.clone());
        }
        None
    }

    fn repair_checksum(&self, field: Field, output: &OutputRecord) -> Option<(String, RecoveryAction)> {
        if !matches!(field, Field::Isbn | Field::ParentIsbn) {
            return None;
        }
        let repaired = isbn::repair_isbn13(output.get(field))?;
        Some((repaired, RecoveryAction::ChecksumRepair))
    }

    fn derive_price(&self, field: Field, output: &OutputRecord) -> Option<(String, RecoveryAction)> {
        let target = self.tables.territory(field.price_territory()?)?;

        // parity territory first, then column order
        let parity = self.tables.parity_territory().map(|t| t.code.clone());
        let mut siblings: Vec<&str> = TERRITORY_FIELDS.iter().map(|(_, _, code)| *code).collect();
        if let Some(parity) = &parity {
            siblings.sort_by_key(|code| !code.eq_ignore_ascii_case(parity));
        }

        siblings.into_iter().find_map(|code| {
            let sibling_field = Field::price_field(code)?;
            if sibling_field == field || output.is_empty(sibling_field) {
                return None;
            }
            let sibling = self.tables.territory(code)?;
            let base = base_from_territory(output.get(sibling_field), sibling)?;
            Some((
                price_from_base_amount(base, target)?,
                RecoveryAction::PriceDerivation {
                    from_territory: sibling.code.clone(),
                },
            ))
        })
    }

    fn truncate(&self, field: Field, output: &OutputRecord) -> Option<(String, RecoveryAction)> {
        let context = field_rules::rules_for(field, &self.config)
            .into_iter()
            .find_map(|rule| match rule {
                Rule::MaxLength { context } => Some(context),
                _ => None,
            })?;
        let limit = resolve_limit(context, &self.config, &self.tables)?;
        let value = output.get(field);
        if value.chars().count() <= limit {
            return None;
        }
        Some((
            truncate_at_word_boundary(value, limit),
            RecoveryAction::Truncation { limit },
        ))
    }
}
