//! Pre-pipeline content enrichment
//!
//! Generated text lands under `llm.<name>` in the record before compilation.
//! A provider error or an empty answer leaves the key absent, so the field's
//! fallback strategy applies.

use crate::error::EngineResult;
use crate::registry::StrategyRegistry;
use crate::types::MetadataRecord;
use async_trait::async_trait;
use tracing::{debug, warn};

/// What to generate for one field of one record
#[derive(Debug, Clone)]
pub struct ContentRequest<'a> {
    pub book_id: String,
    /// Target column header
    pub field_header: &'static str,
    /// Dotted key the value is stored under, e.g. `llm.short_description`
    pub external_key: &'a str,
    /// Source record, read-only
    pub record: &'a MetadataRecord,
}

/// Content generation service
#[async_trait]
pub trait ContentProvider: Send + Sync {
    /// Generate text for `request`; the result is untrusted
    async fn generate(&self, request: &ContentRequest<'_>) -> EngineResult<String>;
}

/// Fill absent external fields of `record` from `provider`
///
/// Returns the number of values inserted.
pub async fn enrich(
    provider: &dyn ContentProvider,
    registry: &StrategyRegistry,
    record: &mut MetadataRecord,
) -> usize {
    let book_id = record.book_id();
    let mut inserted = 0;

    for (field, key) in registry.external_fields() {
        if record.contains(key) {
            continue;
        }

        let generated = {
            let request = ContentRequest {
                book_id: book_id.clone(),
                field_header: field.header(),
                external_key: key,
                record: &*record,
            };
            provider.generate(&request).await
        };

        match generated {
            Ok(text) if !text.trim().is_empty() => {
                if record.insert_path(key, text.trim()) {
                    inserted += 1;
                    debug!(book_id = %book_id, field = %field, "Generated content inserted");
                } else {
                    warn!(book_id = %book_id, key, "Cannot store generated content: key path blocked");
                }
            }
            Ok(_) => {
                debug!(book_id = %book_id, field = %field, "Content provider returned nothing; using fallback");
            }
            Err(e) => {
                warn!(book_id = %book_id, field = %field, error = %e, "Content generation failed; using fallback");
            }
        }
    }

    inserted
}
