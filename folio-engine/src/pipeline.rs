//! Compilation pipeline
//!
//! Turns one [`MetadataRecord`] into one [`OutputRecord`] by running every
//! field's strategy in canonical order.
//!
//! # Flow
//! 1. Resolve the identifier (pool lookup, supplied identifier, or new assignment)
//! 2. For each field in header order, evaluate its strategy with a
//!    [`MappingContext`] holding the values resolved so far
//! 3. A strategy error is logged and the field set to ""
//!
//! Only identifier resolution can fail a record (`PoolExhausted`, or a
//! supplied pool identifier owned by another book); field failures never
//! abort compilation.

use crate::error::{EngineError, EngineResult};
use crate::fields::{Field, OutputRecord};
use crate::lookup::LookupTables;
use crate::pool::IdentifierPool;
use crate::registry::StrategyRegistry;
use crate::strategies::file_naming::extract_identifier;
use crate::types::MetadataRecord;
use chrono::{NaiveDate, Utc};
use folio_common::{isbn, ResolvedConfig};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Read-only view handed to each strategy
#[derive(Debug, Clone, Copy)]
pub struct MappingContext<'a> {
    /// Merged publisher/imprint/tranche configuration
    pub config: &'a ResolvedConfig,
    pub tables: &'a LookupTables,
    /// Fields resolved earlier in this record
    pub resolved: &'a OutputRecord,
    /// Identifier chosen for this record, if any
    pub identifier: Option<&'a str>,
}

/// Where a record's identifier came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentifierSource {
    /// Owned in (or newly assigned from) the pool
    Pool,
    /// Taken from the record as supplied
    Supplied,
    /// No identifier available
    Missing,
}

/// One compiled record before validation
#[derive(Debug, Clone)]
pub struct CompiledRecord {
    pub book_id: String,
    pub identifier: Option<String>,
    pub identifier_source: IdentifierSource,
    pub output: OutputRecord,
    /// Field → strategy error message
    pub strategy_failures: BTreeMap<Field, String>,
}

/// Per-record compiler; cheap to clone and share across workers
#[derive(Debug, Clone)]
pub struct CompilationPipeline {
    registry: Arc<StrategyRegistry>,
    tables: Arc<LookupTables>,
    config: Arc<ResolvedConfig>,
    pool: Option<Arc<IdentifierPool>>,
    assignment_date: NaiveDate,
}

impl CompilationPipeline {
    pub fn new(
        registry: Arc<StrategyRegistry>,
        tables: Arc<LookupTables>,
        config: Arc<ResolvedConfig>,
    ) -> Self {
        Self {
            registry,
            tables,
            config,
            pool: None,
            assignment_date: Utc::now().date_naive(),
        }
    }

    /// Registry built from `config`, built-in or loaded tables
    pub fn from_config(config: ResolvedConfig, tables: LookupTables) -> Self {
        let registry = StrategyRegistry::build(&config);
        Self::new(Arc::new(registry), Arc::new(tables), Arc::new(config))
    }

    /// Assign identifiers from `pool`
    pub fn with_pool(mut self, pool: Arc<IdentifierPool>) -> Self {
        self.pool = Some(pool);
        self
    }

    /// Date stamped on new assignments (default: today, UTC)
    pub fn with_assignment_date(mut self, date: NaiveDate) -> Self {
        self.assignment_date = date;
        self
    }

    pub fn registry(&self) -> &StrategyRegistry {
        &self.registry
    }

    pub fn tables(&self) -> &Arc<LookupTables> {
        &self.tables
    }

    pub fn config(&self) -> &Arc<ResolvedConfig> {
        &self.config
    }

    pub fn pool(&self) -> Option<&Arc<IdentifierPool>> {
        self.pool.as_ref()
    }

    /// Pick the record's identifier
    ///
    /// Priority:
    /// 1. Identifier the pool already holds for this `book_id`
    /// 2. Identifier supplied in the record; a pool entry must be claimable
    ///    for this book, otherwise the record fails (`AlreadyOwned`)
    /// 3. Next AVAILABLE pool identifier
    pub fn resolve_identifier(&self, record: &MetadataRecord) -> EngineResult<(Option<String>, IdentifierSource)> {
        let book_id = record.book_id();
        let supplied = extract_identifier(record);

        let Some(pool) = &self.pool else {
            return Ok(match supplied {
                Some(id) => (Some(id), IdentifierSource::Supplied),
                None => (None, IdentifierSource::Missing),
            });
        };

        if book_id.is_empty() {
            warn!("Record has no book_id; identifier not taken from pool");
            return Ok(match supplied {
                Some(id) => (Some(id), IdentifierSource::Supplied),
                None => (None, IdentifierSource::Missing),
            });
        }

        if let Some(id) = pool.lookup(&book_id) {
            return Ok((Some(id), IdentifierSource::Pool));
        }

        let title = record.get_str("title").unwrap_or_default();

        if let Some(id) = supplied {
            if !pool.contains(&id) {
                return Ok((Some(id), IdentifierSource::Supplied));
            }
            // a pool identifier is only emitted once this book owns it
            if let Err(e) = pool.assign_specific(&id, &book_id, &title, self.assignment_date) {
                warn!(book_id = %book_id, identifier = %id, error = %e, "Supplied pool identifier not claimable");
                return Err(e);
            }
            return Ok((Some(isbn::normalize(&id)), IdentifierSource::Pool));
        }

        let id = pool.get_or_assign(&book_id, &title, self.assignment_date)?;
        Ok((Some(id), IdentifierSource::Pool))
    }

    /// Compile one record
    ///
    /// Fails only when identifier assignment fails (`PoolExhausted`, `AlreadyOwned`).
    pub fn compile(&self, record: &MetadataRecord) -> EngineResult<CompiledRecord> {
        let book_id = record.book_id();
        let (identifier, identifier_source) = self.resolve_identifier(record).map_err(|e| {
            if let EngineError::PoolExhausted { .. } = e {
                tracing::error!(book_id = %book_id, "Identifier pool exhausted; record skipped");
            }
            e
        })?;

        let mut output = OutputRecord::new();
        let mut strategy_failures = BTreeMap::new();

        for &field in Field::ALL {
            let ctx = MappingContext {
                config: &self.config,
                tables: &self.tables,
                resolved: &output,
                identifier: identifier.as_deref(),
            };
            let value = match self.registry.get(field).evaluate(record, &ctx) {
                Ok(value) => value,
                Err(e) => {
                    warn!(book_id = %book_id, field = %field, error = %e, "Strategy failed; field left empty");
                    strategy_failures.insert(field, e.to_string());
                    String::new()
                }
            };
            output.set(field, value);
        }

        debug!(
            book_id = %book_id,
            identifier = ?identifier,
            failures = strategy_failures.len(),
            "Record compiled"
        );

        Ok(CompiledRecord {
            book_id,
            identifier,
            identifier_source,
            output,
            strategy_failures,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pipeline() -> CompilationPipeline {
        CompilationPipeline::from_config(ResolvedConfig::default(), LookupTables::builtin())
            .with_assignment_date(NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
    }

    fn record() -> MetadataRecord {
        MetadataRecord::new()
            .with("book_id", "bk-001")
            .with("title", "Martian Logistics")
            .with("author", "A. Writer")
            .with("page_count", 200)
            .with("trim_size", "6 x 9")
            .with("list_price", "$20.00")
            .with("publication_date", "2025-03-01")
            .with("bisac_codes", "BUS041000; COM004000")
    }

    #[test]
    fn test_every_field_present() {
        let compiled = pipeline().compile(&record()).unwrap();
        assert_eq!(compiled.output.values().len(), Field::COUNT);
        assert_eq!(compiled.output.get(Field::Title), "Martian Logistics");
        assert_eq!(compiled.output.get(Field::Pages), "200");
        assert_eq!(compiled.output.get(Field::UsPrice), "$20.00");
        assert_eq!(compiled.output.get(Field::UkPrice), "15.80 GBP");
        assert_eq!(compiled.output.get(Field::BisacCategory), "BUSINESS & ECONOMICS / Management");
        assert_eq!(
            compiled.output.get(Field::BisacCategory2),
            "COMPUTERS / Artificial Intelligence / General"
        );
        assert_eq!(compiled.output.get(Field::BisacCategory3), "");
        assert!(compiled.strategy_failures.is_empty());
    }

    #[test]
    fn test_strategy_failure_is_contained() {
        let record = record().with("page_count", "lots");
        let compiled = pipeline().compile(&record).unwrap();
        assert_eq!(compiled.output.get(Field::Pages), "");
        assert_eq!(compiled.output.get(Field::Weight), "");
        assert!(compiled.strategy_failures.contains_key(&Field::Pages));
        assert_eq!(compiled.output.get(Field::Title), "Martian Logistics");
    }

    #[test]
    fn test_identifier_from_pool_feeds_paths() {
        let pool = Arc::new(IdentifierPool::in_memory());
        pool.import_batch(["9780134685991"]).unwrap();
        let pipeline = pipeline().with_pool(pool.clone());

        let compiled = pipeline.compile(&record()).unwrap();
        assert_eq!(compiled.identifier_source, IdentifierSource::Pool);
        assert_eq!(compiled.output.get(Field::Isbn), "9780134685991");
        assert_eq!(compiled.output.get(Field::CoverPath), "9780134685991_cover.pdf");

        // rebuild reuses the assignment
        let again = pipeline.compile(&record()).unwrap();
        assert_eq!(again.output.get(Field::Isbn), "9780134685991");
        assert_eq!(pool.statistics().assigned, 1);
    }

    #[test]
    fn test_pool_exhausted_fails_record() {
        let pool = Arc::new(IdentifierPool::in_memory());
        let pipeline = pipeline().with_pool(pool);
        assert!(matches!(
            pipeline.compile(&record()),
            Err(EngineError::PoolExhausted { .. })
        ));
    }

    #[test]
    fn test_supplied_identifier_owned_by_other_book_fails_record() {
        let pool = Arc::new(IdentifierPool::in_memory());
        pool.import_batch(["9780306406157", "9780134685991"]).unwrap();
        pool.assign_specific("9780306406157", "bk-A", "A", NaiveDate::from_ymd_opt(2025, 3, 1).unwrap())
            .unwrap();
        let pipeline = pipeline().with_pool(pool.clone());

        let record = record().with("book_id", "bk-B").with("isbn13", "9780306406157");
        assert!(matches!(
            pipeline.compile(&record),
            Err(EngineError::AlreadyOwned { ref owner, .. }) if owner == "bk-A"
        ));
        assert_eq!(pool.lookup("bk-B"), None);
        assert_eq!(pool.lookup("bk-A").as_deref(), Some("9780306406157"));
    }

    #[test]
    fn test_isbn10_only_record_claims_pool_entry() {
        let pool = Arc::new(IdentifierPool::in_memory());
        pool.import_batch(["9780306406157"]).unwrap();
        let pipeline = pipeline().with_pool(pool.clone());

        let record = record().with("isbn10", "0-306-40615-2");
        let compiled = pipeline.compile(&record).unwrap();
        assert_eq!(compiled.identifier_source, IdentifierSource::Pool);
        assert_eq!(compiled.output.get(Field::Isbn), "9780306406157");
        assert_eq!(pool.lookup("bk-001").as_deref(), Some("9780306406157"));
    }

    #[test]
    fn test_supplied_identifier_outside_pool() {
        let record = record().with("isbn13", "978-0-306-40615-7");
        let compiled = pipeline().compile(&record).unwrap();
        assert_eq!(compiled.identifier_source, IdentifierSource::Supplied);
        assert_eq!(compiled.output.get(Field::Isbn), "9780306406157");
    }
}
