//! End-to-end batch runs: ordering, intentionally empty fields, skipped
//! records, content enrichment and cancellation

use async_trait::async_trait;
use folio_common::{isbn, ResolvedConfig};
use folio_engine::batch::{BatchOrchestrator, ContentProvider, ContentRequest, FieldStatus};
use folio_engine::{
    CompilationPipeline, EngineError, EngineResult, Field, IdentifierPool, LookupTables,
    MetadataRecord,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

const PHYSICAL: [Field; 5] = [
    Field::Pages,
    Field::Weight,
    Field::WeightLbs,
    Field::SpineWidth,
    Field::Thickness,
];

fn identifiers(count: usize) -> Vec<String> {
    (0..count)
        .map(|i| {
            let first12 = format!("97819000{:04}", i);
            let check = isbn::isbn13_check_digit(&first12).unwrap();
            format!("{}{}", first12, check)
        })
        .collect()
}

fn config() -> ResolvedConfig {
    let mut config = ResolvedConfig::default();
    config.settings.insert("publisher".into(), "Nimble Books LLC".into());
    config.settings.insert("imprint".into(), "Xynapse Traces".into());
    config
}

fn orchestrator(pool_size: usize) -> BatchOrchestrator {
    let pool = Arc::new(IdentifierPool::in_memory());
    pool.import_batch(identifiers(pool_size)).unwrap();
    let pipeline = CompilationPipeline::from_config(config(), LookupTables::builtin()).with_pool(pool);
    BatchOrchestrator::new(pipeline)
}

fn record(i: usize) -> MetadataRecord {
    MetadataRecord::new()
        .with("book_id", format!("bk-{:03}", i))
        .with("title", format!("Volume {}", i))
        .with("author", "A. Writer")
        .with("page_count", 120 + i as u64 * 10)
        .with("trim_size", "6 x 9")
        .with("list_price", "$20.00")
        .with("publication_date", "2025-03-01")
        .with("bisac_codes", "BUS041000")
}

fn records(count: usize) -> Vec<MetadataRecord> {
    (0..count).map(record).collect()
}

#[tokio::test]
async fn test_missing_page_count_is_intentionally_empty() {
    let mut input = records(12);
    input[5] = MetadataRecord::new()
        .with("book_id", "bk-005")
        .with("title", "Volume 5")
        .with("author", "A. Writer")
        .with("trim_size", "6 x 9")
        .with("list_price", "$20.00")
        .with("publication_date", "2025-03-01");

    let result = orchestrator(12).run(input, &CancellationToken::new()).await;

    assert_eq!(result.table.rows.len(), 12);
    assert_eq!(result.table.headers.len(), Field::COUNT);
    for row in &result.table.rows {
        assert_eq!(row.len(), Field::COUNT);
    }

    // input order is kept
    for (i, _) in result.table.rows.iter().enumerate() {
        assert_eq!(result.table.cell(i, Field::Title), Some(format!("Volume {}", i).as_str()));
    }

    let outcome = result.report.record("bk-005").unwrap();
    for field in PHYSICAL {
        assert_eq!(result.table.cell(5, field), Some(""), "{}", field);
        assert_eq!(outcome.status(field), Some(FieldStatus::IntentionallyEmpty), "{}", field);
    }
    assert!(outcome.strategy_failures.is_empty());

    let neighbour = result.report.record("bk-004").unwrap();
    assert_eq!(neighbour.status(Field::Pages), Some(FieldStatus::Populated));
    assert!(!result.table.cell(4, Field::Weight).unwrap().is_empty());

    assert_eq!(result.report.records_total, 12);
    assert_eq!(result.report.records_compiled, 12);
    assert!((result.report.fill_rate(Field::Pages) - 11.0 / 12.0).abs() < 1e-9);
    assert!(!result.report.cancelled);
}

#[tokio::test]
async fn test_each_record_gets_its_own_identifier() {
    let result = orchestrator(12).run(records(12), &CancellationToken::new()).await;

    let mut seen: Vec<&str> = (0..12)
        .map(|i| result.table.cell(i, Field::Isbn).unwrap())
        .collect();
    seen.sort_unstable();
    seen.dedup();
    assert_eq!(seen.len(), 12);
    assert!(seen.iter().all(|id| isbn::is_valid_isbn13(id)));
}

#[tokio::test]
async fn test_pool_exhaustion_skips_records_not_the_batch() {
    let result = orchestrator(10).run(records(12), &CancellationToken::new()).await;

    assert_eq!(result.table.rows.len(), 10);
    assert_eq!(result.report.skipped.len(), 2);
    assert!(result
        .report
        .skipped
        .iter()
        .all(|s| s.reason.contains("exhausted")));
    assert_eq!(result.report.records_compiled, 10);
}

#[tokio::test]
async fn test_rebuild_reuses_identifiers() {
    let orchestrator = orchestrator(3);
    let first = orchestrator.run(records(3), &CancellationToken::new()).await;
    let second = orchestrator.run(records(3), &CancellationToken::new()).await;

    for i in 0..3 {
        assert_eq!(
            first.table.cell(i, Field::Isbn),
            second.table.cell(i, Field::Isbn)
        );
    }
    assert!(second.report.skipped.is_empty());
}

struct Generator {
    fail: bool,
}

#[async_trait]
impl ContentProvider for Generator {
    async fn generate(&self, request: &ContentRequest<'_>) -> EngineResult<String> {
        if self.fail {
            return Err(EngineError::InvalidInput("service down".into()));
        }
        Ok(match request.external_key {
            "llm.short_description" => format!("Generated blurb for {}", request.book_id),
            _ => String::new(),
        })
    }
}

#[tokio::test]
async fn test_generated_content_used_when_available() {
    let input = vec![record(0).with("short_description", "Hand-written blurb")];
    let result = orchestrator(1)
        .with_content_provider(Arc::new(Generator { fail: false }))
        .run(input, &CancellationToken::new())
        .await;

    assert_eq!(
        result.table.cell(0, Field::ShortDescription),
        Some("Generated blurb for bk-000")
    );
}

#[tokio::test]
async fn test_content_failure_falls_back() {
    let input = vec![record(0).with("short_description", "Hand-written blurb")];
    let result = orchestrator(1)
        .with_content_provider(Arc::new(Generator { fail: true }))
        .run(input, &CancellationToken::new())
        .await;

    assert_eq!(
        result.table.cell(0, Field::ShortDescription),
        Some("Hand-written blurb")
    );
    assert_eq!(result.table.rows.len(), 1);
}

#[tokio::test]
async fn test_cancellation_keeps_committed_assignments() {
    let pool = Arc::new(IdentifierPool::in_memory());
    pool.import_batch(identifiers(4)).unwrap();
    let pipeline = CompilationPipeline::from_config(config(), LookupTables::builtin()).with_pool(pool.clone());
    let orchestrator = BatchOrchestrator::new(pipeline).with_max_parallel(1);

    let first = orchestrator.run(records(2), &CancellationToken::new()).await;
    assert_eq!(first.table.rows.len(), 2);

    let token = CancellationToken::new();
    token.cancel();
    let cancelled = orchestrator.run(records(4), &token).await;

    assert!(cancelled.report.cancelled);
    assert_eq!(cancelled.report.records_not_submitted, 4);
    assert!(cancelled.table.rows.is_empty());
    // earlier assignments are not rolled back
    assert_eq!(pool.statistics().assigned, 2);
}

#[tokio::test]
async fn test_supplied_identifier_owned_elsewhere_is_not_duplicated() {
    let ids = identifiers(3);
    let pool = Arc::new(IdentifierPool::in_memory());
    pool.import_batch(&ids).unwrap();
    let pipeline = CompilationPipeline::from_config(config(), LookupTables::builtin()).with_pool(pool.clone());
    let orchestrator = BatchOrchestrator::new(pipeline).with_max_parallel(1);

    let input = vec![
        record(0).with("isbn13", ids[0].as_str()),
        record(1).with("isbn13", ids[0].as_str()),
    ];
    let result = orchestrator.run(input, &CancellationToken::new()).await;

    assert_eq!(result.table.rows.len(), 1);
    assert_eq!(result.table.cell(0, Field::Isbn), Some(ids[0].as_str()));
    assert_eq!(result.report.skipped.len(), 1);
    assert_eq!(result.report.skipped[0].book_id, "bk-001");
    assert!(result.report.skipped[0].reason.contains("bk-000"));
    assert_eq!(pool.lookup("bk-001"), None);
}

#[tokio::test]
async fn test_oversized_price_fails_fields_not_record() {
    let huge = "79228162514264337593543950335";
    let input = vec![record(0).with("list_price", huge)];
    let result = orchestrator(1).run(input, &CancellationToken::new()).await;

    assert!(result.report.skipped.is_empty());
    assert_eq!(result.table.rows.len(), 1);
    assert_eq!(result.table.cell(0, Field::UsPrice), Some(huge));

    let outcome = result.report.record("bk-000").unwrap();
    assert!(outcome.strategy_failures.contains_key(&Field::CaPrice));
    assert_eq!(outcome.status(Field::Title), Some(FieldStatus::Populated));
}

#[tokio::test]
async fn test_isbn10_only_record_gets_pool_isbn13() {
    let pool = Arc::new(IdentifierPool::in_memory());
    pool.import_batch(["9780306406157"]).unwrap();
    let pipeline = CompilationPipeline::from_config(config(), LookupTables::builtin()).with_pool(pool.clone());

    let input = vec![record(0).with("isbn10", "0-306-40615-2")];
    let result = BatchOrchestrator::new(pipeline)
        .run(input, &CancellationToken::new())
        .await;

    assert_eq!(result.table.cell(0, Field::Isbn), Some("9780306406157"));
    let outcome = result.report.record("bk-000").unwrap();
    assert_eq!(outcome.status(Field::Isbn), Some(FieldStatus::Populated));
    assert_eq!(pool.statistics().assigned, 1);
}

#[tokio::test]
async fn test_outputs_written_to_disk() {
    let dir = tempfile::TempDir::new().unwrap();
    let result = orchestrator(2).run(records(2), &CancellationToken::new()).await;

    let csv_path = dir.path().join("out.csv");
    let report_path = dir.path().join("report.json");
    result.table.write_csv(&csv_path).unwrap();
    result.report.write_json(&report_path).unwrap();

    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), 3);

    let report: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&report_path).unwrap()).unwrap();
    assert_eq!(report["records_total"], 2);
    assert_eq!(report["fields"]["Title"]["fill_rate"], 1.0);
    assert_eq!(report["records"][0]["field_status"]["Title"], "populated");
}
