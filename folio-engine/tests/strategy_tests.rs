//! Computed strategy properties through the public pipeline

use folio_common::ResolvedConfig;
use folio_engine::lookup::BindingType;
use folio_engine::strategies::physical::{parse_trim_size, PhysicalSpecs};
use folio_engine::{CompilationPipeline, Field, LookupTables, MetadataRecord};
use proptest::prelude::*;

fn pipeline(config: ResolvedConfig) -> CompilationPipeline {
    CompilationPipeline::from_config(config, LookupTables::builtin())
}

fn book(pages: u32, paper: &str) -> MetadataRecord {
    MetadataRecord::new()
        .with("book_id", "bk-prop")
        .with("title", "Property Book")
        .with("page_count", pages)
        .with("trim_size", "6 x 9")
        .with("paper_type", paper)
}

fn compiled_number(pipeline: &CompilationPipeline, record: &MetadataRecord, field: Field) -> f64 {
    pipeline
        .compile(record)
        .unwrap()
        .output
        .get(field)
        .parse()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_weight_and_spine_non_decreasing_in_pages(
        pages in 1u32..1500,
        extra in 0u32..200,
        paper in prop::sample::select(vec!["white", "creme", "groundwood", "color"]),
        hardcover in any::<bool>(),
    ) {
        let tables = LookupTables::builtin();
        let profile = tables.paper(paper).unwrap();
        let trim = parse_trim_size("6 x 9").unwrap();
        let binding = if hardcover { BindingType::Hardcover } else { BindingType::Paperback };

        let thin = PhysicalSpecs::compute(pages, trim, profile, binding);
        let thick = PhysicalSpecs::compute(pages + extra, trim, profile, binding);

        prop_assert!(thick.weight_grams >= thin.weight_grams);
        prop_assert!(thick.spine_width_in >= thin.spine_width_in);
        prop_assert!(thick.thickness_in >= thin.thickness_in);
    }

    #[test]
    fn prop_compiled_values_non_decreasing_in_pages(pages in 1u32..1200, extra in 1u32..100) {
        let pipeline = pipeline(ResolvedConfig::default());
        let thin = book(pages, "white");
        let thick = book(pages + extra, "white");

        for field in [Field::WeightLbs, Field::SpineWidth, Field::Thickness] {
            prop_assert!(
                compiled_number(&pipeline, &thick, field) >= compiled_number(&pipeline, &thin, field)
            );
        }
    }
}

#[test]
fn test_parity_territory_copies_base_price_verbatim() {
    let pipeline = pipeline(ResolvedConfig::default());
    let record = MetadataRecord::new()
        .with("book_id", "bk-price")
        .with("list_price", "$20.00");

    let output = pipeline.compile(&record).unwrap().output;
    assert_eq!(output.get(Field::UsPrice), "$20.00");
    assert_eq!(output.get(Field::UkPrice), "15.80 GBP");
}

#[test]
fn test_cover_path_from_identifier_and_pattern() {
    let mut config = ResolvedConfig::default();
    config
        .settings
        .insert("file_naming_pattern".into(), "{isbn}_{file_type}".into());
    let record = MetadataRecord::new()
        .with("book_id", "bk-path")
        .with("isbn13", "9780134685991");

    let output = pipeline(config).compile(&record).unwrap().output;
    assert_eq!(output.get(Field::CoverPath), "9780134685991_cover.pdf");
}

#[test]
fn test_scope_override_replaces_default_strategy() {
    let mut config = ResolvedConfig::default();
    config
        .field_overrides
        .insert("Language Code".into(), "fre".into());
    config.settings.insert("imprint".into(), "Xynapse Traces".into());

    let output = pipeline(config)
        .compile(&MetadataRecord::new().with("book_id", "bk-o").with("language", "eng"))
        .unwrap()
        .output;
    assert_eq!(output.get(Field::Imprint), "Xynapse Traces");
    assert_eq!(output.get(Field::Language), "fre");
}
